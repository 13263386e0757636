//! 提案源：把会话历史变成下一步行动
//!
//! 所有后端实现 ProposalSource：OpenAI 兼容端点（DeepSeek / OpenAI /
//! Ollama / LM Studio）与测试用 Mock。

pub mod mock;
pub mod openai;
pub mod proposal;
pub mod traits;

pub use mock::MockProposalSource;
pub use openai::OpenAiProposalSource;
pub use proposal::{parse_proposal, Proposal, RiskLevel};
pub use traits::ProposalSource;
