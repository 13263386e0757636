//! 提案源抽象
//!
//! 输入：系统上下文快照 + 完整会话历史；输出：一条结构化提案或错误。
//! 核心把它当作无副作用的函数调用；错误对会话致命。

use async_trait::async_trait;

use crate::collector::SystemContext;
use crate::core::AgentError;
use crate::llm::Proposal;
use crate::transcript::Message;

/// 提案源 trait：每步调用一次
#[async_trait]
pub trait ProposalSource: Send + Sync {
    async fn propose(
        &self,
        ctx: &SystemContext,
        transcript: &[Message],
    ) -> Result<Proposal, AgentError>;
}
