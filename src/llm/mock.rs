//! Mock 提案源（测试用，无需 API）
//!
//! 按脚本顺序吐出预设提案或错误，耗尽后报错；供循环与门控测试复现
//! 空转、拒绝、终止等轨迹。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::collector::SystemContext;
use crate::core::AgentError;
use crate::llm::{Proposal, ProposalSource};
use crate::transcript::Message;

/// 脚本化提案源：每次 propose 弹出队首
pub struct MockProposalSource {
    script: Mutex<VecDeque<Result<Proposal, AgentError>>>,
}

impl MockProposalSource {
    pub fn new(proposals: Vec<Proposal>) -> Self {
        Self {
            script: Mutex::new(proposals.into_iter().map(Ok).collect()),
        }
    }

    /// 允许在脚本中混入错误步骤
    pub fn with_results(results: Vec<Result<Proposal, AgentError>>) -> Self {
        Self {
            script: Mutex::new(results.into_iter().collect()),
        }
    }
}

#[async_trait]
impl ProposalSource for MockProposalSource {
    async fn propose(
        &self,
        _ctx: &SystemContext,
        _transcript: &[Message],
    ) -> Result<Proposal, AgentError> {
        let next = match self.script.lock() {
            Ok(mut q) => q.pop_front(),
            Err(mut poisoned) => poisoned.get_mut().pop_front(),
        };
        next.unwrap_or_else(|| Err(AgentError::Llm("mock script exhausted".to_string())))
    }
}
