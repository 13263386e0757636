//! 风险门控：决定一条提案命令能否执行
//!
//! 判定顺序：无人值守模式直通 > low 自动放行 > 其余（high 或未标注）
//! 走人工确认。确认只认明确的肯定信号：提示失败、取消、否定一律按拒绝处理，
//! 这个方向不可反转。

pub mod ledger;

use async_trait::async_trait;

use crate::core::event::ExecuteCause;
use crate::llm::{Proposal, RiskLevel};

pub use ledger::ApprovalLedger;

/// 门控判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// 放行执行，附带原因供展示
    Execute(ExecuteCause),
    /// 不执行本条命令（循环继续）
    Skip,
}

/// 人工确认边界：一条是/否问题，返回布尔或失败
///
/// 实现方（终端提示、测试桩）只需回答问题本身；失败语义由门控统一处理。
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, question: &str) -> Result<bool, String>;
}

/// 风险门控：持有确认边界与审批台账
pub struct SafetyGate {
    confirmer: Box<dyn Confirmer>,
    ledger: ApprovalLedger,
}

impl SafetyGate {
    pub fn new(confirmer: Box<dyn Confirmer>, ledger: ApprovalLedger) -> Self {
        Self { confirmer, ledger }
    }

    /// 判定一条提案；batch_mode 为显式选入的无人值守直通
    pub async fn decide(&self, proposal: &Proposal, batch_mode: bool) -> Decision {
        if batch_mode {
            return Decision::Execute(ExecuteCause::Batch);
        }
        if proposal.risk() == RiskLevel::Low {
            return Decision::Execute(ExecuteCause::LowRisk);
        }

        let reason = if proposal.reason.trim().is_empty() {
            "未说明理由"
        } else {
            proposal.reason.trim()
        };
        let question = format!("🔴 风险: 高 ({}) -> 是否执行?", reason);

        match self.confirmer.confirm(&question).await {
            Ok(true) => {
                // 人工放行的高风险命令记入审批台账
                self.ledger.record(&proposal.command);
                Decision::Execute(ExecuteCause::Approved)
            }
            Ok(false) => Decision::Skip,
            Err(e) => {
                // 提示失败按隐式拒绝处理，绝不按隐式批准
                tracing::warn!(error = %e, "confirm prompt failed, treating as refusal");
                Decision::Skip
            }
        }
    }
}
