//! 会话过程事件：供 CLI 渲染思考、命令、门控结果与观察
//!
//! 事件中的输出只携带预览（截断），完整输出只进审计报告。

use serde::Serialize;

/// 门控放行原因（用于展示）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteCause {
    /// 无人值守模式直通
    Batch,
    /// 低风险自动执行
    LowRisk,
    /// 高风险经人工确认
    Approved,
}

/// 单步过程事件
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// 新的一步开始
    StepStarted { step: usize, max_steps: usize },
    /// 正在调用提案源思考
    Thinking,
    /// AI 的想法
    Thought { text: String },
    /// 本步未给出命令（空转催促中）
    NoCommand { attempt: u32, limit: u32 },
    /// AI 提议的命令
    CommandProposed { command: String, risk: String },
    /// 门控放行
    Execute { cause: ExecuteCause },
    /// 用户拒绝执行
    Refused,
    /// 命令执行结果（预览，完整输出在审计报告中）
    Observation {
        preview: String,
        error: Option<String>,
    },
}
