//! Agent 错误类型
//!
//! 对应三类结局：连接错误可恢复（上层给出改配置/降级本地/退出的选择），
//! 提案源错误对会话致命（终止循环），执行错误只作为观察文本回流对话，不在此建模。

use thiserror::Error;

/// Agent 运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 执行环境初始化失败（SSH 连接/认证等）；可恢复，由调用方决定重试或降级
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// LLM 调用失败（网络、鉴权、限流等）；对本次会话致命
    #[error("LLM error: {0}")]
    Llm(String),

    /// 提案 JSON 解析失败；对本次会话致命
    #[error("Proposal parse error: {0}")]
    ProposalParse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Cancelled")]
    Cancelled,
}
