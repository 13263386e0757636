//! 命令执行后端：本地 / SSH 双模统一抽象
//!
//! 模式在会话开始时选定一次（ssh.host 为空即本地），之后编排层与风险门控
//! 对执行目标完全无感；只有 Init / Close / is_remote 因模式而异。

pub mod local;
pub mod ssh;

use async_trait::async_trait;

use crate::config::SshSection;
use crate::core::AgentError;

pub use local::LocalBackend;
pub use ssh::SshBackend;

/// 单次命令执行的结果
///
/// 部分失败语义：非零退出码记入 error，但 output 照常返回；
/// 失败的命令同样产生诊断文本，必须回流给提案源。
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// stdout 与 stderr 合并后的输出
    pub output: String,
    /// 非零退出码或底层 I/O 错误的描述
    pub error: Option<String>,
}

/// 执行后端能力接口：恰好两个实现（本地 / SSH），会话期独占持有
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// 执行一条 shell 命令，返回合并输出与可选错误
    async fn run(&self, command: &str) -> ExecutionResult;

    fn is_remote(&self) -> bool;

    /// 释放资源；幂等，Init 未完成时调用也安全
    async fn close(&self);
}

/// 按配置初始化执行后端
///
/// SSH 连接失败返回 ConnectFailed，由调用方给出改配置/降级本地/退出的选择，
/// 本层不做静默重试。
pub async fn init_backend(ssh: &SshSection) -> Result<Box<dyn ExecutionBackend>, AgentError> {
    if ssh.host.trim().is_empty() {
        Ok(Box::new(LocalBackend::new()))
    } else {
        Ok(Box::new(SshBackend::connect(ssh).await?))
    }
}
