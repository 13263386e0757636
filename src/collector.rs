//! 系统指纹采集
//!
//! 本地模式读编译期常量与环境变量；远程模式通过执行后端探测目标机，
//! 让提案源基于目标系统而非操作员本机做推理。

use crate::executor::ExecutionBackend;

/// 系统上下文快照（对编排核心不透明，仅透传给提案源）
#[derive(Debug, Clone)]
pub struct SystemContext {
    pub os: String,
    pub arch: String,
    pub username: String,
}

impl SystemContext {
    /// 本机快照
    pub fn local() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            username: std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .unwrap_or_else(|_| "unknown".to_string()),
        }
    }
}

/// 采集会话目标机的系统上下文
pub async fn collect(backend: &dyn ExecutionBackend) -> SystemContext {
    if !backend.is_remote() {
        return SystemContext::local();
    }

    SystemContext {
        os: probe(backend, "uname -s").await,
        arch: probe(backend, "uname -m").await,
        username: probe(backend, "whoami").await,
    }
}

/// 在目标机上执行探测命令，失败时回退 "unknown"
async fn probe(backend: &dyn ExecutionBackend, command: &str) -> String {
    let result = backend.run(command).await;
    let value = result.output.trim();
    if result.error.is_some() || value.is_empty() {
        tracing::warn!(command, "system probe failed");
        "unknown".to_string()
    } else {
        // 只取首行，防御多行 banner
        value.lines().next().unwrap_or("unknown").trim().to_string()
    }
}
