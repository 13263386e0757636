//! 本地执行后端
//!
//! 经宿主 shell（sh -c / cmd /C）执行，stdout 与 stderr 合并返回；
//! 非零退出码记入 error 但不丢输出。

use async_trait::async_trait;
use tokio::process::Command;

use crate::executor::{ExecutionBackend, ExecutionResult};

/// 本地后端：无连接状态，Close 为空操作
#[derive(Debug, Default)]
pub struct LocalBackend;

impl LocalBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExecutionBackend for LocalBackend {
    async fn run(&self, command: &str) -> ExecutionResult {
        tracing::info!(command, "local exec");

        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };

        let output = match cmd.output().await {
            Ok(o) => o,
            Err(e) => {
                return ExecutionResult {
                    output: String::new(),
                    error: Some(format!("failed to spawn shell: {}", e)),
                }
            }
        };

        let mut merged = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !merged.is_empty() && !merged.ends_with('\n') {
                merged.push('\n');
            }
            merged.push_str(stderr.trim_end());
        }

        let error = if output.status.success() {
            None
        } else {
            Some(format!("exit status: {}", output.status))
        };

        ExecutionResult {
            output: merged,
            error,
        }
    }

    fn is_remote(&self) -> bool {
        false
    }

    async fn close(&self) {}
}
