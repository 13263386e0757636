//! 审批台账：人工放行的高风险命令记录
//!
//! 追加写入（时间戳 + 命令原文）。台账是观测性设施，写失败降级为告警，
//! 不影响会话语义。

use std::io::Write;
use std::path::PathBuf;

use chrono::Local;

/// 审批台账：按行追加 `[时间] 命令`
#[derive(Debug, Clone)]
pub struct ApprovalLedger {
    path: PathBuf,
}

impl ApprovalLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// 记录一条人工批准的命令；尽力而为
    pub fn record(&self, command: &str) {
        if let Err(e) = self.append(command) {
            tracing::warn!(path = %self.path.display(), error = %e, "approval ledger write failed");
        }
    }

    fn append(&self, command: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let line = format!(
            "[{}] {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            command
        );
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?
            .write_all(line.as_bytes())
    }
}
