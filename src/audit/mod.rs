//! 审计报告：会话全程的可读记录
//!
//! 追加写入、逐条带时间戳的 Markdown 文件。打开失败不终止会话，降级为
//! 空操作记录器；审计是尽力而为的观测性，不是编排正确性的依赖。
//! 与交互展示不同，这里必须落完整的未截断命令输出。

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

/// 审计记录器；file 为 None 时所有写入都是空操作
pub struct Reporter {
    file: Option<File>,
    path: PathBuf,
}

impl Reporter {
    /// 在指定目录下创建本次会话的报告文件
    ///
    /// 返回 (记录器, 实际可用的报告路径)；创建失败时返回空操作记录器与 None。
    pub fn open(dir: &Path) -> (Self, Option<PathBuf>) {
        let path = dir.join(format!(
            "report-{}.md",
            Local::now().format("%Y%m%d-%H%M%S")
        ));

        let file = std::fs::create_dir_all(dir)
            .and_then(|_| File::create(&path))
            .map_err(|e| {
                tracing::warn!(path = %path.display(), error = %e, "audit sink unavailable, logging disabled");
                e
            })
            .ok();

        let mut reporter = Self { file, path };
        reporter.write_raw(&format!(
            "# Owl 诊断报告\n\n- 开始时间: {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        let path = reporter.file.is_some().then(|| reporter.path.clone());
        (reporter, path)
    }

    /// 构造空操作记录器（测试或显式关闭审计时用）
    pub fn disabled() -> Self {
        Self {
            file: None,
            path: PathBuf::new(),
        }
    }

    /// 记录一条事件（AI 想法、最终报告等）
    pub fn log_event(&mut self, kind: &str, detail: &str) {
        self.write_raw(&format!(
            "\n## [{}] {}\n\n{}\n",
            Local::now().format("%H:%M:%S"),
            kind,
            detail
        ));
    }

    /// 记录一次命令执行；output 必须是完整未截断的输出
    pub fn log_command(&mut self, command: &str, output: &str) {
        self.write_raw(&format!(
            "\n## [{}] Command\n\n```shell\n$ {}\n```\n\n```\n{}\n```\n",
            Local::now().format("%H:%M:%S"),
            command,
            output
        ));
    }

    /// 收尾落盘；幂等
    pub fn close(&mut self) {
        if let Some(f) = self.file.as_mut() {
            let _ = f.flush();
        }
        self.file = None;
    }

    fn write_raw(&mut self, text: &str) {
        if let Some(f) = self.file.as_mut() {
            if let Err(e) = f.write_all(text.as_bytes()) {
                tracing::warn!(error = %e, "audit write failed, logging disabled");
                self.file = None;
            }
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        self.close();
    }
}
