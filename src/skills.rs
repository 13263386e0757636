//! 快速巡检技能
//!
//! 预置的安全巡检探针（SSH 登录记录、特权用户、计划任务），经执行后端
//! 在目标机上运行；输出按「【标题】:」分节拼接，既给操作员看，
//! 也可作为会话的初始线索交给提案源。

use crate::executor::ExecutionBackend;

/// 巡检探针的一个分节：标题 + 只读探测命令 + 失败提示
struct ProbeSection {
    title: &'static str,
    command: &'static str,
    on_error: &'static str,
}

/// 一项巡检探针：若干条只读命令组成一个主题
pub struct TriageProbe {
    pub id: &'static str,
    pub name: &'static str,
    sections: &'static [ProbeSection],
}

/// 内置巡检探针表；全部为只读命令
pub const TRIAGE_PROBES: &[TriageProbe] = &[
    TriageProbe {
        id: "ssh-logs",
        name: "SSH 登录情况",
        sections: &[
            ProbeSection {
                title: "最近登录失败记录",
                command: "lastb | head -10",
                on_error: "无法读取 SSH 失败日志 (可能需要 root 权限)",
            },
            ProbeSection {
                title: "最近登录成功记录",
                command: "last | head -5",
                on_error: "无法读取登录成功记录",
            },
        ],
    },
    TriageProbe {
        id: "users",
        name: "系统用户",
        sections: &[
            ProbeSection {
                title: "特权用户(UID=0)",
                command: "awk -F: '$3==0 {print $1}' /etc/passwd",
                on_error: "无法读取 /etc/passwd",
            },
            ProbeSection {
                title: "可登录用户",
                command: "grep '/bin/bash' /etc/passwd | cut -d: -f1",
                on_error: "无法读取 /etc/passwd",
            },
        ],
    },
    TriageProbe {
        id: "cron",
        name: "计划任务",
        sections: &[ProbeSection {
            title: "系统级计划任务 /etc/crontab",
            command: "cat /etc/crontab",
            on_error: "无法读取 /etc/crontab",
        }],
    },
];

impl TriageProbe {
    /// 在目标机上执行本探针的全部分节并拼接结果
    pub async fn run(&self, backend: &dyn ExecutionBackend) -> String {
        let mut out = String::new();
        for section in self.sections {
            let result = backend.run(section.command).await;
            let body = if result.error.is_some() {
                section.on_error.to_string()
            } else {
                let text = result.output.trim();
                if text.is_empty() {
                    "(无输出)".to_string()
                } else {
                    text.to_string()
                }
            };
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("【{}】:\n{}", section.title, body));
        }
        out
    }
}

/// 依次执行全部内置探针，返回带主题标题的汇总文本
pub async fn run_triage(backend: &dyn ExecutionBackend) -> String {
    let mut report = String::new();
    for probe in TRIAGE_PROBES {
        tracing::info!(probe = probe.id, "triage probe");
        let body = probe.run(backend).await;
        if !report.is_empty() {
            report.push_str("\n\n");
        }
        report.push_str(&format!("## {}\n{}", probe.name, body));
    }
    report
}
