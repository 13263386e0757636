//! 终端交互层：横幅、过程事件展示与人工确认
//!
//! 过程事件只携带预览文本（完整输出在审计报告里）；确认提示默认否，
//! 提示失败由门控按拒绝处理。

pub mod wizard;

use async_trait::async_trait;
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;

use crate::collector::SystemContext;
use crate::core::{AgentEvent, ExecuteCause};
use crate::safety::Confirmer;

pub fn print_banner() {
    println!();
    println!("{}", style("  ███ Owl · 运维诊断智能体 ███").bold().cyan());
    println!("{}", style("  AI 排障 · 风险门控 · 全程审计").dim());
    println!();
}

/// 会话开场信息：连接状态、目标系统与审计路径
pub fn print_session_info(
    conn_info: &str,
    ctx: &SystemContext,
    report_path: Option<&std::path::Path>,
) {
    if let Some(p) = report_path {
        println!("[*] 审计日志: {}", p.display());
    }
    println!("--------------------------------------------------");
    println!("[+] 连接状态: {}", style(conn_info).yellow().bold());
    println!("[+] 目标系统: {} / {}", ctx.os, ctx.arch);
    println!("[+] 用户信息: {}", ctx.username);
    println!("--------------------------------------------------");
}

/// 渲染一条过程事件
pub fn handle_event(ev: &AgentEvent) {
    match ev {
        AgentEvent::StepStarted { step, max_steps } => {
            println!("\n--- [Step {} / {}] -----------------", step, max_steps);
        }
        AgentEvent::Thinking => {
            println!("{}", style("🧠 AI 正在思考...").dim());
        }
        AgentEvent::Thought { text } => {
            println!("💡 想法: {}", text);
        }
        AgentEvent::NoCommand { attempt, limit } => {
            println!("⏳ (无指令) 正在催促 AI 给出行动 [{}/{}]...", attempt, limit);
        }
        AgentEvent::CommandProposed { command, .. } => {
            println!("💻 命令: {}", style(command).cyan());
        }
        AgentEvent::Execute { cause } => match cause {
            ExecuteCause::Batch => println!("⚡ [Batch] 自动执行"),
            ExecuteCause::LowRisk => println!("🟢 风险: 低 -> 自动执行"),
            ExecuteCause::Approved => println!("✅ 已批准，开始执行"),
        },
        AgentEvent::Refused => {
            println!("🚫 已拒绝执行");
        }
        AgentEvent::Observation { preview, error } => match error {
            Some(err) => {
                println!("⚠️  执行出错: {}", err);
                if preview != "(无输出)" {
                    println!("   输出: {}", preview);
                }
            }
            None => println!("✅ 结果: {}", preview),
        },
    }
}

/// 最终报告（终局后由 main 统一打印）
pub fn print_final_report(report: &str, report_path: Option<&std::path::Path>) {
    println!("\n📝 最终报告:\n{}", "=".repeat(40));
    println!("{}", report);
    println!("{}", "=".repeat(40));
    if let Some(p) = report_path {
        println!("\n📂 日志: {}", p.display());
    }
}

/// 终端确认边界：dialoguer 确认框，默认否
pub struct TerminalConfirmer;

#[async_trait]
impl Confirmer for TerminalConfirmer {
    async fn confirm(&self, question: &str) -> Result<bool, String> {
        let question = question.to_string();
        // dialoguer 是阻塞交互，转入阻塞线程池
        tokio::task::spawn_blocking(move || {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(question)
                .default(false)
                .interact()
                .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| e.to_string())?
    }
}
