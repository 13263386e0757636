//! Owl - 运维诊断智能体
//!
//! 入口：初始化日志、加载配置（缺失则进向导）、初始化执行后端
//! （SSH 失败可改配置/降级本地/退出）、采集系统指纹并驱动主控循环。

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use owl::audit::Reporter;
use owl::collector;
use owl::config::{default_config_path, load_config, save_config};
use owl::core::{run_agent_loop, AgentError};
use owl::executor::{init_backend, ExecutionBackend};
use owl::llm::OpenAiProposalSource;
use owl::safety::{ApprovalLedger, SafetyGate};
use owl::skills;
use owl::transcript::{Message, Transcript};
use owl::ui::{self, wizard};

#[derive(Parser, Debug)]
#[command(name = "owl", version, about = "AI 驱动的运维诊断智能体")]
struct Cli {
    /// 指定配置文件路径
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// 开启无人值守模式（跳过全部人工确认）
    #[arg(long)]
    batch: bool,

    /// 强制重新进入初始化向导
    #[arg(long)]
    init: bool,

    /// 会话开始前先执行一轮内置安全巡检，结果作为排查的初始线索
    #[arg(long)]
    triage: bool,

    /// 诊断需求（留空则交互式询问）
    goal: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();

    ui::print_banner();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    let mut cfg = load_config(&config_path).context("Failed to load config")?;
    if cli.init || !config_path.exists() {
        println!("⚠️  未检测到配置文件或请求重新初始化，进入向导模式...");
        wizard::run_wizard(&mut cfg, &config_path).context("Wizard interrupted")?;
    } else {
        println!("📂 已加载配置: {}", config_path.display());
    }

    // 获取用户需求
    let goal = if cli.goal.is_empty() {
        let g = wizard::ask_goal().context("Cancelled")?;
        if g.trim().is_empty() {
            println!("❌ 未提供需求，程序退出。");
            return Ok(());
        }
        g
    } else {
        cli.goal.join(" ")
    };

    // 初始化执行环境；SSH 连接失败不静默重试，交给用户选择
    let backend: Box<dyn ExecutionBackend> = loop {
        match init_backend(&cfg.ssh).await {
            Ok(b) => break b,
            Err(AgentError::ConnectFailed(msg)) if cfg.is_remote() => {
                match wizard::ssh_failure_menu(&msg) {
                    wizard::SshRecovery::Reconfigure => {
                        let _ = wizard::ssh_wizard(&mut cfg, &config_path, false);
                    }
                    wizard::SshRecovery::FallbackLocal => {
                        cfg.ssh = Default::default();
                        let _ = save_config(&cfg, &config_path);
                    }
                    wizard::SshRecovery::Quit => return Ok(()),
                }
            }
            Err(e) => {
                println!("❌ 初始化执行环境失败: {}", e);
                return Ok(());
            }
        }
    };

    // 无人值守模式必须显式二次确认
    if cli.batch && !wizard::confirm_batch_mode() {
        backend.close().await;
        return Ok(());
    }

    // 审计报告：打开失败降级空操作，不影响会话
    let (mut reporter, report_path) = Reporter::open(Path::new("reports"));

    // 环境感知
    println!("🔍 正在采集系统指纹...");
    let ctx = collector::collect(backend.as_ref()).await;

    let conn_info = if backend.is_remote() {
        format!("SSH -> {}", cfg.ssh.host)
    } else {
        "本地模式".to_string()
    };
    ui::print_session_info(&conn_info, &ctx, report_path.as_deref());

    let source =
        OpenAiProposalSource::new(&cfg.llm.api_url, &cfg.llm.model_name, &cfg.llm.api_key);
    let gate = SafetyGate::new(
        Box::new(ui::TerminalConfirmer),
        ApprovalLedger::new("reports/approvals.log"),
    );
    let mut transcript = Transcript::with_goal(&goal);

    // 可选的开场巡检：结果全文进审计与会话，供 AI 作为初始线索
    if cli.triage {
        println!("🧪 正在执行快速巡检...");
        let summary = skills::run_triage(backend.as_ref()).await;
        reporter.log_event("Triage", &summary);
        println!("{}", summary);
        transcript.push(Message::user(format!(
            "以下是预置巡检命令在目标机上的输出，作为排查的初始依据：\n{}",
            summary
        )));
    }

    // Ctrl-C 走协作式取消：循环在下一步边界收束
    let cancel_token = CancellationToken::new();
    let ctrlc_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrlc_token.cancel();
        }
    });

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(ev) = event_rx.recv().await {
            ui::handle_event(&ev);
        }
    });

    let outcome = run_agent_loop(
        &source,
        backend.as_ref(),
        &gate,
        &mut reporter,
        &ctx,
        &mut transcript,
        cfg.effective_max_steps(),
        cli.batch,
        Some(&event_tx),
        cancel_token,
    )
    .await;

    drop(event_tx);
    let _ = printer.await;

    // 无论终局如何都释放连接并收尾审计
    backend.close().await;
    reporter.close();

    match outcome {
        Ok(end) => ui::print_final_report(end.report(), report_path.as_deref()),
        Err(AgentError::Cancelled) => println!("\n🚫 已取消"),
        Err(e) => {
            println!("\n❌ AI 错误: {}", e);
            if let Some(p) = &report_path {
                println!("📂 日志: {}", p.display());
            }
        }
    }

    Ok(())
}
