//! 初始化向导与 SSH 配置修正
//!
//! 首次运行（或 --init）时收集 LLM 端点、步数上限与可选 SSH 目标；
//! 按服务商预设生成默认 URL 与模型名。SSH 连接失败后的恢复菜单也在这里。

use std::path::Path;

use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password, Select};

use crate::config::{save_config, AppConfig};

/// SSH 连接失败后的用户选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SshRecovery {
    /// 重新输入 SSH 配置
    Reconfigure,
    /// 清除 SSH 配置，降级本地模式
    FallbackLocal,
    /// 退出程序
    Quit,
}

/// 完整初始化向导；写回配置文件
pub fn run_wizard(cfg: &mut AppConfig, config_path: &Path) -> Result<(), dialoguer::Error> {
    let theme = ColorfulTheme::default();
    println!("\n🛠️  {}", style("Owl 初始化向导").blue().bold());
    println!("-------------------------------------------");

    // 先选服务商，用于生成默认 URL 与模型名
    let providers = [
        "DeepSeek (官方 API)",
        "OpenAI / ChatGPT",
        "Ollama (本地运行)",
        "LM Studio (本地运行)",
        "其他 (自定义/中转)",
    ];
    let provider = Select::with_theme(&theme)
        .with_prompt("🤖 请选择您的 AI 模型服务商")
        .items(&providers)
        .default(0)
        .interact()?;

    let (default_url, default_model) = match provider {
        0 => ("https://api.deepseek.com", "deepseek-chat"),
        1 => ("https://api.openai.com/v1", "gpt-4o"),
        2 => ("http://localhost:11434/v1", "llama3"),
        3 => ("http://localhost:1234/v1", "local-model"),
        _ => ("https://api.deepseek.com", "deepseek-chat"),
    };

    cfg.llm.api_url = Input::with_theme(&theme)
        .with_prompt("🌐 API 地址 (Base URL)")
        .default(default_url.to_string())
        .interact_text()?;
    cfg.llm.model_name = Input::with_theme(&theme)
        .with_prompt("🧠 模型名称 (Model ID)")
        .default(default_model.to_string())
        .interact_text()?;
    cfg.llm.api_key = Password::with_theme(&theme)
        .with_prompt("🔑 API Key (本地模型可回车跳过)")
        .allow_empty_password(true)
        .interact()?;

    let max_steps: String = Input::with_theme(&theme)
        .with_prompt("🔄 最大对话轮数 (Max Steps)")
        .default("30".to_string())
        .interact_text()?;
    cfg.agent.max_steps = max_steps.trim().parse().unwrap_or(30);

    cfg.ssh.host = Input::with_theme(&theme)
        .with_prompt("💻 SSH 主机 (IP:Port，只用本地模式可回车跳过)")
        .allow_empty(true)
        .interact_text()?;

    if cfg.ssh.host.trim().is_empty() {
        // 清理旧的 SSH 配置
        cfg.ssh.user.clear();
        cfg.ssh.password.clear();
        cfg.ssh.key_path.clear();
        persist(cfg, config_path);
    } else {
        ssh_wizard(cfg, config_path, true)?;
    }

    println!("-------------------------------------------\n");
    Ok(())
}

/// SSH 配置子向导；skip_host 为 true 时沿用已填的主机名（初次设置场景）
pub fn ssh_wizard(
    cfg: &mut AppConfig,
    config_path: &Path,
    skip_host: bool,
) -> Result<(), dialoguer::Error> {
    let theme = ColorfulTheme::default();
    if skip_host {
        println!("\n🔐 {}", style("SSH 身份认证").blue().bold());
    } else {
        println!("\n🛠️  {}", style("SSH 配置修正").blue().bold());
        cfg.ssh.host = Input::with_theme(&theme)
            .with_prompt("SSH 主机 (IP:Port)")
            .default(cfg.ssh.host.clone())
            .interact_text()?;
    }

    cfg.ssh.user = Input::with_theme(&theme)
        .with_prompt("SSH 用户名")
        .default(if cfg.ssh.user.is_empty() {
            "root".to_string()
        } else {
            cfg.ssh.user.clone()
        })
        .interact_text()?;

    let auth = Select::with_theme(&theme)
        .with_prompt("认证方式")
        .items(&["Password", "Private Key"])
        .default(0)
        .interact()?;

    if auth == 0 {
        cfg.ssh.password = Password::with_theme(&theme)
            .with_prompt("密码")
            .interact()?;
        cfg.ssh.key_path.clear();
    } else {
        let default_key = if cfg.ssh.key_path.is_empty() {
            format!(
                "{}/.ssh/id_rsa",
                std::env::var("HOME").unwrap_or_default()
            )
        } else {
            cfg.ssh.key_path.clone()
        };
        cfg.ssh.key_path = Input::with_theme(&theme)
            .with_prompt("私钥路径")
            .default(default_key)
            .interact_text()?;
        cfg.ssh.password.clear();
    }

    persist(cfg, config_path);
    Ok(())
}

/// SSH 连接失败后的恢复菜单；提示被取消按退出处理
pub fn ssh_failure_menu(error_text: &str) -> SshRecovery {
    println!("\n❌ {}", style(format!("SSH 连接失败: {}", error_text)).red().bold());

    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("检测到 SSH 连接失败，请选择操作")
        .items(&[
            "🔧 修改 SSH 配置 (重新输入)",
            "💻 切换为本地模式 (清除 SSH 配置)",
            "❌ 退出程序",
        ])
        .default(0)
        .interact();

    match choice {
        Ok(0) => SshRecovery::Reconfigure,
        Ok(1) => SshRecovery::FallbackLocal,
        _ => SshRecovery::Quit,
    }
}

/// 询问用户本次诊断目标
pub fn ask_goal() -> Result<String, dialoguer::Error> {
    Input::with_theme(&ColorfulTheme::default())
        .with_prompt("🎯 请输入您的需求 (例：检查系统为何负载过高)")
        .interact_text()
}

/// 无人值守模式的二次确认，默认否
pub fn confirm_batch_mode() -> bool {
    println!(
        "\n{}",
        style(" ⚠️  警告：无人值守模式 (BATCH MODE) 已开启 ⚠️ ")
            .white()
            .on_red()
            .bold()
    );
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("确认要在无人值守模式下运行吗?")
        .default(false)
        .interact()
        .unwrap_or(false)
}

fn persist(cfg: &AppConfig, path: &Path) {
    match save_config(cfg, path) {
        Ok(()) => println!("✅ 配置已保存至 {}", path.display()),
        Err(e) => println!("⚠️  配置保存失败: {}", e),
    }
}
