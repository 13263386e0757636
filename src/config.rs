//! 应用配置：TOML 文件 + 环境变量
//!
//! 加载顺序：先读 config.toml（或 -c 指定的文件），再用环境变量 `OWL__*`
//! 覆盖（双下划线表示嵌套，如 `OWL__LLM__API_KEY=sk-xxx`）。
//! 向导写回时整体序列化为 TOML。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::AgentError;

/// 未配置或配置非法时的最大对话轮数
pub const DEFAULT_MAX_STEPS: usize = 30;

/// 应用配置根（对应 config.toml 顶层）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub agent: AgentSection,
    pub ssh: SshSection,
}

/// [llm] 段：OpenAI 兼容端点（DeepSeek / OpenAI / Ollama / LM Studio / 中转均可）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// API Base URL（不含 /chat/completions 路径）
    pub api_url: String,
    pub model_name: String,
    /// 本地模型可留空
    pub api_key: String,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            api_url: "https://api.deepseek.com".to_string(),
            model_name: "deepseek-chat".to_string(),
            api_key: String::new(),
        }
    }
}

/// [agent] 段：会话边界
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// 最大对话轮数，防止 AI 死循环；非正数按默认值处理
    pub max_steps: i64,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS as i64,
        }
    }
}

/// [ssh] 段：host 为空即本地模式；认证二选一（password / key_path）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSection {
    /// IP 或 IP:Port，留空表示本地模式
    pub host: String,
    pub user: String,
    pub password: String,
    pub key_path: String,
}

impl AppConfig {
    /// 归一化后的最大步数（非正数回退默认 30）
    pub fn effective_max_steps(&self) -> usize {
        if self.agent.max_steps <= 0 {
            DEFAULT_MAX_STEPS
        } else {
            self.agent.max_steps as usize
        }
    }

    /// 是否配置了远程目标
    pub fn is_remote(&self) -> bool {
        !self.ssh.host.trim().is_empty()
    }
}

/// 默认配置文件路径（-c 未指定时）
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config.toml")
}

/// 从 TOML 文件与环境变量加载配置；文件不存在时仅用默认值 + 环境变量
pub fn load_config(path: &Path) -> Result<AppConfig, AgentError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path.to_path_buf()).required(false))
        .add_source(
            config::Environment::with_prefix("OWL")
                .separator("__")
                .try_parsing(true),
        );

    builder
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| AgentError::Config(e.to_string()))
}

/// 将配置写回 TOML 文件（向导与 SSH 修正后调用）
pub fn save_config(cfg: &AppConfig, path: &Path) -> Result<(), AgentError> {
    let text = toml::to_string_pretty(cfg).map_err(|e| AgentError::Config(e.to_string()))?;
    std::fs::write(path, text).map_err(|e| AgentError::Config(e.to_string()))
}
