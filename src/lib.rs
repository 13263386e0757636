//! Owl - Rust 运维诊断智能体
//!
//! AI 逐步提议 shell 命令排查目标机器，经风险门控在本地或 SSH 远端执行，
//! 全程落审计报告。
//!
//! 模块划分：
//! - **audit**: 审计报告（追加式可读记录，打开失败降级空操作）
//! - **collector**: 目标机系统指纹采集
//! - **config**: 应用配置（TOML + 环境变量 `OWL__*`）
//! - **core**: 错误、会话状态、过程事件与主控循环
//! - **executor**: 本地 / SSH 双模命令执行后端
//! - **llm**: 提案源抽象与实现（OpenAI 兼容 / Mock）
//! - **safety**: 风险门控与审批台账
//! - **skills**: 内置快速巡检探针
//! - **transcript**: 追加式会话记录
//! - **ui**: 终端交互（横幅、向导、人工确认）

pub mod audit;
pub mod collector;
pub mod config;
pub mod core;
pub mod executor;
pub mod llm;
pub mod safety;
pub mod skills;
pub mod transcript;
pub mod ui;
