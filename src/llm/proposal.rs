//! 提案：AI 为单步建议的行动
//!
//! parse_proposal 从 LLM 文本中提取 JSON（```json 围栏或花括号切片）并解析；
//! 字段全部宽松缺省，risk_level 留原始字符串，归一化由 risk() 负责。

use serde::{Deserialize, Serialize};

use crate::core::AgentError;

/// 命令风险等级：low 自动执行，其余一律按高风险走人工确认
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    High,
}

/// 单步提案（即用即弃，不持久化；落入会话与审计的是由它派生的消息）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Proposal {
    /// 本步的思考
    pub thought: String,
    /// 建议执行的 shell 命令；可为空（空命令无风险概念）
    pub command: String,
    /// 原始风险标注："low" / "high"，缺省或乱填视同 high
    pub risk_level: String,
    /// 高风险时给用户看的理由
    pub reason: String,
    /// AI 宣告任务完成
    pub is_finished: bool,
    /// 最终报告；可为空，空时由 thought 兜底合成
    pub final_report: String,
}

impl Proposal {
    /// 归一化风险：只有明确的 "low" 才算低风险
    pub fn risk(&self) -> RiskLevel {
        if self.risk_level.trim().eq_ignore_ascii_case("low") {
            RiskLevel::Low
        } else {
            RiskLevel::High
        }
    }

    pub fn has_command(&self) -> bool {
        !self.command.trim().is_empty()
    }
}

/// 解析 LLM 输出为 Proposal
///
/// 依次尝试：```json 围栏内内容、首个 '{' 到末个 '}' 的切片；
/// 无 JSON 或解析失败均为提案源错误，对会话致命，不做重试。
pub fn parse_proposal(output: &str) -> Result<Proposal, AgentError> {
    let trimmed = output.trim();

    let json_str = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        rest.find("```")
            .map(|end| rest[..end].trim())
            .unwrap_or(rest.trim())
    } else if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            &trimmed[start..=end]
        } else {
            trimmed
        }
    } else {
        return Err(AgentError::ProposalParse(format!(
            "no JSON object in output: {}",
            preview(trimmed)
        )));
    };

    serde_json::from_str(json_str)
        .map_err(|e| AgentError::ProposalParse(format!("{}: {}", e, preview(json_str))))
}

fn preview(s: &str) -> String {
    const MAX: usize = 200;
    if s.chars().count() > MAX {
        format!("{}...", s.chars().take(MAX).collect::<String>())
    } else {
        s.to_string()
    }
}
