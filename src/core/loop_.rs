//! 主控循环：提案 -> 审计 -> 门控 -> 执行 -> 回写会话
//!
//! 单线程逐步推进：一步完整落地（含会话与审计追加）后才开始下一步，
//! 提案源看到的永远是前缀一致的完整历史（含被拒绝、被催促的步骤）。
//! 终局：AI 宣告完成 / 空转收束 / 步数耗尽；提案源错误走 Err 且不留半步效果。

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::audit::Reporter;
use crate::collector::SystemContext;
use crate::core::event::AgentEvent;
use crate::core::state::{SessionEnd, SessionState, STALL_LIMIT};
use crate::core::AgentError;
use crate::executor::ExecutionBackend;
use crate::llm::ProposalSource;
use crate::safety::{Decision, SafetyGate};
use crate::transcript::{Message, Transcript};

/// 交互展示的输出预览上限；审计报告始终落完整输出
const DISPLAY_PREVIEW_CHARS: usize = 300;

/// 空转催促语：强迫下一轮输出 command 或收束
const NO_COMMAND_NUDGE: &str = "系统警告: 你没有输出 'command'。\
请立即给出具体的 shell 命令来验证你的想法，或在任务已完成时设置 'is_finished': true。";

/// 拒绝后的纠偏语：提示换方案而非静默丢弃本步
const REFUSED_NOTICE: &str = "用户拒绝执行此命令，请尝试其他方案。";

fn send_event(tx: &Option<&mpsc::UnboundedSender<AgentEvent>>, ev: AgentEvent) {
    if let Some(t) = tx {
        let _ = t.send(ev);
    }
}

/// 输出预览：截断到 DISPLAY_PREVIEW_CHARS 字符，空输出给占位
fn preview(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "(无输出)".to_string();
    }
    if trimmed.chars().count() > DISPLAY_PREVIEW_CHARS {
        let head: String = trimmed.chars().take(DISPLAY_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        trimmed.to_string()
    }
}

/// 执行主控循环直至终局
///
/// 每步：请求提案（错误即中止，不落任何半步效果）-> 想法/命令先进审计 ->
/// is_finished 优先收束 -> 空命令走看门狗 -> 风险门控 -> 放行则执行并把
/// 完整输出回写会话（展示只给预览）。
#[allow(clippy::too_many_arguments)]
pub async fn run_agent_loop(
    source: &dyn ProposalSource,
    backend: &dyn ExecutionBackend,
    gate: &SafetyGate,
    reporter: &mut Reporter,
    ctx: &SystemContext,
    transcript: &mut Transcript,
    max_steps: usize,
    batch_mode: bool,
    event_tx: Option<&mpsc::UnboundedSender<AgentEvent>>,
    cancel_token: CancellationToken,
) -> Result<SessionEnd, AgentError> {
    let mut state = SessionState::new(max_steps);
    let mut last_thought = String::new();

    loop {
        // 外层步数边界：耗尽后不再请求提案，用最后的想法合成收束报告
        if state.exhausted() {
            let report = format!(
                "⏹ 已达最大步数限制 ({})，强制收束。\n最后的思考线索: {}",
                max_steps, last_thought
            );
            reporter.log_event("Final Report", &report);
            return Ok(SessionEnd::StepLimit(report));
        }

        if cancel_token.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        state.next_step();
        send_event(
            &event_tx,
            AgentEvent::StepStarted {
                step: state.step_count,
                max_steps,
            },
        );
        send_event(&event_tx, AgentEvent::Thinking);

        // 提案源错误对会话致命：直接传播，本步不留任何效果
        let proposal = source.propose(ctx, transcript.messages()).await?;

        // 想法与命令先进审计，再做任何执行资格判定
        reporter.log_event(
            "AI Thought",
            &format!("Idea: {}\nCmd: {}", proposal.thought, proposal.command),
        );
        if !proposal.thought.trim().is_empty() {
            last_thought = proposal.thought.trim().to_string();
            send_event(
                &event_tx,
                AgentEvent::Thought {
                    text: last_thought.clone(),
                },
            );
        }

        // 完成宣告优先于一切后续判定
        if proposal.is_finished {
            let report = if proposal.final_report.trim().is_empty() {
                format!("✅ 任务完成。总结: {}", proposal.thought.trim())
            } else {
                proposal.final_report.trim().to_string()
            };
            reporter.log_event("Final Report", &report);
            return Ok(SessionEnd::Completed(report));
        }

        // 空命令看门狗
        if !proposal.has_command() {
            if state.record_empty() {
                let report = if proposal.final_report.trim().is_empty() {
                    format!(
                        "❌ 异常终止：AI 连续多轮未给出任何命令。\n最后的思考线索: {}",
                        last_thought
                    )
                } else {
                    proposal.final_report.trim().to_string()
                };
                reporter.log_event("Final Report", &report);
                return Ok(SessionEnd::Stalled(report));
            }

            send_event(
                &event_tx,
                AgentEvent::NoCommand {
                    attempt: state.consecutive_empty_count,
                    limit: STALL_LIMIT,
                },
            );

            // 先保留 AI 自己的思考维持上下文连贯，再注入催促
            transcript.push(Message::assistant(
                serde_json::json!({
                    "thought": proposal.thought,
                    "command": "",
                    "is_finished": false,
                })
                .to_string(),
            ));
            transcript.push(Message::user(NO_COMMAND_NUDGE));
            continue;
        }

        state.reset_empty();
        send_event(
            &event_tx,
            AgentEvent::CommandProposed {
                command: proposal.command.clone(),
                risk: proposal.risk_level.clone(),
            },
        );

        match gate.decide(&proposal, batch_mode).await {
            Decision::Skip => {
                send_event(&event_tx, AgentEvent::Refused);
                transcript.push(Message::user(REFUSED_NOTICE));
                continue;
            }
            Decision::Execute(cause) => {
                send_event(&event_tx, AgentEvent::Execute { cause });

                let result = backend.run(&proposal.command).await;

                // 审计拿完整输出；事件只带预览
                reporter.log_command(&proposal.command, &result.output);
                if let Some(err) = &result.error {
                    reporter.log_event("Exec Error", err);
                }
                send_event(
                    &event_tx,
                    AgentEvent::Observation {
                        preview: preview(&result.output),
                        error: result.error.clone(),
                    },
                );

                transcript.push(Message::assistant(
                    serde_json::json!({ "command": proposal.command }).to_string(),
                ));
                let mut observation = format!("Output:\n{}", result.output);
                if let Some(err) = &result.error {
                    observation.push_str(&format!("\n(命令执行异常: {})", err));
                }
                transcript.push(Message::user(observation));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_at_limit() {
        let long = "a".repeat(500);
        let p = preview(&long);
        assert_eq!(p.chars().count(), DISPLAY_PREVIEW_CHARS + 3);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn test_preview_short_passthrough() {
        assert_eq!(preview("  ok  "), "ok");
        assert_eq!(preview("   "), "(无输出)");
    }
}
