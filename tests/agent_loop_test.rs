//! 主控循环集成测试
//!
//! 用脚本化提案源、记录型后端与确认桩复现：空转收束、风险门控、
//! 无人值守直通、步数边界与会话顺序保证。

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use owl::audit::Reporter;
use owl::collector::SystemContext;
use owl::core::{run_agent_loop, AgentError, AgentEvent, SessionEnd};
use owl::executor::{ExecutionBackend, ExecutionResult};
use owl::llm::{MockProposalSource, Proposal, ProposalSource};
use owl::safety::{ApprovalLedger, Confirmer, SafetyGate};
use owl::transcript::Transcript;

// ---------------------------------------------------------------- 测试桩

/// 记录型后端：记下每条执行的命令，返回预设输出
struct RecordingBackend {
    calls: Mutex<Vec<String>>,
    canned_output: String,
    canned_error: Option<String>,
}

impl RecordingBackend {
    fn new(output: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            canned_output: output.to_string(),
            canned_error: None,
        }
    }

    fn failing(output: &str, error: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            canned_output: output.to_string(),
            canned_error: Some(error.to_string()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionBackend for RecordingBackend {
    async fn run(&self, command: &str) -> ExecutionResult {
        self.calls.lock().unwrap().push(command.to_string());
        ExecutionResult {
            output: self.canned_output.clone(),
            error: self.canned_error.clone(),
        }
    }

    fn is_remote(&self) -> bool {
        false
    }

    async fn close(&self) {}
}

/// 固定回答的确认桩
struct StubConfirmer {
    answer: Result<bool, String>,
}

impl StubConfirmer {
    fn yes() -> Self {
        Self { answer: Ok(true) }
    }

    fn no() -> Self {
        Self { answer: Ok(false) }
    }

    fn failing() -> Self {
        Self {
            answer: Err("prompt io error".to_string()),
        }
    }
}

#[async_trait]
impl Confirmer for StubConfirmer {
    async fn confirm(&self, _question: &str) -> Result<bool, String> {
        self.answer.clone()
    }
}

/// 一旦被调用即 panic 的确认桩：证明某条路径从不触达人工确认
struct MustNotConfirm;

#[async_trait]
impl Confirmer for MustNotConfirm {
    async fn confirm(&self, _question: &str) -> Result<bool, String> {
        panic!("human confirmation must not be invoked on this path");
    }
}

// ---------------------------------------------------------------- 辅助

fn low(thought: &str, command: &str) -> Proposal {
    Proposal {
        thought: thought.into(),
        command: command.into(),
        risk_level: "low".into(),
        ..Default::default()
    }
}

fn high(thought: &str, command: &str, reason: &str) -> Proposal {
    Proposal {
        thought: thought.into(),
        command: command.into(),
        risk_level: "high".into(),
        reason: reason.into(),
        ..Default::default()
    }
}

fn empty(thought: &str) -> Proposal {
    Proposal {
        thought: thought.into(),
        ..Default::default()
    }
}

fn finish(report: &str) -> Proposal {
    Proposal {
        thought: "收尾".into(),
        is_finished: true,
        final_report: report.into(),
        ..Default::default()
    }
}

fn ctx() -> SystemContext {
    SystemContext {
        os: "linux".into(),
        arch: "x86_64".into(),
        username: "tester".into(),
    }
}

struct LoopRun {
    outcome: Result<SessionEnd, AgentError>,
    transcript: Transcript,
    events: Vec<AgentEvent>,
}

/// 跑一轮完整会话并吐出终局、会话记录与全部过程事件
async fn drive(
    source: &dyn ProposalSource,
    backend: &dyn ExecutionBackend,
    confirmer: impl Confirmer + 'static,
    max_steps: usize,
    batch_mode: bool,
    reporter: &mut Reporter,
    ledger: ApprovalLedger,
) -> LoopRun {
    let gate = SafetyGate::new(Box::new(confirmer), ledger);
    let mut transcript = Transcript::with_goal("检查系统为何负载过高");
    let (tx, mut rx) = mpsc::unbounded_channel();

    let outcome = run_agent_loop(
        source,
        backend,
        &gate,
        reporter,
        &ctx(),
        &mut transcript,
        max_steps,
        batch_mode,
        Some(&tx),
        CancellationToken::new(),
    )
    .await;

    drop(tx);
    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }

    LoopRun {
        outcome,
        transcript,
        events,
    }
}

fn temp_ledger(dir: &tempfile::TempDir) -> ApprovalLedger {
    ApprovalLedger::new(dir.path().join("approvals.log"))
}

// ---------------------------------------------------------------- 测试

#[tokio::test]
async fn test_three_empty_commands_stall_without_executing() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = MockProposalSource::new(vec![
        empty("想法一"),
        empty("想法二"),
        empty("最后的线索"),
    ]);
    let backend = RecordingBackend::new("unused");

    let run = drive(
        &source,
        &backend,
        MustNotConfirm,
        30,
        false,
        &mut Reporter::disabled(),
        temp_ledger(&dir),
    )
    .await;

    match run.outcome.unwrap() {
        SessionEnd::Stalled(report) => {
            assert!(report.contains("最后的线索"), "stall 报告须含最后的想法");
        }
        other => panic!("expected Stalled, got {:?}", other),
    }
    assert!(backend.calls().is_empty(), "空转会话不得执行任何命令");
}

#[tokio::test]
async fn test_low_risk_executes_without_confirmation() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = MockProposalSource::new(vec![low("看负载", "uptime"), finish("负载正常")]);
    let backend = RecordingBackend::new(" 10:00:00 up 3 days,  load average: 0.10");

    let run = drive(
        &source,
        &backend,
        MustNotConfirm,
        30,
        false,
        &mut Reporter::disabled(),
        temp_ledger(&dir),
    )
    .await;

    assert_eq!(run.outcome.unwrap(), SessionEnd::Completed("负载正常".into()));
    assert_eq!(backend.calls(), vec!["uptime".to_string()]);

    // 会话里回放的是完整输出
    let contents: Vec<&str> = run
        .transcript
        .messages()
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert!(contents.iter().any(|c| c.contains("load average: 0.10")));
}

#[tokio::test]
async fn test_high_risk_refusal_skips_and_continues() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = MockProposalSource::new(vec![
        high("清理临时文件", "rm -rf /tmp/x", "删除目录"),
        finish("改用只读方案收尾"),
    ]);
    let backend = RecordingBackend::new("unused");
    let confirmer = StubConfirmer::no();

    let run = drive(
        &source,
        &backend,
        confirmer,
        30,
        false,
        &mut Reporter::disabled(),
        temp_ledger(&dir),
    )
    .await;

    assert_eq!(
        run.outcome.unwrap(),
        SessionEnd::Completed("改用只读方案收尾".into())
    );
    assert!(backend.calls().is_empty(), "被拒绝的命令不得执行");
    assert!(
        run.transcript
            .messages()
            .iter()
            .any(|m| m.content.contains("用户拒绝执行此命令")),
        "拒绝后必须注入纠偏消息"
    );
}

#[tokio::test]
async fn test_high_risk_approval_executes_and_lands_in_ledger() {
    let dir = tempfile::TempDir::new().unwrap();
    let ledger = temp_ledger(&dir);
    let ledger_path = ledger.path().clone();

    let source = MockProposalSource::new(vec![
        high("重启服务", "systemctl restart nginx", "短暂中断"),
        finish("已恢复"),
    ]);
    let backend = RecordingBackend::new("ok");

    let run = drive(
        &source,
        &backend,
        StubConfirmer::yes(),
        30,
        false,
        &mut Reporter::disabled(),
        ledger,
    )
    .await;

    assert_eq!(run.outcome.unwrap(), SessionEnd::Completed("已恢复".into()));
    assert_eq!(backend.calls(), vec!["systemctl restart nginx".to_string()]);

    let ledger_text = std::fs::read_to_string(ledger_path).unwrap();
    assert!(ledger_text.contains("systemctl restart nginx"));
}

#[tokio::test]
async fn test_batch_mode_never_touches_confirmer() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = MockProposalSource::new(vec![
        high("强制清理", "rm -rf /tmp/x", "删除目录"),
        finish("清理完成"),
    ]);
    let backend = RecordingBackend::new("done");

    let run = drive(
        &source,
        &backend,
        MustNotConfirm,
        30,
        true,
        &mut Reporter::disabled(),
        temp_ledger(&dir),
    )
    .await;

    assert_eq!(run.outcome.unwrap(), SessionEnd::Completed("清理完成".into()));
    assert_eq!(backend.calls(), vec!["rm -rf /tmp/x".to_string()]);
}

#[tokio::test]
async fn test_confirm_error_counts_as_refusal() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = MockProposalSource::new(vec![
        high("危险操作", "mkfs /dev/sda", "重建文件系统"),
        finish("放弃该方案"),
    ]);
    let backend = RecordingBackend::new("unused");

    let run = drive(
        &source,
        &backend,
        StubConfirmer::failing(),
        30,
        false,
        &mut Reporter::disabled(),
        temp_ledger(&dir),
    )
    .await;

    assert_eq!(
        run.outcome.unwrap(),
        SessionEnd::Completed("放弃该方案".into())
    );
    assert!(
        backend.calls().is_empty(),
        "确认提示失败只能按拒绝处理，绝不能执行"
    );
}

#[tokio::test]
async fn test_step_count_never_exceeds_max_steps() {
    let dir = tempfile::TempDir::new().unwrap();
    // 永远给出新命令，靠步数边界收束
    let source = MockProposalSource::new(
        (0..20).map(|i| low("继续排查", &format!("cmd-{}", i))).collect(),
    );
    let backend = RecordingBackend::new("output");

    let run = drive(
        &source,
        &backend,
        MustNotConfirm,
        5,
        false,
        &mut Reporter::disabled(),
        temp_ledger(&dir),
    )
    .await;

    assert!(matches!(run.outcome.unwrap(), SessionEnd::StepLimit(_)));
    assert_eq!(backend.calls().len(), 5);

    let max_seen = run
        .events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::StepStarted { step, .. } => Some(*step),
            _ => None,
        })
        .max()
        .unwrap();
    assert_eq!(max_seen, 5, "步数不得越过上限");
}

#[tokio::test]
async fn test_empty_counter_resets_on_command() {
    let dir = tempfile::TempDir::new().unwrap();
    // 2 次空转、1 条命令、再 2 次空转、1 条命令：从不触发 stall
    let source = MockProposalSource::new(vec![
        empty("e1"),
        empty("e2"),
        low("行动", "uptime"),
        empty("e3"),
        empty("e4"),
        low("行动", "df -h"),
        finish("完成"),
    ]);
    let backend = RecordingBackend::new("output");

    let run = drive(
        &source,
        &backend,
        MustNotConfirm,
        30,
        false,
        &mut Reporter::disabled(),
        temp_ledger(&dir),
    )
    .await;

    assert_eq!(run.outcome.unwrap(), SessionEnd::Completed("完成".into()));
    assert_eq!(backend.calls().len(), 2);
}

#[tokio::test]
async fn test_proposal_error_aborts_without_partial_step() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = MockProposalSource::with_results(vec![
        Ok(low("第一步", "uptime")),
        Err(AgentError::Llm("upstream 500".into())),
    ]);
    let backend = RecordingBackend::new("up 3 days");

    let run = drive(
        &source,
        &backend,
        MustNotConfirm,
        30,
        false,
        &mut Reporter::disabled(),
        temp_ledger(&dir),
    )
    .await;

    assert!(matches!(run.outcome, Err(AgentError::Llm(_))));
    // 失败的第二步没有留下任何半步效果：最后一条仍是第一步的输出
    let last = run.transcript.messages().last().unwrap();
    assert!(last.content.starts_with("Output:"));
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test]
async fn test_transcript_is_ordered_concatenation() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = MockProposalSource::new(vec![
        empty("先想想"),
        high("清理", "rm -rf /tmp/x", "删除目录"),
        low("改看磁盘", "df -h"),
        finish("done"),
    ]);
    let backend = RecordingBackend::new("disk usage 42%");

    let run = drive(
        &source,
        &backend,
        StubConfirmer::no(),
        30,
        false,
        &mut Reporter::disabled(),
        temp_ledger(&dir),
    )
    .await;

    assert_eq!(run.outcome.unwrap(), SessionEnd::Completed("done".into()));

    let contents: Vec<&str> = run
        .transcript
        .messages()
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    // 开场需求 -> 空转回写(assistant 思考 + 系统催促) -> 拒绝纠偏 -> 执行回写(命令 + 输出)
    assert_eq!(contents.len(), 6);
    assert!(contents[0].starts_with("需求："));
    assert!(contents[1].contains("先想想"));
    assert!(contents[2].contains("系统警告"));
    assert!(contents[3].contains("用户拒绝执行此命令"));
    assert!(contents[4].contains("df -h"));
    assert!(contents[5].starts_with("Output:\ndisk usage 42%"));
}

#[tokio::test]
async fn test_display_truncated_but_audit_keeps_full_output() {
    let dir = tempfile::TempDir::new().unwrap();
    let long_output = "x".repeat(1000);
    let source = MockProposalSource::new(vec![low("看日志", "cat big.log"), finish("done")]);
    let backend = RecordingBackend::new(&long_output);

    let report_dir = tempfile::TempDir::new().unwrap();
    let (mut reporter, report_path) = Reporter::open(report_dir.path());

    let run = drive(
        &source,
        &backend,
        MustNotConfirm,
        30,
        false,
        &mut reporter,
        temp_ledger(&dir),
    )
    .await;
    reporter.close();

    assert_eq!(run.outcome.unwrap(), SessionEnd::Completed("done".into()));

    // 展示侧：预览截断到 300 字符 + 省略号
    let preview_len = run
        .events
        .iter()
        .find_map(|e| match e {
            AgentEvent::Observation { preview, .. } => Some(preview.chars().count()),
            _ => None,
        })
        .unwrap();
    assert_eq!(preview_len, 303);

    // 审计侧：完整 1000 字符输出
    let report = std::fs::read_to_string(report_path.unwrap()).unwrap();
    assert!(report.contains(&long_output));
}

#[tokio::test]
async fn test_execution_error_flows_back_as_observation() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = MockProposalSource::new(vec![
        low("查进程", "ps aux | grep miner"),
        finish("done"),
    ]);
    let backend = RecordingBackend::failing("grep: miner: not found", "exit status: 1");

    let run = drive(
        &source,
        &backend,
        MustNotConfirm,
        30,
        false,
        &mut Reporter::disabled(),
        temp_ledger(&dir),
    )
    .await;

    // 执行失败不中止循环，失败文本回流会话供下一步推理
    assert_eq!(run.outcome.unwrap(), SessionEnd::Completed("done".into()));
    let contents: Vec<&str> = run
        .transcript
        .messages()
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert!(contents
        .iter()
        .any(|c| c.contains("grep: miner: not found") && c.contains("命令执行异常")));
}

#[tokio::test]
async fn test_finish_without_report_synthesizes_from_thought() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = MockProposalSource::new(vec![Proposal {
        thought: "磁盘已满导致负载飙升".into(),
        is_finished: true,
        ..Default::default()
    }]);
    let backend = RecordingBackend::new("unused");

    let run = drive(
        &source,
        &backend,
        MustNotConfirm,
        30,
        false,
        &mut Reporter::disabled(),
        temp_ledger(&dir),
    )
    .await;

    match run.outcome.unwrap() {
        SessionEnd::Completed(report) => {
            assert!(report.contains("磁盘已满导致负载飙升"));
        }
        other => panic!("expected Completed, got {:?}", other),
    }
}
