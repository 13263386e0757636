//! 会话记录：与 AI 的对话历史
//!
//! 追加写入、永不修改、永不剪枝：每一步把完整历史重放给提案源，
//! 历史的顺序即会话语义（包含被拒绝、被催促的步骤）。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
///
/// System 仅供 LLM 请求层拼接系统提示词使用；主循环只会追加 User / Assistant。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 会话记录：本次诊断会话的全部消息，按时间顺序追加
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以用户需求开场的会话
    pub fn with_goal(goal: &str) -> Self {
        let mut t = Self::new();
        t.push(Message::user(format!("需求：{}", goal)));
        t
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
