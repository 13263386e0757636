//! OpenAI 兼容提案源
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；
//! 系统提示词由目标机上下文拼出，回复按 JSON 提案解析。

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::collector::SystemContext;
use crate::core::AgentError;
use crate::llm::{parse_proposal, Proposal, ProposalSource};
use crate::transcript::{Message, Role};

/// OpenAI 兼容客户端：持有 Client 与 model 名
pub struct OpenAiProposalSource {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiProposalSource {
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Self {
        let api_key = if api_key.trim().is_empty() {
            // Ollama / LM Studio 等本地端点不校验 key，占位即可
            "none".to_string()
        } else {
            api_key.to_string()
        };

        let config = OpenAIConfig::new()
            .with_api_base(base_url)
            .with_api_key(api_key);

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
        }
    }

    /// 诊断智能体的系统提示词：目标机上下文 + 单步工作方式 + JSON 输出契约
    fn system_prompt(ctx: &SystemContext) -> String {
        format!(
            "你是一名资深的系统运维与安全排查专家，正在通过 shell 逐步诊断一台目标机器。\n\
             \n\
             目标系统: {} / {}\n\
             当前用户: {}\n\
             \n\
             工作方式：\n\
             1. 每轮只做一步：给出一条用于验证当前想法的 shell 命令，等输出返回后再决定下一步。\n\
             2. 只读、无副作用的命令（如 uptime、ps、df、查看日志）标注 \"risk_level\": \"low\"；\
             任何写入、删除、重启、改配置、装软件的命令一律标注 \"risk_level\": \"high\"，并在 reason 中说明后果。\n\
             3. 信息足以得出结论时设置 \"is_finished\": true，并在 final_report 中给出结论与建议。\n\
             4. 不要编造命令输出，一切判断只基于对话中真实返回的 Output。\n\
             \n\
             输出格式（必须且只能输出一个 JSON 对象，不要输出其他文字）：\n\
             {{\"thought\": \"你的分析\", \"command\": \"要执行的命令，可为空\", \
             \"risk_level\": \"low 或 high\", \"reason\": \"高风险时的理由\", \
             \"is_finished\": false, \"final_report\": \"\"}}",
            ctx.os, ctx.arch, ctx.username
        )
    }

    fn to_openai_messages(
        system: String,
        transcript: &[Message],
    ) -> Vec<ChatCompletionRequestMessage> {
        let mut out = vec![ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .unwrap(),
        )];
        out.extend(transcript.iter().map(|m| match m.role {
            Role::System => ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(m.content.clone())
                    .build()
                    .unwrap(),
            ),
            Role::User => ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(m.content.clone())
                    .build()
                    .unwrap(),
            ),
            Role::Assistant => ChatCompletionRequestMessage::Assistant(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(m.content.clone())
                    .build()
                    .unwrap(),
            ),
        }));
        out
    }
}

#[async_trait]
impl ProposalSource for OpenAiProposalSource {
    async fn propose(
        &self,
        ctx: &SystemContext,
        transcript: &[Message],
    ) -> Result<Proposal, AgentError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(Self::to_openai_messages(Self::system_prompt(ctx), transcript))
            .build()
            .map_err(|e| AgentError::Llm(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AgentError::Llm(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        parse_proposal(&content)
    }
}
