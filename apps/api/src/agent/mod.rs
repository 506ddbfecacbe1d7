//! Hiring-manager agent: a tool-using model session bound to one manager.
//!
//! Flow per command: build (prompt + tools bound to the scope) → submit the
//! command → run tool calls one at a time until the model answers in text.

pub mod dispatcher;
pub mod prompts;
pub mod query;
pub mod tools;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::llm_client::{ChatModel, ContentBlock, LlmError, Message, Role, ToolSpec};

pub use dispatcher::{dispatch, DispatchContext, DispatchReply};

/// Upper bound on model round-trips for a single command.
pub const MAX_AGENT_TURNS: usize = 8;

/// Outcome of one tool call. Both arms are text the model can relay.
pub type ToolResult = Result<String, String>;

/// Faults that abort a whole command. Never shown to the caller verbatim.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("model backend failed: {0}")]
    Model(#[from] LlmError),

    #[error("agent did not finish within {0} model turns")]
    TurnLimit(usize),

    #[error("agent returned an empty reply")]
    EmptyReply,

    #[error("command timed out after {0:?}")]
    Timeout(Duration),
}

impl DispatchError {
    pub const PUBLIC_MESSAGE: &'static str = "Failed to process job search command";
}

/// The fixed set of operations an agent may call, already bound to a scope.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn specs(&self) -> Vec<ToolSpec>;

    async fn execute(&self, name: &str, input: Value) -> ToolResult;
}

pub struct Agent<'a, T: ToolExecutor> {
    model: &'a dyn ChatModel,
    system_prompt: String,
    tools: T,
}

impl<'a, T: ToolExecutor> Agent<'a, T> {
    pub fn new(model: &'a dyn ChatModel, system_prompt: String, tools: T) -> Self {
        Self {
            model,
            system_prompt,
            tools,
        }
    }

    #[cfg(test)]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Runs one command to completion and returns the model's final text.
    pub async fn run(&self, command: &str) -> Result<String, DispatchError> {
        let specs = self.tools.specs();
        let mut messages = vec![Message::user_text(command)];

        for turn in 0..MAX_AGENT_TURNS {
            let response = self
                .model
                .converse(&self.system_prompt, &messages, &specs)
                .await?;

            if !response.wants_tools() {
                let reply = response.text();
                if reply.is_empty() {
                    return Err(DispatchError::EmptyReply);
                }
                debug!("Agent finished after {} turn(s)", turn + 1);
                return Ok(reply);
            }

            let mut assistant_blocks = Vec::new();
            let mut results = Vec::new();

            for block in response.content {
                match block {
                    ContentBlock::ToolUse { id, name, input } => {
                        // Sequential on purpose: the next call may depend on this one's effect.
                        let outcome = self.tools.execute(&name, input.clone()).await;
                        let (content, is_error) = match outcome {
                            Ok(text) => (text, false),
                            Err(text) => {
                                warn!(tool = %name, "Agent tool reported an error: {text}");
                                (text, true)
                            }
                        };
                        results.push(ContentBlock::ToolResult {
                            tool_use_id: id.clone(),
                            content,
                            is_error,
                        });
                        assistant_blocks.push(ContentBlock::ToolUse { id, name, input });
                    }
                    text @ ContentBlock::Text { .. } => assistant_blocks.push(text),
                    _ => {}
                }
            }

            info!(
                "Agent turn {} executed {} tool call(s)",
                turn + 1,
                results.len()
            );

            messages.push(Message {
                role: Role::Assistant,
                content: assistant_blocks,
            });
            messages.push(Message {
                role: Role::User,
                content: results,
            });
        }

        Err(DispatchError::TurnLimit(MAX_AGENT_TURNS))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted model and recording tool set for driving the agent loop offline.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::llm_client::{LlmResponse, Usage};

    pub fn text_response(text: &str) -> LlmResponse {
        LlmResponse {
            content: vec![ContentBlock::Text {
                text: text.to_string(),
            }],
            stop_reason: Some("end_turn".to_string()),
            usage: Usage::default(),
        }
    }

    pub fn tool_response(calls: &[(&str, &str, Value)]) -> LlmResponse {
        LlmResponse {
            content: calls
                .iter()
                .map(|(id, name, input)| ContentBlock::ToolUse {
                    id: id.to_string(),
                    name: name.to_string(),
                    input: input.clone(),
                })
                .collect(),
            stop_reason: Some("tool_use".to_string()),
            usage: Usage::default(),
        }
    }

    /// Replays canned responses and records what it was sent.
    #[derive(Default)]
    pub struct ScriptedModel {
        responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
        pub seen: Mutex<Vec<(String, Vec<Message>, Vec<&'static str>)>>,
    }

    impl ScriptedModel {
        pub fn new(responses: Vec<Result<LlmResponse, LlmError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn converse(
            &self,
            system: &str,
            messages: &[Message],
            tools: &[ToolSpec],
        ) -> Result<LlmResponse, LlmError> {
            self.seen.lock().unwrap().push((
                system.to_string(),
                messages.to_vec(),
                tools.iter().map(|t| t.name).collect(),
            ));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(text_response("(script exhausted)")))
        }
    }

    /// A model that never answers.
    pub struct StalledModel;

    #[async_trait]
    impl ChatModel for StalledModel {
        async fn converse(
            &self,
            _system: &str,
            _messages: &[Message],
            _tools: &[ToolSpec],
        ) -> Result<LlmResponse, LlmError> {
            std::future::pending().await
        }
    }

    /// Records calls and answers from a fixed function.
    pub struct RecordingTools {
        pub calls: Mutex<Vec<(String, Value)>>,
        answer: fn(&str, &Value) -> ToolResult,
    }

    impl RecordingTools {
        pub fn new(answer: fn(&str, &Value) -> ToolResult) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                answer,
            }
        }
    }

    #[async_trait]
    impl ToolExecutor for RecordingTools {
        fn specs(&self) -> Vec<ToolSpec> {
            tools::tool_specs()
        }

        async fn execute(&self, name: &str, input: Value) -> ToolResult {
            let answer = (self.answer)(name, &input);
            self.calls.lock().unwrap().push((name.to_string(), input));
            answer
        }
    }
}
