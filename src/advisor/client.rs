//! Streaming client for the OpenAI-compatible advisory endpoint.
//!
//! Replies arrive as server-sent `data:` lines, each carrying one delta
//! fragment; the stream ends at `[DONE]`. Fragments are surfaced as they
//! arrive so the caller can print incrementally. A reply stream is finite
//! and cannot be restarted once consumption begins.

use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AdvisorConfig;
use crate::errors::AdvisorError;

/// Lazy sequence of reply text fragments.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<String, AdvisorError>> + Send>>;

/// Answers a free-text question against a prepared context document.
#[async_trait]
pub trait AdvisoryService {
    async fn stream_reply(&self, context: &str, question: &str)
        -> Result<ReplyStream, AdvisorError>;
}

pub struct AdvisorClient {
    http: reqwest::Client,
    config: AdvisorConfig,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl AdvisorClient {
    pub fn new(config: AdvisorConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl AdvisoryService for AdvisorClient {
    async fn stream_reply(
        &self,
        context: &str,
        question: &str,
    ) -> Result<ReplyStream, AdvisorError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: context,
                },
                ChatMessage {
                    role: "user",
                    content: question,
                },
            ],
            stream: true,
        };

        debug!(%url, model = %self.config.model, "Advisory request");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(AdvisorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(sse_fragments(response.bytes_stream()))
    }
}

/// Turns the raw byte stream into content fragments, buffering across chunk
/// boundaries so a `data:` line split between two network reads still
/// parses. Any transport or decode failure ends the stream after the error
/// item.
fn sse_fragments<B>(bytes: impl Stream<Item = reqwest::Result<B>> + Send + 'static) -> ReplyStream
where
    B: AsRef<[u8]> + Send + 'static,
{
    let stream = futures::stream::unfold(
        (Box::pin(bytes), String::new(), false),
        |(mut bytes, mut buffer, failed)| async move {
            if failed {
                return None;
            }
            loop {
                // Drain complete lines already buffered.
                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim().to_string();
                    buffer.drain(..=newline);

                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();
                    if data == "[DONE]" {
                        return None;
                    }
                    match serde_json::from_str::<ChatChunk>(data) {
                        Ok(chunk) => {
                            let content = chunk
                                .choices
                                .into_iter()
                                .next()
                                .and_then(|choice| choice.delta.content);
                            match content {
                                Some(text) if !text.is_empty() => {
                                    return Some((Ok(text), (bytes, buffer, false)));
                                }
                                // Role-only or empty deltas carry no text.
                                _ => continue,
                            }
                        }
                        Err(e) => {
                            return Some((Err(AdvisorError::Decode(e)), (bytes, buffer, true)));
                        }
                    }
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => buffer.push_str(&String::from_utf8_lossy(chunk.as_ref())),
                    Some(Err(e)) => {
                        return Some((Err(AdvisorError::Transport(e)), (bytes, buffer, true)));
                    }
                    None => return None,
                }
            }
        },
    );
    Box::pin(stream)
}
