//! Streaming chat-model providers.
//!
//! `connect_*` sends the request and waits for the upstream to accept it, so
//! configuration and auth failures surface as `Err` before any token has been
//! produced. The returned stream then yields tokens until the model is done.
//! OpenAI streams SSE `data:` lines; Ollama streams NDJSON objects.

use std::pin::Pin;

use docqa_core::{Error, OllamaSettings, OpenAiSettings, Result};
use docqa_retrieve::http::{ensure_success, request_error};
use futures::Stream;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tokio_stream::StreamExt;
use tracing::{debug, error};

use crate::types::ChatMessage;

/// Boxed stream type for returning different stream implementations.
pub type BoxedStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send>>;

/// A single streamed token or error.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    Token(String),
    Done { tokens_used: usize },
    Error(String),
}

/// Open a streaming completion against an OpenAI-compatible API.
pub async fn connect_openai(
    client: &Client,
    settings: &OpenAiSettings,
    messages: &[ChatMessage],
    temperature: f64,
) -> Result<BoxedStream> {
    let url = format!("{}/v1/chat/completions", settings.base_url);
    let body = json!({
        "model": settings.chat_model,
        "messages": messages,
        "temperature": temperature,
        "stream": true,
    });

    debug!("Streaming from {} with model {}", url, settings.chat_model);

    let response = client
        .post(&url)
        .bearer_auth(&settings.api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| request_error("openai", e))?;

    let response = ensure_success("openai", response).await?;
    Ok(Box::pin(openai_token_stream(response)))
}

/// Open a streaming chat against a local Ollama server.
pub async fn connect_ollama(
    client: &Client,
    settings: &OllamaSettings,
    messages: &[ChatMessage],
) -> Result<BoxedStream> {
    let url = format!("{}/api/chat", settings.base_url);
    let body = json!({
        "model": settings.chat_model,
        "messages": messages,
        "stream": true,
    });

    debug!("Streaming from {} with model {}", url, settings.chat_model);

    let response = client
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|e| request_error("ollama", e))?;

    let response = ensure_success("ollama", response).await?;
    Ok(Box::pin(ollama_token_stream(response)))
}

/// Accumulates raw bytes and yields complete `\n`-terminated lines.
///
/// Lines are decoded only once complete, so multi-byte characters split
/// across network chunks are not mangled.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn next_line(&mut self) -> Option<String> {
        let end = self.buf.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.buf.drain(..=end).collect();
        Some(String::from_utf8_lossy(&line).trim().to_string())
    }

    /// Whatever is left after the upstream closed without a final newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        let line = String::from_utf8_lossy(&rest).trim().to_string();
        (!line.is_empty()).then_some(line)
    }
}

/// One parsed SSE line from an OpenAI-compatible stream.
#[derive(Debug, PartialEq)]
pub enum SseLine {
    Token(String),
    Done,
    Error(String),
    Skip,
}

pub fn parse_openai_line(line: &str) -> SseLine {
    if line.is_empty() || line.starts_with(':') {
        return SseLine::Skip;
    }
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Done;
    }

    match serde_json::from_str::<serde_json::Value>(data) {
        Ok(parsed) => {
            if let Some(msg) = parsed["error"]["message"].as_str() {
                return SseLine::Error(msg.to_string());
            }
            match parsed["choices"][0]["delta"]["content"].as_str() {
                Some(content) if !content.is_empty() => SseLine::Token(content.to_string()),
                _ => SseLine::Skip,
            }
        }
        Err(_) => SseLine::Skip,
    }
}

fn openai_token_stream(response: Response) -> impl Stream<Item = StreamChunk> + Send + 'static {
    async_stream::stream! {
        let mut stream = response.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut token_count = 0usize;

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    yield StreamChunk::Error(format!("Stream read error: {}", e));
                    return;
                }
            };
            lines.push(&bytes);

            while let Some(line) = lines.next_line() {
                match parse_openai_line(&line) {
                    SseLine::Token(text) => {
                        token_count += 1;
                        yield StreamChunk::Token(text);
                    }
                    SseLine::Done => {
                        yield StreamChunk::Done { tokens_used: token_count };
                        return;
                    }
                    SseLine::Error(msg) => {
                        error!("OpenAI stream error: {}", msg);
                        yield StreamChunk::Error(msg);
                        return;
                    }
                    SseLine::Skip => {}
                }
            }
        }

        if let Some(SseLine::Token(text)) = lines.finish().as_deref().map(parse_openai_line) {
            token_count += 1;
            yield StreamChunk::Token(text);
        }
        yield StreamChunk::Done { tokens_used: token_count };
    }
}

#[derive(Debug, Deserialize)]
pub struct OllamaLine {
    #[serde(default)]
    pub message: Option<OllamaMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OllamaMessage {
    #[serde(default)]
    pub content: String,
}

pub fn parse_ollama_line(line: &str) -> Result<Option<OllamaLine>> {
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line)
        .map(Some)
        .map_err(|e| Error::Llm(format!("Malformed Ollama stream line: {}", e)))
}

fn ollama_token_stream(response: Response) -> impl Stream<Item = StreamChunk> + Send + 'static {
    async_stream::stream! {
        let mut stream = response.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut token_count = 0usize;
        let mut finished = false;

        loop {
            let line = match lines.next_line() {
                Some(line) => line,
                None if finished => match lines.finish() {
                    Some(line) => line,
                    None => break,
                },
                None => {
                    match stream.next().await {
                        Some(Ok(bytes)) => lines.push(&bytes),
                        Some(Err(e)) => {
                            yield StreamChunk::Error(format!("Stream read error: {}", e));
                            return;
                        }
                        None => finished = true,
                    }
                    continue;
                }
            };

            match parse_ollama_line(&line) {
                Ok(Some(parsed)) => {
                    if let Some(msg) = parsed.error {
                        error!("Ollama stream error: {}", msg);
                        yield StreamChunk::Error(msg);
                        return;
                    }
                    if let Some(message) = parsed.message {
                        if !message.content.is_empty() {
                            token_count += 1;
                            yield StreamChunk::Token(message.content);
                        }
                    }
                    if parsed.done {
                        yield StreamChunk::Done { tokens_used: token_count };
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    yield StreamChunk::Error(e.to_string());
                    return;
                }
            }
        }

        yield StreamChunk::Done { tokens_used: token_count };
    }
}
