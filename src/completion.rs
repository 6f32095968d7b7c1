//! Completion Client
//!
//! OpenAI-compatible chat completion client. Sends a single user message
//! and returns the assembled text, either from one JSON response or by
//! concatenating the `delta.content` fragments of an SSE stream.
//!
//! A stream that fails part-way discards what it received and returns
//! `CompletionError::Stream`; the byte count is kept for logging only.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;

/// Completion errors
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("stream interrupted after {received} bytes: {reason}")]
    Stream { received: usize, reason: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("provider returned no content")]
    EmptyResponse,
}

/// Anything that can turn a prompt into generated text
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Message in the request
#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// API request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
}

/// Batch response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// One SSE `data:` payload
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// Event decoded from the SSE body
#[derive(Debug, PartialEq)]
pub enum SseEvent {
    /// Text fragment (may be empty for role-only or finish chunks)
    Delta(String),
    /// `data: [DONE]`
    Done,
}

/// Incremental line decoder for `text/event-stream` bodies.
///
/// Network chunks may end in the middle of a line (or of a UTF-8
/// sequence); incomplete tails stay buffered until the next push.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes from the network
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Next event from the complete lines buffered so far
    pub fn next_event(&mut self) -> Option<Result<SseEvent, String>> {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            match parse_line(&line) {
                Ok(None) => continue,
                Ok(Some(event)) => return Some(Ok(event)),
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }

    /// Feed bytes and drain every completed event, stopping at the first error
    #[cfg(test)]
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<SseEvent>, String> {
        self.feed(bytes);
        let mut events = Vec::new();
        while let Some(event) = self.next_event() {
            events.push(event?);
        }
        Ok(events)
    }

    /// Flush a final line that was not newline-terminated
    pub fn finish(&mut self) -> Result<Option<SseEvent>, String> {
        let line = std::mem::take(&mut self.buffer);
        parse_line(&line)
    }
}

fn parse_line(raw: &[u8]) -> Result<Option<SseEvent>, String> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();

    // Blank separators, comments (": keep-alive") and non-data fields
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim_start();

    if data == "[DONE]" {
        return Ok(Some(SseEvent::Done));
    }

    let chunk: StreamChunk =
        serde_json::from_str(data).map_err(|e| format!("undecodable event: {}", e))?;

    if let Some(error) = chunk.error {
        return Err(format!("provider error: {}", error.message));
    }

    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .unwrap_or_default();

    Ok(Some(SseEvent::Delta(content)))
}

/// HTTP completion client for OpenAI-compatible providers
#[derive(Clone)]
pub struct CompletionClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    stream: bool,
}

impl CompletionClient {
    pub fn new(api_key: &str, base_url: &str, model: &str, stream: bool) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            stream,
        }
    }

    /// Create from config
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.llm_api_key,
            &config.llm_api_url,
            &config.llm_model,
            config.llm_stream,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_streaming(&self) -> bool {
        self.stream
    }

    /// Startup reachability check.
    ///
    /// Transport failures are errors; a non-success status only warns since
    /// not every compatible provider serves the model listing.
    pub async fn probe(&self) -> Result<(), CompletionError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!("Completion provider reachable at {}", self.base_url);
        } else {
            warn!(
                "Completion provider at {} answered {} to model listing (continuing anyway)",
                self.base_url, status
            );
        }
        Ok(())
    }

    async fn send(&self, prompt: &str) -> Result<reqwest::Response, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            stream: self.stream,
        };

        debug!(
            "Calling completion API: model={}, stream={}, prompt_len={}",
            self.model,
            self.stream,
            prompt.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api { status, body });
        }

        Ok(response)
    }

    async fn complete_batch(&self, prompt: &str) -> Result<String, CompletionError> {
        let response = self.send(prompt).await?;
        let body = response.text().await?;

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| CompletionError::Decode(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }

    async fn complete_stream(&self, prompt: &str) -> Result<String, CompletionError> {
        let response = self.send(prompt).await?;
        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut text = String::new();

        let interrupted = |received: usize, reason: String| {
            warn!("Completion stream failed after {} bytes: {}", received, reason);
            CompletionError::Stream { received, reason }
        };

        let mut done = false;
        'read: while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| interrupted(text.len(), e.to_string()))?;
            decoder.feed(&chunk);

            while let Some(event) = decoder.next_event() {
                match event.map_err(|reason| interrupted(text.len(), reason))? {
                    SseEvent::Delta(fragment) => text.push_str(&fragment),
                    SseEvent::Done => {
                        done = true;
                        break 'read;
                    }
                }
            }
        }

        // Anything buffered after [DONE] is ignored
        if !done {
            // Connection closed without [DONE]: flush whatever line is pending
            if let Some(SseEvent::Delta(fragment)) = decoder
                .finish()
                .map_err(|reason| interrupted(text.len(), reason))?
            {
                text.push_str(&fragment);
            }
        }

        if text.is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl Completer for CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let result = if self.stream {
            self.complete_stream(prompt).await
        } else {
            self.complete_batch(prompt).await
        };

        if let Ok(text) = &result {
            info!(
                "Completion finished: model={}, prompt_len={}, output_len={}",
                self.model,
                prompt.len(),
                text.len()
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(content: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":{}}}}}]}}\n\n",
            serde_json::to_string(content).unwrap()
        )
    }

    #[test]
    fn test_decoder_single_chunk() {
        let mut decoder = SseDecoder::new();
        let body = format!("{}{}data: [DONE]\n\n", delta("Hel"), delta("lo"));
        let events = decoder.push(body.as_bytes()).unwrap();
        assert_eq!(
            events,
            vec![
                SseEvent::Delta("Hel".into()),
                SseEvent::Delta("lo".into()),
                SseEvent::Done
            ]
        );
    }

    #[test]
    fn test_decoder_line_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let body = delta("split me");
        let (a, b) = body.split_at(17);

        assert!(decoder.push(a.as_bytes()).unwrap().is_empty());
        assert_eq!(
            decoder.push(b.as_bytes()).unwrap(),
            vec![SseEvent::Delta("split me".into())]
        );
    }

    #[test]
    fn test_decoder_utf8_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let body = delta("résumé");
        let bytes = body.as_bytes();
        // Cut inside the two-byte 'é'
        let cut = body.find('é').unwrap() + 1;

        assert!(decoder.push(&bytes[..cut]).unwrap().is_empty());
        assert_eq!(
            decoder.push(&bytes[cut..]).unwrap(),
            vec![SseEvent::Delta("résumé".into())]
        );
    }

    #[test]
    fn test_decoder_skips_comments_and_blank_lines() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b": keep-alive\n\nevent: ping\n\n").unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_decoder_role_only_chunk_is_empty_delta() {
        let mut decoder = SseDecoder::new();
        let events = decoder
            .push(b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n")
            .unwrap();
        assert_eq!(events, vec![SseEvent::Delta(String::new())]);
    }

    #[test]
    fn test_decoder_error_event() {
        let mut decoder = SseDecoder::new();
        let err = decoder
            .push(b"data: {\"error\":{\"message\":\"overloaded\"}}\n")
            .unwrap_err();
        assert!(err.contains("overloaded"));
    }

    #[test]
    fn test_decoder_garbage_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {not json\n").is_err());
    }

    #[test]
    fn test_decoder_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        let body = delta("tail");
        let body = body.trim_end();
        assert!(decoder.push(body.as_bytes()).unwrap().is_empty());
        assert_eq!(decoder.finish().unwrap(), Some(SseEvent::Delta("tail".into())));
        assert_eq!(decoder.finish().unwrap(), None);
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![Message {
                role: "user",
                content: "hi",
            }],
            stream: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
        assert_eq!(json["stream"], true);
    }

    #[test]
    fn test_base_url_normalized() {
        let client = CompletionClient::new("k", "https://llm.example.com/v1/", "m", false);
        assert_eq!(client.base_url, "https://llm.example.com/v1");
        assert!(!client.is_streaming());
        assert_eq!(client.model(), "m");
    }
}
