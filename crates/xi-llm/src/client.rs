// Claude API streaming client using reqwest-eventsource.
//
// Sends the chat transcript to the Anthropic Messages API with
// `stream: true` and forwards the Server-Sent Events as `LlmEvent`s over an
// mpsc channel for the orchestrator to consume.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest_eventsource::{Event, RequestBuilderExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use xi_core::config::Config;
use xi_core::protocol::{ChatMessage, ChatRole, LlmEvent};

use crate::advisor::{AdviceRequest, Advisor, PlaceholderAdvisor};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const TRUNCATION_NOTE: &str = "\n\n[Response truncated due to token limit]";

// ---------------------------------------------------------------------------
// ClaudeClient
// ---------------------------------------------------------------------------

/// Low-level Claude API streaming client.
pub struct ClaudeClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl ClaudeClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            api_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    /// Point the client at a different Messages endpoint.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Stream a reply to `transcript` as `LlmEvent`s over `tx`.
    ///
    /// Returns when the stream is complete, an error has been reported, or
    /// the receiver is dropped. Transport failures are reported as
    /// `LlmEvent::Error`, not as `Err`.
    pub async fn stream_chat(
        &self,
        system: &str,
        transcript: &[ChatMessage],
        max_tokens: u32,
        tx: mpsc::Sender<LlmEvent>,
        generation: u64,
    ) -> anyhow::Result<()> {
        if self.api_key.is_empty() {
            let _ = tx
                .send(LlmEvent::Error {
                    message: "API key not configured".to_string(),
                    generation,
                })
                .await;
            return Ok(());
        }

        let messages = to_api_messages(transcript);
        if messages.is_empty() {
            let _ = tx
                .send(LlmEvent::Error {
                    message: "Nothing to ask: transcript has no user message".to_string(),
                    generation,
                })
                .await;
            return Ok(());
        }

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "stream": true,
            "system": system,
            "messages": messages,
        });

        let request = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let mut es = match request.eventsource() {
            Ok(es) => es,
            Err(e) => {
                let _ = tx
                    .send(LlmEvent::Error {
                        message: format!("Failed to create event source: {e}"),
                        generation,
                    })
                    .await;
                return Ok(());
            }
        };

        let mut full_text = String::new();
        let mut stop_reason: Option<String> = None;

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => {
                    debug!("SSE connection opened");
                }
                Ok(Event::Message(msg)) => match msg.event.as_str() {
                    "content_block_delta" => {
                        if let Some(text) = parse_delta_text(&msg.data) {
                            full_text.push_str(&text);
                            if tx
                                .send(LlmEvent::Token { text, generation })
                                .await
                                .is_err()
                            {
                                es.close();
                                return Ok(());
                            }
                        }
                    }
                    "message_delta" => {
                        if let Some(reason) = parse_stop_reason(&msg.data) {
                            stop_reason = Some(reason);
                        }
                    }
                    "message_stop" => {
                        debug!(?stop_reason, "message_stop");
                        if stop_reason.as_deref() == Some("max_tokens") {
                            full_text.push_str(TRUNCATION_NOTE);
                        }
                        let _ = tx
                            .send(LlmEvent::Complete {
                                full_text,
                                generation,
                            })
                            .await;
                        es.close();
                        return Ok(());
                    }
                    "error" => {
                        let message = parse_error_message(&msg.data)
                            .unwrap_or_else(|| "Assistant returned an error".to_string());
                        warn!(%message, "SSE error event");
                        let _ = tx.send(LlmEvent::Error { message, generation }).await;
                        es.close();
                        return Ok(());
                    }
                    other => {
                        debug!(event_type = other, "ignoring SSE event");
                    }
                },
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    debug!("SSE stream ended");
                    break;
                }
                Err(err) => {
                    warn!(?err, "SSE stream error");
                    let _ = tx
                        .send(LlmEvent::Error {
                            message: extract_error_message(&err),
                            generation,
                        })
                        .await;
                    es.close();
                    return Ok(());
                }
            }
        }

        // Stream ended without message_stop.
        es.close();
        let event = if full_text.is_empty() {
            LlmEvent::Error {
                message: "Stream ended unexpectedly without any content".to_string(),
                generation,
            }
        } else {
            LlmEvent::Complete {
                full_text,
                generation,
            }
        };
        let _ = tx.send(event).await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LlmClient wrapper
// ---------------------------------------------------------------------------

/// Either a live Claude client or the offline placeholder.
pub enum LlmClient {
    Active(ClaudeClient),
    Disabled,
}

impl LlmClient {
    /// `Active` when an API key is configured, otherwise `Disabled`.
    pub fn from_config(config: &Config) -> Self {
        match &config.credentials.anthropic_api_key {
            Some(key) if !key.is_empty() => {
                let mut client = ClaudeClient::new(key.clone(), config.assistant.model.clone());
                if let Some(url) = &config.assistant.api_url {
                    client = client.with_api_url(url.clone());
                }
                LlmClient::Active(client)
            }
            _ => LlmClient::Disabled,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, LlmClient::Active(_))
    }
}

#[async_trait]
impl Advisor for LlmClient {
    async fn advise(
        &self,
        request: AdviceRequest,
        tx: mpsc::Sender<LlmEvent>,
        generation: u64,
    ) -> anyhow::Result<()> {
        match self {
            LlmClient::Active(client) => {
                let system = format!("{}\n\n{}", request.system, request.context);
                client
                    .stream_chat(&system, &request.transcript, request.max_tokens, tx, generation)
                    .await
            }
            LlmClient::Disabled => PlaceholderAdvisor.advise(request, tx, generation).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Request / SSE JSON helpers
// ---------------------------------------------------------------------------

/// Convert the chat transcript to Messages API turns.
///
/// The API wants alternating roles starting with `user`: leading assistant
/// turns are dropped and consecutive turns with the same role are merged.
pub(crate) fn to_api_messages(transcript: &[ChatMessage]) -> Vec<Value> {
    let mut turns: Vec<(ChatRole, String)> = Vec::new();
    for msg in transcript {
        if turns.is_empty() && msg.role == ChatRole::Assistant {
            continue;
        }
        match turns.last_mut() {
            Some((role, text)) if *role == msg.role => {
                text.push_str("\n\n");
                text.push_str(&msg.text);
            }
            _ => turns.push((msg.role, msg.text.clone())),
        }
    }
    turns
        .into_iter()
        .map(|(role, content)| {
            let role = match role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            serde_json::json!({ "role": role, "content": content })
        })
        .collect()
}

/// Extract `delta.text` from a `content_block_delta` event's JSON.
///
/// Expected shape: `{ "type": "content_block_delta", "delta": { "type": "text_delta", "text": "..." } }`
pub(crate) fn parse_delta_text(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("delta")?
        .get("text")?
        .as_str()
        .map(|s| s.to_string())
}

/// Extract `delta.stop_reason` from a `message_delta` event's JSON.
pub(crate) fn parse_stop_reason(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("delta")?
        .get("stop_reason")?
        .as_str()
        .map(|s| s.to_string())
}

/// Extract `error.message` from an `error` event's JSON.
pub(crate) fn parse_error_message(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("error")?
        .get("message")?
        .as_str()
        .map(|s| s.to_string())
}

fn extract_error_message(err: &reqwest_eventsource::Error) -> String {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(status, _response) => {
            format!("API returned status {status}")
        }
        reqwest_eventsource::Error::Transport(e) => {
            format!("Network error: {e}")
        }
        other => format!("Stream error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::PLACEHOLDER_REPLY;

    // -- SSE JSON parsing --

    #[test]
    fn parse_content_block_delta_text() {
        let data = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Pick Bumrah"}}"#;
        assert_eq!(parse_delta_text(data), Some("Pick Bumrah".to_string()));
    }

    #[test]
    fn parse_content_block_delta_missing_delta() {
        assert_eq!(parse_delta_text(r#"{"type":"content_block_delta"}"#), None);
        assert_eq!(parse_delta_text("not json"), None);
    }

    #[test]
    fn parse_message_delta_stop_reason() {
        let data = r#"{"type":"message_delta","delta":{"stop_reason":"max_tokens"},"usage":{"output_tokens":9}}"#;
        assert_eq!(parse_stop_reason(data), Some("max_tokens".to_string()));
        assert_eq!(parse_stop_reason(r#"{"type":"message_delta","delta":{}}"#), None);
    }

    #[test]
    fn parse_error_event_message() {
        let data = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert_eq!(parse_error_message(data), Some("Overloaded".to_string()));
        assert_eq!(parse_error_message("{}"), None);
    }

    // -- Transcript conversion --

    #[test]
    fn api_messages_drop_leading_assistant_and_merge_runs() {
        let transcript = vec![
            ChatMessage::assistant("Hi! Ask me anything."),
            ChatMessage::user("Who is the best bowler?"),
            ChatMessage::user("Budget is tight."),
            ChatMessage::assistant("Take Bumrah."),
            ChatMessage::user("And a keeper?"),
        ];
        let messages = to_api_messages(&transcript);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(
            messages[0]["content"],
            "Who is the best bowler?\n\nBudget is tight."
        );
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[2]["content"], "And a keeper?");
    }

    #[test]
    fn api_messages_empty_transcript() {
        assert!(to_api_messages(&[]).is_empty());
        assert!(to_api_messages(&[ChatMessage::assistant("hello")]).is_empty());
    }

    // -- Disabled / empty key paths --

    fn request(question: &str) -> AdviceRequest {
        AdviceRequest {
            system: "system".into(),
            context: "context".into(),
            transcript: vec![ChatMessage::user(question)],
            max_tokens: 100,
        }
    }

    #[tokio::test]
    async fn disabled_client_sends_placeholder_reply() {
        let (tx, mut rx) = mpsc::channel(8);
        LlmClient::Disabled
            .advise(request("help"), tx, 1)
            .await
            .expect("should not fail");

        assert_eq!(
            rx.recv().await,
            Some(LlmEvent::Complete {
                full_text: PLACEHOLDER_REPLY.to_string(),
                generation: 1,
            })
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_api_key_sends_error_event() {
        let client = ClaudeClient::new(String::new(), "model".to_string());
        let (tx, mut rx) = mpsc::channel(8);
        client
            .stream_chat("system", &[ChatMessage::user("hi")], 100, tx, 42)
            .await
            .expect("should not fail");

        assert_eq!(
            rx.recv().await,
            Some(LlmEvent::Error {
                message: "API key not configured".to_string(),
                generation: 42,
            })
        );
    }

    #[tokio::test]
    async fn transcript_without_user_turn_sends_error_event() {
        let client = ClaudeClient::new("sk-test".into(), "model".into());
        let (tx, mut rx) = mpsc::channel(8);
        client
            .stream_chat("system", &[], 100, tx, 3)
            .await
            .expect("should not fail");
        assert!(matches!(rx.recv().await, Some(LlmEvent::Error { generation: 3, .. })));
    }

    // -- from_config --

    fn config_with_key(key: Option<&str>) -> Config {
        let mut config = Config::default();
        config.credentials.anthropic_api_key = key.map(str::to_string);
        config
    }

    #[test]
    fn from_config_with_api_key_returns_active() {
        assert!(LlmClient::from_config(&config_with_key(Some("sk-ant-test"))).is_active());
    }

    #[test]
    fn from_config_without_api_key_returns_disabled() {
        assert!(!LlmClient::from_config(&config_with_key(None)).is_active());
        assert!(!LlmClient::from_config(&config_with_key(Some(""))).is_active());
    }

    // -- Mock SSE server --

    /// Serve one canned HTTP response on a local port; returns the URL.
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<()>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        });
        (format!("http://{addr}/v1/messages"), handle)
    }

    #[tokio::test]
    async fn mock_sse_server_full_flow() {
        let response = concat!(
            "HTTP/1.1 200 OK\r\n",
            "Content-Type: text/event-stream\r\n",
            "Cache-Control: no-cache\r\n",
            "\r\n",
            "event: message_start\r\n",
            "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"usage\":{\"input_tokens\":15}}}\r\n",
            "\r\n",
            "event: content_block_delta\r\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Take\"}}\r\n",
            "\r\n",
            "event: content_block_delta\r\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\" Bumrah\"}}\r\n",
            "\r\n",
            "event: message_delta\r\n",
            "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":7}}\r\n",
            "\r\n",
            "event: message_stop\r\n",
            "data: {\"type\":\"message_stop\"}\r\n",
            "\r\n",
        );
        let (url, server) = serve_once(response).await;
        let client = ClaudeClient::new("sk-test".into(), "test-model".into()).with_api_url(url);

        let (tx, mut rx) = mpsc::channel(32);
        client
            .stream_chat("system", &[ChatMessage::user("who?")], 100, tx, 1)
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        let _ = server.await;

        assert_eq!(
            events,
            vec![
                LlmEvent::Token {
                    text: "Take".into(),
                    generation: 1
                },
                LlmEvent::Token {
                    text: " Bumrah".into(),
                    generation: 1
                },
                LlmEvent::Complete {
                    full_text: "Take Bumrah".into(),
                    generation: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn mock_sse_server_max_tokens_appends_note() {
        let response = concat!(
            "HTTP/1.1 200 OK\r\n",
            "Content-Type: text/event-stream\r\n",
            "\r\n",
            "event: content_block_delta\r\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Long\"}}\r\n",
            "\r\n",
            "event: message_delta\r\n",
            "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"max_tokens\"}}\r\n",
            "\r\n",
            "event: message_stop\r\n",
            "data: {\"type\":\"message_stop\"}\r\n",
            "\r\n",
        );
        let (url, server) = serve_once(response).await;
        let client = ClaudeClient::new("sk-test".into(), "test-model".into()).with_api_url(url);

        let (tx, mut rx) = mpsc::channel(32);
        client
            .stream_chat("system", &[ChatMessage::user("who?")], 1, tx, 2)
            .await
            .unwrap();

        let mut last = None;
        while let Some(event) = rx.recv().await {
            last = Some(event);
        }
        let _ = server.await;

        assert_eq!(
            last,
            Some(LlmEvent::Complete {
                full_text: format!("Long{TRUNCATION_NOTE}"),
                generation: 2,
            })
        );
    }

    #[tokio::test]
    async fn mock_sse_server_error_status() {
        let response = concat!(
            "HTTP/1.1 401 Unauthorized\r\n",
            "Content-Type: application/json\r\n",
            "Content-Length: 70\r\n",
            "\r\n",
            "{\"error\":{\"message\":\"Invalid API key\",\"type\":\"authentication_error\"}}",
        );
        let (url, server) = serve_once(response).await;
        let client = ClaudeClient::new("sk-bad".into(), "test-model".into()).with_api_url(url);

        let (tx, mut rx) = mpsc::channel(8);
        client
            .stream_chat("system", &[ChatMessage::user("who?")], 100, tx, 5)
            .await
            .unwrap();

        match rx.recv().await {
            Some(LlmEvent::Error { message, generation }) => {
                assert_eq!(generation, 5);
                assert!(message.contains("401"), "unexpected message: {message}");
            }
            other => panic!("expected LlmEvent::Error, got: {other:?}"),
        }
        let _ = server.await;
    }

    #[tokio::test]
    async fn mock_sse_server_closed_early_keeps_partial_reply() {
        let response = concat!(
            "HTTP/1.1 200 OK\r\n",
            "Content-Type: text/event-stream\r\n",
            "Connection: close\r\n",
            "\r\n",
            "event: content_block_delta\r\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Half an\"}}\r\n",
            "\r\n",
        );
        let (url, server) = serve_once(response).await;
        let client = ClaudeClient::new("sk-test".into(), "test-model".into()).with_api_url(url);

        let (tx, mut rx) = mpsc::channel(32);
        client
            .stream_chat("system", &[ChatMessage::user("who?")], 100, tx, 3)
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        let _ = server.await;

        assert_eq!(
            events.last(),
            Some(&LlmEvent::Complete {
                full_text: "Half an".into(),
                generation: 3,
            })
        );
    }
}
