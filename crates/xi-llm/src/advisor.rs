// Assistant capability: the trait the orchestrator depends on, plus the
// offline placeholder used when no API key is configured.

use async_trait::async_trait;
use tokio::sync::mpsc;

use xi_core::protocol::{ChatMessage, LlmEvent};

/// Canned reply returned when no real assistant backend is available.
pub const PLACEHOLDER_REPLY: &str = "Assistant response here...";

/// One question for the assistant, with everything it may look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdviceRequest {
    /// Standing instructions.
    pub system: String,
    /// Rendered squad/pool state at the time of the question.
    pub context: String,
    /// Earlier chat turns followed by the new user question.
    pub transcript: Vec<ChatMessage>,
    pub max_tokens: u32,
}

/// Produces free-text advice about a squad. Implementations stream their
/// answer as `LlmEvent`s over `tx`, tagging each with `generation`, and must
/// end with exactly one `Complete` or `Error` unless the receiver is gone.
///
/// Advice never feeds back into squad or selection state.
#[async_trait]
pub trait Advisor: Send + Sync {
    async fn advise(
        &self,
        request: AdviceRequest,
        tx: mpsc::Sender<LlmEvent>,
        generation: u64,
    ) -> anyhow::Result<()>;
}

/// Answers every question with [`PLACEHOLDER_REPLY`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderAdvisor;

#[async_trait]
impl Advisor for PlaceholderAdvisor {
    async fn advise(
        &self,
        _request: AdviceRequest,
        tx: mpsc::Sender<LlmEvent>,
        generation: u64,
    ) -> anyhow::Result<()> {
        let _ = tx
            .send(LlmEvent::Complete {
                full_text: PLACEHOLDER_REPLY.to_string(),
                generation,
            })
            .await;
        Ok(())
    }
}
