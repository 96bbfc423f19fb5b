//! The capability seam between the studio and whatever generates text.
//!
//! Components that issue requests hold an `Arc<dyn GenerationProvider>`
//! handed to them at construction time. The settings surface offers more
//! provider identities than have backends; the ones without a backend are
//! represented by [`UnconfiguredProvider`], which fails fast instead of
//! quietly borrowing the default backend.

use std::pin::Pin;

use futures::future::{ready, BoxFuture};
use futures::Stream;
use thiserror::Error;

use crate::config::ProviderKind;
use crate::util::data_uri;

/// Incremental text fragments of one streamed reply.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The selected provider identity has no backend wired up.
    #[error("provider '{0}' has no configured backend")]
    Unconfigured(ProviderKind),

    /// The HTTP request could not be sent or completed.
    #[error("{0}")]
    Request(String),

    /// The provider answered with a non-success HTTP status.
    #[error("API endpoint '{url}' returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// A response body or stream event could not be decoded.
    #[error("response decode failed: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRole {
    User,
    Model,
}

impl HistoryRole {
    pub fn wire_name(self) -> &'static str {
        match self {
            HistoryRole::User => "user",
            HistoryRole::Model => "model",
        }
    }
}

/// One prior exchange turn as replayed to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTurn {
    pub role: HistoryRole,
    pub text: String,
}

/// A streaming completion request from the coding panel.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub history: Vec<HistoryTurn>,
    pub message: String,
    /// Current editor buffer, folded into the system instruction.
    pub editor_context: String,
}

/// A whole-reply request from the asset panel.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_instruction: Option<String>,
    /// Ask the backend for an inline image payload alongside the text.
    pub want_image: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub base64_data: String,
}

impl InlineImage {
    /// Encode for direct embedding in a display surface.
    pub fn data_uri(&self) -> String {
        data_uri(&self.mime_type, &self.base64_data)
    }
}

/// Result of a whole-reply generation round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReply {
    pub text: String,
    pub image: Option<InlineImage>,
}

pub trait GenerationProvider: Send + Sync {
    /// Open a streamed completion; fragments arrive until the provider
    /// closes the stream or fails it partway.
    fn stream_completion(
        &self,
        request: StreamRequest,
    ) -> BoxFuture<'_, Result<FragmentStream, ProviderError>>;

    /// Single-shot generation, optionally producing an inline image.
    fn generate(
        &self,
        request: GenerationRequest,
    ) -> BoxFuture<'_, Result<GenerationReply, ProviderError>>;
}

/// Placeholder backend for provider identities the settings surface lists
/// but nothing implements.
pub struct UnconfiguredProvider {
    kind: ProviderKind,
}

impl UnconfiguredProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self { kind }
    }
}

impl GenerationProvider for UnconfiguredProvider {
    fn stream_completion(
        &self,
        _request: StreamRequest,
    ) -> BoxFuture<'_, Result<FragmentStream, ProviderError>> {
        Box::pin(ready(Err(ProviderError::Unconfigured(self.kind))))
    }

    fn generate(
        &self,
        _request: GenerationRequest,
    ) -> BoxFuture<'_, Result<GenerationReply, ProviderError>> {
        Box::pin(ready(Err(ProviderError::Unconfigured(self.kind))))
    }
}
