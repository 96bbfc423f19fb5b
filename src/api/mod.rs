//! Provider backends and the wire plumbing behind them.

pub mod client;
pub mod logging;
pub mod mock_client;
pub mod provider;
pub mod stream;

use crate::config::{Config, ProviderKind};
use anyhow::Result;
use provider::{GenerationProvider, UnconfiguredProvider};
use std::sync::Arc;

/// Build the backend for a provider selection. Only Gemini has a live
/// implementation; the other selectable identities refuse every call.
pub fn build_provider(
    kind: ProviderKind,
    config: &Config,
) -> Result<Arc<dyn GenerationProvider>> {
    Ok(match kind {
        ProviderKind::Gemini => Arc::new(client::GeminiClient::new(config)?),
        other => Arc::new(UnconfiguredProvider::new(other)),
    })
}
