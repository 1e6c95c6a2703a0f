//! Provider traits and failure envelope.

use crate::model::document::Intents;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failure reported by (or on behalf of) a suggestion provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub provider_id: String,
    /// Stable machine-readable code, e.g. `provider_not_selected`.
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(
        provider_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "provider `{}` failed ({}): {}",
            self.provider_id, self.code, self.message
        )
    }
}

impl Error for ProviderError {}

/// Produces one continuation sentence for the story so far.
pub trait ContinuationProvider {
    /// `context` is the full projected text of the surface.
    fn generate(&self, context: &str, intents: &Intents) -> ProviderResult<String>;
}

/// Rewrites a selected passage following a free-text instruction.
pub trait RewriteProvider {
    fn rewrite(&self, selected: &str, instruction: &str) -> ProviderResult<String>;
}

/// Provider offering both capabilities under a stable id.
pub trait SuggestionProvider: ContinuationProvider + RewriteProvider + Send + Sync {
    /// Lowercase id made of `[a-z0-9_-]`.
    fn provider_id(&self) -> &str;
}
