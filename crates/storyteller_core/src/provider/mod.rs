//! Suggestion provider boundary.
//!
//! # Responsibility
//! - Define the fixed interface continuation and rewrite providers satisfy.
//! - Select one active provider at runtime.
//! - Ship a deterministic canned provider for hosts without a real one.
//!
//! # Invariants
//! - Core never retries a failed provider call.

pub mod canned;
pub mod registry;
pub mod spi;

pub use canned::CannedProvider;
pub use registry::{ProviderRegistry, ProviderRegistryError};
pub use spi::{
    ContinuationProvider, ProviderError, ProviderResult, RewriteProvider, SuggestionProvider,
};
