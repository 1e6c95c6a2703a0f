//! Persisted per-installation preference flags.
//!
//! # Invariants
//! - A flag that was never written reads as `false`.

use serde::{Deserialize, Serialize};

/// Storage key for the first-run flag.
pub const FIRST_RUN_COMPLETE_KEY: &str = "first_run_complete";
/// Storage key for the one-time continuation tip flag.
pub const CONTINUATION_TIP_SEEN_KEY: &str = "continuation_tip_seen";

/// Small preferences record injected into editor services.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Set once the user has inserted a first continuation.
    pub first_run_complete: bool,
    /// Set once the continuation tip has been shown.
    pub continuation_tip_seen: bool,
}

impl Preferences {
    /// Returns whether onboarding help should still be shown.
    pub fn is_first_run(&self) -> bool {
        !self.first_run_complete
    }
}
