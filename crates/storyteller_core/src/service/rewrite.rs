//! Selection-anchored rewrite flow.
//!
//! # Responsibility
//! - Capture a non-collapsed selection as a value snapshot.
//! - Ask a rewrite provider for a replacement and hold the old/new pair.
//! - Apply or discard the proposal.
//!
//! # Invariants
//! - A snapshot is re-validated before it mutates the surface; a stale one
//!   closes the session without touching the surface.
//! - Closing always drops both the snapshot and the proposal.

use crate::editor::surface::{EditableSurface, RangeSnapshot};
use crate::provider::spi::{ProviderError, RewriteProvider};
use crate::service::autosave::AutosaveController;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteState {
    Closed,
    Captured,
    Proposed,
}

/// Old/new pair shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub instruction: String,
    pub original: String,
    pub replacement: String,
}

/// Result of accepting a proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// Replacement written to the surface.
    Applied { replacement: String },
    /// Range went stale after capture; nothing was changed.
    Discarded,
}

#[derive(Debug)]
pub enum RewriteError {
    /// No selection is captured.
    NothingCaptured,
    /// Accept was requested before any proposal.
    NothingProposed,
    Provider(ProviderError),
}

impl Display for RewriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NothingCaptured => write!(f, "no selection captured for rewrite"),
            Self::NothingProposed => write!(f, "no rewrite proposal to accept"),
            Self::Provider(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RewriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Provider(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProviderError> for RewriteError {
    fn from(value: ProviderError) -> Self {
        Self::Provider(value)
    }
}

#[derive(Debug, Clone, Default)]
enum Phase {
    #[default]
    Closed,
    Captured(RangeSnapshot),
    Proposed(RangeSnapshot, Proposal),
}

/// Rewrite session owning at most one captured range.
#[derive(Debug, Clone, Default)]
pub struct RewriteSession {
    phase: Phase,
}

impl RewriteSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RewriteState {
        match self.phase {
            Phase::Closed => RewriteState::Closed,
            Phase::Captured(_) => RewriteState::Captured,
            Phase::Proposed(..) => RewriteState::Proposed,
        }
    }

    /// Text of the captured selection.
    pub fn captured_text(&self) -> Option<&str> {
        match &self.phase {
            Phase::Closed => None,
            Phase::Captured(snapshot) | Phase::Proposed(snapshot, _) => Some(snapshot.text()),
        }
    }

    pub fn proposal(&self) -> Option<&Proposal> {
        match &self.phase {
            Phase::Proposed(_, proposal) => Some(proposal),
            _ => None,
        }
    }

    /// Re-evaluates the surface selection.
    ///
    /// A non-collapsed selection is captured; collapsed, foreign or missing
    /// selections close the session. Re-reporting the same selection keeps
    /// the current proposal.
    pub fn on_selection_change<S: EditableSurface + ?Sized>(
        &mut self,
        surface: &S,
    ) -> RewriteState {
        let snapshot = surface
            .selection()
            .filter(|range| matches!(surface.is_collapsed(range), Ok(false)))
            .and_then(|range| RangeSnapshot::capture(surface, range).ok());

        match snapshot {
            Some(snapshot) => {
                let unchanged = matches!(
                    &self.phase,
                    Phase::Captured(current) | Phase::Proposed(current, _) if *current == snapshot
                );
                if !unchanged {
                    self.phase = Phase::Captured(snapshot);
                }
            }
            None => self.phase = Phase::Closed,
        }
        self.state()
    }

    /// Requests a replacement for the captured text.
    ///
    /// May be repeated while a proposal is shown. On provider failure the
    /// session keeps its current state.
    pub fn propose<P: RewriteProvider + ?Sized>(
        &mut self,
        instruction: &str,
        provider: &P,
    ) -> Result<Proposal, RewriteError> {
        let snapshot = match &self.phase {
            Phase::Captured(snapshot) | Phase::Proposed(snapshot, _) => snapshot.clone(),
            Phase::Closed => return Err(RewriteError::NothingCaptured),
        };
        let instruction = instruction.trim();
        let replacement = provider.rewrite(snapshot.text(), instruction)?;
        let proposal = Proposal {
            instruction: instruction.to_string(),
            original: snapshot.text().to_string(),
            replacement,
        };
        self.phase = Phase::Proposed(snapshot, proposal.clone());
        Ok(proposal)
    }

    /// Applies the proposal if the captured range is still live.
    pub fn accept<S: EditableSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        autosave: &mut AutosaveController,
        now_ms: i64,
    ) -> Result<RewriteOutcome, RewriteError> {
        let (snapshot, proposal) = match std::mem::take(&mut self.phase) {
            Phase::Proposed(snapshot, proposal) => (snapshot, proposal),
            other => {
                self.phase = other;
                return Err(RewriteError::NothingProposed);
            }
        };

        if !snapshot.is_live(surface) {
            warn!("event=rewrite_accept module=rewrite status=stale");
            return Ok(RewriteOutcome::Discarded);
        }
        if let Err(err) = surface.replace_range(snapshot.range(), &proposal.replacement) {
            warn!("event=rewrite_accept module=rewrite status=stale error={err}");
            return Ok(RewriteOutcome::Discarded);
        }

        autosave.record_mutation(now_ms);
        info!(
            "event=rewrite_accept module=rewrite status=ok original_chars={} replacement_chars={}",
            proposal.original.chars().count(),
            proposal.replacement.chars().count()
        );
        Ok(RewriteOutcome::Applied {
            replacement: proposal.replacement,
        })
    }

    /// Drops a shown proposal without mutating anything.
    ///
    /// Returns `false` (and leaves the session as is) when nothing was
    /// proposed.
    pub fn reject(&mut self) -> bool {
        if self.state() != RewriteState::Proposed {
            return false;
        }
        self.phase = Phase::Closed;
        true
    }

    /// Closes the session from any state.
    pub fn cancel(&mut self) {
        self.phase = Phase::Closed;
    }
}
