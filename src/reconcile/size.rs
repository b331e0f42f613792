//! Local versus remote size reconciliation.
//!
//! The comparison moves through `Unknown → Probed → Compared → Resolved`.
//! Transitions out of order leave the state unchanged, so a caller can never
//! reach a decision without having both sides in hand.

/// What to do with the local file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeDecision {
    /// Local and remote sizes agree; nothing to transfer.
    AlreadyComplete,
    /// The local file is larger than the remote one. Left alone.
    LocalLarger { local: u64, remote: u64 },
    /// Transfer, resuming from `resume_from` bytes.
    Fetch { resume_from: u64 },
}

/// Size reconciliation state of one item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SizeState {
    #[default]
    Unknown,
    /// Remote size known, or known to be unobtainable.
    Probed { remote: Option<u64> },
    /// Both sides measured; `local` is `None` when no file exists.
    Compared {
        local: Option<u64>,
        remote: Option<u64>,
    },
    Resolved(SizeDecision),
}

impl SizeState {
    /// Records the remote size.
    #[must_use]
    pub fn probed(self, remote: Option<u64>) -> Self {
        match self {
            Self::Unknown => Self::Probed { remote },
            other => other,
        }
    }

    /// Records the local size.
    #[must_use]
    pub fn compared(self, local: Option<u64>) -> Self {
        match self {
            Self::Probed { remote } => Self::Compared { local, remote },
            other => other,
        }
    }

    /// Turns a comparison into a decision.
    #[must_use]
    pub fn resolved(self) -> Self {
        match self {
            Self::Compared { local, remote } => Self::Resolved(decide(local, remote)),
            other => other,
        }
    }

    /// Runs the full `Unknown → Resolved` chain for one item.
    #[must_use]
    pub fn settle(remote: Option<u64>, local: Option<u64>) -> SizeDecision {
        match Self::Unknown.probed(remote).compared(local).resolved() {
            Self::Resolved(decision) => decision,
            // The chain above never stops short of a decision.
            _ => decide(local, remote),
        }
    }

    /// The decision, once resolved.
    #[must_use]
    pub fn decision(self) -> Option<SizeDecision> {
        match self {
            Self::Resolved(decision) => Some(decision),
            _ => None,
        }
    }
}

/// Decides from the two sizes.
///
/// Without a remote size a fetch is always attempted, resuming from whatever
/// is on disk; the server answers 416 when that is already everything.
#[must_use]
pub fn decide(local: Option<u64>, remote: Option<u64>) -> SizeDecision {
    match (local, remote) {
        (Some(local), Some(remote)) if local == remote => SizeDecision::AlreadyComplete,
        (Some(local), Some(remote)) if local > remote => SizeDecision::LocalLarger { local, remote },
        (Some(local), _) => SizeDecision::Fetch { resume_from: local },
        (None, _) => SizeDecision::Fetch { resume_from: 0 },
    }
}
