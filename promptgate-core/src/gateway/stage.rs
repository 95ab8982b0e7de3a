//! Route stages.
//!
//! ```text
//! Init ──PEP──▶ Decided ──deny──▶ Denied
//!                  │
//!                  └─allow/modify─▶ Redacted ──answer──▶ Answered ──evidence──▶ Done
//!
//! Init / Redacted ──stage failure──▶ Failed
//! ```

use std::fmt;

/// Where a single route currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteStage {
    /// Query received, PEP not yet consulted.
    Init,
    /// PEP returned a decision.
    Decided,
    /// Decision was deny. Terminal.
    Denied,
    /// Prompt prepared for the answer pipeline (masked or unchanged).
    Redacted,
    /// Answer pipeline returned a payload.
    Answered,
    /// Evidence handed off; response ready. Terminal.
    Done,
    /// PEP or answer pipeline failed. Terminal.
    Failed,
}

impl RouteStage {
    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Denied | Self::Done | Self::Failed)
    }

    /// Returns true if moving from `self` to `to` is a legal step.
    #[must_use]
    pub fn can_transition_to(&self, to: RouteStage) -> bool {
        matches!(
            (self, to),
            (Self::Init, Self::Decided)
                | (Self::Init, Self::Failed)
                | (Self::Decided, Self::Denied)
                | (Self::Decided, Self::Redacted)
                | (Self::Redacted, Self::Answered)
                | (Self::Redacted, Self::Failed)
                | (Self::Answered, Self::Done)
        )
    }

    /// Lowercase name, for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Decided => "decided",
            Self::Denied => "denied",
            Self::Redacted => "redacted",
            Self::Answered => "answered",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RouteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
