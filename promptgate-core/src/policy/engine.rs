//! Keyword rule engine (the Policy Decision Point).
//!
//! # Decision Logic
//!
//! 1. If the sensitivity is restricted, scan `deny_terms` in order against the
//!    lower-cased prompt. The first substring hit returns **deny** and names
//!    the keyword; nothing else runs.
//! 2. Scan the mask catalog against the original-case prompt and collect every
//!    hit in catalog order. Any hit returns **modify**.
//! 3. Otherwise return **allow**.
//!
//! Deny matching is case-insensitive on the prompt side only, while mask
//! matching is case-sensitive. Both are kept exactly as written until the
//! product owners decide otherwise.

use std::sync::Arc;

use tracing::debug;

use super::{Decision, Query, RuleSet, is_restricted};

/// Reason attached to every modify decision.
pub const MODIFY_REASON: &str = "masked low-risk ids";

/// Reason attached to every allow decision.
pub const ALLOW_REASON: &str = "default allow";

/// Stateless evaluator over an immutable [`RuleSet`].
///
/// `decide` is a pure function of the query: no counters, no caches, no
/// clock. Cloning is cheap (the rules are shared).
///
/// ```
/// use promptgate_core::policy::{PolicyDecisionPoint, Query, RuleSet, Verdict};
///
/// let rules = RuleSet::new(vec!["password".into()], vec!["email@".into()]).unwrap();
/// let pdp = PolicyDecisionPoint::new(rules);
///
/// let decision = pdp.decide(&Query::new("What is my PASSWORD?").with_sensitivity("confidential"));
/// assert_eq!(decision.verdict(), Verdict::Deny);
/// ```
#[derive(Debug, Clone)]
pub struct PolicyDecisionPoint {
    rules: Arc<RuleSet>,
}

impl PolicyDecisionPoint {
    /// Create an evaluator over the given rules.
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }

    /// Create an evaluator sharing an already loaded rule set.
    pub fn with_shared_rules(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    /// The rules this evaluator applies.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Evaluate a query.
    #[tracing::instrument(skip_all, fields(sensitivity = ?query.sensitivity))]
    pub fn decide(&self, query: &Query) -> Decision {
        if is_restricted(query.sensitivity.as_deref()) {
            if let Some(keyword) = self.first_deny_term(&query.prompt) {
                debug!(keyword = %keyword, "Deny term matched");
                return Decision::deny(format!("Found '{keyword}'"));
            }
        }

        let hits: Vec<String> = self
            .rules
            .mask_terms()
            .iter()
            .filter(|term| query.prompt.contains(term.as_str()))
            .cloned()
            .collect();

        if let Some(decision) = Decision::modify(hits, MODIFY_REASON) {
            debug!(mask_terms = ?decision.mask_terms(), "Mask terms matched");
            return decision;
        }

        Decision::allow(ALLOW_REASON)
    }

    fn first_deny_term(&self, prompt: &str) -> Option<&str> {
        let lowered = prompt.to_lowercase();
        self.rules
            .deny_terms()
            .iter()
            .find(|term| lowered.contains(term.as_str()))
            .map(String::as_str)
    }
}
