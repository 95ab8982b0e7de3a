//! Policy model for PromptGate.
//!
//! The policy layer answers one question per prompt: may it go through
//! untouched (**allow**), must it be blocked (**deny**), or may it go through
//! once some terms are masked (**modify**)?
//!
//! Rule evaluation is a fixed two-phase keyword check driven by a [`RuleSet`]:
//!
//! 1. **Deny phase**: only for restricted sensitivities. The lower-cased prompt
//!    is scanned for `deny_terms` in configured order; the first hit wins.
//! 2. **Mask phase**: the original-case prompt is scanned for every term of
//!    the mask catalog; all hits are reported, in catalog order.
//!
//! There is no rule language: the only inputs are the two ordered term lists.

pub mod engine;
pub mod loader;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validate::null_as_default;

pub use engine::PolicyDecisionPoint;
pub use loader::{RuleSource, load_rules};

/// Sensitivity labels that switch on the deny phase (compared case-insensitively).
pub const RESTRICTED_SENSITIVITIES: &[&str] = &["confidential", "restricted"];

/// Returns `true` if the sensitivity label activates deny rules.
pub fn is_restricted(sensitivity: Option<&str>) -> bool {
    sensitivity.is_some_and(|s| {
        let s = s.to_lowercase();
        RESTRICTED_SENSITIVITIES.contains(&s.as_str())
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Query
// ═══════════════════════════════════════════════════════════════════════════

/// A prompt submitted for policy evaluation.
///
/// Immutable once received: redaction produces a new
/// [`AnswerRequest`](crate::answer::AnswerRequest) instead of editing the query.
///
/// Inbound bodies are decoded with [`from_json`](crate::validate::from_json): unknown fields are
/// ignored and `null` is accepted for every optional field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Optional caller identifier (carried, never interpreted).
    #[serde(default)]
    pub user_id: Option<String>,

    /// Prompt text.
    pub prompt: String,

    /// Optional classification label (e.g. "confidential").
    #[serde(default)]
    pub sensitivity: Option<String>,

    /// Topic tags, forwarded to the answer pipeline in order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: Vec<String>,
}

impl Query {
    /// Create a query with only a prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            user_id: None,
            prompt: prompt.into(),
            sensitivity: None,
            labels: Vec::new(),
        }
    }

    /// Set the sensitivity label.
    #[must_use]
    pub fn with_sensitivity(mut self, sensitivity: impl Into<String>) -> Self {
        self.sensitivity = Some(sensitivity.into());
        self
    }

    /// Set the topic labels.
    #[must_use]
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Set the user identifier.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Decision
// ═══════════════════════════════════════════════════════════════════════════

/// Policy verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Forward the prompt unchanged.
    Allow,
    /// Block the prompt.
    Deny,
    /// Forward the prompt after masking the reported terms.
    Modify,
}

impl Verdict {
    /// Wire name of the verdict.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
            Self::Modify => "modify",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one [`Query`].
///
/// Serialized as `{"decision": "...", "reason": "...", "mask_terms": [...]}`,
/// where `mask_terms` is omitted unless the verdict is `modify`.
///
/// Invariants: a deny never carries mask terms; a modify always carries at
/// least one. Constructors uphold them; decisions received over the wire are
/// checked with [`Decision::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(rename = "decision")]
    verdict: Verdict,
    #[serde(default)]
    reason: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    mask_terms: Vec<String>,
}

impl Decision {
    /// An allow decision.
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Allow,
            reason: reason.into(),
            mask_terms: Vec::new(),
        }
    }

    /// A deny decision.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Deny,
            reason: reason.into(),
            mask_terms: Vec::new(),
        }
    }

    /// A modify decision. Returns `None` if `mask_terms` is empty.
    pub fn modify(mask_terms: Vec<String>, reason: impl Into<String>) -> Option<Self> {
        if mask_terms.is_empty() {
            return None;
        }
        Some(Self {
            verdict: Verdict::Modify,
            reason: reason.into(),
            mask_terms,
        })
    }

    /// The verdict.
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Human-readable reason.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Terms to mask, in catalog order. Empty unless the verdict is modify.
    pub fn mask_terms(&self) -> &[String] {
        &self.mask_terms
    }

    /// Check the verdict/mask-term invariants on a decision that did not come
    /// from one of the constructors (i.e. one deserialized from a peer).
    ///
    /// Allow decisions that carry stray mask terms are rejected too: the
    /// gateway would otherwise redact on an allow.
    pub fn validate(&self) -> Result<(), String> {
        match self.verdict {
            Verdict::Modify if self.mask_terms.is_empty() => {
                Err("modify decision without mask_terms".to_string())
            }
            Verdict::Modify if self.mask_terms.iter().any(String::is_empty) => {
                Err("modify decision with an empty mask term".to_string())
            }
            Verdict::Deny | Verdict::Allow if !self.mask_terms.is_empty() => Err(format!(
                "{} decision must not carry mask_terms",
                self.verdict
            )),
            _ => Ok(()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// RuleSet
// ═══════════════════════════════════════════════════════════════════════════

/// Errors raised while building a [`RuleSet`].
#[derive(Debug, Error)]
pub enum RuleError {
    /// A term list contains an empty string (it would match every prompt).
    #[error("empty term at position {index} of the {list} list")]
    EmptyTerm {
        /// `deny` or `mask`
        list: &'static str,
        /// Position of the empty term
        index: usize,
    },

    /// The rules file could not be read.
    #[error("failed to read rules file {path}: {source}")]
    Io {
        /// Path that was read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The rules document is not valid YAML for a rule set.
    #[error("failed to parse rules: {0}")]
    Parse(#[from] serde_saphyr::Error),
}

/// The two ordered keyword lists that drive policy evaluation.
///
/// Order is significant: `deny_terms` order decides which keyword a denial
/// names, and `mask_terms` order is the order of reported mask terms. Neither
/// list is ever sorted or deduplicated.
///
/// YAML shape:
///
/// ```yaml
/// deny: ["password", "ssn", "credit card"]
/// mask: ["email@", "@company.com"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuleSet {
    #[serde(rename = "deny", default)]
    deny_terms: Vec<String>,
    #[serde(rename = "mask", default)]
    mask_terms: Vec<String>,
}

impl RuleSet {
    /// Build a rule set from ordered term lists.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::EmptyTerm`] if any term is the empty string.
    pub fn new(deny_terms: Vec<String>, mask_terms: Vec<String>) -> Result<Self, RuleError> {
        let rules = Self {
            deny_terms,
            mask_terms,
        };
        rules.check()?;
        Ok(rules)
    }

    /// Parse a rule set from YAML.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Parse`] for malformed YAML and
    /// [`RuleError::EmptyTerm`] for empty terms.
    pub fn from_yaml(yaml: &str) -> Result<Self, RuleError> {
        let rules: Self = serde_saphyr::from_str(yaml)?;
        rules.check()?;
        Ok(rules)
    }

    fn check(&self) -> Result<(), RuleError> {
        for (list, terms) in [("deny", &self.deny_terms), ("mask", &self.mask_terms)] {
            if let Some(index) = terms.iter().position(String::is_empty) {
                return Err(RuleError::EmptyTerm { list, index });
            }
        }
        Ok(())
    }

    /// Deny keywords, in tie-break order.
    pub fn deny_terms(&self) -> &[String] {
        &self.deny_terms
    }

    /// Mask catalog, in reporting order.
    pub fn mask_terms(&self) -> &[String] {
        &self.mask_terms
    }
}
