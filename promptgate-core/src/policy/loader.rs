//! Rule loading with priority: rules file → environment → embedded.
//!
//! # Priority
//! 1. YAML file at `$PROMPTGATE_RULES_FILE` (default: `/etc/promptgate/rules.yaml`)
//! 2. Environment variables `$PROMPTGATE_DENY_TERMS` / `$PROMPTGATE_MASK_TERMS`
//!    (comma-separated, order preserved; an unset list is empty)
//! 3. Embedded default rules
//!
//! Rules are loaded once at startup and never reloaded.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::{RuleError, RuleSet};

/// Default location of the rules file.
pub const DEFAULT_RULES_PATH: &str = "/etc/promptgate/rules.yaml";

/// Where the active rule set came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    /// Loaded from a YAML file.
    File {
        /// Path of the file
        path: PathBuf,
    },
    /// Loaded from `PROMPTGATE_DENY_TERMS` / `PROMPTGATE_MASK_TERMS`.
    Environment,
    /// Compiled-in defaults.
    Embedded,
}

/// Load the rule set using the standard priority order.
///
/// # Errors
///
/// Returns [`RuleError`] if the selected source holds an invalid rule set.
/// An unreadable file is logged and skipped; a readable but invalid one is
/// an error, so a typo never silently falls back to the defaults.
///
/// # Note
/// Uses blocking I/O. Called once before the server starts accepting traffic.
pub fn load_rules() -> Result<(RuleSet, RuleSource), RuleError> {
    let path = env::var("PROMPTGATE_RULES_FILE").unwrap_or_else(|_| DEFAULT_RULES_PATH.to_string());
    load_rules_from(Path::new(&path))
}

/// Load the rule set, trying `path` first.
///
/// # Errors
///
/// See [`load_rules`].
pub fn load_rules_from(path: &Path) -> Result<(RuleSet, RuleSource), RuleError> {
    // 1. Rules file
    if path.exists() {
        match fs::read_to_string(path) {
            Ok(content) => {
                let rules = RuleSet::from_yaml(&content)?;
                log_loaded(&rules, "file");
                info!(path = %path.display(), "Loaded rules from file");
                return Ok((
                    rules,
                    RuleSource::File {
                        path: path.to_path_buf(),
                    },
                ));
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read rules file, trying environment"
                );
            }
        }
    }

    // 2. Environment
    let deny = env::var("PROMPTGATE_DENY_TERMS").ok();
    let mask = env::var("PROMPTGATE_MASK_TERMS").ok();
    if deny.is_some() || mask.is_some() {
        let rules = RuleSet::new(
            split_terms(deny.as_deref()),
            split_terms(mask.as_deref()),
        )?;
        log_loaded(&rules, "environment");
        return Ok((rules, RuleSource::Environment));
    }

    // 3. Embedded
    let rules = embedded_rules()?;
    log_loaded(&rules, "embedded");
    Ok((rules, RuleSource::Embedded))
}

/// The compiled-in rule set.
///
/// # Errors
///
/// Only fails if the embedded YAML is broken, which the tests guard against.
pub fn embedded_rules() -> Result<RuleSet, RuleError> {
    RuleSet::from_yaml(include_str!("defaults.yaml"))
}

fn split_terms(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(s) if !s.trim().is_empty() => s.split(',').map(|t| t.trim().to_string()).collect(),
        _ => Vec::new(),
    }
}

fn log_loaded(rules: &RuleSet, source: &str) {
    info!(
        source,
        deny_terms = rules.deny_terms().len(),
        mask_terms = rules.mask_terms().len(),
        "Rule set loaded"
    );

    // Deny terms are matched against the lower-cased prompt, so any uppercase
    // character makes the term unmatchable.
    for term in rules.deny_terms() {
        if term.chars().any(char::is_uppercase) {
            warn!(term = %term, "Deny term contains uppercase characters and can never match");
        }
    }
}
