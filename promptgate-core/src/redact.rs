//! Prompt redaction for `modify` decisions.
//!
//! Each mask term is applied in decision order: every literal occurrence is
//! replaced with [`REDACTION_TOKEN`] before the next term is applied. Later
//! terms therefore see the output of earlier ones (`email@company.com` with
//! terms `["email@", "@company.com"]` becomes `[REDACTED]company.com`).

/// Placeholder substituted for every masked occurrence.
pub const REDACTION_TOKEN: &str = "[REDACTED]";

/// Replace every occurrence of every term in `prompt`.
///
/// Empty terms are skipped (they would otherwise match between every
/// character). If `terms` is empty, the prompt is returned unchanged.
pub fn redact_prompt(prompt: &str, terms: &[String]) -> String {
    terms
        .iter()
        .filter(|term| !term.is_empty())
        .fold(prompt.to_string(), |acc, term| {
            acc.replace(term.as_str(), REDACTION_TOKEN)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_redact_single_term() {
        assert_eq!(
            redact_prompt("contact email@ for help", &terms(&["email@"])),
            "contact [REDACTED] for help"
        );
    }

    #[test]
    fn test_redact_every_occurrence() {
        assert_eq!(
            redact_prompt("email@ or email@ or email@", &terms(&["email@"])),
            "[REDACTED] or [REDACTED] or [REDACTED]"
        );
    }

    #[test]
    fn test_terms_apply_in_order() {
        assert_eq!(
            redact_prompt(
                "mail email@company.com and ops@company.com",
                &terms(&["email@", "@company.com"])
            ),
            "mail [REDACTED]company.com and ops[REDACTED]"
        );
    }

    #[test]
    fn test_redact_is_case_sensitive() {
        assert_eq!(
            redact_prompt("EMAIL@ stays", &terms(&["email@"])),
            "EMAIL@ stays"
        );
    }

    #[test]
    fn test_empty_terms_are_noop() {
        assert_eq!(redact_prompt("abc", &[]), "abc");
        assert_eq!(redact_prompt("abc", &terms(&[""])), "abc");
    }
}
