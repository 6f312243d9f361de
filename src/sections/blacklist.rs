//! Blacklist section - checks if the password contains a forbidden word.

use secrecy::ExposeSecret;

use super::SectionResult;
use crate::policy::PolicyConfig;
use crate::verdict::{EvaluationContext, ViolationKind};

/// Checks the password against the policy's blacklist.
///
/// Matching is case-insensitive and by substring, so "password123" is caught
/// by a blacklisted "password".
pub fn blacklist_section(ctx: &EvaluationContext, policy: &PolicyConfig) -> SectionResult {
    if policy.blacklist().matches(ctx.password().expose_secret()) {
        return vec![ViolationKind::Blacklisted];
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blacklist::Blacklist;
    use crate::sections::context;

    fn policy() -> PolicyConfig {
        PolicyConfig::builder()
            .blacklist(Blacklist::new(["password", "123456", "qwerty"]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_blacklist_section_common_password() {
        let result = blacklist_section(&context("password"), &policy());
        assert_eq!(result, vec![ViolationKind::Blacklisted]);
    }

    #[test]
    fn test_blacklist_section_embedded_mixed_case() {
        let result = blacklist_section(&context("MyPassword1!"), &policy());
        assert_eq!(result, vec![ViolationKind::Blacklisted]);
    }

    #[test]
    fn test_blacklist_section_strong_password() {
        let result = blacklist_section(&context("CorrectHorseBatteryStaple!123"), &policy());
        assert!(result.is_empty());
    }

    #[test]
    fn test_blacklist_section_without_blacklist() {
        let policy = PolicyConfig::builder().build().unwrap();
        assert!(blacklist_section(&context("password"), &policy).is_empty());
    }
}
