//! Length section - checks password length bounds.

use secrecy::ExposeSecret;

use super::SectionResult;
use crate::policy::PolicyConfig;
use crate::verdict::{EvaluationContext, ViolationKind};

/// Checks the password length in characters (not bytes) against the
/// policy's bounds.
pub fn length_section(ctx: &EvaluationContext, policy: &PolicyConfig) -> SectionResult {
    let len = ctx.password().expose_secret().chars().count();
    if len < policy.min_length() {
        return vec![ViolationKind::TooShort];
    }
    if len > policy.max_length() {
        return vec![ViolationKind::TooLong];
    }
    Vec::new()
}
