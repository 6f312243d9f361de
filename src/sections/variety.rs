//! Character variety sections - allowed characters, class minimums,
//! distinct class count and the leading uppercase letter.

use std::collections::BTreeMap;

use secrecy::ExposeSecret;

use super::SectionResult;
use crate::policy::{CharClass, PolicyConfig};
use crate::verdict::{EvaluationContext, ViolationKind};

/// Counts the characters of each class present in `pwd`, and whether any
/// character falls outside the policy's character sets.
fn class_counts(pwd: &str, policy: &PolicyConfig) -> (BTreeMap<CharClass, usize>, bool) {
    let mut counts = BTreeMap::new();
    let mut invalid = false;
    for c in pwd.chars() {
        match policy.classify(c) {
            Some(class) => *counts.entry(class).or_insert(0) += 1,
            None => invalid = true,
        }
    }
    (counts, invalid)
}

/// Checks allowed characters, per-class minimums and the number of
/// distinct classes.
///
/// Reports `InvalidCharacter` first if any character is outside the
/// policy's character sets, then one `MissingClass` per class below its
/// minimum, in class order, then `TooFewClasses` if fewer distinct classes
/// appear than required.
pub fn character_class_section(ctx: &EvaluationContext, policy: &PolicyConfig) -> SectionResult {
    let (counts, invalid) = class_counts(ctx.password().expose_secret(), policy);

    let mut violations = Vec::new();
    if invalid {
        violations.push(ViolationKind::InvalidCharacter);
    }
    violations.extend(
        policy
            .required_classes()
            .filter(|(class, min)| counts.get(class).copied().unwrap_or(0) < *min)
            .map(|(class, _)| ViolationKind::MissingClass(class)),
    );

    if counts.len() < policy.required_class_kinds() {
        violations.push(ViolationKind::TooFewClasses);
    }
    violations
}

/// Requires the first character to be an uppercase letter when enabled.
pub fn first_letter_section(ctx: &EvaluationContext, policy: &PolicyConfig) -> SectionResult {
    if !policy.first_letter_uppercase() {
        return Vec::new();
    }
    let first = ctx.password().expose_secret().chars().next();
    if first.is_some_and(|c| policy.classify(c) == Some(CharClass::Uppercase)) {
        Vec::new()
    } else {
        vec![ViolationKind::FirstLetterNotUppercase]
    }
}
