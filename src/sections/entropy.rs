//! Entropy section - heuristic strength estimate.
//!
//! The estimate is `length × log2(alphabet)`, where the alphabet is the sum
//! of the sizes of the character classes actually present. It rewards length
//! and variety; it is not a cryptographic measure and knows nothing about
//! dictionary words or keyboard walks.

use std::collections::BTreeSet;

use secrecy::ExposeSecret;

use super::SectionResult;
use crate::policy::{CharClass, PolicyConfig};
use crate::verdict::{EvaluationContext, ViolationKind};

/// Bits that map to a score of 100.
const FULL_SCALE_BITS: f64 = 128.0;

/// Estimated entropy of `pwd` in bits. 0 for the empty string.
pub fn estimate_entropy_bits(pwd: &str) -> f64 {
    let mut present = BTreeSet::new();
    let mut len = 0usize;
    for c in pwd.chars() {
        present.insert(CharClass::of(c));
        len += 1;
    }
    let alphabet: u32 = present.into_iter().map(CharClass::alphabet_size).sum();
    if alphabet == 0 {
        return 0.0;
    }
    len as f64 * f64::from(alphabet).log2()
}

/// Maps an entropy estimate onto 0..=100.
pub fn entropy_percent(bits: f64) -> f64 {
    (bits / FULL_SCALE_BITS * 100.0).clamp(0.0, 100.0)
}

/// Fails when the estimate is below the policy minimum.
pub fn entropy_section(ctx: &EvaluationContext, policy: &PolicyConfig) -> SectionResult {
    let min = policy.min_entropy_bits();
    if min <= 0.0 || estimate_entropy_bits(ctx.password().expose_secret()) >= min {
        return Vec::new();
    }
    vec![ViolationKind::InsufficientEntropy]
}
