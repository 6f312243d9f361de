//! Pattern analysis sections - detects repetitive, sequential and
//! palindromic patterns.

use secrecy::ExposeSecret;

use super::SectionResult;
use crate::policy::PolicyConfig;
use crate::verdict::{EvaluationContext, ViolationKind};

fn chars_of(ctx: &EvaluationContext) -> Vec<char> {
    ctx.password().expose_secret().chars().collect()
}

/// Length of the longest run of identical consecutive characters.
pub(crate) fn longest_repeated_run(chars: &[char]) -> usize {
    let mut longest = usize::from(!chars.is_empty());
    let mut run = 1;
    for w in chars.windows(2) {
        if w[0] == w[1] {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 1;
        }
    }
    longest
}

/// Length of the longest run whose code points step by exactly +1 or
/// exactly -1 throughout ("abcd", "4321"). "z" to "a" is not a step.
pub(crate) fn longest_sequential_run(chars: &[char]) -> usize {
    let mut longest = usize::from(!chars.is_empty());
    let mut run = 1;
    let mut step = 0i64;
    for w in chars.windows(2) {
        let diff = i64::from(u32::from(w[1])) - i64::from(u32::from(w[0]));
        if diff.abs() != 1 {
            run = 1;
            step = 0;
            continue;
        }
        if diff == step {
            run += 1;
        } else {
            // direction change, the pair starts a new run
            run = 2;
            step = diff;
        }
        longest = longest.max(run);
    }
    longest
}

/// Length of the longest palindromic substring.
pub(crate) fn longest_palindrome(chars: &[char]) -> usize {
    let n = chars.len();
    let mut longest = 0;
    for center in 0..n {
        // odd length around `center`, even length between `center` and `center + 1`
        for (mut lo, mut hi) in [(center, center), (center, center + 1)] {
            while hi < n && chars[lo] == chars[hi] {
                longest = longest.max(hi - lo + 1);
                if lo == 0 {
                    break;
                }
                lo -= 1;
                hi += 1;
            }
        }
    }
    longest
}

/// Fails when a run of identical characters is longer than allowed.
pub fn repetition_section(ctx: &EvaluationContext, policy: &PolicyConfig) -> SectionResult {
    let max = policy.max_repeated_run();
    if max == 0 || longest_repeated_run(&chars_of(ctx)) <= max {
        return Vec::new();
    }
    vec![ViolationKind::ExcessiveRepeat]
}

/// Fails when an ascending or descending run is longer than allowed.
pub fn sequence_section(ctx: &EvaluationContext, policy: &PolicyConfig) -> SectionResult {
    let max = policy.max_sequential_run();
    if max == 0 || longest_sequential_run(&chars_of(ctx)) <= max {
        return Vec::new();
    }
    vec![ViolationKind::SequentialPattern]
}

/// Fails when the password contains a palindrome of the configured length
/// or longer.
pub fn palindrome_section(ctx: &EvaluationContext, policy: &PolicyConfig) -> SectionResult {
    let min = policy.min_palindrome_len();
    if min == 0 || longest_palindrome(&chars_of(ctx)) < min {
        return Vec::new();
    }
    vec![ViolationKind::Palindrome]
}
