//! Similarity section - rejects passwords that resemble the account they
//! belong to.

use secrecy::ExposeSecret;

use super::SectionResult;
use crate::policy::PolicyConfig;
use crate::verdict::{EvaluationContext, ViolationKind};

/// Hints shorter than this are only compared against the whole password,
/// never against password windows.
const MIN_WINDOW_HINT_LEN: usize = 3;

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// `1 - distance / max(len)`; two empty strings are identical.
fn ratio(a: &[char], b: &[char]) -> f64 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

/// Edit distance of `a` and `b` if it is at most `max`, else `None`.
///
/// Only the diagonal band `|i - j| <= max` of the table is filled and the
/// scan stops as soon as a whole row exceeds `max`, so the cost is
/// `O(len × max)` instead of `O(len²)`.
fn bounded_levenshtein(a: &[char], b: &[char], max: usize) -> Option<usize> {
    if a.len().abs_diff(b.len()) > max {
        return None;
    }
    let out = max + 1;
    let mut prev: Vec<usize> = (0..=b.len()).map(|j| j.min(out)).collect();
    let mut curr = vec![out; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        let row = i + 1;
        let lo = row.saturating_sub(max).max(1);
        let hi = (row + max).min(b.len());

        let mut row_min = out;
        if lo == 1 {
            curr[0] = row.min(out);
            row_min = curr[0];
        } else {
            curr[lo - 1] = out;
        }
        for j in lo..=hi {
            let substitution = prev[j - 1] + usize::from(*ca != b[j - 1]);
            curr[j] = substitution.min(prev[j] + 1).min(curr[j - 1] + 1).min(out);
            row_min = row_min.min(curr[j]);
        }
        if hi < b.len() {
            curr[hi + 1] = out;
        }
        if row_min > max {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    Some(prev[b.len()]).filter(|d| *d <= max)
}

/// Normalized similarity of `password` to `hint` in `0.0..=1.0`, higher
/// meaning more similar. Both are case-folded.
///
/// The password is the base string: besides the whole password, every
/// window of the hint's length is compared too, so a hint embedded in a
/// longer password scores 1.0. Not symmetric.
pub fn account_similarity(password: &str, hint: &str) -> f64 {
    let pwd: Vec<char> = password.to_lowercase().chars().collect();
    let hint: Vec<char> = hint.trim().to_lowercase().chars().collect();

    let mut best = ratio(&pwd, &hint);
    if hint.len() >= MIN_WINDOW_HINT_LEN && pwd.len() > hint.len() {
        for window in pwd.windows(hint.len()) {
            best = best.max(ratio(window, &hint));
            if best >= 1.0 {
                break;
            }
        }
    }
    best
}

/// Same comparison as [`account_similarity`], answering only whether the
/// similarity exceeds `threshold`. Distances that cannot get above the
/// threshold are abandoned early.
fn exceeds_similarity(pwd: &[char], hint: &[char], threshold: f64) -> bool {
    let close = |candidate: &[char]| {
        let longest = candidate.len().max(hint.len());
        if longest == 0 {
            return 1.0 > threshold;
        }
        let max = ((1.0 - threshold) * longest as f64).ceil() as usize;
        bounded_levenshtein(candidate, hint, max)
            .is_some_and(|d| 1.0 - d as f64 / longest as f64 > threshold)
    };

    close(pwd)
        || (hint.len() >= MIN_WINDOW_HINT_LEN
            && pwd.len() > hint.len()
            && pwd.windows(hint.len()).any(close))
}

/// Fails when the password is more similar than allowed to any account hint.
/// Passes vacuously without hints.
///
/// Only the first `max_length` characters are compared; anything longer is
/// already a length violation.
pub fn similarity_section(ctx: &EvaluationContext, policy: &PolicyConfig) -> SectionResult {
    let threshold = policy.similarity_threshold();
    if threshold >= 1.0 || ctx.account_hints().is_empty() {
        return Vec::new();
    }
    let pwd: Vec<char> = ctx
        .password()
        .expose_secret()
        .to_lowercase()
        .chars()
        .take(policy.max_length())
        .collect();
    let too_similar = ctx.account_hints().iter().any(|hint| {
        let hint: Vec<char> = hint.trim().to_lowercase().chars().collect();
        exceeds_similarity(&pwd, &hint, threshold)
    });
    if too_similar {
        return vec![ViolationKind::TooSimilarToAccountInfo];
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::context;

    fn policy(threshold: f64) -> PolicyConfig {
        PolicyConfig::builder()
            .similarity_threshold(threshold)
            .build()
            .unwrap()
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein(&chars("kitten"), &chars("sitting")), 3);
        assert_eq!(levenshtein(&chars(""), &chars("abc")), 3);
        assert_eq!(levenshtein(&chars("flaw"), &chars("lawn")), 2);
        assert_eq!(levenshtein(&chars("same"), &chars("same")), 0);
    }

    #[test]
    fn test_bounded_levenshtein() {
        assert_eq!(bounded_levenshtein(&chars("kitten"), &chars("sitting"), 3), Some(3));
        assert_eq!(bounded_levenshtein(&chars("kitten"), &chars("sitting"), 2), None);
        assert_eq!(bounded_levenshtein(&chars("flaw"), &chars("lawn"), 5), Some(2));
        assert_eq!(bounded_levenshtein(&chars(""), &chars("abc"), 3), Some(3));
        assert_eq!(bounded_levenshtein(&chars("abc"), &chars(""), 2), None);
        assert_eq!(bounded_levenshtein(&chars("same"), &chars("same"), 0), Some(0));
    }

    #[test]
    fn test_bounded_agrees_with_full_table() {
        let words = ["jsmith", "jsmith123", "smith", "xk7mq2pl", "", "abcabcabc", "cba"];
        for a in words {
            for b in words {
                let (a, b) = (chars(a), chars(b));
                let full = levenshtein(&a, &b);
                for max in 0..12 {
                    let expected = (full <= max).then_some(full);
                    assert_eq!(bounded_levenshtein(&a, &b, max), expected);
                }
            }
        }
    }

    #[test]
    fn test_exceeds_matches_account_similarity() {
        let pairs = [
            ("jsmith123", "jsmith"),
            ("johnsmith99", "john smith"),
            ("xk7mq2pl", "jsmith"),
            ("totally-unrelated", "al"),
            ("smith", "jsmith"),
        ];
        for (pwd, hint) in pairs {
            for threshold in [0.0, 0.3, 0.5, 0.7, 0.8, 0.9] {
                assert_eq!(
                    exceeds_similarity(&chars(pwd), &chars(hint), threshold),
                    account_similarity(pwd, hint) > threshold,
                    "{} vs {} at {}",
                    pwd,
                    hint,
                    threshold
                );
            }
        }
    }

    #[test]
    fn test_similarity_section_long_password_stays_fast() {
        let pwd: String = (0..4096).map(|i| char::from(b'a' + (i * 7 % 26) as u8)).collect();
        let hint: String = (0..256).map(|i| char::from(b'a' + (i * 11 % 26) as u8)).collect();
        let ctx = context(&pwd).with_hint(hint.clone()).with_hint(hint);

        let start = std::time::Instant::now();
        let _ = similarity_section(&ctx, &policy(0.8));
        assert!(start.elapsed() < std::time::Duration::from_millis(500));
    }

    #[test]
    fn test_similarity_section_ignores_text_past_max_length() {
        let policy = PolicyConfig::builder()
            .length(1, 8)
            .similarity_threshold(0.8)
            .build()
            .unwrap();
        let ctx = context("Xk7mQ2pLjsmith").with_hint("jsmith");
        assert!(similarity_section(&ctx, &policy).is_empty());
        let ctx = context("jsmithXk7mQ2pL").with_hint("jsmith");
        assert_eq!(
            similarity_section(&ctx, &policy),
            vec![ViolationKind::TooSimilarToAccountInfo]
        );
    }

    #[test]
    fn test_similarity_to_self_is_maximal() {
        assert_eq!(account_similarity("jsmith", "jsmith"), 1.0);
        assert_eq!(account_similarity("JSmith", "jsmith"), 1.0);
        assert_eq!(account_similarity("", ""), 1.0);
    }

    #[test]
    fn test_similarity_embedded_hint() {
        assert_eq!(account_similarity("jsmith123", "jsmith"), 1.0);
        assert_eq!(account_similarity("123JSMITH!", "jsmith"), 1.0);
    }

    #[test]
    fn test_similarity_unrelated() {
        assert!(account_similarity("Xk7mQ2pL", "jsmith") < 0.5);
    }

    #[test]
    fn test_short_hint_only_compared_whole() {
        // "al" appears inside, but two-letter hints are not windowed
        assert!(account_similarity("totally-unrelated", "al") < 0.2);
    }

    #[test]
    fn test_similarity_section_flags_username() {
        let ctx = context("jsmith123").with_hint("jsmith");
        assert_eq!(
            similarity_section(&ctx, &policy(0.8)),
            vec![ViolationKind::TooSimilarToAccountInfo]
        );
    }

    #[test]
    fn test_similarity_section_any_hint() {
        let ctx = context("JohnSmith99")
            .with_hint("jsmith")
            .with_hint("John Smith");
        assert_eq!(
            similarity_section(&ctx, &policy(0.7)),
            vec![ViolationKind::TooSimilarToAccountInfo]
        );
    }

    #[test]
    fn test_similarity_section_without_hints() {
        let ctx = context("jsmith123");
        assert!(similarity_section(&ctx, &policy(0.0)).is_empty());
    }

    #[test]
    fn test_similarity_section_disabled_at_one() {
        let ctx = context("jsmith").with_hint("jsmith");
        assert!(similarity_section(&ctx, &policy(1.0)).is_empty());
    }
}
