//! Password policy evaluator - main evaluation logic.

use secrecy::ExposeSecret;

use crate::policy::{PolicyConfig, ScoreMode};
use crate::sections::{entropy_percent, estimate_entropy_bits, Rule, SECTIONS};
use crate::verdict::{EvaluationContext, Verdict};

/// Evaluates a password against a policy.
///
/// Every section runs, in order, and all violations are collected so the
/// caller can explain the full set of problems at once. The password is
/// rejected if any violation comes from a rule the policy does not mark as
/// advisory. With the policy's strong-password switch off only the length
/// rule runs.
///
/// Never fails: policy consistency is enforced when the policy is built,
/// and rule failures are data in the returned [`Verdict`].
pub fn evaluate(ctx: &EvaluationContext, policy: &PolicyConfig) -> Verdict {
    // Orchestrator: execute sections in sequence
    let violations: Vec<_> = SECTIONS
        .iter()
        .filter(|(rule, _)| policy.strong_password() || *rule == Rule::Length)
        .flat_map(|(_, section_fn)| section_fn(ctx, policy))
        .collect();

    let accepted = violations.iter().all(|v| policy.is_advisory(v.rule()));

    let entropy_bits = estimate_entropy_bits(ctx.password().expose_secret());
    let score = match policy.score_mode() {
        ScoreMode::Percent => entropy_percent(entropy_bits),
        ScoreMode::EntropyBits => entropy_bits,
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(
        accepted,
        violations = ?violations.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "password evaluated"
    );

    Verdict {
        accepted,
        score,
        violations,
        entropy_bits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blacklist::Blacklist;
    use crate::policy::{CharClass, PolicyBuilder, PolicyProfile};
    use crate::verdict::ViolationKind;
    use proptest::prelude::*;
    use pwd_types::PasswordStrength;
    use secrecy::SecretString;

    fn ctx(pwd: &str) -> EvaluationContext {
        EvaluationContext::new(SecretString::new(pwd.to_string().into()))
    }

    /// `{minLength: 8, upper: 1, lower: 1, digit: 1, maxRepeatedRun: 3}`
    fn basic_policy() -> PolicyConfig {
        PolicyConfig::builder()
            .length(8, 64)
            .require(CharClass::Uppercase, 1)
            .require(CharClass::Lowercase, 1)
            .require(CharClass::Digit, 1)
            .max_repeated_run(3)
            .build()
            .unwrap()
    }

    fn strict_policy() -> PolicyConfig {
        PolicyConfig::builder()
            .length(8, 64)
            .require(CharClass::Uppercase, 1)
            .require(CharClass::Lowercase, 1)
            .require(CharClass::Digit, 1)
            .require(CharClass::Symbol, 1)
            .max_repeated_run(2)
            .max_sequential_run(3)
            .min_palindrome_len(4)
            .blacklist(Blacklist::new(["password", "qwerty", "admin"]))
            .similarity_threshold(0.8)
            .min_entropy_bits(40.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_scenario_repeat_and_missing_upper() {
        let verdict = evaluate(&ctx("aaaa1234"), &basic_policy());
        assert!(!verdict.accepted);
        assert!(verdict.violations.contains(&ViolationKind::ExcessiveRepeat));
        assert!(verdict
            .violations
            .contains(&ViolationKind::MissingClass(CharClass::Uppercase)));
    }

    #[test]
    fn test_scenario_strong_password_accepted() {
        let verdict = evaluate(&ctx("Xk7mQ2pL"), &basic_policy());
        assert!(verdict.accepted);
        assert!(verdict.violations.is_empty());
    }

    #[test]
    fn test_scenario_blacklisted_substring() {
        let policy = PolicyConfig::builder()
            .blacklist(Blacklist::new(["password"]))
            .build()
            .unwrap();
        let verdict = evaluate(&ctx("MyPassword1!"), &policy);
        assert!(!verdict.accepted);
        assert_eq!(verdict.violations, vec![ViolationKind::Blacklisted]);
    }

    #[test]
    fn test_scenario_similar_to_account() {
        let policy = PolicyConfig::builder().similarity_threshold(0.8).build().unwrap();
        let verdict = evaluate(&ctx("jsmith123").with_hint("jsmith"), &policy);
        assert!(!verdict.accepted);
        assert!(verdict
            .violations
            .contains(&ViolationKind::TooSimilarToAccountInfo));
    }

    #[test]
    fn test_evaluate_empty_password() {
        let verdict = evaluate(&ctx(""), &strict_policy());
        assert!(!verdict.accepted);
        assert_eq!(verdict.violations[0], ViolationKind::TooShort);
        assert_eq!(verdict.score, 0.0);
        assert_eq!(verdict.strength(), PasswordStrength::WEAK);
    }

    #[test]
    fn test_evaluate_collects_in_rule_order() {
        let verdict = evaluate(&ctx("qwerty1234").with_hint("qwerty"), &strict_policy());
        assert_eq!(
            verdict.violations,
            vec![
                ViolationKind::MissingClass(CharClass::Uppercase),
                ViolationKind::MissingClass(CharClass::Symbol),
                ViolationKind::SequentialPattern,
                ViolationKind::Blacklisted,
                ViolationKind::TooSimilarToAccountInfo,
            ]
        );
    }

    #[test]
    fn test_evaluate_low_entropy() {
        let verdict = evaluate(&ctx("zq9x7w"), &strict_policy());
        assert!(verdict
            .violations
            .contains(&ViolationKind::InsufficientEntropy));
    }

    #[test]
    fn test_evaluate_strict_policy_accepts_good_password() {
        let verdict = evaluate(
            &ctx("Tr0ub4dor&3-Zebra").with_hint("jsmith"),
            &strict_policy(),
        );
        assert!(verdict.accepted, "unexpected {:?}", verdict.violations);
        assert!(verdict.score > 50.0 && verdict.score <= 100.0);
    }

    #[test]
    fn test_advisory_rules_do_not_reject() {
        let policy = PolicyConfig::builder()
            .min_entropy_bits(80.0)
            .advisory(Rule::Entropy)
            .build()
            .unwrap();
        let verdict = evaluate(&ctx("Xk7mQ2pL"), &policy);
        assert!(verdict.accepted);
        assert_eq!(verdict.violations, vec![ViolationKind::InsufficientEntropy]);
    }

    #[test]
    fn test_strong_password_off_checks_length_only() {
        let policy = PolicyBuilder::from_profile(PolicyProfile::Server)
            .strong_password(false)
            .blacklist(Blacklist::new(["password"]))
            .build()
            .unwrap();
        let verdict = evaluate(&ctx("password"), &policy);
        assert!(verdict.accepted, "unexpected {:?}", verdict.violations);

        let verdict = evaluate(&ctx("pass wörd"), &policy);
        assert!(verdict.accepted);

        let verdict = evaluate(&ctx("aaa"), &policy);
        assert_eq!(verdict.violations, vec![ViolationKind::TooShort]);
    }

    #[test]
    fn test_stock_profile_rejects_characters_outside_sets() {
        let policy = PolicyBuilder::from_profile(PolicyProfile::Server).build().unwrap();
        let verdict = evaluate(&ctx("Grüße 2024!"), &policy);
        assert!(!verdict.accepted);
        assert_eq!(verdict.violations, vec![ViolationKind::InvalidCharacter]);

        assert!(evaluate(&ctx("Xk7mQ2pL-Gruen!"), &policy).accepted);
    }

    #[test]
    fn test_score_modes() {
        let bits_policy = PolicyConfig::builder()
            .score_mode(ScoreMode::EntropyBits)
            .build()
            .unwrap();
        let percent_policy = PolicyConfig::builder().build().unwrap();

        let bits = evaluate(&ctx("Xk7mQ2pL"), &bits_policy);
        let percent = evaluate(&ctx("Xk7mQ2pL"), &percent_policy);

        assert!((bits.score - 8.0 * 62f64.log2()).abs() < 1e-9);
        assert!((percent.score - bits.score / 128.0 * 100.0).abs() < 1e-9);
        assert_eq!(bits.entropy_bits(), percent.entropy_bits());
    }

    #[test]
    fn test_evaluate_score_boundaries() {
        let policy = PolicyConfig::builder().length(1, 1024).build().unwrap();
        let long = "Aa1!".repeat(100);
        for pwd in ["", "a", "password", "MyPass123!", "VeryStrongPassword123!@#", long.as_str()] {
            let verdict = evaluate(&ctx(pwd), &policy);
            assert!(
                (0.0..=100.0).contains(&verdict.score),
                "Score {} out of bounds",
                verdict.score
            );
        }
    }

    fn password_strategy() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-zA-Z0-9!@#$%]{0,24}").expect("valid regex")
    }

    proptest! {
        #[test]
        fn prop_short_passwords_rejected(pwd in prop::string::string_regex("[a-z0-9]{0,7}").expect("valid regex")) {
            let verdict = evaluate(&ctx(&pwd), &basic_policy());
            prop_assert!(!verdict.accepted);
            prop_assert!(verdict.violations.contains(&ViolationKind::TooShort));
        }

        #[test]
        fn prop_evaluation_is_idempotent(pwd in password_strategy(), hint in "[a-z]{0,8}") {
            let policy = strict_policy();
            let first = evaluate(&ctx(&pwd).with_hint(hint.clone()), &policy);
            let second = evaluate(&ctx(&pwd).with_hint(hint), &policy);
            prop_assert_eq!(first.score.to_bits(), second.score.to_bits());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_accepted_iff_no_violations(pwd in password_strategy()) {
            let verdict = evaluate(&ctx(&pwd), &strict_policy());
            prop_assert_eq!(verdict.accepted, verdict.violations.is_empty());
        }

        #[test]
        fn prop_adding_missing_class_never_adds_class_violations(pwd in password_strategy()) {
            let policy = strict_policy();
            let count = |v: &Verdict| {
                v.violations
                    .iter()
                    .filter(|k| k.rule() == Rule::CharacterClass)
                    .count()
            };
            let before = evaluate(&ctx(&pwd), &policy);
            for (class, extra) in [
                (CharClass::Uppercase, 'Q'),
                (CharClass::Lowercase, 'q'),
                (CharClass::Digit, '7'),
                (CharClass::Symbol, '~'),
            ] {
                if before.violations.contains(&ViolationKind::MissingClass(class)) {
                    let after = evaluate(&ctx(&format!("{pwd}{extra}")), &policy);
                    prop_assert!(count(&after) <= count(&before));
                    prop_assert!(!after.violations.contains(&ViolationKind::MissingClass(class)));
                }
            }
        }
    }
}
