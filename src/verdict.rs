//! Evaluation input and output types.

use std::fmt;
use std::str::FromStr;

use pwd_types::{PasswordEvaluation, PasswordScore, PasswordStrength};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::CharClass;
use crate::sections::{entropy_percent, Rule};

/// Per-call input: the candidate password and any account-identifying
/// strings it should not resemble.
#[derive(Debug)]
pub struct EvaluationContext {
    password: SecretString,
    account_hints: Vec<String>,
}

impl EvaluationContext {
    pub fn new(password: SecretString) -> Self {
        Self {
            password,
            account_hints: Vec::new(),
        }
    }

    /// Adds a username, display name or similar. Blank hints are ignored.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        let hint = hint.into();
        if !hint.trim().is_empty() {
            self.account_hints.push(hint);
        }
        self
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    pub fn account_hints(&self) -> &[String] {
        &self.account_hints
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown violation token: {0}")]
pub struct UnknownViolation(pub String);

/// One specific rule failure. Serializes to a stable string token so
/// callers can map it to a localized message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ViolationKind {
    TooShort,
    TooLong,
    InvalidCharacter,
    MissingClass(CharClass),
    TooFewClasses,
    FirstLetterNotUppercase,
    ExcessiveRepeat,
    SequentialPattern,
    Palindrome,
    Blacklisted,
    TooSimilarToAccountInfo,
    InsufficientEntropy,
}

impl ViolationKind {
    /// The rule that reports this violation.
    pub fn rule(self) -> Rule {
        match self {
            ViolationKind::TooShort | ViolationKind::TooLong => Rule::Length,
            ViolationKind::InvalidCharacter
            | ViolationKind::MissingClass(_)
            | ViolationKind::TooFewClasses => Rule::CharacterClass,
            ViolationKind::FirstLetterNotUppercase => Rule::FirstLetter,
            ViolationKind::ExcessiveRepeat => Rule::Repetition,
            ViolationKind::SequentialPattern => Rule::Sequence,
            ViolationKind::Palindrome => Rule::Palindrome,
            ViolationKind::Blacklisted => Rule::Blacklist,
            ViolationKind::TooSimilarToAccountInfo => Rule::Similarity,
            ViolationKind::InsufficientEntropy => Rule::Entropy,
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::TooShort => f.write_str("too_short"),
            ViolationKind::TooLong => f.write_str("too_long"),
            ViolationKind::InvalidCharacter => f.write_str("invalid_character"),
            ViolationKind::MissingClass(class) => write!(f, "missing_class:{}", class),
            ViolationKind::TooFewClasses => f.write_str("too_few_classes"),
            ViolationKind::FirstLetterNotUppercase => f.write_str("first_letter_not_uppercase"),
            ViolationKind::ExcessiveRepeat => f.write_str("excessive_repeat"),
            ViolationKind::SequentialPattern => f.write_str("sequential_pattern"),
            ViolationKind::Palindrome => f.write_str("palindrome"),
            ViolationKind::Blacklisted => f.write_str("blacklisted"),
            ViolationKind::TooSimilarToAccountInfo => f.write_str("too_similar_to_account_info"),
            ViolationKind::InsufficientEntropy => f.write_str("insufficient_entropy"),
        }
    }
}

impl FromStr for ViolationKind {
    type Err = UnknownViolation;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        if let Some(class) = token.strip_prefix("missing_class:") {
            return CharClass::from_name(class)
                .map(ViolationKind::MissingClass)
                .ok_or_else(|| UnknownViolation(token.to_string()));
        }
        let kind = match token {
            "too_short" => ViolationKind::TooShort,
            "too_long" => ViolationKind::TooLong,
            "invalid_character" => ViolationKind::InvalidCharacter,
            "too_few_classes" => ViolationKind::TooFewClasses,
            "first_letter_not_uppercase" => ViolationKind::FirstLetterNotUppercase,
            "excessive_repeat" => ViolationKind::ExcessiveRepeat,
            "sequential_pattern" => ViolationKind::SequentialPattern,
            "palindrome" => ViolationKind::Palindrome,
            "blacklisted" => ViolationKind::Blacklisted,
            "too_similar_to_account_info" => ViolationKind::TooSimilarToAccountInfo,
            "insufficient_entropy" => ViolationKind::InsufficientEntropy,
            other => return Err(UnknownViolation(other.to_string())),
        };
        Ok(kind)
    }
}

impl From<ViolationKind> for String {
    fn from(kind: ViolationKind) -> Self {
        kind.to_string()
    }
}

impl TryFrom<String> for ViolationKind {
    type Error = UnknownViolation;

    fn try_from(token: String) -> Result<Self, Self::Error> {
        token.parse()
    }
}

/// Result of one evaluation. Built fresh per call and never retained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub accepted: bool,
    /// Percent (0..=100) or entropy bits, depending on the policy's score mode.
    pub score: f64,
    /// In rule order.
    pub violations: Vec<ViolationKind>,
    #[serde(skip)]
    pub(crate) entropy_bits: f64,
}

impl Verdict {
    /// Heuristic entropy estimate behind the score.
    pub fn entropy_bits(&self) -> f64 {
        self.entropy_bits
    }

    /// Coarse strength bucket for UIs.
    pub fn strength(&self) -> PasswordStrength {
        PasswordEvaluation::from(self).strength()
    }
}

/// Maps a verdict onto the shared evaluation type. The entropy percentage
/// is the base score and each violation of a rejected verdict costs 10 points.
impl From<&Verdict> for PasswordEvaluation {
    fn from(verdict: &Verdict) -> Self {
        let penalty = if verdict.accepted {
            0
        } else {
            verdict.violations.len() as i64 * 10
        };
        let score = (entropy_percent(verdict.entropy_bits).floor() as i64 - penalty).max(0);

        PasswordEvaluation {
            score: Some(PasswordScore::new(score)),
            reasons: verdict.violations.iter().map(ToString::to_string).collect(),
        }
    }
}
