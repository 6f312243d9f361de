//! Password evaluation sections
//!
//! Each section checks one rule of the policy. Sections are pure: they read
//! the password and context, never log or retain them, and report nothing
//! when the policy leaves their threshold at zero.

use serde::{Deserialize, Serialize};

use crate::policy::PolicyConfig;
use crate::verdict::{EvaluationContext, ViolationKind};

mod blacklist;
mod entropy;
mod length;
mod pattern;
mod similarity;
mod variety;

pub use blacklist::blacklist_section;
pub use entropy::{entropy_percent, entropy_section, estimate_entropy_bits};
pub use length::length_section;
pub use pattern::{palindrome_section, repetition_section, sequence_section};
pub use similarity::{account_similarity, similarity_section};
pub use variety::{character_class_section, first_letter_section};

/// Violations reported by a section; empty when the section passed.
pub type SectionResult = Vec<ViolationKind>;

pub type SectionFn = fn(&EvaluationContext, &PolicyConfig) -> SectionResult;

/// Identifies a section, e.g. to mark it advisory in a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Length,
    CharacterClass,
    FirstLetter,
    Repetition,
    Sequence,
    Palindrome,
    Blacklist,
    Similarity,
    Entropy,
}

/// Sections in evaluation order.
pub const SECTIONS: [(Rule, SectionFn); 9] = [
    (Rule::Length, length_section),
    (Rule::CharacterClass, character_class_section),
    (Rule::FirstLetter, first_letter_section),
    (Rule::Repetition, repetition_section),
    (Rule::Sequence, sequence_section),
    (Rule::Palindrome, palindrome_section),
    (Rule::Blacklist, blacklist_section),
    (Rule::Similarity, similarity_section),
    (Rule::Entropy, entropy_section),
];

#[cfg(test)]
pub(crate) fn context(password: &str) -> EvaluationContext {
    EvaluationContext::new(secrecy::SecretString::new(password.to_string().into()))
}
