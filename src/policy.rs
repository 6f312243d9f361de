//! Password policy - validated, read-only thresholds shared by every evaluation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blacklist::Blacklist;
use crate::sections::Rule;

/// Longest password accepted by the stock profiles.
pub const DEFAULT_MAX_LENGTH: usize = 511;

/// Character sets of the stock profiles, as `digits;lowercase;uppercase;symbols`.
pub const DEFAULT_CHARACTER_POLICY: &str = "1234567890;abcdefghijklmnopqrstuvwxyz;\
    ABCDEFGHIJKLMNOPQRSTUVWXYZ;!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~/";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("minimum length must be at least 1")]
    ZeroMinLength,
    #[error("maximum length {max} is below minimum length {min}")]
    InvertedLengthBounds { min: usize, max: usize },
    #[error("at most 4 distinct character classes can be required, got {0}")]
    TooManyClassKinds(usize),
    #[error("similarity threshold must be within 0.0..=1.0, got {0}")]
    InvalidSimilarityThreshold(f64),
    #[error("minimum entropy must be a non-negative number of bits, got {0}")]
    InvalidEntropy(f64),
    #[error("invalid character policy: {0}")]
    InvalidCharacterPolicy(String),
}

/// The four character classes a password is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharClass {
    Lowercase,
    Uppercase,
    Digit,
    Symbol,
}

impl CharClass {
    pub const ALL: [CharClass; 4] = [
        CharClass::Lowercase,
        CharClass::Uppercase,
        CharClass::Digit,
        CharClass::Symbol,
    ];

    /// Classifies a character. Anything that is neither cased nor an ASCII
    /// digit counts as a symbol.
    pub fn of(c: char) -> Self {
        if c.is_uppercase() {
            CharClass::Uppercase
        } else if c.is_lowercase() {
            CharClass::Lowercase
        } else if c.is_ascii_digit() {
            CharClass::Digit
        } else {
            CharClass::Symbol
        }
    }

    /// Symbols a class contributes to the effective alphabet of the entropy estimate.
    pub fn alphabet_size(self) -> u32 {
        match self {
            CharClass::Lowercase | CharClass::Uppercase => 26,
            CharClass::Digit => 10,
            CharClass::Symbol => 32,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CharClass::Lowercase => "lowercase",
            CharClass::Uppercase => "uppercase",
            CharClass::Digit => "digit",
            CharClass::Symbol => "symbol",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        CharClass::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The characters a password may be built from, one set per class.
///
/// Parsed from `digits;lowercase;uppercase;symbols`. Everything after the
/// third `;` is the symbol set, so the symbol set may contain `;` itself.
/// Characters outside every set are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterSets {
    classes: BTreeMap<char, CharClass>,
    sizes: BTreeMap<CharClass, usize>,
}

impl CharacterSets {
    const ORDER: [CharClass; 4] = [
        CharClass::Digit,
        CharClass::Lowercase,
        CharClass::Uppercase,
        CharClass::Symbol,
    ];

    /// Class of `c`, `None` when `c` is in no set.
    pub fn classify(&self, c: char) -> Option<CharClass> {
        self.classes.get(&c).copied()
    }

    /// Number of distinct characters in the set of `class`.
    pub fn size(&self, class: CharClass) -> usize {
        self.sizes.get(&class).copied().unwrap_or(0)
    }
}

impl FromStr for CharacterSets {
    type Err = PolicyError;

    fn from_str(policy: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = policy.splitn(Self::ORDER.len(), ';').collect();
        if parts.len() != Self::ORDER.len() {
            return Err(PolicyError::InvalidCharacterPolicy(format!(
                "expected {} `;`-separated sets, got {}",
                Self::ORDER.len(),
                parts.len()
            )));
        }

        let mut classes = BTreeMap::new();
        let mut sizes = BTreeMap::new();
        for (class, set) in Self::ORDER.into_iter().zip(parts) {
            if set.is_empty() {
                return Err(PolicyError::InvalidCharacterPolicy(format!(
                    "the {} set is empty",
                    class
                )));
            }
            for c in set.chars() {
                match classes.insert(c, class) {
                    Some(other) if other != class => {
                        return Err(PolicyError::InvalidCharacterPolicy(format!(
                            "{:?} is in both the {} and the {} set",
                            c, other, class
                        )));
                    }
                    Some(_) => {}
                    None => *sizes.entry(class).or_insert(0) += 1,
                }
            }
        }
        Ok(Self { classes, sizes })
    }
}

/// How `Verdict::score` is expressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    /// Entropy estimate mapped onto 0..=100.
    #[default]
    Percent,
    /// Raw entropy estimate in bits.
    EntropyBits,
}

/// Stock policies matching the defaults shipped per OS edition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyProfile {
    Professional,
    Server,
    Euler,
}

/// Immutable password policy.
///
/// Only obtainable through [`PolicyBuilder::build`] or
/// `PolicyConfig::try_from(PolicySettings)`, so every instance in circulation
/// is known to be consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    strong_password: bool,
    min_length: usize,
    max_length: usize,
    character_sets: Option<CharacterSets>,
    required_classes: BTreeMap<CharClass, usize>,
    required_class_kinds: usize,
    first_letter_uppercase: bool,
    max_repeated_run: usize,
    max_sequential_run: usize,
    min_palindrome_len: usize,
    blacklist: Blacklist,
    similarity_threshold: f64,
    min_entropy_bits: f64,
    score_mode: ScoreMode,
    advisory_rules: BTreeSet<Rule>,
}

impl PolicyConfig {
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    /// Master switch: when off, only the length bounds are enforced.
    pub fn strong_password(&self) -> bool {
        self.strong_password
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn character_sets(&self) -> Option<&CharacterSets> {
        self.character_sets.as_ref()
    }

    /// Class of `c` under this policy. Without configured character sets
    /// every character has a class; with them, characters outside every
    /// set yield `None`.
    pub fn classify(&self, c: char) -> Option<CharClass> {
        match &self.character_sets {
            Some(sets) => sets.classify(c),
            None => Some(CharClass::of(c)),
        }
    }

    /// Minimum count for `class`; 0 when the class is not required.
    pub fn required_count(&self, class: CharClass) -> usize {
        self.required_classes.get(&class).copied().unwrap_or(0)
    }

    pub fn required_classes(&self) -> impl Iterator<Item = (CharClass, usize)> + '_ {
        self.required_classes.iter().map(|(c, n)| (*c, *n))
    }

    pub fn required_class_kinds(&self) -> usize {
        self.required_class_kinds
    }

    pub fn first_letter_uppercase(&self) -> bool {
        self.first_letter_uppercase
    }

    pub fn max_repeated_run(&self) -> usize {
        self.max_repeated_run
    }

    pub fn max_sequential_run(&self) -> usize {
        self.max_sequential_run
    }

    pub fn min_palindrome_len(&self) -> usize {
        self.min_palindrome_len
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    pub fn min_entropy_bits(&self) -> f64 {
        self.min_entropy_bits
    }

    pub fn score_mode(&self) -> ScoreMode {
        self.score_mode
    }

    /// Whether violations of `rule` are reported without rejecting.
    pub fn is_advisory(&self, rule: Rule) -> bool {
        self.advisory_rules.contains(&rule)
    }
}

/// Builder for [`PolicyConfig`].
///
/// Defaults are permissive: length 1..=511, any character allowed and every
/// optional rule disabled.
#[derive(Debug, Clone)]
pub struct PolicyBuilder {
    strong_password: bool,
    min_length: usize,
    max_length: usize,
    character_policy: Option<String>,
    required_classes: BTreeMap<CharClass, usize>,
    required_class_kinds: usize,
    first_letter_uppercase: bool,
    max_repeated_run: usize,
    max_sequential_run: usize,
    min_palindrome_len: usize,
    blacklist: Blacklist,
    similarity_threshold: f64,
    min_entropy_bits: f64,
    score_mode: ScoreMode,
    advisory_rules: BTreeSet<Rule>,
}

impl Default for PolicyBuilder {
    fn default() -> Self {
        Self {
            strong_password: true,
            min_length: 1,
            max_length: DEFAULT_MAX_LENGTH,
            character_policy: None,
            required_classes: BTreeMap::new(),
            required_class_kinds: 0,
            first_letter_uppercase: false,
            max_repeated_run: 0,
            max_sequential_run: 0,
            min_palindrome_len: 0,
            blacklist: Blacklist::default(),
            similarity_threshold: 1.0,
            min_entropy_bits: 0.0,
            score_mode: ScoreMode::default(),
            advisory_rules: BTreeSet::new(),
        }
    }
}

impl PolicyBuilder {
    /// Starts from one of the stock profiles.
    pub fn from_profile(profile: PolicyProfile) -> Self {
        let base = Self::default().character_policy(DEFAULT_CHARACTER_POLICY);
        match profile {
            PolicyProfile::Professional => base.length(1, DEFAULT_MAX_LENGTH).required_class_kinds(1),
            PolicyProfile::Server => base
                .length(8, DEFAULT_MAX_LENGTH)
                .required_class_kinds(3)
                .min_palindrome_len(4)
                .max_repeated_run(3)
                .max_sequential_run(3),
            PolicyProfile::Euler => Self::from_profile(PolicyProfile::Server).length(8, 510),
        }
    }

    pub fn strong_password(mut self, enabled: bool) -> Self {
        self.strong_password = enabled;
        self
    }

    /// Restricts passwords to the given `digits;lowercase;uppercase;symbols`
    /// sets. Checked by [`build`](Self::build).
    pub fn character_policy(mut self, policy: impl Into<String>) -> Self {
        self.character_policy = Some(policy.into());
        self
    }

    /// Lifts any character restriction; classes follow Unicode case.
    pub fn any_character(mut self) -> Self {
        self.character_policy = None;
        self
    }

    pub fn length(mut self, min: usize, max: usize) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn require(mut self, class: CharClass, count: usize) -> Self {
        if count == 0 {
            self.required_classes.remove(&class);
        } else {
            self.required_classes.insert(class, count);
        }
        self
    }

    pub fn required_class_kinds(mut self, kinds: usize) -> Self {
        self.required_class_kinds = kinds;
        self
    }

    pub fn first_letter_uppercase(mut self, enabled: bool) -> Self {
        self.first_letter_uppercase = enabled;
        self
    }

    pub fn max_repeated_run(mut self, run: usize) -> Self {
        self.max_repeated_run = run;
        self
    }

    pub fn max_sequential_run(mut self, run: usize) -> Self {
        self.max_sequential_run = run;
        self
    }

    pub fn min_palindrome_len(mut self, len: usize) -> Self {
        self.min_palindrome_len = len;
        self
    }

    pub fn blacklist(mut self, blacklist: Blacklist) -> Self {
        self.blacklist = blacklist;
        self
    }

    pub fn similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn min_entropy_bits(mut self, bits: f64) -> Self {
        self.min_entropy_bits = bits;
        self
    }

    pub fn score_mode(mut self, mode: ScoreMode) -> Self {
        self.score_mode = mode;
        self
    }

    pub fn advisory(mut self, rule: Rule) -> Self {
        self.advisory_rules.insert(rule);
        self
    }

    /// Validates and freezes the policy.
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyError`] for inverted length bounds, a zero minimum
    /// length, more than four required class kinds, a malformed character
    /// policy, or thresholds that are negative, NaN or out of range.
    pub fn build(self) -> Result<PolicyConfig, PolicyError> {
        let result = self.validate().and_then(|()| {
            self.character_policy
                .as_deref()
                .map(str::parse::<CharacterSets>)
                .transpose()
        });

        #[cfg(feature = "tracing")]
        {
            if let Err(e) = &result {
                tracing::error!("Rejecting password policy: {}", e);
            }
        }

        let character_sets = result?;

        Ok(PolicyConfig {
            strong_password: self.strong_password,
            min_length: self.min_length,
            max_length: self.max_length,
            character_sets,
            required_classes: self.required_classes,
            required_class_kinds: self.required_class_kinds,
            first_letter_uppercase: self.first_letter_uppercase,
            max_repeated_run: self.max_repeated_run,
            max_sequential_run: self.max_sequential_run,
            min_palindrome_len: self.min_palindrome_len,
            blacklist: self.blacklist,
            similarity_threshold: self.similarity_threshold,
            min_entropy_bits: self.min_entropy_bits,
            score_mode: self.score_mode,
            advisory_rules: self.advisory_rules,
        })
    }

    fn validate(&self) -> Result<(), PolicyError> {
        if self.min_length == 0 {
            return Err(PolicyError::ZeroMinLength);
        }
        if self.max_length < self.min_length {
            return Err(PolicyError::InvertedLengthBounds {
                min: self.min_length,
                max: self.max_length,
            });
        }
        if self.required_class_kinds > CharClass::ALL.len() {
            return Err(PolicyError::TooManyClassKinds(self.required_class_kinds));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(PolicyError::InvalidSimilarityThreshold(self.similarity_threshold));
        }
        if !(self.min_entropy_bits >= 0.0 && self.min_entropy_bits.is_finite()) {
            return Err(PolicyError::InvalidEntropy(self.min_entropy_bits));
        }
        Ok(())
    }
}

/// Plain, deserializable form of a policy as a host would read it from its
/// own configuration source. Convert with `PolicyConfig::try_from`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicySettings {
    pub profile: Option<PolicyProfile>,
    pub strong_password: Option<bool>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// `digits;lowercase;uppercase;symbols`; an empty string allows any character.
    pub character_policy: Option<String>,
    pub required_classes: BTreeMap<CharClass, usize>,
    pub required_class_kinds: Option<usize>,
    pub first_letter_uppercase: Option<bool>,
    pub max_repeated_run: Option<usize>,
    pub max_sequential_run: Option<usize>,
    pub min_palindrome_len: Option<usize>,
    pub blacklist: Vec<String>,
    pub similarity_threshold: Option<f64>,
    pub min_entropy_bits: Option<f64>,
    pub score_mode: ScoreMode,
    pub advisory_rules: Vec<Rule>,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            profile: None,
            strong_password: None,
            min_length: None,
            max_length: None,
            character_policy: None,
            required_classes: BTreeMap::new(),
            required_class_kinds: None,
            first_letter_uppercase: None,
            max_repeated_run: None,
            max_sequential_run: None,
            min_palindrome_len: None,
            blacklist: Vec::new(),
            similarity_threshold: None,
            min_entropy_bits: None,
            score_mode: ScoreMode::default(),
            advisory_rules: Vec::new(),
        }
    }
}

impl TryFrom<PolicySettings> for PolicyConfig {
    type Error = PolicyError;

    /// Unset fields fall back to the profile (or the builder defaults).
    fn try_from(settings: PolicySettings) -> Result<Self, Self::Error> {
        let mut builder = settings
            .profile
            .map(PolicyBuilder::from_profile)
            .unwrap_or_default();

        let min = settings.min_length.unwrap_or(builder.min_length);
        let max = settings.max_length.unwrap_or(builder.max_length);
        builder = builder.length(min, max);

        if let Some(enabled) = settings.strong_password {
            builder = builder.strong_password(enabled);
        }
        match settings.character_policy.as_deref() {
            Some("") => builder = builder.any_character(),
            Some(policy) => builder = builder.character_policy(policy),
            None => {}
        }
        for (class, count) in settings.required_classes {
            builder = builder.require(class, count);
        }
        if let Some(kinds) = settings.required_class_kinds {
            builder = builder.required_class_kinds(kinds);
        }
        if let Some(enabled) = settings.first_letter_uppercase {
            builder = builder.first_letter_uppercase(enabled);
        }
        if let Some(run) = settings.max_repeated_run {
            builder = builder.max_repeated_run(run);
        }
        if let Some(run) = settings.max_sequential_run {
            builder = builder.max_sequential_run(run);
        }
        if let Some(len) = settings.min_palindrome_len {
            builder = builder.min_palindrome_len(len);
        }
        if !settings.blacklist.is_empty() {
            builder = builder.blacklist(Blacklist::new(settings.blacklist));
        }
        if let Some(threshold) = settings.similarity_threshold {
            builder = builder.similarity_threshold(threshold);
        }
        if let Some(bits) = settings.min_entropy_bits {
            builder = builder.min_entropy_bits(bits);
        }
        builder = builder.score_mode(settings.score_mode);
        for rule in settings.advisory_rules {
            builder = builder.advisory(rule);
        }

        builder.build()
    }
}
