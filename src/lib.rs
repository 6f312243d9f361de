//! Password policy validation service
//!
//! This library judges candidate passwords against a configurable policy
//! and keeps the hosting service resident only while it is being used.
//!
//! # Features
//!
//! - `async` (default): Enables the tokio idle watchdog
//! - `tracing`: Enables logging via tracing crate
//!
//! # Environment Variables
//!
//! - `PWD_CHECK_DICT_PATH`: Word list read by [`load_blacklist`]
//!   (default: `/etc/pwd-check/blacklist.txt`)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pwd_check::{
//!     load_blacklist, IdleLifecycleManager, PasswordCheckService, PolicyBuilder, PolicyProfile,
//!     DEFAULT_IDLE_TIMEOUT,
//! };
//! use secrecy::SecretString;
//!
//! // Build the policy once at startup; a bad policy stops the service here
//! let policy = PolicyBuilder::from_profile(PolicyProfile::Server)
//!     .blacklist(load_blacklist().expect("Failed to load blacklist"))
//!     .similarity_threshold(0.8)
//!     .build()
//!     .expect("Invalid password policy");
//!
//! let service = PasswordCheckService::new(
//!     Arc::new(policy),
//!     Arc::new(IdleLifecycleManager::new(DEFAULT_IDLE_TIMEOUT)),
//! );
//!
//! let password = SecretString::new("MyP@ssw0rd!".to_string().into());
//! let verdict = service.check_password(password, Some("jsmith")).unwrap();
//!
//! println!("Accepted: {}", verdict.accepted);
//! println!("Violations: {:?}", verdict.violations);
//! println!("Strength: {:?}", verdict.strength());
//! ```

// Re-export types from pwd-types for convenience
pub use pwd_types::{PasswordEvaluation, PasswordScore, PasswordStrength};

// Internal modules
mod blacklist;
mod evaluator;
mod lifecycle;
mod policy;
mod sections;
mod service;
mod verdict;

// Public API
pub use blacklist::{
    get_blacklist_path, load_blacklist, load_blacklist_from_path, Blacklist, BlacklistError,
    DICT_PATH_ENV,
};
pub use evaluator::evaluate;
pub use lifecycle::{
    ActivityGuard, Clock, IdleConfig, IdleLifecycleManager, LifecycleError, LifecyclePhase,
    SystemClock, DEFAULT_CHECK_INTERVAL, DEFAULT_IDLE_TIMEOUT,
};
pub use policy::{
    CharClass, CharacterSets, PolicyBuilder, PolicyConfig, PolicyError, PolicyProfile,
    PolicySettings, ScoreMode, DEFAULT_CHARACTER_POLICY, DEFAULT_MAX_LENGTH,
};
pub use sections::{account_similarity, estimate_entropy_bits, Rule};
pub use service::{CheckRequest, PasswordCheckService, ServiceError, MAX_HINT_BYTES};
pub use verdict::{EvaluationContext, UnknownViolation, Verdict, ViolationKind};

#[cfg(feature = "async")]
pub use lifecycle::{run_idle_watchdog, TokioClock};
