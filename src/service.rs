//! Request facade - the surface an IPC transport binds to.
//!
//! Every call is bracketed by an activity guard so the idle lifecycle sees
//! it, and requests arriving from a transport are validated before they
//! reach the evaluator.

use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

#[cfg(feature = "async")]
use tokio::task::JoinHandle;

#[cfg(feature = "async")]
use tokio_util::sync::CancellationToken;

use crate::evaluator::evaluate;
use crate::lifecycle::{Clock, IdleLifecycleManager, LifecycleError, SystemClock};
use crate::policy::PolicyConfig;
use crate::verdict::{EvaluationContext, Verdict};

/// Longest UTF-8 encoding of one character. A transport request may carry
/// at most this many bytes per character of the policy's maximum length.
const MAX_UTF8_CHAR_BYTES: usize = 4;

/// Largest account hint a transport request may carry, in bytes.
pub const MAX_HINT_BYTES: usize = 256;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("malformed request: {0}")]
    MalformedRequest(&'static str),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// A decoded `CheckPassword` call as a transport delivers it.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckRequest {
    password: SecretString,
    #[serde(default)]
    account_hint: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

impl CheckRequest {
    pub fn new(password: impl Into<SecretString>, account_hint: Option<String>) -> Self {
        Self {
            password: password.into(),
            account_hint,
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: String) -> Self {
        self.display_name = Some(name);
        self
    }

    fn validate(&self, max_password_bytes: usize) -> Result<(), ServiceError> {
        let password = self.password.expose_secret();
        if password.len() > max_password_bytes {
            return Err(ServiceError::MalformedRequest("password too large"));
        }
        if password.contains('\0') {
            return Err(ServiceError::MalformedRequest("password contains NUL"));
        }
        for hint in self.account_hint.iter().chain(self.display_name.iter()) {
            if hint.len() > MAX_HINT_BYTES {
                return Err(ServiceError::MalformedRequest("account hint too large"));
            }
            if hint.contains('\0') {
                return Err(ServiceError::MalformedRequest("account hint contains NUL"));
            }
        }
        Ok(())
    }

    fn into_context(self) -> EvaluationContext {
        let mut ctx = EvaluationContext::new(self.password);
        for hint in self.account_hint.into_iter().chain(self.display_name) {
            ctx = ctx.with_hint(hint);
        }
        ctx
    }
}

impl fmt::Debug for CheckRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckRequest")
            .field("password", &"[REDACTED]")
            .field("account_hint", &self.account_hint)
            .field("display_name", &self.display_name)
            .finish()
    }
}

/// The password check service: a shared policy plus the idle lifecycle.
pub struct PasswordCheckService<C: Clock = SystemClock> {
    policy: Arc<PolicyConfig>,
    lifecycle: Arc<IdleLifecycleManager<C>>,
}

impl<C: Clock> PasswordCheckService<C> {
    pub fn new(policy: Arc<PolicyConfig>, lifecycle: Arc<IdleLifecycleManager<C>>) -> Self {
        Self { policy, lifecycle }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn lifecycle(&self) -> &Arc<IdleLifecycleManager<C>> {
        &self.lifecycle
    }

    /// Largest password, in bytes, [`check_request`](Self::check_request)
    /// lets through: room for the policy's maximum length in any script.
    pub fn max_password_bytes(&self) -> usize {
        self.policy.max_length().saturating_mul(MAX_UTF8_CHAR_BYTES)
    }

    /// Evaluates a prepared context.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Lifecycle`] once the service has started shutting
    /// down. A rejected password is not an error.
    pub fn check(&self, ctx: &EvaluationContext) -> Result<Verdict, ServiceError> {
        let _activity = self.lifecycle.begin_request()?;
        let verdict = evaluate(ctx, &self.policy);

        #[cfg(feature = "tracing")]
        {
            if verdict.accepted {
                tracing::debug!("password accepted");
            } else {
                tracing::info!(
                    "password rejected: {}",
                    verdict
                        .violations
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }

        Ok(verdict)
    }

    /// `CheckPassword(password, accountHint?)`.
    ///
    /// # Errors
    ///
    /// Same as [`check`](Self::check).
    pub fn check_password(
        &self,
        password: SecretString,
        account_hint: Option<&str>,
    ) -> Result<Verdict, ServiceError> {
        let mut ctx = EvaluationContext::new(password);
        if let Some(hint) = account_hint {
            ctx = ctx.with_hint(hint);
        }
        self.check(&ctx)
    }

    /// Validates a transport request, then evaluates it.
    ///
    /// # Errors
    ///
    /// [`ServiceError::MalformedRequest`] for oversized fields or embedded
    /// NUL characters, otherwise as [`check`](Self::check).
    pub fn check_request(&self, request: CheckRequest) -> Result<Verdict, ServiceError> {
        if let Err(e) = request.validate(self.max_password_bytes()) {
            #[cfg(feature = "tracing")]
            tracing::warn!("Rejecting request: {}", e);
            return Err(e);
        }
        self.check(&request.into_context())
    }

    /// JSON in, JSON out: `{"password": …, "account_hint": …}` to
    /// `{"accepted": …, "score": …, "violations": […]}`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Json`] when the payload does not decode, otherwise as
    /// [`check_request`](Self::check_request).
    pub fn handle_json(&self, payload: &str) -> Result<String, ServiceError> {
        let request: CheckRequest = serde_json::from_str(payload)?;
        let verdict = self.check_request(request)?;
        Ok(serde_json::to_string(&verdict)?)
    }

    /// Auto-quit predicate for a host that runs its own timer. `true` means
    /// the process should exit now; it is returned at most once.
    pub fn should_quit(&self) -> bool {
        self.lifecycle.poll()
    }
}

#[cfg(feature = "async")]
impl<C: Clock + 'static> PasswordCheckService<C> {
    /// Spawns the idle watchdog on the current tokio runtime, polling at
    /// the lifecycle's check interval. The task resolves to `true` when the
    /// service went idle, `false` if cancelled.
    pub fn spawn_idle_watchdog(&self, token: CancellationToken) -> JoinHandle<bool> {
        tokio::spawn(crate::lifecycle::run_idle_watchdog(
            Arc::clone(&self.lifecycle),
            token,
        ))
    }
}
