//! The engine facade the host talks to.
//!
//! A [`Bridge`] starts uninitialized; `init` builds an engine from the host's
//! configuration and from then on every verb runs against it. A later `init`
//! replaces the engine; a failed one leaves the current state untouched.
//!
//! Each public method is a host entry point: it runs inside the fault
//! barrier, decodes its text arguments, drives the engine, and returns the
//! encoded results.

use std::sync::{Arc, PoisonError, RwLock};

use crate::barrier::guarded;
use crate::codec;
use crate::config::Config;
use crate::engine::{CeremonyEngine, PasskeyEngine};
use crate::error::{BridgeError, Outcome, Result};
use crate::operation::Operation;
use crate::relay::{HostFunction, OptionHookRelay};
use crate::types::User;

pub struct Bridge<E: CeremonyEngine = PasskeyEngine> {
    engine: RwLock<Option<Arc<E>>>,
}

impl<E: CeremonyEngine> Default for Bridge<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: CeremonyEngine> Bridge<E> {
    pub fn new() -> Self {
        Self {
            engine: RwLock::new(None),
        }
    }

    /// Whether `init` has succeeded at least once.
    pub fn is_ready(&self) -> bool {
        self.engine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn ready(&self) -> Result<Arc<E>> {
        self.engine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(BridgeError::NotInitialized)
    }

    /// Build the engine from `config_text`. Delivers no results.
    pub fn init(&self, config_text: &str) -> Outcome {
        guarded("init", || {
            let config: Config = codec::decode("config", config_text)?;
            let engine = E::configure(&config)?;

            *self.engine.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(engine));
            tracing::info!(rp_id = %config.rp_id, "WebAuthn engine initialized");

            Ok(vec![])
        })
    }

    /// Delivers `[options, sessionData]`.
    pub fn begin_registration(&self, user_text: &str, hooks: &[&dyn HostFunction]) -> Outcome {
        guarded("beginRegistration", || {
            let engine = self.ready()?;
            let user: User<E::Credential> = codec::decode("user", user_text)?;

            let relay = OptionHookRelay::new(hooks);
            let began = engine.begin_registration(&user, relay.mutators());
            // A hook failure explains whatever the engine reported afterwards.
            relay.finish()?;
            let (options, session) = began?;

            Ok(vec![
                codec::encode("options", &options)?,
                codec::encode("session data", &session)?,
            ])
        })
    }

    /// Delivers `[credential]`.
    pub fn finish_registration(
        &self,
        user_text: &str,
        session_text: &str,
        response_text: &str,
    ) -> Outcome {
        guarded("finishRegistration", || {
            let engine = self.ready()?;
            let user: User<E::Credential> = codec::decode("user", user_text)?;
            let session: E::RegistrationState = codec::decode("session data", session_text)?;
            let response: E::RegistrationResponse = codec::decode("response", response_text)?;

            let credential = engine.complete_registration(&user, &session, &response)?;

            Ok(vec![codec::encode("credential", &credential)?])
        })
    }

    /// Delivers `[options, sessionData]`.
    pub fn begin_login(&self, user_text: &str, hooks: &[&dyn HostFunction]) -> Outcome {
        guarded("beginLogin", || {
            let engine = self.ready()?;
            let user: User<E::Credential> = codec::decode("user", user_text)?;

            let relay = OptionHookRelay::new(hooks);
            let began = engine.begin_login(&user, relay.mutators());
            relay.finish()?;
            let (options, session) = began?;

            Ok(vec![
                codec::encode("options", &options)?,
                codec::encode("session data", &session)?,
            ])
        })
    }

    /// Delivers `[credential]` with refreshed counters.
    pub fn finish_login(
        &self,
        user_text: &str,
        session_text: &str,
        response_text: &str,
    ) -> Outcome {
        guarded("finishLogin", || {
            let engine = self.ready()?;
            let user: User<E::Credential> = codec::decode("user", user_text)?;
            let session: E::AuthenticationState = codec::decode("session data", session_text)?;
            let response: E::AuthenticationResponse = codec::decode("response", response_text)?;

            let credential = engine.complete_login(&user, &session, &response)?;

            Ok(vec![codec::encode("credential", &credential)?])
        })
    }

    /// Route a host call by operation, checking its arity first.
    ///
    /// `exit` never reaches the bridge; the host loop handles it.
    pub fn dispatch(&self, op: Operation, args: &[String], hooks: &[&dyn HostFunction]) -> Outcome {
        if !hooks.is_empty() && !op.accepts_hooks() {
            return Err(BridgeError::arguments(format!("{op} does not take option hooks")));
        }

        match op {
            Operation::Init => {
                let [config] = expect_args::<1>(op, args)?;
                self.init(config)
            }
            Operation::BeginRegistration => {
                let [user] = expect_args::<1>(op, args)?;
                self.begin_registration(user, hooks)
            }
            Operation::FinishRegistration => {
                let [user, session, response] = expect_args::<3>(op, args)?;
                self.finish_registration(user, session, response)
            }
            Operation::BeginLogin => {
                let [user] = expect_args::<1>(op, args)?;
                self.begin_login(user, hooks)
            }
            Operation::FinishLogin => {
                let [user, session, response] = expect_args::<3>(op, args)?;
                self.finish_login(user, session, response)
            }
            Operation::Exit => Err(BridgeError::arguments("exit is handled by the host")),
        }
    }
}

/// Arguments for the host's completion callback: `[null, results...]` on
/// success, `[error message]` on failure.
pub fn completion_args(outcome: &Outcome) -> Vec<serde_json::Value> {
    match outcome {
        Ok(results) => std::iter::once(serde_json::Value::Null)
            .chain(results.iter().cloned().map(serde_json::Value::String))
            .collect(),
        Err(err) => vec![serde_json::Value::String(err.to_string())],
    }
}

fn expect_args<const N: usize>(op: Operation, args: &[String]) -> Result<[&str; N]> {
    if args.len() != N {
        return Err(BridgeError::arguments(format!(
            "{op} expects {N} argument(s), got {}",
            args.len()
        )));
    }
    Ok(std::array::from_fn(|i| args[i].as_str()))
}

impl<E: CeremonyEngine> std::fmt::Debug for Bridge<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("ready", &self.is_ready())
            .finish()
    }
}
