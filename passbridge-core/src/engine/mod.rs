//! The ceremony engine seam.
//!
//! The bridge owns no protocol logic: challenge generation, attestation and
//! assertion verification all happen behind [`CeremonyEngine`]. The
//! production implementation is [`PasskeyEngine`], backed by `webauthn-rs`.

#[cfg(test)]
pub(crate) mod mock;
mod passkey;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::types::User;

pub use passkey::PasskeyEngine;

/// A failure reported by the engine, treated opaquely by the bridge.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine could not be built from the configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The engine refused the ceremony (challenge, origin, signature, ...)
    #[error("{0}")]
    Rejected(String),
}

impl EngineError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

/// A plain in-place edit applied to options while the engine builds them.
pub type OptionMutator<'a, T> = Box<dyn FnMut(&mut T) + 'a>;

/// Begin-call result: the options to hand the client plus the session state
/// the host must return on the matching finish call.
pub type Began<O, S> = (O, S);

/// Operations the bridge needs from a WebAuthn ceremony engine.
pub trait CeremonyEngine: Sized + Send + Sync {
    /// Options hooks see and rewrite during registration.
    type CreationOptions: Serialize + DeserializeOwned + 'static;
    /// Registration options as delivered to the host.
    type Creation: Serialize;
    /// Options hooks see and rewrite during authentication.
    type RequestOptions: Serialize + DeserializeOwned + 'static;
    /// Authentication options as delivered to the host.
    type Request: Serialize;
    type RegistrationState: Serialize + DeserializeOwned;
    type AuthenticationState: Serialize + DeserializeOwned;
    type RegistrationResponse: DeserializeOwned;
    type AuthenticationResponse: DeserializeOwned;
    /// Credential record the host persists.
    type Credential: Serialize + DeserializeOwned;

    fn configure(config: &Config) -> Result<Self, EngineError>;

    /// Build registration options, applying `mutators` in order.
    ///
    /// The returned state must reflect the options after every mutator ran.
    fn begin_registration(
        &self,
        user: &User<Self::Credential>,
        mutators: Vec<OptionMutator<'_, Self::CreationOptions>>,
    ) -> Result<Began<Self::Creation, Self::RegistrationState>, EngineError>;

    fn complete_registration(
        &self,
        user: &User<Self::Credential>,
        state: &Self::RegistrationState,
        response: &Self::RegistrationResponse,
    ) -> Result<Self::Credential, EngineError>;

    /// Build authentication options, applying `mutators` in order.
    fn begin_login(
        &self,
        user: &User<Self::Credential>,
        mutators: Vec<OptionMutator<'_, Self::RequestOptions>>,
    ) -> Result<Began<Self::Request, Self::AuthenticationState>, EngineError>;

    fn complete_login(
        &self,
        user: &User<Self::Credential>,
        state: &Self::AuthenticationState,
        response: &Self::AuthenticationResponse,
    ) -> Result<Self::Credential, EngineError>;
}
