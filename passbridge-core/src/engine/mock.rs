//! Deterministic engine for exercising the bridge without real authenticators.
//! WARNING: performs no verification beyond a challenge string comparison.

use serde::{Deserialize, Serialize};

use super::{Began, CeremonyEngine, EngineError, OptionMutator};
use crate::config::Config;
use crate::types::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MockOptions {
    pub challenge: String,
    pub rp_id: String,
    pub timeout: u32,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct MockSession {
    pub challenge: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MockResponse {
    pub challenge: String,
    /// Makes the engine panic mid-verification
    #[serde(default)]
    pub explode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MockCredential {
    pub id: String,
    pub sign_count: u32,
}

#[derive(Debug)]
pub(crate) struct MockEngine {
    rp_id: String,
    timeout: u32,
}

impl MockEngine {
    fn options(&self, user: &User<MockCredential>, kind: &str) -> MockOptions {
        MockOptions {
            challenge: format!("{kind}-{}", user.name),
            rp_id: self.rp_id.clone(),
            timeout: self.timeout,
            tags: vec![],
        }
    }

    fn check(session: &MockSession, response: &MockResponse) -> Result<(), EngineError> {
        if response.explode {
            panic!("engine exploded");
        }
        if session.challenge != response.challenge {
            return Err(EngineError::rejected("Challenge mismatch"));
        }
        Ok(())
    }
}

impl CeremonyEngine for MockEngine {
    type CreationOptions = MockOptions;
    type Creation = MockOptions;
    type RequestOptions = MockOptions;
    type Request = MockOptions;
    type RegistrationState = MockSession;
    type AuthenticationState = MockSession;
    type RegistrationResponse = MockResponse;
    type AuthenticationResponse = MockResponse;
    type Credential = MockCredential;

    fn configure(config: &Config) -> Result<Self, EngineError> {
        if config.rp_id.is_empty() {
            return Err(EngineError::Configuration("Empty RPID".into()));
        }
        Ok(Self {
            rp_id: config.rp_id.clone(),
            timeout: if config.timeout == 0 { 60_000 } else { config.timeout },
        })
    }

    fn begin_registration(
        &self,
        user: &User<MockCredential>,
        mutators: Vec<OptionMutator<'_, MockOptions>>,
    ) -> Result<Began<MockOptions, MockSession>, EngineError> {
        if user.name == "rejected" {
            return Err(EngineError::rejected("User rejected by engine"));
        }
        let mut options = self.options(user, "register");
        for mut mutate in mutators {
            mutate(&mut options);
        }
        if options.rp_id != self.rp_id {
            return Err(EngineError::rejected("RP ID changed while building options"));
        }
        let session = MockSession {
            challenge: options.challenge.clone(),
        };
        Ok((options, session))
    }

    fn complete_registration(
        &self,
        user: &User<MockCredential>,
        state: &MockSession,
        response: &MockResponse,
    ) -> Result<MockCredential, EngineError> {
        Self::check(state, response)?;
        Ok(MockCredential {
            id: user.name.clone(),
            sign_count: 0,
        })
    }

    fn begin_login(
        &self,
        user: &User<MockCredential>,
        mutators: Vec<OptionMutator<'_, MockOptions>>,
    ) -> Result<Began<MockOptions, MockSession>, EngineError> {
        // An empty credential list is accepted, matching webauthn-rs.
        if user.name == "rejected" {
            return Err(EngineError::rejected("User rejected by engine"));
        }
        let mut options = self.options(user, "login");
        for mut mutate in mutators {
            mutate(&mut options);
        }
        let session = MockSession {
            challenge: options.challenge.clone(),
        };
        Ok((options, session))
    }

    fn complete_login(
        &self,
        user: &User<MockCredential>,
        state: &MockSession,
        response: &MockResponse,
    ) -> Result<MockCredential, EngineError> {
        Self::check(state, response)?;
        let mut credential = user
            .credentials
            .first()
            .cloned()
            .ok_or_else(|| EngineError::rejected("Credential not found"))?;
        credential.sign_count += 1;
        Ok(credential)
    }
}
