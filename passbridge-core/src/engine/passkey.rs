//! `webauthn-rs` backed ceremony engine.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;
use webauthn_rs::prelude::{
    CreationChallengeResponse, CredentialID, Passkey, PasskeyAuthentication, PasskeyRegistration,
    PublicKeyCredential, RegisterPublicKeyCredential, RequestChallengeResponse, Webauthn,
    WebauthnBuilder, WebauthnError,
};
use webauthn_rs_proto::{PublicKeyCredentialCreationOptions, PublicKeyCredentialRequestOptions};

use super::{Began, CeremonyEngine, EngineError, OptionMutator};
use crate::config::{AttestationPreference, AuthenticatorSelection, Config};
use crate::types::User;

/// Passkey ceremonies over a configured `Webauthn` instance.
pub struct PasskeyEngine {
    webauthn: Webauthn,
    attestation: Option<AttestationPreference>,
    selection: AuthenticatorSelection,
    timeout: u32,
    debug: bool,
}

impl PasskeyEngine {
    /// Get a reference to the Webauthn instance
    pub fn webauthn(&self) -> &Webauthn {
        &self.webauthn
    }

    /// Overlay the configured preferences on engine-built creation options and
    /// put the host's own user handle back in place of the engine's UUID.
    fn overlay_creation(
        &self,
        options: &mut PublicKeyCredentialCreationOptions,
        user_id: &[u8],
    ) -> Result<(), EngineError> {
        let attestation = self.attestation.map(to_value).transpose()?;
        let selection = to_value(&self.selection)?;
        let timeout = self.timeout;
        let handle = URL_SAFE_NO_PAD.encode(user_id);

        edit_as_json(options, |map| {
            if let Some(user) = map.get_mut("user").and_then(Value::as_object_mut) {
                user.insert("id".into(), Value::String(handle));
            }
            if let Some(attestation) = attestation {
                map.insert("attestation".into(), attestation);
            }
            if let Value::Object(fields) = selection {
                if !fields.is_empty() {
                    let target = map
                        .entry("authenticatorSelection")
                        .or_insert(Value::Null);
                    if !target.is_object() {
                        *target = Value::Object(Map::new());
                    }
                    if let Some(target) = target.as_object_mut() {
                        target.extend(fields);
                    }
                }
            }
            if timeout > 0 {
                map.insert("timeout".into(), Value::from(timeout));
            }
        })
    }

    fn overlay_request(
        &self,
        options: &mut PublicKeyCredentialRequestOptions,
    ) -> Result<(), EngineError> {
        let user_verification = self
            .selection
            .user_verification
            .map(to_value)
            .transpose()?;
        let timeout = self.timeout;

        edit_as_json(options, |map| {
            if let Some(user_verification) = user_verification {
                map.insert("userVerification".into(), user_verification);
            }
            if timeout > 0 {
                map.insert("timeout".into(), Value::from(timeout));
            }
        })
    }

    fn trace<T: Serialize>(&self, what: &str, value: &T) {
        if self.debug {
            match serde_json::to_string(value) {
                Ok(json) => tracing::debug!(what, json = %json, "Generated ceremony value"),
                Err(e) => tracing::debug!(what, error = %e, "Could not render ceremony value"),
            }
        }
    }
}

/// Engine-side user handle for a host identifier.
///
/// The engine keys users by UUID; a 16 byte identifier is used as is and
/// anything else maps to a stable name-based UUID.
pub(crate) fn user_handle(id: &[u8]) -> Uuid {
    Uuid::from_slice(id).unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_OID, id))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, EngineError> {
    serde_json::to_value(value).map_err(|e| EngineError::rejected(e.to_string()))
}

fn edit_as_json<T, F>(target: &mut T, edit: F) -> Result<(), EngineError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&mut Map<String, Value>),
{
    let mut value = to_value(&*target)?;
    if let Value::Object(map) = &mut value {
        edit(map);
    }
    *target = serde_json::from_value(value)
        .map_err(|e| EngineError::rejected(format!("Invalid ceremony overlay: {e}")))?;
    Ok(())
}

/// Session fields that must match the final creation options.
fn creation_session_fields(
    options: &PublicKeyCredentialCreationOptions,
) -> Result<Map<String, Value>, EngineError> {
    let options = to_value(options)?;
    let mut fields = Map::new();

    if let Some(challenge) = options.get("challenge") {
        fields.insert("challenge".into(), challenge.clone());
    }
    if let Some(selection) = options.get("authenticatorSelection").and_then(Value::as_object) {
        if let Some(policy) = selection.get("userVerification") {
            fields.insert("policy".into(), policy.clone());
        }
        let attachment = selection
            .get("authenticatorAttachment")
            .cloned()
            .unwrap_or(Value::Null);
        fields.insert("authenticator_attachment".into(), attachment);

        let resident = match selection.get("residentKey").and_then(Value::as_str) {
            Some(requirement) => requirement == "required",
            None => selection
                .get("requireResidentKey")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        };
        fields.insert("require_resident_key".into(), Value::Bool(resident));
    }
    Ok(fields)
}

/// Session fields that must match the final request options.
fn request_session_fields(
    options: &PublicKeyCredentialRequestOptions,
) -> Result<Map<String, Value>, EngineError> {
    let options = to_value(options)?;
    let mut fields = Map::new();

    if let Some(challenge) = options.get("challenge") {
        fields.insert("challenge".into(), challenge.clone());
    }
    if let Some(policy) = options.get("userVerification") {
        fields.insert("policy".into(), policy.clone());
    }
    Ok(fields)
}

/// Write `fields` into the engine's session state so the finish step
/// verifies what the client was actually asked for.
///
/// The engine nests its state one level down (`rs` / `ast`); only fields
/// already present there are replaced.
fn bind_session<S>(state: &mut S, fields: &Map<String, Value>) -> Result<(), EngineError>
where
    S: Serialize + DeserializeOwned,
{
    edit_as_json(state, |map| {
        for inner in map.values_mut().filter_map(Value::as_object_mut) {
            for (key, value) in fields {
                if inner.contains_key(key) {
                    inner.insert(key.clone(), value.clone());
                }
            }
        }
    })
}

fn base64_url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn rejected(err: WebauthnError) -> EngineError {
    EngineError::Rejected(err.to_string())
}

fn configuration(err: WebauthnError) -> EngineError {
    EngineError::Configuration(err.to_string())
}

impl CeremonyEngine for PasskeyEngine {
    type CreationOptions = PublicKeyCredentialCreationOptions;
    type Creation = CreationChallengeResponse;
    type RequestOptions = PublicKeyCredentialRequestOptions;
    type Request = RequestChallengeResponse;
    type RegistrationState = PasskeyRegistration;
    type AuthenticationState = PasskeyAuthentication;
    type RegistrationResponse = RegisterPublicKeyCredential;
    type AuthenticationResponse = PublicKeyCredential;
    type Credential = Passkey;

    fn configure(config: &Config) -> Result<Self, EngineError> {
        let origin = config
            .origin()
            .map_err(|e| EngineError::Configuration(format!("Invalid origin URL: {e}")))?;

        let webauthn = WebauthnBuilder::new(&config.rp_id, &origin)
            .map_err(configuration)?
            .rp_name(&config.rp_display_name)
            .allow_subdomains(false)
            .build()
            .map_err(configuration)?;

        if !config.rp_icon.is_empty() {
            tracing::debug!(
                icon = %config.rp_icon,
                "Relying Party icon is not sent to authenticators"
            );
        }

        Ok(Self {
            webauthn,
            attestation: config.attestation_preference,
            selection: config.authenticator_selection.clone(),
            timeout: config.timeout,
            debug: config.debug,
        })
    }

    fn begin_registration(
        &self,
        user: &User<Passkey>,
        mutators: Vec<OptionMutator<'_, PublicKeyCredentialCreationOptions>>,
    ) -> Result<Began<CreationChallengeResponse, PasskeyRegistration>, EngineError> {
        let exclude_credentials: Option<Vec<CredentialID>> = if user.credentials.is_empty() {
            None
        } else {
            Some(
                user.credentials
                    .iter()
                    .map(|passkey| passkey.cred_id().clone())
                    .collect(),
            )
        };

        let (mut ccr, mut reg_state) = self
            .webauthn
            .start_passkey_registration(
                user_handle(&user.id),
                &user.name,
                user.effective_display_name(),
                exclude_credentials,
            )
            .map_err(rejected)?;

        self.overlay_creation(&mut ccr.public_key, &user.id)?;
        for mut mutate in mutators {
            mutate(&mut ccr.public_key);
        }
        bind_session(&mut reg_state, &creation_session_fields(&ccr.public_key)?)?;

        self.trace("creation options", &ccr);
        tracing::info!(user = %user.name, "WebAuthn registration started");

        Ok((ccr, reg_state))
    }

    fn complete_registration(
        &self,
        user: &User<Passkey>,
        state: &PasskeyRegistration,
        response: &RegisterPublicKeyCredential,
    ) -> Result<Passkey, EngineError> {
        let passkey = self
            .webauthn
            .finish_passkey_registration(response, state)
            .map_err(rejected)?;

        tracing::info!(
            user = %user.name,
            credential_id = %base64_url_encode(passkey.cred_id()),
            "WebAuthn registration completed"
        );

        Ok(passkey)
    }

    fn begin_login(
        &self,
        user: &User<Passkey>,
        mutators: Vec<OptionMutator<'_, PublicKeyCredentialRequestOptions>>,
    ) -> Result<Began<RequestChallengeResponse, PasskeyAuthentication>, EngineError> {
        let (mut rcr, mut auth_state) = self
            .webauthn
            .start_passkey_authentication(&user.credentials)
            .map_err(rejected)?;

        self.overlay_request(&mut rcr.public_key)?;
        for mut mutate in mutators {
            mutate(&mut rcr.public_key);
        }
        bind_session(&mut auth_state, &request_session_fields(&rcr.public_key)?)?;

        self.trace("request options", &rcr);
        tracing::info!(
            user = %user.name,
            credentials = user.credentials.len(),
            "WebAuthn authentication started"
        );

        Ok((rcr, auth_state))
    }

    fn complete_login(
        &self,
        user: &User<Passkey>,
        state: &PasskeyAuthentication,
        response: &PublicKeyCredential,
    ) -> Result<Passkey, EngineError> {
        let auth_result = self
            .webauthn
            .finish_passkey_authentication(response, state)
            .map_err(rejected)?;

        let mut passkey = user
            .credentials
            .iter()
            .find(|passkey| passkey.cred_id() == auth_result.cred_id())
            .cloned()
            .ok_or_else(|| {
                EngineError::rejected("Authenticated credential is not registered to user")
            })?;
        passkey.update_credential(&auth_result);

        tracing::info!(
            user = %user.name,
            sign_count = auth_result.counter(),
            "WebAuthn authentication completed"
        );

        Ok(passkey)
    }
}

impl std::fmt::Debug for PasskeyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasskeyEngine")
            .field("webauthn", &"<Webauthn instance>")
            .field("attestation", &self.attestation)
            .field("selection", &self.selection)
            .field("timeout", &self.timeout)
            .finish()
    }
}
