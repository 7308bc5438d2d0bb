//! Relying Party configuration supplied by the host at `init`.
//!
//! Keys keep the PascalCase spelling hosts already send
//! (`RPDisplayName`, `RPID`, ...).

use serde::{Deserialize, Serialize};
use url::Url;

/// Relying Party configuration, immutable once the engine is built from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Human-readable Relying Party name
    #[serde(rename = "RPDisplayName")]
    pub rp_display_name: String,

    /// Relying Party ID (typically the domain name)
    #[serde(rename = "RPID")]
    pub rp_id: String,

    /// Relying Party origin; defaults to `https://<RPID>`
    #[serde(rename = "RPOrigin", default, skip_serializing_if = "String::is_empty")]
    pub rp_origin: String,

    /// Relying Party icon. Accepted for compatibility; the engine has no slot for it.
    #[serde(rename = "RPIcon", default, skip_serializing_if = "String::is_empty")]
    pub rp_icon: String,

    #[serde(
        rename = "AttestationPreference",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub attestation_preference: Option<AttestationPreference>,

    #[serde(
        rename = "AuthenticatorSelection",
        default,
        skip_serializing_if = "AuthenticatorSelection::is_empty"
    )]
    pub authenticator_selection: AuthenticatorSelection,

    /// Ceremony timeout in milliseconds; 0 keeps the engine default
    #[serde(rename = "Timeout", default, skip_serializing_if = "is_zero")]
    pub timeout: u32,

    /// Trace generated options and session state at debug level
    #[serde(rename = "Debug", default)]
    pub debug: bool,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl Config {
    /// Create a configuration with only the required fields set.
    pub fn new(rp_display_name: impl Into<String>, rp_id: impl Into<String>) -> Self {
        Self {
            rp_display_name: rp_display_name.into(),
            rp_id: rp_id.into(),
            rp_origin: String::new(),
            rp_icon: String::new(),
            attestation_preference: None,
            authenticator_selection: AuthenticatorSelection::default(),
            timeout: 0,
            debug: false,
        }
    }

    /// The origin the engine validates responses against.
    pub fn origin(&self) -> Result<Url, url::ParseError> {
        if self.rp_origin.is_empty() {
            Url::parse(&format!("https://{}", self.rp_id))
        } else {
            Url::parse(&self.rp_origin)
        }
    }
}

/// Attestation conveyance preference sent to authenticators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttestationPreference {
    None,
    Indirect,
    Direct,
}

/// Authenticator selection criteria overlaid on the engine's defaults.
///
/// Unset fields leave the engine's choice in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_resident_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resident_key: Option<ResidentKeyRequirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<UserVerification>,
}

impl AuthenticatorSelection {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorAttachment {
    Platform,
    CrossPlatform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidentKeyRequirement {
    Discouraged,
    Preferred,
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserVerification {
    Required,
    Preferred,
    Discouraged,
}
