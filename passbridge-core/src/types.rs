//! Values the host supplies on every ceremony call.

use serde::{Deserialize, Serialize};

use crate::codec;

/// The principal a ceremony runs for.
///
/// The host is the system of record: a fresh copy arrives with every call
/// and nothing here is cached between calls. `C` is the engine's opaque
/// credential record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User<C> {
    /// Opaque user handle
    #[serde(with = "codec::bytes")]
    pub id: Vec<u8>,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, rename = "iconURL")]
    pub icon_url: String,
    /// Credentials previously registered by this user, in host order
    #[serde(default = "Vec::new")]
    pub credentials: Vec<C>,
}

impl<C> User<C> {
    /// Display name to hand the engine, falling back to the account name.
    pub fn effective_display_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}
