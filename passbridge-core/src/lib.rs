//! Passbridge Core - WebAuthn ceremonies behind a text-only host boundary
//!
//! This crate lets a host that speaks only strings and callbacks drive a
//! Relying Party's WebAuthn ceremonies. The host supplies configuration,
//! users, session data and authenticator responses as JSON text; the bridge
//! decodes them, runs the ceremony engine, and hands back JSON text.
//!
//! # Features
//!
//! - Registration and authentication ceremonies via `webauthn-rs`
//! - Host option hooks that rewrite ceremony options before they are sealed
//!   into session state
//! - A per-call fault barrier: a panic ends one call, never the process
//! - Stateless between calls; the host is the system of record
//!
//! # Example
//!
//! ```no_run
//! use passbridge_core::Bridge;
//!
//! let bridge: Bridge = Bridge::new();
//! bridge.init(r#"{"RPDisplayName":"Example","RPID":"example.com"}"#)?;
//!
//! let user = r#"{"id":"dXNlcg","name":"alice","displayName":"Alice"}"#;
//! let results = bridge.begin_registration(user, &[])?;
//! let (options, session) = (&results[0], &results[1]);
//! // Send `options` to the browser, keep `session` until finishRegistration.
//! # let _ = (options, session);
//! # Ok::<(), passbridge_core::BridgeError>(())
//! ```

mod barrier;
mod bridge;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod operation;
pub mod relay;
pub mod types;

// Re-export main types for convenience
pub use bridge::{completion_args, Bridge};
pub use config::Config;
pub use engine::{CeremonyEngine, EngineError, PasskeyEngine};
pub use error::{BridgeError, Outcome, Result, NOT_INITIALIZED_MESSAGE};
pub use operation::Operation;
pub use relay::{HostCallError, HostFunction};
pub use types::User;
