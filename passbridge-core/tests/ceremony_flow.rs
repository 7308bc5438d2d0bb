//! Ceremony tests against the `webauthn-rs` backed bridge.
//!
//! Authenticator responses cannot be produced here, so these cover
//! everything up to the point where a real browser would take over.

use passbridge_core::{codec, Bridge, BridgeError, HostCallError, HostFunction};
use serde_json::{json, Value};
use webauthn_rs::prelude::Passkey;

const CONFIG: &str = r#"{"RPDisplayName":"Example","RPID":"example.com"}"#;
const ALICE: &str = r#"{"id":"dXNlcg==","name":"alice","displayName":"Alice","credentials":[]}"#;

const CRED_ID: &str =
    "uZcVDBVS68E_MtAgeQpElJxldF_6cY9sSvbWqx_qRh8wiu42lyRBRmh5yFeD_r9k130dMbFHBHI9RTFgdJQIzQ";

/// A stored ES256 passkey as webauthn-rs persists it.
fn stored_passkey() -> Value {
    json!({
        "cred": {
            "cred_id": CRED_ID,
            "cred": {
                "type_": "ES256",
                "key": {"EC_EC2": {
                    "curve": "SECP256R1",
                    "x": [194, 126, 127, 109, 252, 23, 131, 21, 252, 6, 223, 99, 44, 254, 140, 27,
                          230, 17, 94, 5, 133, 28, 104, 41, 144, 69, 171, 149, 161, 26, 200, 243],
                    "y": [143, 123, 183, 156, 24, 178, 21, 248, 117, 159, 162, 69, 171, 52, 188,
                          252, 26, 59, 6, 47, 103, 92, 19, 58, 117, 103, 249, 0, 219, 8, 95, 196]
                }}
            },
            "counter": 2,
            "user_verified": false,
            "backup_eligible": false,
            "backup_state": false,
            "registration_policy": "preferred",
            "extensions": {"cred_protect": "NotRequested", "hmac_create_secret": "NotRequested"},
            "attestation": {"data": "None", "metadata": "None"},
            "attestation_format": "none"
        }
    })
}

fn alice_with(credentials: Vec<Value>) -> String {
    json!({
        "id": "dXNlcg==",
        "name": "alice",
        "displayName": "Alice",
        "credentials": credentials
    })
    .to_string()
}

fn ready_bridge() -> Bridge {
    let bridge = Bridge::new();
    bridge.init(CONFIG).expect("init should succeed");
    bridge
}

fn parse(text: &str) -> Value {
    serde_json::from_str(text).expect("bridge output should be JSON")
}

#[test]
fn test_begin_registration_before_init() {
    let bridge: Bridge = Bridge::new();
    let err = bridge.begin_registration(ALICE, &[]).unwrap_err();
    assert_eq!(err.to_string(), "WebAuthn not initialiazed");
}

#[test]
fn test_begin_registration_produces_options_and_session() {
    let bridge = ready_bridge();
    let results = bridge.begin_registration(ALICE, &[]).unwrap();
    assert_eq!(results.len(), 2);

    let options = parse(&results[0]);
    assert_eq!(options["publicKey"]["rp"]["id"], "example.com");
    assert_eq!(options["publicKey"]["rp"]["name"], "Example");
    assert_eq!(options["publicKey"]["user"]["name"], "alice");
    assert_eq!(options["publicKey"]["user"]["displayName"], "Alice");
    assert!(options["publicKey"]["challenge"].is_string());

    // Session data is opaque but must be JSON the host can store.
    assert!(parse(&results[1]).is_object());
}

#[test]
fn test_each_registration_gets_a_fresh_challenge() {
    let bridge = ready_bridge();
    let first = parse(&bridge.begin_registration(ALICE, &[]).unwrap()[0]);
    let second = parse(&bridge.begin_registration(ALICE, &[]).unwrap()[0]);
    assert_ne!(
        first["publicKey"]["challenge"],
        second["publicKey"]["challenge"]
    );
}

#[test]
fn test_configured_timeout_and_attestation() {
    let bridge: Bridge = Bridge::new();
    bridge
        .init(
            r#"{
                "RPDisplayName": "Example",
                "RPID": "example.com",
                "RPOrigin": "https://login.example.com",
                "AttestationPreference": "indirect",
                "AuthenticatorSelection": {"authenticatorAttachment": "platform"},
                "Timeout": 90000
            }"#,
        )
        .unwrap();

    let options = parse(&bridge.begin_registration(ALICE, &[]).unwrap()[0]);
    assert_eq!(options["publicKey"]["timeout"], 90_000);
    assert_eq!(options["publicKey"]["attestation"], "indirect");
    assert_eq!(
        options["publicKey"]["authenticatorSelection"]["authenticatorAttachment"],
        "platform"
    );
}

#[test]
fn test_hook_rewrites_creation_options() {
    let bridge = ready_bridge();
    let shorten = |text: &str| -> Result<String, HostCallError> {
        let mut options: Value =
            serde_json::from_str(text).map_err(|e| HostCallError(e.to_string()))?;
        options["timeout"] = 5_000.into();
        Ok(options.to_string())
    };

    let results = bridge.begin_registration(ALICE, &[&shorten]).unwrap();
    let options = parse(&results[0]);
    assert_eq!(options["publicKey"]["timeout"], 5_000);
}

#[test]
fn test_hook_sees_engine_options() {
    let bridge = ready_bridge();
    let seen = std::cell::RefCell::new(String::new());
    let spy = |text: &str| -> Result<String, HostCallError> {
        *seen.borrow_mut() = text.to_string();
        Ok(text.to_string())
    };
    let hooks: [&dyn HostFunction; 1] = [&spy];

    bridge.begin_registration(ALICE, &hooks).unwrap();
    let options = parse(&seen.borrow());
    assert_eq!(options["rp"]["id"], "example.com");
    assert_eq!(options["user"]["id"], "dXNlcg");
}

#[test]
fn test_malformed_hook_result() {
    let bridge = ready_bridge();
    let broken = |_: &str| -> Result<String, HostCallError> { Ok("not json".to_string()) };
    let err = bridge.begin_registration(ALICE, &[&broken]).unwrap_err();
    assert!(matches!(err, BridgeError::HookRelay { index: 0, .. }));
}

#[test]
fn test_finish_registration_with_bad_session() {
    let bridge = ready_bridge();
    let err = bridge
        .finish_registration(ALICE, "{}", "{}")
        .unwrap_err();
    match err {
        BridgeError::Decode { what, .. } => assert_eq!(what, "session data"),
        other => panic!("Expected decode error, got {other:?}"),
    }
}

#[test]
fn test_finish_registration_with_bad_response() {
    let bridge = ready_bridge();
    let began = bridge.begin_registration(ALICE, &[]).unwrap();
    let err = bridge
        .finish_registration(ALICE, &began[1], r#"{"id":"x"}"#)
        .unwrap_err();
    match err {
        BridgeError::Decode { what, .. } => assert_eq!(what, "response"),
        other => panic!("Expected decode error, got {other:?}"),
    }
}

#[test]
fn test_init_with_invalid_origin() {
    let bridge: Bridge = Bridge::new();
    let err = bridge
        .init(r#"{"RPDisplayName":"Example","RPID":"example.com","RPOrigin":"::"}"#)
        .unwrap_err();
    assert!(matches!(err, BridgeError::Engine(_)));
    assert!(!bridge.is_ready());
}

#[test]
fn test_registration_hook_shapes_session() {
    let bridge = ready_bridge();
    let rewrite = |text: &str| -> Result<String, HostCallError> {
        let mut options: Value =
            serde_json::from_str(text).map_err(|e| HostCallError(e.to_string()))?;
        options["challenge"] = "AAAAAAAA".into();
        options["authenticatorSelection"]["userVerification"] = "discouraged".into();
        Ok(options.to_string())
    };

    let results = bridge.begin_registration(ALICE, &[&rewrite]).unwrap();
    let options = parse(&results[0]);
    let session = parse(&results[1]);

    assert_eq!(options["publicKey"]["challenge"], "AAAAAAAA");
    assert_eq!(session["rs"]["challenge"], "AAAAAAAA");
    assert_eq!(session["rs"]["policy"], "discouraged");
}

#[test]
fn test_configured_selection_reaches_session() {
    let bridge: Bridge = Bridge::new();
    bridge
        .init(
            r#"{
                "RPDisplayName": "Example",
                "RPID": "example.com",
                "AuthenticatorSelection": {
                    "userVerification": "discouraged",
                    "authenticatorAttachment": "cross-platform",
                    "residentKey": "required"
                }
            }"#,
        )
        .unwrap();

    let results = bridge.begin_registration(ALICE, &[]).unwrap();
    let selection = &parse(&results[0])["publicKey"]["authenticatorSelection"];
    let session = parse(&results[1]);

    assert_eq!(selection["userVerification"], "discouraged");
    assert_eq!(session["rs"]["policy"], "discouraged");
    assert_eq!(session["rs"]["authenticator_attachment"], "cross-platform");
    assert_eq!(session["rs"]["require_resident_key"], true);

    let results = bridge.begin_login(&alice_with(vec![stored_passkey()]), &[]).unwrap();
    assert_eq!(parse(&results[0])["publicKey"]["userVerification"], "discouraged");
    assert_eq!(parse(&results[1])["ast"]["policy"], "discouraged");
}

#[test]
fn test_begin_login_without_credentials() {
    // webauthn-rs issues a challenge with an empty allow list.
    let bridge = ready_bridge();
    let results = bridge.begin_login(ALICE, &[]).unwrap();
    assert_eq!(results.len(), 2);

    let options = parse(&results[0]);
    assert_eq!(options["publicKey"]["allowCredentials"], json!([]));
    assert_eq!(options["publicKey"]["rpId"], "example.com");
    assert_eq!(
        parse(&results[1])["ast"]["challenge"],
        options["publicKey"]["challenge"]
    );
}

#[test]
fn test_begin_login_with_stored_passkey() {
    let bridge: Bridge = Bridge::new();
    bridge
        .init(
            r#"{
                "RPDisplayName": "Example",
                "RPID": "example.com",
                "AuthenticatorSelection": {"userVerification": "preferred"},
                "Timeout": 45000
            }"#,
        )
        .unwrap();
    let user = alice_with(vec![stored_passkey()]);

    let results = bridge.begin_login(&user, &[]).unwrap();
    let options = parse(&results[0]);
    let allowed = options["publicKey"]["allowCredentials"].as_array().unwrap();
    assert_eq!(allowed.len(), 1);
    assert_eq!(allowed[0]["id"], CRED_ID);
    assert_eq!(allowed[0]["type"], "public-key");
    assert_eq!(options["publicKey"]["userVerification"], "preferred");
    assert_eq!(options["publicKey"]["timeout"], 45_000);

    let session = parse(&results[1]);
    assert_eq!(session["ast"]["policy"], "preferred");
    assert_eq!(session["ast"]["credentials"][0]["cred_id"], CRED_ID);
}

#[test]
fn test_login_hook_rewrites_request_options() {
    let bridge = ready_bridge();
    let user = alice_with(vec![stored_passkey()]);
    let seen = std::cell::RefCell::new(Value::Null);
    let require_uv = |text: &str| -> Result<String, HostCallError> {
        let mut options: Value =
            serde_json::from_str(text).map_err(|e| HostCallError(e.to_string()))?;
        *seen.borrow_mut() = options["allowCredentials"].clone();
        options["userVerification"] = "required".into();
        options["timeout"] = 5_000.into();
        Ok(options.to_string())
    };

    let results = bridge.begin_login(&user, &[&require_uv]).unwrap();
    assert_eq!(seen.borrow()[0]["id"], CRED_ID);
    let options = parse(&results[0]);
    assert_eq!(options["publicKey"]["userVerification"], "required");
    assert_eq!(options["publicKey"]["timeout"], 5_000);
    assert_eq!(parse(&results[1])["ast"]["policy"], "required");
}

#[test]
fn test_stored_passkey_encoding_is_stable() {
    let passkey: Passkey = codec::decode("credential", &stored_passkey().to_string()).unwrap();
    let encoded = codec::encode("credential", &passkey).unwrap();
    let again: Passkey = codec::decode("credential", &encoded).unwrap();

    assert_eq!(codec::encode("credential", &again).unwrap(), encoded);
    assert_eq!(parse(&encoded)["cred"]["cred_id"], CRED_ID);
}
