//! Per-call fault barrier.
//!
//! Every host-reachable entry point runs inside [`guarded`], so a panic
//! anywhere below it ends that one call with [`BridgeError::Fault`] instead
//! of taking the process down.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::error::{BridgeError, Outcome};

/// Run `call` for operation `op`, turning a panic into a fault outcome.
pub fn guarded<F>(op: &str, call: F) -> Outcome
where
    F: FnOnce() -> Outcome,
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(&*payload);
            tracing::error!(op, panic = %message, "Recovered from panic at call boundary");
            Err(BridgeError::Fault(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passes_outcome_through() {
        let outcome = guarded("init", || Ok(vec!["a".into()]));
        assert_eq!(outcome.unwrap(), vec!["a".to_string()]);

        let outcome = guarded("init", || Err(BridgeError::NotInitialized));
        assert!(matches!(outcome, Err(BridgeError::NotInitialized)));
    }

    #[test]
    fn test_static_str_panic() {
        let outcome = guarded("beginLogin", || panic!("boom"));
        let err = outcome.unwrap_err();
        assert!(err.is_fault());
        assert_eq!(err.to_string(), "panic: boom");
    }

    #[test]
    fn test_formatted_panic() {
        let credentials: Vec<u8> = vec![];
        let outcome = guarded("finishLogin", || {
            let index = credentials.len() + 3;
            Ok(vec![credentials[index].to_string()])
        });
        let err = outcome.unwrap_err();
        assert!(err.to_string().starts_with("panic: index out of bounds"));
    }

    #[test]
    fn test_opaque_payload() {
        let outcome = guarded("init", || std::panic::panic_any(42_u32));
        assert_eq!(outcome.unwrap_err().to_string(), "panic: unknown panic payload");
    }
}
