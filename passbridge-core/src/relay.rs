//! Option-hook relay.
//!
//! Engines accept plain in-place option mutators and have no error channel
//! for them. The relay wraps each host hook as such a mutator: encode the
//! options, call the host, decode the replacement. The first failure is
//! kept, later hooks are skipped, and the caller collects the failure with
//! [`OptionHookRelay::finish`] once the engine call has returned.

use std::cell::RefCell;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::engine::OptionMutator;
use crate::error::{BridgeError, Result};

/// Failure reported by the host while running one of its functions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HostCallError(pub String);

/// A host function reference the bridge can call synchronously.
///
/// Receives the encoded in-flight options and returns replacement options
/// in the same encoding.
pub trait HostFunction {
    fn call(&self, options: &str) -> std::result::Result<String, HostCallError>;
}

impl<F> HostFunction for F
where
    F: Fn(&str) -> std::result::Result<String, HostCallError>,
{
    fn call(&self, options: &str) -> std::result::Result<String, HostCallError> {
        self(options)
    }
}

pub struct OptionHookRelay<'h> {
    hooks: &'h [&'h dyn HostFunction],
    failure: RefCell<Option<BridgeError>>,
}

impl<'h> OptionHookRelay<'h> {
    pub fn new(hooks: &'h [&'h dyn HostFunction]) -> Self {
        Self {
            hooks,
            failure: RefCell::new(None),
        }
    }

    /// One engine mutator per hook, in host order.
    pub fn mutators<T>(&self) -> Vec<OptionMutator<'_, T>>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        self.hooks
            .iter()
            .enumerate()
            .map(|(index, hook)| {
                let hook: &dyn HostFunction = *hook;
                let failure = &self.failure;
                Box::new(move |options: &mut T| {
                    if failure.borrow().is_some() {
                        return;
                    }
                    match relay_once(index, hook, options) {
                        Ok(replacement) => *options = replacement,
                        Err(err) => {
                            tracing::warn!(hook = index, error = %err, "Option hook failed");
                            *failure.borrow_mut() = Some(err);
                        }
                    }
                }) as OptionMutator<'_, T>
            })
            .collect()
    }

    /// The first hook failure, if any.
    pub fn finish(self) -> Result<()> {
        match self.failure.into_inner() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn relay_once<T>(index: usize, hook: &dyn HostFunction, options: &T) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let encoded = serde_json::to_string(options).map_err(|e| BridgeError::HookRelay {
        index,
        reason: format!("could not encode options: {e}"),
    })?;

    let replacement = hook.call(&encoded).map_err(|e| BridgeError::HookRelay {
        index,
        reason: e.to_string(),
    })?;

    serde_json::from_str(&replacement).map_err(|e| BridgeError::HookRelay {
        index,
        reason: format!("invalid options returned: {e}"),
    })
}
