//! The serve loop: read host calls, run them through the bridge, answer.
//!
//! Calls are handled one at a time. While a call is in flight its option
//! hooks are relayed to the host over the same channel and the loop waits
//! for each answer before continuing.

use std::cell::RefCell;
use std::io::{BufRead, Write};

use passbridge_core::{
    completion_args, Bridge, BridgeError, HostCallError, HostFunction, Operation, Outcome,
};
use serde_json::Value;

use crate::exit_codes;
use crate::lifecycle;
use crate::protocol::{Call, Channel, Incoming, Outgoing, Received};

/// What the loop does after a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit(i32),
}

pub struct Host<R, W> {
    channel: RefCell<Channel<R, W>>,
    bridge: Bridge,
}

impl<R: BufRead, W: Write> Host<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            channel: RefCell::new(Channel::new(reader, writer)),
            bridge: Bridge::new(),
        }
    }

    /// Announce the surface under `namespace` and serve until the host asks
    /// to exit or goes away. Returns the process exit code.
    pub fn run(&self, namespace: &str) -> i32 {
        if let Err(e) = self
            .channel
            .borrow_mut()
            .send(&lifecycle::registration(namespace))
        {
            tracing::error!(error = %e, "Could not announce operations to host");
            return exit_codes::IO_ERROR;
        }
        tracing::info!(namespace, "Registered WebAuthn operations");

        loop {
            let received = self.channel.borrow_mut().receive();
            let flow = match received {
                Ok(Received::Message(Incoming::Call(call))) => self.handle(call),
                Ok(Received::Message(Incoming::HookResult(answer))) => {
                    tracing::warn!(
                    call = %answer.call,
                    "Ignoring hook result with no pending hook"
                );
                    Ok(Flow::Continue)
                }
                Ok(Received::Malformed { call, reason }) => {
                    tracing::warn!(call = %call, %reason, "Rejected host message");
                    self.reply(call, vec![Value::String(reason)])
                        .map(|()| Flow::Continue)
                }
                Ok(Received::Closed) => {
                    tracing::info!("Host closed the channel");
                    Ok(Flow::Exit(exit_codes::SUCCESS))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Host channel failed");
                    Ok(Flow::Exit(exit_codes::IO_ERROR))
                }
            };

            match flow {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit(code)) => return code,
                Err(e) => {
                    tracing::error!(error = %e, "Could not answer host");
                    return exit_codes::IO_ERROR;
                }
            }
        }
    }

    fn handle(&self, call: Call) -> std::io::Result<Flow> {
        let op = match call.method.parse::<Operation>() {
            Ok(op) => op,
            Err(reason) => {
                tracing::warn!(call = %call.id, method = %call.method, "Unknown operation");
                self.reply(call.id, vec![Value::String(reason)])?;
                return Ok(Flow::Continue);
            }
        };

        if op == Operation::Exit {
            return match exit_code(&call.args) {
                Ok(code) => {
                    tracing::info!(code, "Exit requested by host");
                    Ok(Flow::Exit(code))
                }
                Err(err) => {
                    self.reply(call.id, completion_args(&Err(err)))?;
                    Ok(Flow::Continue)
                }
            };
        }

        let outcome = self.invoke(op, &call);
        match &outcome {
            Ok(results) => tracing::debug!(
                call = %call.id,
                op = %op,
                results = results.len(),
                "Call completed"
            ),
            Err(e) => tracing::warn!(call = %call.id, op = %op, error = %e, "Call failed"),
        }
        self.reply(call.id, completion_args(&outcome))?;
        Ok(Flow::Continue)
    }

    fn invoke(&self, op: Operation, call: &Call) -> Outcome {
        let args = string_args(&call.args)?;
        let hooks: Vec<HostHook<'_, R, W>> = call
            .hooks
            .iter()
            .map(|handle| HostHook {
                channel: &self.channel,
                call: &call.id,
                handle,
            })
            .collect();
        let hooks: Vec<&dyn HostFunction> = hooks
            .iter()
            .map(|hook| hook as &dyn HostFunction)
            .collect();

        self.bridge.dispatch(op, &args, &hooks)
    }

    fn reply(&self, call: Value, args: Vec<Value>) -> std::io::Result<()> {
        self.channel
            .borrow_mut()
            .send(&Outgoing::Done { call, args })
    }
}

/// A host function handle, callable through the shared channel.
struct HostHook<'a, R, W> {
    channel: &'a RefCell<Channel<R, W>>,
    call: &'a Value,
    handle: &'a Value,
}

impl<R: BufRead, W: Write> HostFunction for HostHook<'_, R, W> {
    fn call(&self, options: &str) -> Result<String, HostCallError> {
        let mut channel = self.channel.borrow_mut();
        channel
            .send(&Outgoing::Hook {
                call: self.call.clone(),
                hook: self.handle.clone(),
                options: options.to_string(),
            })
            .map_err(|e| HostCallError(format!("Could not reach host: {e}")))?;

        match channel.receive() {
            Ok(Received::Message(Incoming::HookResult(answer))) if answer.call == *self.call => {
                answer.into_result().map_err(HostCallError)
            }
            Ok(Received::Message(Incoming::HookResult(answer))) => Err(HostCallError(format!(
                "Hook result for call {} while call {} was waiting",
                answer.call, self.call
            ))),
            Ok(Received::Message(Incoming::Call(other))) => Err(HostCallError(format!(
                "Received call {} while waiting for a hook result",
                other.id
            ))),
            Ok(Received::Malformed { reason, .. }) => Err(HostCallError(reason)),
            Ok(Received::Closed) => Err(HostCallError(
                "Host closed the channel during a hook".to_string(),
            )),
            Err(e) => Err(HostCallError(format!("Could not reach host: {e}"))),
        }
    }
}

fn string_args(args: &[Value]) -> Result<Vec<String>, BridgeError> {
    args.iter()
        .enumerate()
        .map(|(index, arg)| {
            arg.as_str().map(str::to_owned).ok_or_else(|| {
                BridgeError::arguments(format!("argument {index} must be a JSON string"))
            })
        })
        .collect()
}

/// The code passed to `exit`. Hosts that only have doubles send `7.0`;
/// any integral number in `i32` range is accepted.
fn exit_code(args: &[Value]) -> Result<i32, BridgeError> {
    let Some(arg) = args.first().filter(|arg| !arg.is_null()) else {
        return Ok(exit_codes::SUCCESS);
    };
    let code = match arg.as_i64() {
        Some(code) => i32::try_from(code).ok(),
        None => arg
            .as_f64()
            .filter(|code| code.fract() == 0.0)
            .filter(|code| (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(code))
            .map(|code| code as i32),
    };
    code.ok_or_else(|| {
        BridgeError::arguments(format!("exit code must be an integer, got {arg}"))
    })
}
