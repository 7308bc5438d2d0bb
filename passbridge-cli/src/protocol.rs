//! Newline-delimited JSON messages exchanged with the host over stdio.
//!
//! Call ids and hook handles are chosen by the host and echoed back
//! untouched, so they are kept as raw JSON values.

use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Adapter to host.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Outgoing {
    /// The callable surface, sent once at start.
    Register {
        namespace: String,
        operations: Vec<&'static str>,
    },
    /// Run host function `hook` on `options` for call `call`.
    Hook {
        call: Value,
        hook: Value,
        options: String,
    },
    /// Completion for call `call`.
    Done { call: Value, args: Vec<Value> },
}

/// Host to adapter.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Incoming {
    Call(Call),
    HookResult(HookResult),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Call {
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub hooks: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HookResult {
    pub call: Value,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl HookResult {
    /// The replacement options, or the host's failure message.
    pub fn into_result(self) -> Result<String, String> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(error),
            (Some(result), None) => Ok(result),
            (None, None) => Err("hook returned nothing".to_string()),
        }
    }
}

/// One line read from the host.
#[derive(Debug)]
pub enum Received {
    Message(Incoming),
    /// Not a message we understand; `call` is the id if one could be found.
    Malformed { call: Value, reason: String },
    /// The host closed its end.
    Closed,
}

/// Line-framed JSON over a reader and writer pair.
pub struct Channel<R, W> {
    reader: R,
    writer: W,
    line: String,
}

impl<R: BufRead, W: Write> Channel<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            line: String::new(),
        }
    }

    pub fn send(&mut self, message: &Outgoing) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, message)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    /// Next non-blank line, decoded.
    pub fn receive(&mut self) -> io::Result<Received> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(Received::Closed);
            }
            let text = self.line.trim();
            if text.is_empty() {
                continue;
            }
            return Ok(parse(text));
        }
    }
}

fn parse(text: &str) -> Received {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            return Received::Malformed {
                call: Value::Null,
                reason: format!("Malformed message: {e}"),
            }
        }
    };

    let call = value
        .get("id")
        .or_else(|| value.get("call"))
        .cloned()
        .unwrap_or(Value::Null);

    match serde_json::from_value(value) {
        Ok(message) => Received::Message(message),
        Err(e) => Received::Malformed {
            call,
            reason: format!("Malformed message: {e}"),
        },
    }
}
