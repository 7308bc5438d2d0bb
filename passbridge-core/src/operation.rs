//! The callable surface registered with the host.

use std::fmt;
use std::str::FromStr;

/// Operations a host can invoke, under the names hosts call them by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Exit,
    Init,
    BeginRegistration,
    FinishRegistration,
    BeginLogin,
    FinishLogin,
}

impl Operation {
    /// Registration order of the surface.
    pub const ALL: [Operation; 6] = [
        Operation::Exit,
        Operation::Init,
        Operation::BeginRegistration,
        Operation::FinishRegistration,
        Operation::BeginLogin,
        Operation::FinishLogin,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Exit => "exit",
            Operation::Init => "init",
            Operation::BeginRegistration => "beginRegistration",
            Operation::FinishRegistration => "finishRegistration",
            Operation::BeginLogin => "beginLogin",
            Operation::FinishLogin => "finishLogin",
        }
    }

    /// Whether the operation takes option hooks after its first argument.
    pub fn accepts_hooks(self) -> bool {
        matches!(self, Operation::BeginRegistration | Operation::BeginLogin)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| format!("Unknown operation: {s}"))
    }
}
