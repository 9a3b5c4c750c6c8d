use std::fmt;

use crate::status_code::{self, status_code_t, ErrorKind};

/// Error value of every fallible directory operation.
///
/// The code decides behavior; the message only feeds logs and replies.
/// Callers branch on [`Status::kind`], never on message text. A successful
/// call returns `Ok`, so a `Status` never carries `StatusCode::OK` in
/// practice.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Status {
    code: status_code_t,
    message: Option<String>,
}

impl Status {
    pub fn new(code: status_code_t) -> Self {
        Self {
            code,
            message: None,
        }
    }

    /// A status whose message names the path, key or volume involved.
    pub fn with_message(code: status_code_t, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(msg.into()),
        }
    }

    /// Wire value placed in a reply's `ret` field.
    pub fn code(&self) -> status_code_t {
        self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn kind(&self) -> ErrorKind {
        status_code::kind_of(self.code)
    }

    /// `Name(code) message`, e.g. `Meta::NotFound(3000) file /a/b not found`.
    pub fn describe(&self) -> String {
        let name = status_code::to_string(self.code);
        match &self.message {
            Some(msg) => format!("{}({}) {}", name, self.code, msg),
            None => format!("{}({})", name, self.code),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl std::error::Error for Status {}
