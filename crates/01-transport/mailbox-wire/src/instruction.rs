//! Instruction text and the value-returning convention.

use std::fmt;

use crate::{WireError, WireResult};

/// Host variable whose value is copied into the response record.
pub const RESPONSE_VARIABLE: &str = "response$";

/// Prefix that turns an expression into a value-returning instruction.
pub const RESPONSE_MARKER: &str = "response$ = ";

/// Opaque instruction text handed to the host interpreter.
///
/// An instruction assigning into [`RESPONSE_VARIABLE`] expects a value back;
/// anything else is fire-and-forget and is answered with the no-value marker.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Instruction(String);

impl Instruction {
    /// Builds a value-returning instruction from a host expression.
    pub fn query(expression: impl AsRef<str>) -> Self {
        Self(format!("{RESPONSE_MARKER}{}", expression.as_ref()))
    }

    /// Builds a fire-and-forget instruction.
    pub fn command(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Whether the instruction assigns into the response variable.
    pub fn expects_value(&self) -> bool {
        self.query_expression().is_some()
    }

    /// Expression assigned into the response variable, if any.
    pub fn query_expression(&self) -> Option<&str> {
        let rest = self.0.trim_start().strip_prefix(RESPONSE_VARIABLE)?;
        let rest = rest.trim_start().strip_prefix('=')?;
        Some(rest.trim_start())
    }

    /// Checks the instruction fits in a single-line record.
    pub fn validate(&self) -> WireResult<()> {
        if self.0.trim().is_empty() {
            return Err(WireError::EmptyInstruction);
        }
        if self.0.contains(&['\r', '\n'][..]) {
            return Err(WireError::MultiLineInstruction);
        }
        Ok(())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Instruction {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Instruction {
    fn from(text: &str) -> Self {
        Self(text.to_owned())
    }
}

impl From<String> for Instruction {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&String> for Instruction {
    fn from(text: &String) -> Self {
        Self(text.clone())
    }
}
