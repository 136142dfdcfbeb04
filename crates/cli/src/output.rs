//! Command output.
//!
//! Results go to stdout (text or JSON); logs go to stderr via `tracing`.

#![allow(clippy::print_stdout)]

use serde::Serialize;

use crate::CliError;

pub struct Output {
    json: bool,
}

impl Output {
    pub const fn new(json: bool) -> Self {
        Self { json }
    }

    /// Print `value` as JSON, or the text produced by `render`.
    pub fn emit<T, F>(&self, value: &T, render: F) -> Result<(), CliError>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&T) -> String,
    {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            let text = render(value);
            if !text.is_empty() {
                println!("{text}");
            }
        }
        Ok(())
    }

    /// Print a plain status line (JSON mode wraps it as `{"message": ...}`).
    pub fn message(&self, message: &str) -> Result<(), CliError> {
        self.emit(&serde_json::json!({ "message": message }), |_| {
            message.to_string()
        })
    }
}
