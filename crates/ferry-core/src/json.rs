use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::status::StructuredStatus;

/// Errors produced while rendering JSON
#[derive(Debug, Error)]
pub enum SerializeError {
    /// `Any` details need a type registry to be rendered, which the printer does not have
    #[error("cannot print detail of type `{type_url}` without a type registry")]
    UnsupportedDetail { type_url: String },

    /// The payload could not be encoded
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON rendering options, fixed at construction and shared by every call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonPrinter {
    pretty: bool,
    include_default_fields: bool,
}

impl JsonPrinter {
    pub const fn new() -> Self {
        Self {
            pretty: false,
            include_default_fields: false,
        }
    }

    /// Indent output over multiple lines
    #[must_use]
    pub const fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Emit status fields even when they hold their default value
    #[must_use]
    pub const fn include_default_fields(mut self, include: bool) -> Self {
        self.include_default_fields = include;
        self
    }

    /// Single-line variant of this printer
    ///
    /// Streamed items must not span lines so that every item stays a
    /// single server-sent event.
    #[must_use]
    pub const fn compact(self) -> Self {
        self.pretty(false)
    }

    /// Render any serializable payload
    ///
    /// # Errors
    ///
    /// Returns an error if `serde_json` cannot encode the value
    pub fn print<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, SerializeError> {
        let text = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };

        Ok(text)
    }

    /// Render a status in the proto3 JSON form of `google.rpc.Status`
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError::UnsupportedDetail`] if the status carries
    /// any detail payloads
    pub fn print_status(&self, status: &StructuredStatus) -> Result<String, SerializeError> {
        if let Some(detail) = status.details().first() {
            return Err(SerializeError::UnsupportedDetail {
                type_url: detail.type_url.clone(),
            });
        }

        let code = status.code() as i32;
        let mut object = Map::new();

        if code != 0 || self.include_default_fields {
            object.insert("code".to_owned(), Value::from(code));
        }
        if !status.message().is_empty() || self.include_default_fields {
            object.insert("message".to_owned(), Value::from(status.message()));
        }
        if self.include_default_fields {
            object.insert("details".to_owned(), Value::Array(Vec::new()));
        }

        self.print(&Value::Object(object))
    }
}

/// Renders statuses, dropping details the printer cannot represent
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusSerializer {
    printer: JsonPrinter,
}

impl StatusSerializer {
    pub const fn new(printer: JsonPrinter) -> Self {
        Self { printer }
    }

    /// Serialize a status to JSON text
    ///
    /// A status with details is rendered from a details-free copy; the value
    /// passed in is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error only if the printer cannot produce any output
    pub fn serialize(&self, status: &StructuredStatus) -> Result<String, SerializeError> {
        if status.details().is_empty() {
            self.printer.print_status(status)
        } else {
            self.printer.print_status(&status.without_details())
        }
    }
}
