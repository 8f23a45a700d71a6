use serde::Deserialize;

/// JSON printer options shared by every call
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JsonConfig {
    /// Indent unary bodies over multiple lines
    ///
    /// Streamed items are always printed on a single line.
    #[serde(default)]
    pub pretty: bool,
    /// Emit status fields that hold their default value
    #[serde(default)]
    pub include_default_fields: bool,
}
