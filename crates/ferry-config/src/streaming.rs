use serde::Deserialize;

/// Server-streaming call configuration
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamingConfig {
    /// Number of framed items buffered ahead of a slow client
    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            buffer: default_buffer(),
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_buffer() -> usize {
    16
}
