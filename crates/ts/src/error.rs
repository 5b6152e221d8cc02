/// Errors produced while muxing (or, in tests, inspecting) transport
/// stream data.
#[derive(Debug, thiserror::Error)]
pub enum TsError {
    #[error("fragment contains no samples for the available tracks")]
    EmptyFragment,

    #[error("invalid packet size: {0} (expected 188)")]
    InvalidPacketSize(usize),

    #[error("invalid sync byte: {0:#04x}")]
    InvalidSyncByte(u8),

    #[error("insufficient data: expected {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("invalid codec configuration: {reason}")]
    CodecConfig { reason: String },

    #[error("invalid sample payload: {reason}")]
    InvalidSample { reason: String },
}

impl TsError {
    pub fn codec_config(reason: impl Into<String>) -> Self {
        Self::CodecConfig {
            reason: reason.into(),
        }
    }

    pub fn invalid_sample(reason: impl Into<String>) -> Self {
        Self::InvalidSample {
            reason: reason.into(),
        }
    }
}
