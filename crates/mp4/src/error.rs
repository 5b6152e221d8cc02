/// Errors produced while parsing an MP4 container.
#[derive(Debug, thiserror::Error)]
pub enum Mp4Error {
    #[error("required box `{fourcc}` is missing")]
    MissingBox { fourcc: &'static str },

    #[error("malformed container: {reason}")]
    Malformed { reason: String },

    #[error("unsupported codec `{fourcc}`")]
    UnsupportedCodec { fourcc: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl Mp4Error {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// True for structural container errors (as opposed to I/O failures).
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MissingBox { .. } | Self::Malformed { .. })
    }
}
