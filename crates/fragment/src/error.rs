/// Errors decoding a persisted fragment index.
///
/// Every variant means the same thing to callers: the index cannot be
/// trusted and the asset should be treated as having none.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("invalid index magic")]
    Magic,

    #[error("unsupported index format version {0}")]
    Version(u16),

    #[error("truncated index: need {expected} bytes, {actual} remain")]
    Truncated { expected: usize, actual: usize },

    #[error("invalid index field: {reason}")]
    Invalid { reason: String },
}

impl IndexError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

/// Errors reading sample payloads from the source file.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error(
        "sample range {offset}+{size} exceeds source file size {file_size} (stale index?)"
    )]
    OutOfBounds {
        offset: u64,
        size: u32,
        file_size: u64,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}
