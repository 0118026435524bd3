//! The last-operation status every [super::DecodedFrame] carries.

use std::fmt::{self, Display, Formatter};

/// Whether the last operation on a frame handle (e.g. decoding into it)
/// succeeded. A failure keeps a machine-readable code (the backend's error
/// number, `0` if it has none) and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FrameStatus {
    #[default]
    Ok,
    Failed { code: i32, message: String },
}

impl FrameStatus {
    /// A failed status.
    pub fn failed(code: i32, message: impl Into<String>) -> Self {
        Self::Failed {
            code,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn is_failed(&self) -> bool {
        !self.is_ok()
    }

    /// The error code, `0` for [FrameStatus::Ok].
    pub fn code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Failed { code, .. } => *code,
        }
    }

    /// The error message, empty for [FrameStatus::Ok].
    pub fn message(&self) -> &str {
        match self {
            Self::Ok => "",
            Self::Failed { message, .. } => message,
        }
    }
}

impl Display for FrameStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::Failed { code, message } => write!(f, "failed with code {code}: {message}"),
        }
    }
}
