// SPDX-License-Identifier: GPL-3.0-only
//! Error types for the application
//!
//! Every failure is recoverable: the GUI turns an [`AppError`] into a
//! [`Notice`] and keeps running, the command line prints it and exits non-zero.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// The display tool could not be spawned at all
    #[error("{tool} is not available: {source}")]
    ToolUnavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The query command ran but did not succeed
    #[error("{tool} query failed: {reason}")]
    Query { tool: String, reason: String },

    /// The query output was not in a format we understand
    #[error("unrecognized xrandr output: {0}")]
    Parse(String),

    /// Applying brightness to an output failed
    #[error("can't set brightness on {output}: {reason}")]
    Apply { output: String, reason: String },

    /// A subprocess did not finish in time
    #[error("{command} timed out after {after:?}")]
    Timeout { command: String, after: Duration },

    #[error("invalid brightness value {0}")]
    InvalidBrightness(f32),

    /// Reading or writing the settings file failed
    #[error("settings file {path}: {source}")]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file exists but can't be parsed
    #[error("settings file {path} is malformed: {reason}")]
    SettingsFormat { path: PathBuf, reason: String },

    /// Desktop shortcut registration failed
    #[error("hotkey setup failed: {0}")]
    Hotkeys(String),
}

/// Result type alias for AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// The four user-facing failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Missing dependency: controls are disabled
    ToolUnavailable,
    /// Monitor list could not be read: shown as a banner
    QueryParseFailure,
    /// A single brightness change failed
    ApplyFailure,
    /// Settings could not be read or written: defaults are used
    SettingsIoFailure,
}

impl AppError {
    pub fn kind(&self) -> NoticeKind {
        match self {
            AppError::ToolUnavailable { .. } => NoticeKind::ToolUnavailable,
            AppError::Query { .. } | AppError::Parse(_) => NoticeKind::QueryParseFailure,
            AppError::Apply { .. } | AppError::Timeout { .. } | AppError::InvalidBrightness(_) => {
                NoticeKind::ApplyFailure
            }
            AppError::SettingsIo { .. } | AppError::SettingsFormat { .. } => {
                NoticeKind::SettingsIoFailure
            }
            AppError::Hotkeys(_) => NoticeKind::ApplyFailure,
        }
    }
}

/// Cloneable form of an error, carried in UI messages
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether the brightness controls must stay disabled while this notice is shown
    pub fn disables_controls(&self) -> bool {
        self.kind == NoticeKind::ToolUnavailable
    }
}

impl From<&AppError> for Notice {
    fn from(err: &AppError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl From<AppError> for Notice {
    fn from(err: AppError) -> Self {
        Self::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_disables_controls() {
        let err = AppError::ToolUnavailable {
            tool: "xrandr".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        let notice = Notice::from(&err);
        assert_eq!(notice.kind, NoticeKind::ToolUnavailable);
        assert!(notice.disables_controls());
        assert!(notice.message.starts_with("xrandr is not available"));
    }

    #[test]
    fn test_recoverable_kinds() {
        assert_eq!(
            AppError::Parse("empty".into()).kind(),
            NoticeKind::QueryParseFailure
        );
        assert_eq!(
            AppError::Timeout {
                command: "xrandr --output eDP-1".into(),
                after: Duration::from_secs(5),
            }
            .kind(),
            NoticeKind::ApplyFailure
        );
        assert_eq!(
            AppError::SettingsFormat {
                path: PathBuf::from("/tmp/x.kdl"),
                reason: "bad".into(),
            }
            .kind(),
            NoticeKind::SettingsIoFailure
        );
        assert!(!Notice::from(AppError::InvalidBrightness(f32::NAN)).disables_controls());
    }
}
