use crate::config::ConfigError;
use crate::edit::EditError;
use crate::journal::JournalError;
use crate::safety::SafetyError;
use crate::settings::SettingsError;
use crate::template::TemplateError;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse error categories reported to the caller alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// A required template, directory or target file does not exist
    TargetNotExist,
    /// No template directory matches the requested module
    UnknownModule,
    InvalidArgument,
    Template,
    Io,
    Config,
    /// A write would land outside the root or inside a protected tree
    Unsafe,
}

impl ErrorCode {
    /// Numeric code, used as the process exit status.
    pub fn as_u8(self) -> u8 {
        match self {
            ErrorCode::TargetNotExist => 2,
            ErrorCode::UnknownModule => 3,
            ErrorCode::InvalidArgument => 4,
            ErrorCode::Template => 5,
            ErrorCode::Io => 6,
            ErrorCode::Config => 7,
            ErrorCode::Unsafe => 8,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::TargetNotExist => "target-not-exist",
            ErrorCode::UnknownModule => "unknown-module",
            ErrorCode::InvalidArgument => "invalid-argument",
            ErrorCode::Template => "template",
            ErrorCode::Io => "io",
            ErrorCode::Config => "config",
            ErrorCode::Unsafe => "unsafe",
        };
        f.write_str(name)
    }
}

/// The single typed error surfaced by every scaffolding operation.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{what} not found: {}", .path.display())]
    TargetNotExist { what: &'static str, path: PathBuf },

    #[error("no template directory for module '{module}'{}", suggestion_suffix(.suggestion))]
    UnknownModule {
        module: String,
        suggestion: Option<String>,
    },

    #[error("no root macro in {} covers {}", .file.display(), .path.display())]
    NoRootMacro { file: PathBuf, path: PathBuf },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to render {}: {source}", .path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error(transparent)]
    Journal(#[from] JournalError),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean '{name}'?)"),
        None => String::new(),
    }
}

impl ToolError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ToolError::TargetNotExist { .. } | ToolError::NoRootMacro { .. } => {
                ErrorCode::TargetNotExist
            }
            ToolError::UnknownModule { .. } => ErrorCode::UnknownModule,
            ToolError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            ToolError::Template { .. } => ErrorCode::Template,
            ToolError::Io { .. } | ToolError::Edit(_) | ToolError::Journal(_) => ErrorCode::Io,
            ToolError::Config(_) | ToolError::Settings(_) => ErrorCode::Config,
            ToolError::Safety(_) => ErrorCode::Unsafe,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ToolError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn missing(what: &'static str, path: impl Into<PathBuf>) -> Self {
        ToolError::TargetNotExist {
            what,
            path: path.into(),
        }
    }
}
