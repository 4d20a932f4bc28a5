//! Error types for DocChat.
//!
//! Library crates use [`DocChatError`] via `thiserror`.
//! App crates (cli/tui) wrap this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Boxed underlying cause attached to transport-level errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all DocChat operations.
#[derive(Debug, thiserror::Error)]
pub enum DocChatError {
    /// Configuration file missing or malformed.
    #[error("config error: {message}")]
    Config { message: String },

    /// Required secrets (credentials, API key, folder id) are absent.
    #[error("configuration incomplete: missing {}", .missing.join(", "))]
    ConfigurationIncomplete { missing: Vec<String> },

    /// The prompt template file could not be located.
    #[error("prompt template not found at {path:?}")]
    TemplateMissing { path: PathBuf },

    /// The prompt template does not have the expected named slots.
    #[error("invalid prompt template: {message}")]
    TemplateInvalid { message: String },

    /// The folder listing yielded no accepted documents.
    #[error("no documents found in folder {folder_id}")]
    NoDocumentsFound { folder_id: String },

    /// Document store transport or auth failure.
    #[error("source unavailable: {message}")]
    SourceUnavailable {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A single document could not be decoded into text.
    #[error("extraction failed for {source_name}: {message}")]
    ExtractionFailed {
        source_name: String,
        message: String,
    },

    /// Completion service transport, auth, or quota failure.
    #[error("generation failed: {message}")]
    GenerationFailed {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocChatError>;

impl DocChatError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a configuration-incomplete error naming the missing pieces.
    pub fn incomplete<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ConfigurationIncomplete {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a template-invalid error from any displayable message.
    pub fn template_invalid(msg: impl Into<String>) -> Self {
        Self::TemplateInvalid {
            message: msg.into(),
        }
    }

    /// Source failure with the underlying cause attached.
    pub fn source_unavailable(
        msg: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::SourceUnavailable {
            message: msg.into(),
            source: Some(Box::new(cause)),
        }
    }

    /// Source failure without a lower-level cause (e.g. an HTTP status).
    pub fn source_status(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            message: msg.into(),
            source: None,
        }
    }

    /// Create an extraction error for a named document.
    pub fn extraction(source_name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            source_name: source_name.into(),
            message: msg.into(),
        }
    }

    /// Generation failure with the underlying cause attached.
    pub fn generation_failed(
        msg: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::GenerationFailed {
            message: msg.into(),
            source: Some(Box::new(cause)),
        }
    }

    /// Generation failure without a lower-level cause.
    pub fn generation_status(msg: impl Into<String>) -> Self {
        Self::GenerationFailed {
            message: msg.into(),
            source: None,
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must halt the session before (or instead of) chat.
    ///
    /// Per-turn failures (`GenerationFailed`) and per-document failures
    /// (`ExtractionFailed`) leave the session usable.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::GenerationFailed { .. } | Self::ExtractionFailed { .. }
        )
    }

    /// Whether this error ends a session that is already chatting.
    ///
    /// An unreachable source only halts startup; once a session is running, a
    /// failed rebuild is reported for that turn and the next one retries.
    pub fn halts_chat(&self) -> bool {
        self.is_fatal() && !matches!(self, Self::SourceUnavailable { .. })
    }

    /// Key into the `[error_messages]` table for this error.
    pub fn scenario(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config_invalid",
            Self::ConfigurationIncomplete { missing }
                if missing.len() == 1 && missing[0] == "folder_id" =>
            {
                "folder_id_missing"
            }
            Self::ConfigurationIncomplete { .. } => "secrets_not_found",
            Self::TemplateMissing { .. } => "template_not_found",
            Self::TemplateInvalid { .. } => "template_invalid",
            Self::NoDocumentsFound { .. } => "no_documents",
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::ExtractionFailed { .. } => "extraction_failed",
            Self::GenerationFailed { .. } => "generation_failed",
            Self::Io { .. } => "io_error",
        }
    }

    /// Named values available to the scenario's message template.
    pub fn message_args(&self) -> Vec<(&'static str, String)> {
        let mut args = vec![("error", self.detail())];
        match self {
            Self::ConfigurationIncomplete { missing } => {
                args.push(("missing", missing.join(", ")));
            }
            Self::TemplateMissing { path } => {
                args.push(("file_name", path.display().to_string()));
            }
            Self::NoDocumentsFound { folder_id } => {
                args.push(("folder_id", folder_id.clone()));
            }
            Self::ExtractionFailed { source_name, .. } => {
                args.push(("file_name", source_name.clone()));
            }
            Self::Io { path, .. } => {
                args.push(("file_name", path.display().to_string()));
            }
            _ => {}
        }
        args
    }

    /// The display message followed by each attached cause.
    pub fn detail(&self) -> String {
        let mut out = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            let text = err.to_string();
            // `Io` already renders its source inline
            if !out.ends_with(&text) {
                out.push_str(": ");
                out.push_str(&text);
            }
            cause = err.source();
        }
        out
    }
}
