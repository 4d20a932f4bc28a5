//! User-facing error message templates.
//!
//! The `[error_messages]` table maps a scenario name to a template with
//! `{name}` placeholders. Scenarios missing from the config fall back to
//! built-in English defaults.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DocChatError;

/// Built-in templates, keyed by scenario.
const DEFAULT_MESSAGES: &[(&str, &str)] = &[
    ("config_invalid", "Failed to load configuration: {error}"),
    (
        "secrets_not_found",
        "Secrets are not configured. Provide the service account fields, gemini_api_key and folder_id in the secrets file (missing: {missing}).",
    ),
    (
        "folder_id_missing",
        "The Google Drive folder ID is not set in the secrets file.",
    ),
    (
        "template_not_found",
        "Prompt template file '{file_name}' was not found.",
    ),
    ("template_invalid", "The prompt template is invalid: {error}"),
    (
        "no_documents",
        "No Google Docs or PDF files were found in the folder. Check that the folder ID is correct and the files are shared with the service account.",
    ),
    (
        "source_unavailable",
        "Could not read documents from Google Drive: {error}. Check the service account credentials and that the folder is shared with the service account email.",
    ),
    ("extraction_failed", "Could not read '{file_name}': {error}"),
    ("generation_failed", "The model could not answer: {error}"),
    ("io_error", "File error: {error}"),
];

/// `[error_messages]` section: scenario name → message template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorMessages(pub BTreeMap<String, String>);

impl ErrorMessages {
    /// A table populated with every built-in template.
    pub fn builtin() -> Self {
        Self(
            DEFAULT_MESSAGES
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    /// The template for `scenario`, falling back to the built-in default.
    pub fn template(&self, scenario: &str) -> &str {
        if let Some(t) = self.0.get(scenario) {
            return t;
        }
        DEFAULT_MESSAGES
            .iter()
            .find(|(k, _)| *k == scenario)
            .map(|(_, v)| *v)
            .unwrap_or("{error}")
    }

    /// Render the template for `scenario` with the given named values.
    pub fn render(&self, scenario: &str, args: &[(&str, String)]) -> String {
        render_placeholders(self.template(scenario), args)
    }

    /// Render the user-facing message for an error.
    pub fn for_error(&self, err: &DocChatError) -> String {
        self.render(err.scenario(), &err.message_args())
    }
}

/// Substitute `{name}` placeholders in `template`.
///
/// `{{` and `}}` render as literal braces. Placeholders without a value are
/// left untouched so a mistyped key stays visible in the output.
pub fn render_placeholders(template: &str, args: &[(&str, String)]) -> String {
    static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex")
    });

    PLACEHOLDER_RE
        .replace_all(template, |caps: &regex::Captures<'_>| match &caps[0] {
            "{{" => "{".to_string(),
            "}}" => "}".to_string(),
            whole => {
                let name = &caps[1];
                args.iter()
                    .find(|(k, _)| *k == name)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_else(|| whole.to_string())
            }
        })
        .into_owned()
}
