//! Prompt template loading and composition.
//!
//! A template is plain text with two named slots, `{basis_pengetahuan}` for
//! the knowledge buffer and `{prompt}` for the user's question. Literal
//! braces are written `{{` and `}}`. The template is parsed once; composing
//! a prompt never re-scans substituted text.

use std::path::Path;

use tracing::debug;

use docchat_shared::{DocChatError, Result};

/// Slot replaced by the knowledge buffer.
pub const KNOWLEDGE_SLOT: &str = "basis_pengetahuan";

/// Slot replaced by the user's question.
pub const QUESTION_SLOT: &str = "prompt";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Knowledge,
    Question,
}

/// A parsed prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Read and parse a template file. A missing file is `TemplateMissing`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DocChatError::TemplateMissing {
                path: path.to_path_buf(),
            },
            _ => DocChatError::io(path, e),
        })?;

        let template = Self::parse(&content)?;
        debug!(?path, segments = template.segments.len(), "prompt template loaded");
        Ok(template)
    }

    /// Parse template text, requiring both slots and rejecting unknown ones.
    pub fn parse(text: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let rest = &text[pos + 1..];
                    let Some(close) = rest.find('}') else {
                        return Err(DocChatError::template_invalid(format!(
                            "unclosed '{{' at byte {pos}"
                        )));
                    };
                    let name = &rest[..close];
                    let slot = match name {
                        KNOWLEDGE_SLOT => Segment::Knowledge,
                        QUESTION_SLOT => Segment::Question,
                        other => {
                            return Err(DocChatError::template_invalid(format!(
                                "unknown slot {{{other}}} at byte {pos} (use {{{{ and }}}} for literal braces)"
                            )));
                        }
                    };
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(slot);
                    // skip the name and the closing brace
                    for _ in 0..name.chars().count() + 1 {
                        chars.next();
                    }
                }
                '}' => {
                    return Err(DocChatError::template_invalid(format!(
                        "unmatched '}}' at byte {pos}"
                    )));
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        for (slot, segment) in [(KNOWLEDGE_SLOT, Segment::Knowledge), (QUESTION_SLOT, Segment::Question)] {
            if !segments.contains(&segment) {
                return Err(DocChatError::template_invalid(format!(
                    "missing required slot {{{slot}}}"
                )));
            }
        }

        Ok(Self { segments })
    }

    /// Substitute the knowledge buffer and question. No escaping is applied.
    pub fn compose(&self, knowledge: &str, question: &str) -> String {
        let capacity = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Literal(text) => text.len(),
                Segment::Knowledge => knowledge.len(),
                Segment::Question => question.len(),
            })
            .sum();

        let mut out = String::with_capacity(capacity);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Knowledge => out.push_str(knowledge),
                Segment::Question => out.push_str(question),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn composes_both_slots() {
        let template = PromptTemplate::parse("KB:{basis_pengetahuan} Q:{prompt}").unwrap();
        assert_eq!(template.compose("KB1", "hi"), "KB:KB1 Q:hi");
    }

    #[test]
    fn substitution_is_single_pass() {
        let template = PromptTemplate::parse("{basis_pengetahuan}|{prompt}").unwrap();
        let out = template.compose("contains {prompt}", "asks about {basis_pengetahuan}");
        assert_eq!(out, "contains {prompt}|asks about {basis_pengetahuan}");
    }

    #[test]
    fn doubled_braces_are_literals() {
        let template =
            PromptTemplate::parse("{{\"answer\": \"...\"}}\n{basis_pengetahuan}\n{prompt}").unwrap();
        assert_eq!(template.compose("K", "Q"), "{\"answer\": \"...\"}\nK\nQ");
    }

    #[test]
    fn slots_may_repeat() {
        let template = PromptTemplate::parse("{prompt}\n{basis_pengetahuan}\n{prompt}").unwrap();
        assert_eq!(template.compose("K", "Q"), "Q\nK\nQ");
    }

    #[test]
    fn non_ascii_literals_survive() {
        let template =
            PromptTemplate::parse("Jawab: {prompt} ✓ {basis_pengetahuan} ✓").unwrap();
        assert_eq!(template.compose("K", "Q"), "Jawab: Q ✓ K ✓");
    }

    #[test]
    fn missing_slot_is_invalid() {
        let err = PromptTemplate::parse("Only {prompt}").unwrap_err();
        assert!(matches!(err, DocChatError::TemplateInvalid { .. }));
        assert!(err.to_string().contains("basis_pengetahuan"));
    }

    #[test]
    fn unknown_slot_is_invalid() {
        let err = PromptTemplate::parse("{basis_pengetahuan} {prompt} {context}").unwrap_err();
        assert!(err.to_string().contains("unknown slot {context}"));
    }

    #[test]
    fn stray_braces_are_invalid() {
        assert!(PromptTemplate::parse("{basis_pengetahuan} {prompt} }").is_err());
        assert!(PromptTemplate::parse("{basis_pengetahuan} {prompt} {").is_err());
    }

    #[test]
    fn missing_file_is_template_missing() {
        let path = std::env::temp_dir().join(format!("docchat-missing-{}.txt", Uuid::now_v7()));
        let err = PromptTemplate::load(&path).unwrap_err();
        assert!(matches!(err, DocChatError::TemplateMissing { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn loads_from_file() {
        let path = std::env::temp_dir().join(format!("docchat-template-{}.txt", Uuid::now_v7()));
        std::fs::write(&path, "Context:\n{basis_pengetahuan}\n\nQuestion: {prompt}\n").unwrap();

        let template = PromptTemplate::load(&path).unwrap();
        assert_eq!(template.compose("K", "Q"), "Context:\nK\n\nQuestion: Q\n");

        let _ = std::fs::remove_file(&path);
    }
}
