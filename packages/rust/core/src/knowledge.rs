//! Knowledge buffer aggregation.
//!
//! Every extracted document is wrapped in begin/end markers naming its
//! source and the blocks are concatenated in input order.

use docchat_shared::ExtractedText;

/// The concatenated, marker-delimited text of every source document.
///
/// Built wholesale by [`aggregate`]; never edited in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBuffer {
    text: String,
    documents: Vec<String>,
}

impl KnowledgeBuffer {
    /// The full buffer text, as substituted into prompts.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Names of the aggregated documents, in buffer order.
    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    /// Size of the buffer in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl std::fmt::Display for KnowledgeBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Opening marker for a document block.
pub fn begin_marker(name: &str) -> String {
    format!("--- Begin Document: {name} ---")
}

/// Closing marker for a document block.
pub fn end_marker(name: &str) -> String {
    format!("--- End Document: {name} ---")
}

/// Wrap and concatenate extracted texts. Deterministic for a given input.
pub fn aggregate(texts: &[ExtractedText]) -> KnowledgeBuffer {
    let capacity = texts
        .iter()
        .map(|t| t.body.len() + 2 * t.source_name.len() + 48)
        .sum();
    let mut text = String::with_capacity(capacity);

    for doc in texts {
        text.push_str("\n\n");
        text.push_str(&begin_marker(&doc.source_name));
        text.push('\n');
        text.push_str(&doc.body);
        text.push('\n');
        text.push_str(&end_marker(&doc.source_name));
        text.push('\n');
    }

    KnowledgeBuffer {
        text,
        documents: texts.iter().map(|t| t.source_name.clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs() -> Vec<ExtractedText> {
        vec![ExtractedText::new("A", "x"), ExtractedText::new("B", "y")]
    }

    #[test]
    fn exact_block_layout() {
        let buffer = aggregate(&[ExtractedText::new("Policy", "Leave: 12 days")]);
        assert_eq!(
            buffer.as_str(),
            "\n\n--- Begin Document: Policy ---\nLeave: 12 days\n--- End Document: Policy ---\n"
        );
        assert_eq!(buffer.documents(), ["Policy".to_string()]);
    }

    #[test]
    fn aggregate_is_deterministic() {
        let a = aggregate(&docs());
        let b = aggregate(&docs());
        assert_eq!(a.as_str().as_bytes(), b.as_str().as_bytes());
    }

    #[test]
    fn each_body_sits_once_between_its_markers() {
        let buffer = aggregate(&docs());
        let text = buffer.as_str();

        assert!(text.contains("--- Begin Document: A ---"));
        assert!(text.contains("--- End Document: B ---"));

        for (name, body) in [("A", "x"), ("B", "y")] {
            let start = text.find(&begin_marker(name)).unwrap() + begin_marker(name).len();
            let end = text.find(&end_marker(name)).unwrap();
            assert!(start < end);
            assert_eq!(text[start..end].trim(), body);
            assert_eq!(text.matches(body).count(), 1);
        }
    }

    #[test]
    fn input_order_is_preserved() {
        let buffer = aggregate(&docs());
        let a = buffer.as_str().find("Begin Document: A").unwrap();
        let b = buffer.as_str().find("Begin Document: B").unwrap();
        assert!(a < b);
    }

    #[test]
    fn empty_input_is_empty_buffer() {
        let buffer = aggregate(&[]);
        assert!(buffer.is_empty());
        assert!(buffer.documents().is_empty());
    }
}
