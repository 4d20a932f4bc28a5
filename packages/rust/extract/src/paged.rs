//! Page-by-page text of fixed-layout (PDF) documents.

use lopdf::Document;
use tracing::{debug, warn};

use docchat_shared::{DocChatError, Result};

/// Extract the text of every page in order and concatenate it.
///
/// No separator is inserted between pages. A document with no pages yields
/// an empty string.
pub fn extract_pages(name: &str, raw: &[u8]) -> Result<String> {
    let mut doc = Document::load_mem(raw)
        .map_err(|e| DocChatError::extraction(name, format!("cannot open document: {e}")))?;

    // Permission-only encryption uses an empty user password.
    if doc.is_encrypted() {
        doc.decrypt("").map_err(|e| {
            DocChatError::extraction(name, format!("document is password protected: {e}"))
        })?;
        debug!(document = name, "decrypted with empty user password");
    }

    let pages = doc.get_pages();
    if pages.is_empty() {
        warn!(document = name, "document has no pages");
    }

    let mut out = String::new();
    // `get_pages` is a BTreeMap keyed by page number, so iteration is in order
    for &number in pages.keys() {
        let text = doc.extract_text(&[number]).map_err(|e| {
            DocChatError::extraction(name, format!("page {number}: {e}"))
        })?;
        out.push_str(&text);
    }

    debug!(document = name, pages = pages.len(), "extracted pages");
    Ok(out)
}
