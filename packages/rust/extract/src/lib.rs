//! Plain-text extraction for the two accepted document kinds.
//!
//! - [`native`]: exported text of cloud-native documents (UTF-8 decode and cleanup)
//! - [`paged`]: page-by-page text of fixed-layout documents

pub mod native;
pub mod paged;

use tracing::{debug, instrument};

use docchat_shared::{ContentType, ExtractedText, Result, SourceItem};

/// Convert one downloaded item into plain text.
///
/// Undecodable content fails with `ExtractionFailed` naming the item; the
/// caller decides whether to skip it.
#[instrument(skip_all, fields(document = %item.name, kind = %item.content_type, bytes = raw.len()))]
pub fn extract(item: &SourceItem, raw: &[u8]) -> Result<ExtractedText> {
    let body = match item.content_type {
        ContentType::NativeDocument => native::decode(&item.name, raw)?,
        ContentType::PagedDocument => paged::extract_pages(&item.name, raw)?,
    };
    debug!(chars = body.chars().count(), "extracted text");
    Ok(ExtractedText::new(item.name.clone(), body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_shared::DocChatError;

    fn item(name: &str, content_type: ContentType) -> SourceItem {
        SourceItem {
            id: format!("id-{name}"),
            name: name.into(),
            content_type,
        }
    }

    #[test]
    fn native_document_dispatch() {
        let text = extract(&item("Policy", ContentType::NativeDocument), b"Leave: 12 days")
            .expect("extract");
        assert_eq!(text.source_name, "Policy");
        assert_eq!(text.body, "Leave: 12 days");
    }

    #[test]
    fn paged_document_dispatch_rejects_garbage() {
        let err = extract(&item("scan.pdf", ContentType::PagedDocument), b"not a pdf")
            .unwrap_err();
        match err {
            DocChatError::ExtractionFailed { source_name, .. } => {
                assert_eq!(source_name, "scan.pdf")
            }
            other => panic!("expected ExtractionFailed, got {other:?}"),
        }
    }
}
