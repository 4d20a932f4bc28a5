//! Exported text of native documents.

use docchat_shared::{DocChatError, Result};

const BOM: char = '\u{feff}';

/// Decode an exported document as UTF-8.
///
/// Strips a leading byte-order mark and normalizes line endings to `\n`.
pub fn decode(name: &str, raw: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(raw).map_err(|e| {
        DocChatError::extraction(name, format!("export is not valid UTF-8: {e}"))
    })?;

    let text = text.strip_prefix(BOM).unwrap_or(text);
    Ok(text.replace("\r\n", "\n").replace('\r', "\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bom_and_normalizes_newlines() {
        let raw = "\u{feff}Line one\r\nLine two\rLine three\n".as_bytes();
        assert_eq!(
            decode("doc", raw).unwrap(),
            "Line one\nLine two\nLine three\n"
        );
    }

    #[test]
    fn keeps_non_ascii_text() {
        let raw = "Basis pengetahuan: cuti tahunan 12 hari \u{2014} ok".as_bytes();
        assert!(decode("doc", raw).unwrap().contains("\u{2014}"));
    }

    #[test]
    fn empty_export_is_empty_text() {
        assert_eq!(decode("doc", b"").unwrap(), "");
    }

    #[test]
    fn invalid_utf8_names_the_document() {
        let err = decode("Broken Doc", &[0x66, 0x6f, 0xff, 0xfe]).unwrap_err();
        assert!(err.to_string().contains("Broken Doc"));
        assert!(err.to_string().contains("UTF-8"));
    }
}
