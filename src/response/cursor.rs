//! Opaque connection cursors: `base64("arrayconnection:" + offset)`.

use base64::{Engine, engine::general_purpose::STANDARD};

const PREFIX: &str = "arrayconnection:";

pub fn offset_to_cursor(offset: usize) -> String {
    STANDARD.encode(format!("{}{}", PREFIX, offset))
}

/// Offset encoded in `cursor`, or `None` for anything that is not a cursor
/// this module produced.
pub fn cursor_to_offset(cursor: &str) -> Option<usize> {
    let decoded = STANDARD.decode(cursor).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    text.strip_prefix(PREFIX)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_format() {
        assert_eq!(offset_to_cursor(4), "YXJyYXljb25uZWN0aW9uOjQ=");
        assert_eq!(cursor_to_offset("YXJyYXljb25uZWN0aW9uOjQ="), Some(4));
    }

    #[test]
    fn test_foreign_cursors_are_rejected() {
        assert_eq!(cursor_to_offset("not base64!"), None);
        // base64("offset:4")
        assert_eq!(cursor_to_offset("b2Zmc2V0OjQ="), None);
        // base64("arrayconnection:x")
        assert_eq!(cursor_to_offset("YXJyYXljb25uZWN0aW9uOng="), None);
    }
}
