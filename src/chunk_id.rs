//! Chunk identifiers: `"<doc_id>__<ordinal>"`, with the ordinal zero-based
//! and contiguous within a document.

/// Separator between the document id and the chunk ordinal.
const SEPARATOR: &str = "__";

/// Derive the chunk id for the given document and ordinal position.
///
/// # Examples
///
/// ```
/// use ragstore::chunk_id::chunk_id;
///
/// assert_eq!(chunk_id("docA", 0), "docA__0");
/// assert_eq!(chunk_id("docA", 12), "docA__12");
/// ```
pub fn chunk_id(doc_id: &str, ordinal: u32) -> String {
    format!("{doc_id}{SEPARATOR}{ordinal}")
}

/// Split a chunk id back into `(doc_id, ordinal)`.
///
/// Splits on the *last* separator, so document ids that themselves contain
/// `__` round-trip. Returns `None` if the separator is absent or the
/// ordinal is not a number.
pub fn parse_chunk_id(chunk_id: &str) -> Option<(&str, u32)> {
    let (doc_id, ordinal) = chunk_id.rsplit_once(SEPARATOR)?;
    Some((doc_id, ordinal.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        assert_eq!(chunk_id("docA", 0), chunk_id("docA", 0));
        assert_eq!(chunk_id("docA", 3), "docA__3");
    }

    #[test]
    fn roundtrip() {
        let id = chunk_id("report-2024", 7);
        assert_eq!(parse_chunk_id(&id), Some(("report-2024", 7)));
    }

    #[test]
    fn doc_id_containing_separator() {
        let id = chunk_id("a__b", 3);
        assert_eq!(id, "a__b__3");
        assert_eq!(parse_chunk_id(&id), Some(("a__b", 3)));
    }

    #[test]
    fn parse_rejects_malformed() {
        assert_eq!(parse_chunk_id("no-separator"), None);
        assert_eq!(parse_chunk_id("doc__notanumber"), None);
        assert_eq!(parse_chunk_id("doc__"), None);
    }
}
