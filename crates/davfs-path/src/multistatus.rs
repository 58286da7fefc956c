//! Extraction of resource references from directory-listing bodies.

use std::borrow::Cow;

/// One resource reference from a listing body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Decoded reference value. Collections keep their trailing `/`.
    pub path: String,
    /// Derived from the trailing separator of the raw reference.
    pub is_collection: bool,
}

const TAGS: [(&str, &str); 2] = [("<D:href>", "</D:href>"), ("<href>", "</href>")];

/// Scan a multi-status listing body for resource references.
///
/// Both the namespaced and bare tag spellings are accepted; values are
/// percent-decoded. Malformed fragments are skipped rather than failing the
/// parse, since a bad entry must not abort a whole resolution.
pub fn parse_multistatus(body: &str) -> Vec<DirectoryEntry> {
    let mut entries = Vec::new();
    let mut pos = 0;
    while let Some((at, open, close)) = next_tag(body, pos) {
        let start = at + open.len();
        let Some(len) = body[start..].find(close) else {
            break;
        };
        let raw = &body[start..start + len];
        let path = percent_decode(raw);
        let is_collection = path.ends_with('/');
        entries.push(DirectoryEntry {
            path: path.into_owned(),
            is_collection,
        });
        pos = start + len + close.len();
    }
    entries
}

fn next_tag(body: &str, pos: usize) -> Option<(usize, &'static str, &'static str)> {
    TAGS.iter()
        .filter_map(|(open, close)| body[pos..].find(open).map(|i| (pos + i, *open, *close)))
        .min_by_key(|(at, ..)| *at)
}

fn percent_decode(raw: &str) -> Cow<'_, str> {
    // Servers occasionally emit raw bytes that do not decode to UTF-8;
    // those references are kept verbatim.
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_collections_from_files() {
        let body = "<?xml version=\"1.0\"?><D:multistatus xmlns:D=\"DAV:\">\
                    <D:response><D:href>/data/</D:href></D:response>\
                    <D:response><D:href>/data/report.csv</D:href></D:response>\
                    </D:multistatus>";
        let entries = parse_multistatus(body);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "/data/");
        assert!(entries[0].is_collection);
        assert_eq!(entries[1].path, "/data/report.csv");
        assert!(!entries[1].is_collection);
    }

    #[test]
    fn accepts_bare_tag_spelling() {
        let body = "<response><href>/a/b.txt</href></response>";
        let entries = parse_multistatus(body);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "/a/b.txt");
    }

    #[test]
    fn percent_decodes_values() {
        let body = "<D:href>/my%20files/caf%C3%A9.csv</D:href>";
        let entries = parse_multistatus(body);
        assert_eq!(entries[0].path, "/my files/café.csv");
    }

    #[test]
    fn unterminated_tag_stops_cleanly() {
        let body = "<D:href>/ok.txt</D:href><D:href>/broken";
        let entries = parse_multistatus(body);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "/ok.txt");
    }

    #[test]
    fn empty_body_yields_no_entries() {
        assert!(parse_multistatus("").is_empty());
        assert!(parse_multistatus("<D:multistatus/>").is_empty());
    }
}
