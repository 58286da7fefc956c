use crate::request::Headers;

/// Accumulates response headers for one logical request.
///
/// A redirected transfer delivers several header blocks over one connection;
/// a new block starts whenever a status line is observed. Only the block
/// belonging to the last status line is meaningful to callers, so the
/// collector keeps hops separate and exposes the final one.
#[derive(Debug, Default)]
pub struct HeaderCollector {
    hops: Vec<(u16, Headers)>,
}

impl HeaderCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observed status line, starting a fresh header set.
    pub fn start_hop(&mut self, status: u16) {
        self.hops.push((status, Headers::new()));
    }

    /// Record one header for the current hop. Headers arriving before any
    /// status line are dropped.
    pub fn header(&mut self, name: &str, value: &str) {
        if let Some((_, headers)) = self.hops.last_mut() {
            headers.insert(name, value);
        }
    }

    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    pub fn final_status(&self) -> Option<u16> {
        self.hops.last().map(|(status, _)| *status)
    }

    /// Status and headers of the final hop; earlier hops are discarded.
    pub fn into_final(self) -> Option<(u16, Headers)> {
        self.hops.into_iter().next_back()
    }
}
