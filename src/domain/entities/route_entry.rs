//! Derived, in-memory route record used to serve redirects.

/// A servable `code -> target` mapping with a staleness guard.
///
/// Not authoritative state: entries are produced exclusively by the
/// reconciler and rebuilt from a full list on process start or watch-stream
/// loss. `version` is the object's store revision at publish time; the
/// routing table rejects publishes older than what it already holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub code: String,
    pub target: String,
    pub version: i64,
}

impl RouteEntry {
    pub fn new(code: impl Into<String>, target: impl Into<String>, version: i64) -> Self {
        Self {
            code: code.into(),
            target: target.into(),
            version,
        }
    }
}
