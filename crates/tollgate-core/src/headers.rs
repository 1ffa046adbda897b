use std::sync::OnceLock;

use http::header::{self, HeaderMap, HeaderName};

/// Copy a caller header to an upstream-specific name
///
/// Used to translate correlation IDs (e.g. `x-session-id`) into the
/// header a given vendor expects. The source header is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRename {
    /// Header read from the incoming request
    pub from: HeaderName,
    /// Header written on the upstream request
    pub to: HeaderName,
}

/// Request headers that never reach an upstream
static SCRUB_LIST: OnceLock<[HeaderName; 11]> = OnceLock::new();

/// Upstream response headers that are relayed to the caller
static RELAY_LIST: [HeaderName; 2] = [header::CONTENT_TYPE, header::CACHE_CONTROL];

fn scrub_list() -> &'static [HeaderName] {
    SCRUB_LIST.get_or_init(|| {
        [
            header::HOST,
            header::CONTENT_LENGTH,
            header::AUTHORIZATION,
            header::CONNECTION,
            HeaderName::from_static("keep-alive"),
            header::PROXY_AUTHORIZATION,
            header::TE,
            header::TRAILER,
            header::TRANSFER_ENCODING,
            header::UPGRADE,
            header::ACCEPT_ENCODING,
        ]
    })
}

/// Check if a request header must be dropped before forwarding
pub fn is_scrubbed(name: &HeaderName) -> bool {
    scrub_list().contains(name)
}

/// Copy incoming request headers minus hop-by-hop and caller credentials
pub fn scrub_request_headers(incoming: &HeaderMap) -> HeaderMap {
    let mut result = HeaderMap::with_capacity(incoming.len());

    for (name, value) in incoming {
        if !is_scrubbed(name) {
            result.append(name.clone(), value.clone());
        }
    }

    result
}

/// Apply rename rules, reading from `incoming` and writing into `outgoing`
///
/// Missing source headers are skipped. Rules that read or write a scrubbed
/// header are ignored, so a caller credential is never copied upstream
/// under another name.
pub fn apply_renames(incoming: &HeaderMap, renames: &[HeaderRename], outgoing: &mut HeaderMap) {
    for rename in renames {
        if is_scrubbed(&rename.from) || is_scrubbed(&rename.to) {
            continue;
        }

        if let Some(value) = incoming.get(&rename.from) {
            outgoing.insert(rename.to.clone(), value.clone());
        }
    }
}

/// Keep only the allow-listed upstream response headers
pub fn relay_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut result = HeaderMap::new();

    for name in &RELAY_LIST {
        if let Some(value) = upstream.get(name) {
            result.insert(name.clone(), value.clone());
        }
    }

    result
}
