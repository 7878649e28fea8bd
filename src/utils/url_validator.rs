// SPDX-License-Identifier: GPL-3.0-only
use url::Url;

/// Maximum allowed URL length
const MAX_URL_LENGTH: usize = 2048;

/// Resolve a published download location to an absolute http(s) URL.
///
/// Absolute locations are used as-is; relative ones (`/e/799059/...`) are
/// joined onto `base`. Returns `None` for anything that does not end up
/// as a well-formed http(s) URL with a host.
pub fn resolve_download_url(raw: &str, base: &Url) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > MAX_URL_LENGTH {
        return None;
    }

    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(raw).ok()?,
        Err(_) => return None,
    };

    is_http_url(&url).then_some(url)
}

/// Check that a URL uses http or https and names a host
pub fn is_http_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
}
