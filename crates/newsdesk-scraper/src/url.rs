//! URL normalization for scraped references.

use reqwest::Url;

/// Resolves `candidate` against `base_url` into an absolute http(s) URL.
///
/// Handles protocol-relative (`//host/x`), root-relative (`/x`) and
/// document-relative (`x`, `../x`) forms. HTML-escaped ampersands are
/// unescaped first. `data:` and `javascript:` URIs, and anything that does
/// not resolve to http or https, yield `None`.
#[must_use]
pub fn absolutize_url(base_url: &str, candidate: &str) -> Option<String> {
    let candidate = candidate.trim().replace("&amp;", "&");
    if candidate.is_empty() {
        return None;
    }
    let lower = candidate.to_ascii_lowercase();
    if lower.starts_with("data:") || lower.starts_with("javascript:") {
        return None;
    }

    let base = Url::parse(base_url).ok()?;
    let resolved = base.join(&candidate).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Hostname of `url` for log fields, or the input unchanged if it does not parse.
#[must_use]
pub fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}
