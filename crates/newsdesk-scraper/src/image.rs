use std::sync::LazyLock;

use regex::Regex;

use crate::url::absolutize_url;

static META_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid regex"));
static IMG_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("valid regex"));
static ARTICLE_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<article\b[^>]*>").expect("valid regex"));
static MAIN_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<main\b[^>]*>").expect("valid regex"));
static CONTENT_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<(?:div|section)\b[^>]*\bclass\s*=\s*["'][^"']*\b(?:article|content|post|entry|story)[\w-]*\b[^"']*["'][^>]*>"#,
    )
    .expect("valid regex")
});

/// Meta keys searched in priority order.
const META_KEYS: &[&str] = &[
    "og:image",
    "twitter:image",
    "twitter:image:src",
    "og:image:url",
    "og:image:secure_url",
];

/// Find the lead image for an article page.
///
/// Priority: `og:image`, then the Twitter card image, then the alternate
/// Open-Graph URL variants, then the first usable `<img>` inside an
/// `<article>`, `<main>` or content-classed container. The result is always
/// absolute, resolved against `page_url`.
#[must_use]
pub fn extract_article_image(page_url: &str, html: &str) -> Option<String> {
    META_KEYS
        .iter()
        .find_map(|key| {
            find_meta_content(html, key).and_then(|raw| absolutize_url(page_url, &raw))
        })
        .or_else(|| find_container_image(page_url, html))
}

fn find_container_image(page_url: &str, html: &str) -> Option<String> {
    let containers: [(&Regex, Option<&str>); 3] = [
        (&*ARTICLE_OPEN_RE, Some("</article>")),
        (&*MAIN_OPEN_RE, Some("</main>")),
        (&*CONTENT_OPEN_RE, None),
    ];

    for (open_re, close_tag) in containers {
        for open in open_re.find_iter(html) {
            let rest = &html[open.end()..];
            let body = close_tag
                .and_then(|tag| find_ascii_case_insensitive(rest, tag))
                .map_or(rest, |end| &rest[..end]);
            if let Some(url) = first_usable_img(page_url, body) {
                return Some(url);
            }
        }
    }
    None
}

fn first_usable_img(page_url: &str, fragment: &str) -> Option<String> {
    IMG_TAG_RE.find_iter(fragment).find_map(|m| {
        let tag = m.as_str();
        if is_tracking_pixel(tag) {
            return None;
        }
        ["src", "data-src", "data-original"]
            .iter()
            .filter_map(|attr| extract_attr(tag, attr))
            .find_map(|raw| absolutize_url(page_url, &raw))
    })
}

fn is_tracking_pixel(tag: &str) -> bool {
    let dim = |attr| extract_attr(tag, attr).and_then(|v| v.parse::<u32>().ok());
    matches!(dim("width"), Some(0 | 1)) || matches!(dim("height"), Some(0 | 1))
}

fn find_meta_content(html: &str, key: &str) -> Option<String> {
    META_TAG_RE.find_iter(html).find_map(|m| {
        let tag = m.as_str();
        let matches_key = ["property", "name"]
            .iter()
            .filter_map(|attr| extract_attr(tag, attr))
            .any(|value| value.eq_ignore_ascii_case(key));
        if matches_key {
            extract_attr(tag, "content").filter(|c| !c.is_empty())
        } else {
            None
        }
    })
}

fn extract_attr(tag: &str, attr: &str) -> Option<String> {
    // `(?:^|\s)` keeps `src` from matching inside `data-src`.
    let pattern = format!(
        r#"(?is)(?:^|\s){}\s*=\s*(?:"([^"]*)"|'([^']*)')"#,
        regex::escape(attr)
    );
    Regex::new(&pattern)
        .ok()?
        .captures(tag)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().trim().to_string())
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(&needle.to_ascii_lowercase())
}
