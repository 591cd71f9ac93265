//! Response body rewriting for proxied CMS content.
//!
//! Upstream pages embed absolute links to the backend pool they came from.
//! Those hosts are internal, so every configured upstream fragment is replaced
//! with the externally visible proxy host before the body leaves the edge.

use super::CmsUpstreams;

/// Host rewriter built from the configured upstream table.
#[derive(Debug, Clone)]
pub struct BodyRewriter {
    fragments: Vec<String>,
    proxy_host: String,
}

impl BodyRewriter {
    pub fn new(upstreams: &CmsUpstreams, proxy_host: &str) -> Self {
        let mut fragments: Vec<String> = upstreams
            .configured_hosts()
            .map(normalize_fragment)
            .filter(|f| !f.is_empty())
            .map(String::from)
            .collect();
        // Longest first so `cms.internal` never clobbers `cms.internal.example`.
        fragments.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        fragments.dedup();

        Self {
            fragments,
            proxy_host: normalize_fragment(proxy_host).to_string(),
        }
    }

    /// Rewrite a standard HTML/CSS/JS page: `//upstream` → `//proxy`.
    pub fn rewrite_page(&self, body: &str) -> String {
        self.replace_with_prefix(body, "//")
    }

    /// Rewrite AJAX-delivered viewer content, where URLs arrive JSON-escaped
    /// (`\/\/upstream`) or percent-encoded (`%2F%2Fupstream`).
    pub fn rewrite_ajax(&self, body: &str) -> String {
        let escaped = self.replace_with_prefix(body, "\\/\\/");
        let encoded = self.replace_with_prefix(&escaped, "%2F%2F");
        self.replace_with_prefix(&encoded, "//")
    }

    fn replace_with_prefix(&self, body: &str, prefix: &str) -> String {
        if self.proxy_host.is_empty() {
            return body.to_string();
        }
        let replacement = format!("{prefix}{}", self.proxy_host);
        self.fragments.iter().fold(body.to_string(), |acc, fragment| {
            replace_host(&acc, &format!("{prefix}{fragment}"), &replacement)
        })
    }
}

/// Replace `needle` only where the host it names ends; `//10.0.3.7` must not
/// touch `//10.0.3.70`.
fn replace_host(haystack: &str, needle: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(haystack.len());
    let mut rest = haystack;
    while let Some(idx) = rest.find(needle) {
        let end = idx + needle.len();
        let host_ends = rest[end..].chars().next().is_none_or(|c| !is_host_char(c));
        out.push_str(&rest[..idx]);
        out.push_str(if host_ends { replacement } else { &rest[idx..end] });
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

fn is_host_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

/// Trim stray `-`, `=`, `.`, `/` characters from the ends of a configured host.
pub fn normalize_fragment(raw: &str) -> &str {
    raw.trim()
        .trim_matches(|c: char| matches!(c, '-' | '=' | '.' | '/'))
}
