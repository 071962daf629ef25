// HTML sanitizing for the `raw` helper

/// Turns untrusted markup into markup that is safe to emit unescaped.
pub trait HtmlSanitizer: Send + Sync {
    fn sanitize(&self, raw: &str) -> String;
}

const ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "b", "blockquote", "br", "code", "del", "em", "h1", "h2", "h3", "h4", "h5", "h6",
    "hr", "i", "ins", "li", "ol", "p", "pre", "s", "small", "span", "strong", "sub", "sup", "u",
    "ul",
];

const VOID_TAGS: &[&str] = &["br", "hr"];

// Dropped together with everything up to their closing tag.
const OPAQUE_TAGS: &[&str] = &["script", "style", "iframe", "object", "template"];

/// Allow-list sanitizer for user generated content: formatting tags survive
/// with only `title` and a safe `href` kept; everything else is stripped.
#[derive(Debug, Clone, Copy, Default)]
pub struct UgcSanitizer;

impl HtmlSanitizer for UgcSanitizer {
    fn sanitize(&self, raw: &str) -> String {
        let lower = raw.to_ascii_lowercase();
        let bytes = raw.as_bytes();
        let mut out = String::with_capacity(raw.len());
        let mut i = 0;

        while i < raw.len() {
            match bytes[i] {
                b'<' if lower[i..].starts_with("<!--") => {
                    i = match lower[i + 4..].find("-->") {
                        Some(end) => i + 4 + end + 3,
                        None => raw.len(),
                    };
                }
                b'<' => {
                    let Some(end) = tag_end(bytes, i + 1) else {
                        out.push_str("&lt;");
                        i += 1;
                        continue;
                    };
                    let Some(tag) = Tag::parse(&raw[i + 1..end]) else {
                        // Not a tag after all: escape the bracket, keep the text.
                        out.push_str("&lt;");
                        i += 1;
                        continue;
                    };
                    i = end + 1;

                    if !tag.closing && OPAQUE_TAGS.contains(&tag.name.as_str()) {
                        let close = format!("</{}", tag.name);
                        i = match lower[i..].find(&close) {
                            Some(pos) => tag_end(bytes, i + pos + 1)
                                .map(|e| e + 1)
                                .unwrap_or(raw.len()),
                            None => raw.len(),
                        };
                    } else if ALLOWED_TAGS.contains(&tag.name.as_str()) {
                        tag.write(&mut out);
                    }
                }
                b'>' => {
                    out.push_str("&gt;");
                    i += 1;
                }
                _ => {
                    let ch = raw[i..].chars().next().unwrap_or_default();
                    out.push(ch);
                    i += ch.len_utf8().max(1);
                }
            }
        }

        out
    }
}

// Index of the `>` closing a tag that starts at `from`, skipping quoted
// attribute values.
fn tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (offset, &b) in bytes[from..].iter().enumerate() {
        match (quote, b) {
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"') | (None, b'\'') => quote = Some(b),
            (None, b'>') => return Some(from + offset),
            (None, b'<') => return None,
            _ => {}
        }
    }
    None
}

struct Tag {
    name: String,
    closing: bool,
    attrs: Vec<(String, String)>,
}

impl Tag {
    fn parse(src: &str) -> Option<Tag> {
        let (closing, rest) = match src.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, src),
        };
        let name_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        if name_len == 0 {
            return None;
        }
        let name = rest[..name_len].to_ascii_lowercase();
        let attrs = if closing {
            Vec::new()
        } else {
            parse_attrs(&rest[name_len..])
        };
        Some(Tag {
            name,
            closing,
            attrs,
        })
    }

    fn write(&self, out: &mut String) {
        if self.closing {
            if !VOID_TAGS.contains(&self.name.as_str()) {
                out.push_str("</");
                out.push_str(&self.name);
                out.push('>');
            }
            return;
        }

        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attrs {
            let keep = match key.as_str() {
                "title" => true,
                "href" => self.name == "a" && is_safe_url(value),
                _ => false,
            };
            if keep {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(value));
                out.push('"');
            }
        }
        out.push('>');
    }
}

fn parse_attrs(src: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut rest = src.trim_start_matches(|c: char| c.is_whitespace() || c == '/');

    while !rest.is_empty() {
        let key_len = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let key = rest[..key_len].to_ascii_lowercase();
        rest = rest[key_len..].trim_start();

        let mut value = String::new();
        if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let (v, remaining) = match after_eq.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    match body.find(q) {
                        Some(end) => (&body[..end], &body[end + 1..]),
                        None => (body, ""),
                    }
                }
                _ => {
                    let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
                    (&after_eq[..end], &after_eq[end..])
                }
            };
            value = v.to_string();
            rest = remaining;
        }

        if !key.is_empty() {
            attrs.push((key, value));
        }
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
    }

    attrs
}

/// Relative paths, anchors and a few well-known protocols only.
pub fn is_safe_url(url: &str) -> bool {
    let url_lower = url.trim().to_lowercase();

    if url_lower.starts_with("//") {
        return false;
    }
    if url_lower.starts_with('/') || url_lower.starts_with("./") || url_lower.starts_with('#') {
        return true;
    }

    ["http://", "https://", "mailto:"]
        .iter()
        .any(|protocol| url_lower.starts_with(protocol))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(s: &str) -> String {
        UgcSanitizer.sanitize(s)
    }

    #[test]
    fn test_keeps_formatting_tags() {
        assert_eq!(clean("<p>Hello <b>World</b></p>"), "<p>Hello <b>World</b></p>");
        assert_eq!(clean("line<br/>next"), "line<br>next");
    }

    #[test]
    fn test_drops_script_with_content() {
        assert_eq!(clean("a<script>alert(1)</script>b"), "ab");
        assert_eq!(clean("a<SCRIPT type=x>alert(1)</Script >b"), "ab");
        assert_eq!(clean("a<style>p{}</style>"), "a");
    }

    #[test]
    fn test_strips_attributes_except_safe_href() {
        assert_eq!(
            clean(r#"<a href="https://example.com" onclick="x()">go</a>"#),
            r#"<a href="https://example.com">go</a>"#
        );
        assert_eq!(clean(r#"<a href="javascript:alert(1)">x</a>"#), "<a>x</a>");
        assert_eq!(clean(r#"<b onmouseover='x' title="hi">t</b>"#), r#"<b title="hi">t</b>"#);
    }

    #[test]
    fn test_unknown_tags_removed_text_kept() {
        assert_eq!(clean("<div><img src=x onerror=alert(1)>text</div>"), "text");
    }

    #[test]
    fn test_comments_and_stray_brackets() {
        assert_eq!(clean("a<!-- hidden -->b"), "ab");
        assert_eq!(clean("1 < 2 > 0"), "1 &lt; 2 &gt; 0");
    }

    #[test]
    fn test_quoted_gt_inside_attribute() {
        assert_eq!(clean(r#"<a title="x>y">Link</a>"#), r#"<a title="x&gt;y">Link</a>"#);
    }

    #[test]
    fn test_is_safe_url() {
        assert!(is_safe_url("/path"));
        assert!(is_safe_url("https://example.com"));
        assert!(!is_safe_url("javascript:alert(1)"));
        assert!(!is_safe_url("//evil.example.com"));
        assert!(!is_safe_url("data:text/html,x"));
    }
}
