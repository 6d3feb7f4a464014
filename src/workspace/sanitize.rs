//! Rendering helpers for backend-supplied draft bodies.
//!
//! Bodies arrive as HTML produced by the backend. They are stored verbatim
//! and only cleaned when rendered.

use scraper::{ElementRef, Html, Node};

/// Formatting tags kept by [`sanitize_body`]. Attributes are dropped except `href` on `a`.
const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "blockquote", "br", "code", "div", "em", "h1", "h2", "h3", "h4", "h5", "h6", "hr",
    "i", "li", "ol", "p", "pre", "span", "strong", "u", "ul",
];

/// Tags without a closing tag.
const VOID_TAGS: &[&str] = &["br", "hr"];

/// Tags removed together with everything inside them.
const DROPPED_TAGS: &[&str] = &[
    "embed", "iframe", "noscript", "object", "script", "style", "template", "textarea",
];

/// Tags that end a line in plain-text rendering.
const BLOCK_TAGS: &[&str] = &[
    "blockquote", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "p", "pre", "tr",
];

/// Reduce `body` to an allow-listed subset of HTML.
///
/// Unknown tags are unwrapped (their text is kept), scripts and embeds are
/// removed with their content, every attribute except a safe `href` is
/// dropped, and text is re-escaped. The tree is walked with an explicit
/// stack, so nesting depth is bounded only by memory.
#[must_use]
pub fn sanitize_body(body: &str) -> String {
    let fragment = Html::parse_fragment(body);
    let mut out = String::with_capacity(body.len());
    let mut stack = Vec::new();
    push_children(fragment.root_element(), &mut stack);

    while let Some(item) = stack.pop() {
        match item {
            Walk::Text(text) => escape_text(text, &mut out),
            Walk::Element(element) => open_sanitized(element, &mut out, &mut stack),
            Walk::Close(name) => {
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            Walk::Suffix(suffix) => out.push_str(suffix),
        }
    }
    out
}

/// Render `body` as plain text for terminals.
#[must_use]
pub fn body_text(body: &str) -> String {
    let fragment = Html::parse_fragment(body);
    let mut out = String::with_capacity(body.len());
    let mut stack = Vec::new();
    push_children(fragment.root_element(), &mut stack);

    while let Some(item) = stack.pop() {
        match item {
            Walk::Text(text) => out.push_str(text),
            Walk::Element(element) => open_text(element, &mut out, &mut stack),
            Walk::Close(_) => {}
            Walk::Suffix(suffix) => out.push_str(suffix),
        }
    }
    collapse_blank_lines(&out)
}

/// Pending work while walking a parsed fragment.
enum Walk<'a> {
    Text(&'a str),
    Element(ElementRef<'a>),
    /// Closing tag, written after the element's children.
    Close(&'a str),
    /// Literal text, written after the element's children.
    Suffix(&'static str),
}

/// Queue the children of `element` so they pop in document order.
fn push_children<'a>(element: ElementRef<'a>, stack: &mut Vec<Walk<'a>>) {
    for child in element.children().rev() {
        match child.value() {
            Node::Text(text) => stack.push(Walk::Text(text)),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    stack.push(Walk::Element(child));
                }
            }
            _ => {}
        }
    }
}

fn open_sanitized<'a>(element: ElementRef<'a>, out: &mut String, stack: &mut Vec<Walk<'a>>) {
    let name = element.value().name();
    if DROPPED_TAGS.contains(&name) {
        return;
    }
    if !ALLOWED_TAGS.contains(&name) {
        push_children(element, stack);
        return;
    }

    out.push('<');
    out.push_str(name);
    if name == "a" {
        if let Some(href) = element.value().attr("href").filter(|h| is_safe_href(h)) {
            out.push_str(" href=\"");
            escape_attr(href, out);
            out.push('"');
        }
    }
    out.push('>');

    if VOID_TAGS.contains(&name) {
        return;
    }
    stack.push(Walk::Close(name));
    push_children(element, stack);
}

fn open_text<'a>(element: ElementRef<'a>, out: &mut String, stack: &mut Vec<Walk<'a>>) {
    let name = element.value().name();
    if DROPPED_TAGS.contains(&name) {
        return;
    }
    match name {
        "br" => out.push('\n'),
        "hr" => out.push_str("\n---\n"),
        "li" => {
            out.push_str("- ");
            stack.push(Walk::Suffix("\n"));
            push_children(element, stack);
        }
        _ if BLOCK_TAGS.contains(&name) => {
            stack.push(Walk::Suffix("\n"));
            push_children(element, stack);
        }
        _ => push_children(element, stack),
    }
}

/// Absolute http(s) and mailto links, plus same-site paths and fragments.
/// Protocol-relative URLs (`//host`) are rejected.
fn is_safe_href(href: &str) -> bool {
    let href = href.trim().to_ascii_lowercase();
    if href.starts_with("//") || href.starts_with("/\\") {
        return false;
    }
    ["http://", "https://", "mailto:", "/", "#"]
        .iter()
        .any(|prefix| href.starts_with(prefix))
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => escape_text(c.encode_utf8(&mut [0; 4]), out),
        }
    }
}

fn collapse_blank_lines(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut previous_blank = false;
    for line in text.lines().map(str::trim_end) {
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        previous_blank = blank;
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_formatting() {
        assert_eq!(
            sanitize_body("<p>Hi <strong>Dana</strong>,<br>welcome</p>"),
            "<p>Hi <strong>Dana</strong>,<br>welcome</p>"
        );
    }

    #[test]
    fn test_drops_scripts_and_handlers() {
        let cleaned = sanitize_body(
            r#"<p onclick="steal()">Hello</p><script>alert(1)</script><img src=x onerror="steal()">"#,
        );
        assert_eq!(cleaned, "<p>Hello</p>");
    }

    #[test]
    fn test_unwraps_unknown_tags() {
        assert_eq!(
            sanitize_body("<table><tr><td>cell</td></tr></table>"),
            "cell"
        );
    }

    #[test]
    fn test_filters_links() {
        assert_eq!(
            sanitize_body(r#"<a href="javascript:alert(1)">x</a> <a href="https://helix.dev/?a=1&b=2">y</a>"#),
            r#"<a>x</a> <a href="https://helix.dev/?a=1&amp;b=2">y</a>"#
        );
    }

    #[test]
    fn test_escapes_text() {
        assert_eq!(sanitize_body("1 &lt; 2 &amp; 3"), "1 &lt; 2 &amp; 3");
        assert_eq!(sanitize_body("plain"), "plain");
    }

    #[test]
    fn test_body_text() {
        let text = body_text("<p>Hi Dana,</p><p>Two points:</p><ul><li>one</li><li>two</li></ul><script>x</script>");
        assert_eq!(text, "Hi Dana,\nTwo points:\n- one\n- two");
    }

    #[test]
    fn test_rejects_protocol_relative_links() {
        assert_eq!(
            sanitize_body(r#"<a href="//evil.example/x">a</a><a href="/\\evil.example">b</a><a href="/jobs#team">c</a>"#),
            r#"<a>a</a><a>b</a><a href="/jobs#team">c</a>"#
        );
    }

    #[test]
    fn test_deeply_nested_body() {
        let depth = 5_000;
        let body = format!("{}deep &amp; nested{}", "<div>".repeat(depth), "</div>".repeat(depth));

        let cleaned = sanitize_body(&body);
        assert!(cleaned.contains("deep &amp; nested"));
        assert_eq!(cleaned.matches("<div>").count(), cleaned.matches("</div>").count());

        assert_eq!(body_text(&body), "deep & nested");
    }

    #[test]
    fn test_nested_order_is_preserved() {
        assert_eq!(
            sanitize_body("<ul><li>a <em>b</em></li><li>c</li></ul>tail"),
            "<ul><li>a <em>b</em></li><li>c</li></ul>tail"
        );
        assert_eq!(body_text("<ol><li>a <b>b</b></li><li>c</li></ol>tail"), "- a b\n- c\ntail");
    }

    #[test]
    fn test_body_text_decodes_entities() {
        assert_eq!(body_text("Tom &amp; Jerry<br>next"), "Tom & Jerry\nnext");
    }
}
