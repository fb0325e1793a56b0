//! Markdown rendering for user-supplied text (bios, descriptions, comments).

use std::collections::HashSet;

use pulldown_cmark::{html, Options, Parser};

const ALLOWED_TAGS: &[&str] = &[
    "div", "b", "i", "em", "strong", "p", "ul", "ol", "li", "a", "br", "pre", "code",
];

fn cleaner() -> ammonia::Builder<'static> {
    let mut builder = ammonia::Builder::default();
    builder
        .tags(ALLOWED_TAGS.iter().copied().collect::<HashSet<_>>())
        .link_rel(Some("nofollow noopener noreferrer"));
    builder
}

/// Render Markdown to HTML and strip everything outside the allowed tag set.
///
/// Missing or empty input renders as an empty string.
pub fn cleaned_markdown_conversion(text: Option<&str>) -> String {
    let text = match text {
        Some(t) if !t.trim().is_empty() => t,
        _ => return String::new(),
    };

    let parser = Parser::new_ext(text, Options::empty());
    let mut rendered = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut rendered, parser);

    cleaner().clean(&rendered).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_renders_nothing() {
        assert_eq!(cleaned_markdown_conversion(None), "");
        assert_eq!(cleaned_markdown_conversion(Some("")), "");
        assert_eq!(cleaned_markdown_conversion(Some("   \n")), "");
    }

    #[test]
    fn renders_emphasis() {
        let html = cleaned_markdown_conversion(Some("some **bold** and *italic*"));
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>italic</em>"));
        assert!(html.starts_with("<p>"));
    }

    #[test]
    fn strips_script_and_disallowed_tags() {
        let html = cleaned_markdown_conversion(Some(
            "hello <script>alert('x')</script> <h1>big</h1> <img src=\"x.png\">",
        ));
        assert!(!html.contains("<script"));
        assert!(!html.contains("alert"));
        assert!(!html.contains("<h1"));
        assert!(!html.contains("<img"));
        assert!(html.contains("big"));
    }

    #[test]
    fn links_get_nofollow() {
        let html = cleaned_markdown_conversion(Some("[home](http://example.org/)"));
        assert!(html.contains("href=\"http://example.org/\""));
        assert!(html.contains("nofollow"));
    }

    #[test]
    fn javascript_links_are_dropped() {
        let html = cleaned_markdown_conversion(Some("[x](javascript:alert(1))"));
        assert!(!html.contains("javascript:"));
    }
}
