//! Turns a fetched HTML page into a title and a block of plain text.
//!
//! The page is parsed with html5ever into an `RcDom` and walked once. Scripts,
//! styles and other non-visible subtrees are skipped, block-level elements
//! become line breaks, and the `<title>` element is collected separately.
//! With `strip_html_menus` enabled, subtrees that look like navigation chrome
//! are skipped as well (see [`HtmlExtractor::is_menu_block`]).

use std::cell::RefCell;
use std::num::NonZeroUsize;

use html5ever::tendril::TendrilSink;
use html5ever::{Attribute, LocalName, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::data_models::ExtractedContent;

/// Class/id tokens that mark a container as page chrome.
const BOILERPLATE_TOKENS: &[&str] = &[
    "nav",
    "navbar",
    "navigation",
    "menu",
    "menubar",
    "submenu",
    "sidebar",
    "footer",
    "header",
    "masthead",
    "breadcrumb",
    "breadcrumbs",
    "cookie",
    "cookies",
    "banner",
    "promo",
    "skiplink",
    "toolbar",
    "topbar",
    "pagination",
    "share",
    "social",
];

const MENU_ROLES: &[&str] = &[
    "navigation",
    "menu",
    "menubar",
    "banner",
    "contentinfo",
    "complementary",
];

/// A link cluster needs at least this many anchors...
const CLUSTER_MIN_LINKS: usize = 3;
/// ...with at least this share of its text inside anchors...
const CLUSTER_MIN_LINK_RATIO: f64 = 0.8;
/// ...and anchors no longer than this on average.
const CLUSTER_MAX_AVG_LINK_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Drop navigation and menu-like blocks before flattening.
    pub strip_html_menus: bool,
    /// Upper bound on the flattened text, in bytes.
    pub max_text_bytes: Option<NonZeroUsize>,
}

#[derive(Clone, Default, Debug)]
struct TextBuffer {
    title: String,
    title_seen: bool,
    body: String,
}

#[derive(Debug, Clone, PartialEq, Copy)]
enum Context {
    Title,
    Body,
}

#[derive(Debug, Default, Clone, Copy)]
struct LinkDensity {
    text_chars: usize,
    link_chars: usize,
    links: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor {
    options: ExtractOptions,
}

impl HtmlExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// Never fails: unparseable input simply yields no title and empty text.
    pub fn extract(&self, html: &str) -> ExtractedContent {
        let dom = Self::get_dom(html);
        let mut out = TextBuffer::default();
        self.walk_html(&dom.document, Context::Body, &mut out);

        let mut text = Self::compress_whitespaces(&out.body);
        if let Some(max) = self.options.max_text_bytes {
            truncate_to_bytes(&mut text, max.get());
        }

        ExtractedContent {
            title: Self::clean_title(&out.title),
            text,
        }
    }

    fn get_dom(html: &str) -> RcDom {
        parse_document(RcDom::default(), Default::default()).one(html)
    }

    fn is_invisible(local: &LocalName) -> bool {
        matches!(
            &**local,
            "script"
                | "style"
                | "noscript"
                | "template"
                | "iframe"
                | "object"
                | "svg"
                | "canvas"
                | "head"
                | "meta"
                | "link"
                | "button"
                | "select"
        )
    }

    fn is_block_like(local: &LocalName) -> bool {
        matches!(
            &**local,
            "p" | "div"
                | "section"
                | "article"
                | "main"
                | "li"
                | "ul"
                | "ol"
                | "dl"
                | "dt"
                | "dd"
                | "header"
                | "footer"
                | "nav"
                | "aside"
                | "blockquote"
                | "pre"
                | "table"
                | "tr"
                | "form"
                | "figure"
                | "figcaption"
                | "h1"
                | "h2"
                | "h3"
                | "h4"
                | "h5"
                | "h6"
                | "hr"
                | "br"
        )
    }

    fn attr<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a str> {
        attrs
            .iter()
            .find(|a| &*a.name.local == name)
            .map(|a| &*a.value)
    }

    fn has_boilerplate_class_or_id(attrs: &RefCell<Vec<Attribute>>) -> bool {
        let attrs = attrs.borrow();
        ["class", "id"]
            .iter()
            .filter_map(|name| Self::attr(&attrs, name))
            .flat_map(|value| value.split(|c: char| !c.is_ascii_alphanumeric()))
            .map(|token| token.to_ascii_lowercase())
            .any(|token| BOILERPLATE_TOKENS.contains(&token.as_str()))
    }

    fn has_menu_role(attrs: &RefCell<Vec<Attribute>>) -> bool {
        let attrs = attrs.borrow();
        Self::attr(&attrs, "role")
            .map(|role| MENU_ROLES.contains(&role.trim().to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// Heuristic classifier for navigation chrome: semantic navigation tags,
    /// ARIA navigation roles, boilerplate class/id names, and containers that
    /// are almost entirely short links.
    pub fn is_menu_block(handle: &Handle) -> bool {
        let NodeData::Element { name, attrs, .. } = &handle.data else {
            return false;
        };
        let local = &*name.local;

        if matches!(local, "nav" | "menu" | "aside" | "header" | "footer") {
            return true;
        }
        if Self::has_menu_role(attrs) || Self::has_boilerplate_class_or_id(attrs) {
            return true;
        }
        if matches!(local, "ul" | "ol" | "dl" | "div" | "section" | "table" | "p") {
            let density = Self::link_density(handle);
            if density.links >= CLUSTER_MIN_LINKS && density.text_chars > 0 {
                let ratio = density.link_chars as f64 / density.text_chars as f64;
                let avg = density.link_chars / density.links;
                return ratio >= CLUSTER_MIN_LINK_RATIO && avg <= CLUSTER_MAX_AVG_LINK_CHARS;
            }
        }
        false
    }

    fn link_density(handle: &Handle) -> LinkDensity {
        let mut density = LinkDensity::default();
        Self::accumulate_density(handle, false, &mut density);
        density
    }

    fn accumulate_density(handle: &Handle, in_link: bool, density: &mut LinkDensity) {
        match &handle.data {
            NodeData::Text { contents } => {
                let chars = contents.borrow().chars().filter(|c| !c.is_whitespace()).count();
                density.text_chars += chars;
                if in_link {
                    density.link_chars += chars;
                }
            }
            NodeData::Element { name, .. } => {
                if Self::is_invisible(&name.local) {
                    return;
                }
                let is_link = &*name.local == "a";
                if is_link && !in_link {
                    density.links += 1;
                }
                for child in handle.children.borrow().iter() {
                    Self::accumulate_density(child, in_link || is_link, density);
                }
            }
            _ => {
                for child in handle.children.borrow().iter() {
                    Self::accumulate_density(child, in_link, density);
                }
            }
        }
    }

    fn walk_html(&self, handle: &Handle, ctx: Context, out: &mut TextBuffer) {
        match &handle.data {
            NodeData::Text { contents } => {
                let s = contents.borrow();
                match ctx {
                    Context::Title => out.title.push_str(&s),
                    Context::Body => Self::push_collapsed(&mut out.body, &s),
                }
            }
            NodeData::Element { name, .. } => {
                let local = &name.local;

                // <title> sits inside <head>, which is otherwise invisible
                if &**local == "title" {
                    if !out.title_seen {
                        out.title_seen = true;
                        for child in handle.children.borrow().iter() {
                            self.walk_html(child, Context::Title, out);
                        }
                    }
                    return;
                }
                if &**local == "head" {
                    for child in handle.children.borrow().iter() {
                        if let NodeData::Element { name, .. } = &child.data {
                            if &*name.local == "title" {
                                self.walk_html(child, ctx, out);
                            }
                        }
                    }
                    return;
                }
                if Self::is_invisible(local) {
                    return;
                }
                if self.options.strip_html_menus && Self::is_menu_block(handle) {
                    return;
                }

                let block = Self::is_block_like(local);
                if block {
                    Self::break_line(&mut out.body);
                } else if matches!(&**local, "td" | "th") {
                    out.body.push(' ');
                }

                for child in handle.children.borrow().iter() {
                    self.walk_html(child, ctx, out);
                }

                if block {
                    Self::break_line(&mut out.body);
                }
            }
            _ => {
                for child in handle.children.borrow().iter() {
                    self.walk_html(child, ctx, out);
                }
            }
        }
    }

    fn push_collapsed(body: &mut String, text: &str) {
        let mut last_space = body.ends_with(char::is_whitespace);
        for c in text.chars() {
            if c.is_whitespace() {
                if !last_space {
                    body.push(' ');
                    last_space = true;
                }
            } else {
                body.push(c);
                last_space = false;
            }
        }
    }

    fn break_line(body: &mut String) {
        if !body.is_empty() && !body.ends_with('\n') {
            body.push('\n');
        }
    }

    fn compress_whitespaces(text: &str) -> String {
        text.lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn clean_title(raw: &str) -> Option<String> {
        let title = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if title.is_empty() { None } else { Some(title) }
    }
}

/// Truncates to at most `max` bytes without splitting a UTF-8 sequence.
pub fn truncate_to_bytes(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_char_boundary() {
        // "é" is two bytes
        let mut s = "aé".to_string();
        truncate_to_bytes(&mut s, 2);
        assert_eq!(s, "a");

        let mut s = "日本語".to_string();
        truncate_to_bytes(&mut s, 7);
        assert_eq!(s, "日本");
    }

    #[test]
    fn test_truncate_short_text_untouched() {
        let mut s = "short".to_string();
        truncate_to_bytes(&mut s, 100);
        assert_eq!(s, "short");
    }

    #[test]
    fn test_compress_whitespaces() {
        let text = "  Hello   world \n\n\n  second\tline  \n";
        assert_eq!(
            HtmlExtractor::compress_whitespaces(text),
            "Hello world\nsecond line"
        );
    }

    #[test]
    fn test_link_cluster_detected() {
        let dom = HtmlExtractor::get_dom(
            r#"<div id="x"><a href="/a">Home</a> <a href="/b">News</a> <a href="/c">Sport</a></div>"#,
        );
        let mut found = false;
        find_element(&dom.document, "div", &mut |h| {
            found = HtmlExtractor::is_menu_block(h);
        });
        assert!(found);
    }

    #[test]
    fn test_prose_with_links_not_a_cluster() {
        let dom = HtmlExtractor::get_dom(
            r#"<p>The <a href="/a">first</a> team won the <a href="/b">league</a> after a long
            and difficult season, beating the <a href="/c">rivals</a> in the last game.</p>"#,
        );
        let mut found = true;
        find_element(&dom.document, "p", &mut |h| {
            found = HtmlExtractor::is_menu_block(h);
        });
        assert!(!found);
    }

    fn find_element(handle: &Handle, tag: &str, f: &mut dyn FnMut(&Handle)) {
        if let NodeData::Element { name, .. } = &handle.data {
            if &*name.local == tag {
                f(handle);
                return;
            }
        }
        for child in handle.children.borrow().iter() {
            find_element(child, tag, f);
        }
    }
}
