//! Page processor
//!
//! Turns raw page markup into:
//! - sanitized markup with boilerplate removed and links made absolute
//! - a linear markdown rendering of the sanitized body for the relevance oracle
//! - the list of hyperlinks found on the raw page
//!
//! Tables are bracketed with `[TABLE]` / `[/TABLE]` markers in the sanitized
//! markup, so their boundaries survive the markdown conversion.

use crate::url::{file_name, resolve_link};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use tracing::warn;
use url::Url;

/// Elements dropped together with their subtree
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "link", "meta", "form", "input", "button",
    "select", "textarea", "fieldset", "nav", "header", "footer", "menu", "aside", "iframe",
    "svg", "canvas",
];

/// Class names marking navigation, header and footer regions
const SKIPPED_CLASSES: &[&str] = &[
    "footer", "footnav", "site-footer", "page-footer", "footer-container", "footer-content",
    "footer-links", "header", "head", "site-header", "page-header", "header-container",
    "top-header", "navbar", "nav", "navigation", "menu", "site-nav", "main-navigation",
];

/// Element ids marking navigation, header and footer regions
const SKIPPED_IDS: &[&str] = &[
    "footer", "foot", "page-footer", "header", "head", "top", "navbar", "nav", "menu",
];

/// Elements serialized without a closing tag
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "source", "track", "wbr",
];

const TABLE_OPEN: &str = "[TABLE]";
const TABLE_CLOSE: &str = "[/TABLE]";

static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\n[ \t]*){3,}").unwrap());

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// A hyperlink found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    /// Absolute target, fragment removed
    pub url: Url,

    /// Visible link text, whitespace collapsed
    pub text: String,
}

/// Result of processing one page
#[derive(Debug, Clone)]
pub struct ProcessedPage {
    /// `<title>` text, else the last path segment of the URL
    pub title: String,

    /// Markup with boilerplate removed and `href`/`src` made absolute
    pub sanitized_markup: String,

    /// Markdown rendering of the sanitized body, prefixed with the source URL
    pub linear_text: String,

    /// Visible text only, without markup or link targets
    pub visible_text: String,

    /// Hyperlinks (`<a href>`, `<iframe src>`) on the raw page, in document order
    pub links: Vec<PageLink>,
}

/// Processes raw page markup
///
/// Pure transformation; removal heuristics that match nothing are no-ops and
/// truncated markup is processed as far as it goes.
///
/// # Example
///
/// ```
/// use campus_harvest::crawler::process;
/// use url::Url;
///
/// let url = Url::parse("https://example.edu/").unwrap();
/// let page = process("<title>Home</title><p>Fee <a href='/fees'>details</a></p>", &url);
/// assert_eq!(page.title, "Home");
/// assert!(page.linear_text.contains("[details](https://example.edu/fees)"));
/// ```
pub fn process(raw: &str, page_url: &Url) -> ProcessedPage {
    let document = Html::parse_document(raw);

    let mut sanitizer = Sanitizer::new(page_url);
    sanitizer.walk(document.root_element());

    let markdown = to_markdown(sanitizer.body_markup());
    let body = BLANK_RUNS.replace_all(&markdown, "\n\n");
    let body = body
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");

    ProcessedPage {
        title: extract_title(&document).unwrap_or_else(|| file_name(page_url)),
        linear_text: format!("Source URL: {}\n\n{}", page_url, body.trim()),
        visible_text: collapse_whitespace(&sanitizer.visible),
        sanitized_markup: sanitizer.markup,
        links: extract_links(&document, page_url),
    }
}

/// Converts sanitized markup to markdown
///
/// The converter escapes brackets in text, so the table markers are restored
/// afterwards. A conversion failure leaves the text empty.
fn to_markdown(markup: &str) -> String {
    match htmd::convert(markup) {
        Ok(markdown) => markdown
            .replace(r"\[TABLE\]", TABLE_OPEN)
            .replace(r"\[/TABLE\]", TABLE_CLOSE),
        Err(e) => {
            warn!("Markdown conversion failed: {}", e);
            String::new()
        }
    }
}

/// Title recorded for a document: last path segment, lower-cased, up to the first `.`
pub fn document_title(url: &Url) -> String {
    let name = file_name(url).to_lowercase();
    name.split('.').next().unwrap_or_default().to_string()
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

fn extract_links(document: &Html, page_url: &Url) -> Vec<PageLink> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    let (Ok(anchors), Ok(frames)) = (Selector::parse("a[href], iframe[src]"), Selector::parse("iframe"))
    else {
        return links;
    };

    for element in document.select(&anchors) {
        let is_frame = frames.matches(&element);
        let target = if is_frame {
            element.value().attr("src")
        } else {
            element.value().attr("href")
        };

        let Some(url) = target.and_then(|t| resolve_link(t, page_url)) else {
            continue;
        };

        if seen.insert(url.to_string()) {
            links.push(PageLink {
                url,
                text: collapse_whitespace(&element.text().collect::<String>()),
            });
        }
    }

    links
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Returns true if the element and its subtree are boilerplate or hidden
fn is_removed(element: &ElementRef) -> bool {
    let value = element.value();

    if SKIPPED_TAGS.contains(&value.name()) {
        return true;
    }

    if value
        .classes()
        .any(|class| SKIPPED_CLASSES.contains(&class.to_ascii_lowercase().as_str()))
    {
        return true;
    }

    if let Some(id) = value.id() {
        if SKIPPED_IDS.contains(&id.to_ascii_lowercase().as_str()) {
            return true;
        }
    }

    if value.attr("hidden").is_some() {
        return true;
    }

    if value
        .attr("aria-hidden")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    {
        return true;
    }

    value.attr("style").is_some_and(|style| {
        let style: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        style.contains("display:none") || style.contains("visibility:hidden")
    })
}

/// Single pass over the tree serializing what survives the removal rules
struct Sanitizer<'a> {
    base: &'a Url,
    markup: String,
    visible: String,
    body: Option<(usize, usize)>,
    title_depth: usize,
}

impl<'a> Sanitizer<'a> {
    fn new(base: &'a Url) -> Self {
        Self {
            base,
            markup: String::new(),
            visible: String::new(),
            body: None,
            title_depth: 0,
        }
    }

    /// Sanitized `<body>` element, or all markup if there was none
    fn body_markup(&self) -> &str {
        match self.body {
            Some((start, end)) => &self.markup[start..end],
            None => &self.markup,
        }
    }

    fn walk(&mut self, element: ElementRef) {
        if is_removed(&element) {
            return;
        }

        let name = element.value().name();
        let start = self.markup.len();

        if name == "table" {
            self.markup.push_str(TABLE_OPEN);
        }

        self.open_tag(&element);
        if VOID_TAGS.contains(&name) {
            return;
        }

        if name == "title" {
            self.title_depth += 1;
        }

        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.push_text(text),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.walk(child);
                    }
                }
                // comments, doctypes and processing instructions are dropped
                _ => {}
            }
        }

        if name == "title" {
            self.title_depth -= 1;
        }

        self.markup.push_str("</");
        self.markup.push_str(name);
        self.markup.push('>');

        if name == "table" {
            self.markup.push_str(TABLE_CLOSE);
        }

        if name == "body" && self.body.is_none() {
            self.body = Some((start, self.markup.len()));
        }
    }

    fn open_tag(&mut self, element: &ElementRef) {
        let value = element.value();
        self.markup.push('<');
        self.markup.push_str(value.name());

        for (attr, attr_value) in value.attrs() {
            let attr_value = if attr == "href" || attr == "src" {
                absolutize(attr_value, self.base)
            } else {
                attr_value.to_string()
            };
            self.markup.push(' ');
            self.markup.push_str(attr);
            self.markup.push_str("=\"");
            self.markup.push_str(&escape(&attr_value, true));
            self.markup.push('"');
        }

        self.markup.push('>');
    }

    fn push_text(&mut self, text: &str) {
        self.markup.push_str(&escape(text, false));

        if self.title_depth == 0 {
            self.visible.push_str(text);
            self.visible.push(' ');
        }
    }
}

fn absolutize(value: &str, base: &Url) -> String {
    base.join(value.trim())
        .map(|url| url.to_string())
        .unwrap_or_else(|_| value.to_string())
}

fn escape(text: &str, in_attribute: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if in_attribute => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
