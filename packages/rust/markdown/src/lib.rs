//! HTML-to-text conversion and text cleanup for ingested sources.
//!
//! Fetched pages are reduced to their main content and converted to Markdown
//! with `htmd`, then run through a sequence of cleanup passes. Every
//! source, whatever its kind, finally goes through [`sanitize`] so the corpus
//! only ever contains normalized UTF-8 text.

mod cleanup;
mod sanitize;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use meetnotes_shared::{MeetNotesError, Result};

pub use sanitize::sanitize;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Text recovered from one HTML page.
#[derive(Debug, Clone)]
pub struct PageText {
    /// Cleaned Markdown body.
    pub text: String,
    /// `<title>` or first H1, if any.
    pub title: Option<String>,
    /// Approximate word count of `text`.
    pub word_count: usize,
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Convert an HTML page to clean Markdown.
///
/// 1. Extracts the main content (strips nav/header/footer/aside)
/// 2. Pre-processes HTML tables into markdown tables
/// 3. Converts HTML → Markdown via `htmd`
/// 4. Runs the cleanup pipeline
#[instrument(skip(html), fields(url = %source_url))]
pub fn html_to_text(html: &str, source_url: &str) -> Result<PageText> {
    let doc = Html::parse_document(html);
    let content_html = extract_content_html(&doc).unwrap_or_else(|| html.to_string());
    let content_html = preprocess_tables(&content_html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec![
            "script", "style", "nav", "header", "footer", "aside", "iframe", "noscript", "svg",
            "form",
        ])
        .build();

    let raw_markdown = converter
        .convert(&content_html)
        .map_err(|e| MeetNotesError::Conversion(format!("htmd conversion failed: {e}")))?;

    debug!(raw_len = raw_markdown.len(), "htmd conversion complete");

    let base_url = Url::parse(source_url).ok();
    let text = cleanup::run_pipeline(&raw_markdown, base_url.as_ref());

    let title = extract_document_title(&doc).or_else(|| extract_title_from_markdown(&text));
    let word_count = count_words(&text);

    debug!(?title, word_count, final_len = text.len(), "conversion complete");

    Ok(PageText {
        text,
        title,
        word_count,
    })
}

/// All visible text of a page with markup removed, paragraph breaks kept.
///
/// Used when [`html_to_text`] fails or yields nothing. Structure is lost, so
/// callers should treat the result as a lossy extraction.
pub fn strip_tags(html: &str) -> String {
    static SKIP_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("script, style, noscript, svg").expect("valid selector"));

    let doc = Html::parse_document(html);
    let skipped: Vec<_> = doc.select(&SKIP_SEL).map(|el| el.id()).collect();

    let mut out = String::new();
    for node in doc.tree.nodes() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let inside_skipped = node.ancestors().any(|a| skipped.contains(&a.id()));
        if inside_skipped {
            continue;
        }
        let piece = text.trim();
        if piece.is_empty() {
            continue;
        }
        out.push_str(piece);
        out.push('\n');
    }

    sanitize(&out)
}

// ---------------------------------------------------------------------------
// Table pre-processing
// ---------------------------------------------------------------------------

/// Convert HTML `<table>` elements to markdown table syntax before htmd conversion.
///
/// `htmd` 0.1 doesn't support table conversion, so we handle it manually.
fn preprocess_tables(html: &str) -> String {
    static TABLE_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("table").expect("valid selector"));

    let doc = Html::parse_fragment(html);
    if doc.select(&TABLE_SEL).next().is_none() {
        return html.to_string();
    }

    let mut result = html.to_string();
    for table_el in doc.select(&TABLE_SEL) {
        let md_table = html_table_to_markdown(&table_el);
        result = result.replacen(&table_el.html(), &md_table, 1);
    }

    result
}

/// Convert a single HTML table element to a markdown table string.
///
/// Action-item tables (Task / Owner / Due) are common in meeting notes, so
/// the header row is kept intact for the extractor to read.
fn html_table_to_markdown(table: &ElementRef) -> String {
    static TR_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
    static CELL_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("th, td").expect("valid selector"));

    let mut rows: Vec<Vec<String>> = table
        .select(&TR_SEL)
        .map(|tr| {
            tr.select(&CELL_SEL)
                .map(|cell| {
                    cell.text()
                        .collect::<String>()
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ")
                        .replace('|', "/")
                })
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();

    let col_count = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    if col_count == 0 {
        return String::new();
    }

    for row in &mut rows {
        row.resize(col_count, String::new());
    }

    let mut md = String::from("\n\n");
    let separator = vec!["---"; col_count].join(" | ");

    for (i, row) in rows.iter().enumerate() {
        md.push_str("| ");
        md.push_str(&row.join(" | "));
        md.push_str(" |\n");
        if i == 0 {
            md.push_str(&format!("| {separator} |\n"));
        }
    }

    md.push('\n');
    md
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Extract the main content HTML, stripping page chrome.
fn extract_content_html(doc: &Html) -> Option<String> {
    // Known content containers in priority order
    let selectors = [
        ".notion-page-content",  // Notion public pages
        "#main-content",         // Confluence
        "#contents",             // Google Docs "publish to web"
        "[role=\"main\"]",
        "article",
        "main",
        ".content",
        "body",
    ];

    selectors.iter().find_map(|sel_str| {
        let selector = Selector::parse(sel_str).ok()?;
        doc.select(&selector).next().map(|el| el.inner_html())
    })
}

fn extract_document_title(doc: &Html) -> Option<String> {
    static TITLE_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("head > title").expect("valid selector"));

    doc.select(&TITLE_SEL)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Extract title from the first H1 in the Markdown text.
fn extract_title_from_markdown(md: &str) -> Option<String> {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^# (.+)$").expect("valid regex"));

    H1_RE.captures(md).map(|c| c[1].trim().to_string())
}

fn count_words(md: &str) -> usize {
    md.split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
