use scraper::{ElementRef, Html, Selector};

/// Appended when a document is cut at the configured length cap.
pub const TRUNCATION_MARKER: &str = "\n\n[Document truncated due to length]";

/// Subtrees that are boilerplate on regulatory portals, never content.
const SKIPPED_TAGS: [&str; 9] = [
    "script", "style", "noscript", "template", "svg", "nav", "header", "footer", "aside",
];

/// Reduces an HTML page to its visible text.
///
/// Prefers a main-content container and falls back to `<body>`; boilerplate
/// subtrees are skipped, whitespace is collapsed, and the result is capped
/// at `max_chars` with an explicit truncation marker.
pub fn extract_readable_text(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);

    let content = Selector::parse("main, article, .content, .main-content, #content, #main")
        .expect("content selector");
    let body = Selector::parse("body").expect("body selector");

    let root = document
        .select(&content)
        .next()
        .or_else(|| document.select(&body).next());

    let mut raw = String::new();
    match root {
        Some(element) => collect_visible_text(element, &mut raw),
        None => {
            for element in document.root_element().child_elements() {
                collect_visible_text(element, &mut raw);
            }
        }
    }

    truncate_with_marker(collapse_whitespace(&raw), max_chars)
}

fn collect_visible_text(element: ElementRef<'_>, out: &mut String) {
    if SKIPPED_TAGS.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_element) = ElementRef::wrap(child) {
            collect_visible_text(child_element, out);
        }
    }
}

fn collapse_whitespace(input: &str) -> String {
    let mut buf = String::with_capacity(input.len());
    let mut last_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !last_space && !buf.is_empty() {
                buf.push(' ');
            }
            last_space = true;
        } else {
            buf.push(ch);
            last_space = false;
        }
    }
    buf.trim_end().to_string()
}

fn truncate_with_marker(text: String, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text;
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
