//! HTML and plain-text helpers shared by enrichment and assembly.
//!
//! `insert_anchor` is deliberately not regex-based: it walks the markup
//! and only ever touches text that sits outside tags and outside an
//! existing `<a>` element, so a phrase spanning a tag boundary or already
//! inside a link can never be rewritten.

/// Slugify text for heading ids and vector index keys.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Strip tags from HTML and collapse whitespace into single spaces.
pub fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                // Tags act as word boundaries
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    let unescaped = unescape_entities(&text);
    unescaped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode the handful of named entities the model and CMS actually emit.
pub fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Strip surrounding markdown code fences, if present.
pub fn strip_code_fences(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```html")
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Extract the `<table>…</table>` substring, tolerating text around it.
pub fn extract_table(html: &str) -> Option<&str> {
    let start = find_ascii_ci(html, "<table")?;
    let end = find_ascii_ci(html, "</table>")?;
    if end < start {
        return None;
    }
    Some(&html[start..end + "</table>".len()])
}

/// Byte-wise ASCII case-insensitive substring search.
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

/// The sentence containing `phrase` within plain text, if the phrase
/// occurs. Sentence boundaries are `.`, `!`, and `?`.
pub fn sentence_around<'a>(text: &'a str, phrase: &str) -> Option<&'a str> {
    let at = text.find(phrase)?;
    let start = text[..at]
        .rfind(['.', '!', '?'])
        .map(|i| i + 1)
        .unwrap_or(0);
    let end = text[at + phrase.len()..]
        .find(['.', '!', '?'])
        .map(|i| at + phrase.len() + i + 1)
        .unwrap_or(text.len());
    Some(text[start..end].trim())
}

/// A text run inside HTML: byte range plus whether it sits inside an
/// existing anchor element.
struct TextRun {
    start: usize,
    end: usize,
    in_anchor: bool,
}

/// Split HTML into text runs with anchor awareness.
fn text_runs(html: &str) -> Vec<TextRun> {
    let bytes = html.as_bytes();
    let mut runs = Vec::new();
    let mut anchor_depth: usize = 0;
    let mut i = 0;
    let mut run_start = 0;

    while i < bytes.len() {
        if bytes[i] == b'<' {
            if i > run_start {
                runs.push(TextRun {
                    start: run_start,
                    end: i,
                    in_anchor: anchor_depth > 0,
                });
            }
            let tag_end = html[i..].find('>').map(|j| i + j + 1).unwrap_or(bytes.len());
            let tag = &html[i..tag_end];
            let tag_lower = tag.to_lowercase();
            if tag_lower.starts_with("<a ") || tag_lower.starts_with("<a>") {
                anchor_depth += 1;
            } else if tag_lower.starts_with("</a") {
                anchor_depth = anchor_depth.saturating_sub(1);
            }
            i = tag_end;
            run_start = i;
        } else {
            i += 1;
        }
    }
    if i > run_start {
        runs.push(TextRun {
            start: run_start,
            end: i,
            in_anchor: anchor_depth > 0,
        });
    }
    runs
}

/// Whether `phrase` occurs in the HTML's linkable text (outside tags and
/// outside existing anchors).
pub fn phrase_present(html: &str, phrase: &str) -> bool {
    text_runs(html)
        .iter()
        .any(|run| !run.in_anchor && html[run.start..run.end].contains(phrase))
}

/// Wrap the first linkable occurrence of `phrase` in an anchor tag.
///
/// Returns None when the phrase does not occur outside tags/anchors; the
/// original HTML is never modified in that case.
pub fn insert_anchor(html: &str, phrase: &str, url: &str) -> Option<String> {
    if phrase.is_empty() {
        return None;
    }
    for run in text_runs(html) {
        if run.in_anchor {
            continue;
        }
        if let Some(offset) = html[run.start..run.end].find(phrase) {
            let at = run.start + offset;
            let mut result = String::with_capacity(html.len() + url.len() + 32);
            result.push_str(&html[..at]);
            result.push_str("<a href=\"");
            result.push_str(url);
            result.push_str("\">");
            result.push_str(phrase);
            result.push_str("</a>");
            result.push_str(&html[at + phrase.len()..]);
            return Some(result);
        }
    }
    None
}
