//! Best-effort Markdown to HTML for model output.
//!
//! Supports bold, italic, `#`/`##`/`###` headers, `-` list items and line
//! breaks. This is not CommonMark: the passes below run in a fixed order and
//! each rewrites the output of the previous one, so mixed or malformed input
//! degrades in a predictable way (a bold phrase inside a header stays bold,
//! unbalanced asterisks may become a stray `<em>`).

use once_cell::sync::Lazy;
use regex::Regex;

/// Rewrite passes in application order.
///
/// 1. bold before italic, so `**x**` is consumed before `*x*` can see it
/// 2. headers, one line at a time, `#` then `##` then `###`
/// 3. list items, one line at a time
/// 4. everything from the first `<li>` to the last `</li>` in a single `<ul>`
///
/// Remaining newlines become `<br>` afterwards.
static PASSES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\*\*(.*?)\*\*", "<strong>${1}</strong>"),
        (r"\*(.*?)\*", "<em>${1}</em>"),
        (r"(?m)^\s*#\s+(.*)$", "<h1>${1}</h1>"),
        (r"(?m)^\s*##\s+(.*)$", "<h2>${1}</h2>"),
        (r"(?m)^\s*###\s+(.*)$", "<h3>${1}</h3>"),
        (r"(?m)^\s*-\s+(.*)$", "<li>${1}</li>"),
        (r"(?s)(<li>.*</li>)", "<ul>${1}</ul>"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
    .collect()
});

pub fn render(text: &str) -> String {
    let mut html = text.to_string();
    for (pattern, replacement) in PASSES.iter() {
        html = pattern.replace_all(&html, *replacement).into_owned();
    }
    html.replace('\n', "<br>")
}
