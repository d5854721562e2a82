//! Final whitespace normalization applied to every extraction path.

/// Characters that end a line. Form feeds separate pages in extracted PDF
/// text; `\r\n` yields an empty piece that is dropped later.
const LINE_BREAKS: [char; 10] = [
    '\n', '\r', '\x0b', '\x0c', '\x1c', '\x1d', '\x1e', '\u{85}', '\u{2028}', '\u{2029}',
];

/// Split into lines, split each line on double spaces, trim every phrase and
/// join the non-empty phrases with single newlines.
pub fn normalize_text(text: &str) -> String {
    text.split(LINE_BREAKS)
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|phrase| !phrase.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
