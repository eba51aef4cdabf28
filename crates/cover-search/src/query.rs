use std::path::Path;

/// Turn a document filename into a search string.
///
/// `"My_Book (2nd Edition).pdf"` becomes `"My Book"`.
pub fn derive_query(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let separated = stem.replace(['_', '-'], " ");
    let query = strip_annotations(&separated)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    log::debug!("Derived query '{}' from '{}'", query, filename);
    query
}

/// Remove `(...)` and `[...]` groups such as edition, year or volume markers.
/// An opener without a later closer is kept as text.
fn strip_annotations(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len());
    let mut i = 0;
    while i < chars.len() {
        if matches!(chars[i], '(' | '[') {
            if let Some(offset) = chars[i + 1..].iter().position(|c| matches!(c, ')' | ']')) {
                i += offset + 2;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}
