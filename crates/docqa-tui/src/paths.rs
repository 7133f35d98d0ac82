//! Turning typed or pasted text into file paths.

use std::path::PathBuf;

/// Expand a leading `~` to the home directory
pub fn expand_tilde(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Split text pasted by a terminal drag-and-drop into paths.
///
/// Terminals emit dropped files separated by spaces or newlines, either
/// quoted (`'my file.pdf'`) or with backslash-escaped spaces
/// (`my\ file.pdf`). `file://` URIs are accepted too.
pub fn parse_dropped_paths(text: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => quote = Some(c),
            (None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            (None, c) if c.is_whitespace() => {
                if !current.is_empty() {
                    paths.push(to_path(&std::mem::take(&mut current)));
                }
            }
            (None, c) => current.push(c),
        }
    }
    if !current.is_empty() {
        paths.push(to_path(&current));
    }

    paths
}

fn to_path(token: &str) -> PathBuf {
    let token = token.strip_prefix("file://").unwrap_or(token);
    expand_tilde(&token.replace("%20", " "))
}
