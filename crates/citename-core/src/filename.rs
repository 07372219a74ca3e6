//! Canonical filename assembly and collision handling.

use std::path::{Path, PathBuf};

use crate::fs_ops::FileOps;
use crate::reconcile::ResolvedFields;
use crate::text::sanitize_for_filename;

/// Short words allowed to end a truncated title.
const TRAILING_STOP_WORDS: &[&str] = &["a", "an", "the", "of", "in", "on", "at", "to", "for"];

fn is_trailing_junk(c: char) -> bool {
    matches!(c, ',' | ';' | ':' | '-') || c.is_whitespace()
}

fn looks_cut(word: &str) -> bool {
    word.chars().count() > 2
        && word.chars().last().is_some_and(char::is_lowercase)
        && !TRAILING_STOP_WORDS.contains(&word)
}

/// Build `"<author> - <year> - <title>.pdf"` from resolved fields.
pub fn build_filename(fields: &ResolvedFields, max_title_length: usize, colon_replacement: &str) -> String {
    let author = sanitize_for_filename(&fields.author, colon_replacement);
    let year = sanitize_for_filename(&fields.year, colon_replacement);
    let title = sanitize_for_filename(&fields.title, colon_replacement);
    let title = truncate_title(
        title.trim_end_matches(['.', ',', ';', ':', '!', '?']),
        max_title_length,
    );
    format!("{} - {} - {}.pdf", author, year, title)
}

/// Shorten `title` to at most `max_len` characters.
///
/// Cuts at the last space before the limit when that space lies beyond 70%
/// of it, otherwise hard-cuts at the limit. A last word that looks cut off
/// (longer than two letters, ending lowercase, not a stop word) is dropped
/// unless it is the only word.
pub fn truncate_title(title: &str, max_len: usize) -> String {
    let chars: Vec<char> = title.chars().collect();
    if chars.len() <= max_len {
        return title.to_string();
    }

    let cut = match chars[..max_len].iter().rposition(|&c| c == ' ') {
        Some(pos) if pos as f64 > max_len as f64 * 0.7 => pos,
        _ => max_len,
    };
    let truncated: String = chars[..cut].iter().collect();
    let truncated = truncated.trim_end_matches(is_trailing_junk);

    let mut words: Vec<&str> = truncated.split_whitespace().collect();
    // A lone word is exempt: dropping it would leave an empty title.
    if words.len() > 1 && words.last().is_some_and(|w| looks_cut(w)) {
        words.pop();
    }

    words.join(" ").trim_end_matches(is_trailing_junk).to_string()
}

/// Pick a free path for `target`, appending ` (n)` before the extension.
///
/// `original` is the file being moved; landing on its own path is never a
/// collision.
pub fn resolve_collision(target: &Path, original: &Path, fs: &dyn FileOps) -> PathBuf {
    if target == original || !fs.exists(target) {
        return target.to_path_buf();
    }

    let parent = target.parent().unwrap_or_else(|| Path::new(""));
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = target
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1usize;
    loop {
        let candidate = parent.join(format!("{} ({}){}", stem, counter, ext));
        if candidate == original || !fs.exists(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}
