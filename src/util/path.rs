/// Turns a repository base directory into a key prefix: the leading
/// separator is dropped and exactly one trailing separator is kept. An
/// empty base directory stays empty so keys land at the bucket root.
pub fn base_dir(raw: &str) -> String {
    let trimmed = raw.trim_start_matches('/').trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }

    format!("{}/", trimmed)
}

/// Every parent prefix of a destination key, root first. Each prefix ends
/// with a separator and names one directory marker to create.
pub fn parent_prefixes(destination: &str) -> Vec<String> {
    let mut prefixes = Vec::new();
    for (pos, ch) in destination.char_indices() {
        if ch == '/' && pos > 0 {
            prefixes.push(destination[..=pos].to_string());
        }
    }

    prefixes
}
