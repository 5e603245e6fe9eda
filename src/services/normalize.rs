/// Canonicalizes a free-text title into a stable search/cache key
///
/// Lowercases, drops everything outside `[a-z0-9 ]`, collapses whitespace runs to a
/// single space and trims. Total: any input, including the empty string, yields a string.
pub fn normalize_title(title: &str) -> String {
    let mut normalized = String::with_capacity(title.len());
    let mut pending_space = false;

    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() {
            pending_space = !normalized.is_empty();
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_space {
                normalized.push(' ');
                pending_space = false;
            }
            normalized.push(c);
        }
    }

    normalized
}

/// Converts a normalized title into the slug form used in detail-page URLs
pub fn title_slug(title: &str) -> String {
    normalize_title(title).replace(' ', "_")
}
