//! URL slug derivation.

/// Convert free text into a lowercase, hyphen-separated URL segment.
///
/// Runs of anything that is not alphanumeric collapse into a single `-`, and
/// leading/trailing separators are dropped.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Build the slug of a content item from its heading and short identifier.
///
/// The short id suffix keeps two items with identical headings apart.
pub fn content_slug(heading: &str, short_id: &str) -> String {
    let base = slugify(heading);
    let short_id = slugify(short_id);
    match (base.is_empty(), short_id.is_empty()) {
        (true, _) => short_id,
        (false, true) => base,
        (false, false) => format!("{base}-{short_id}"),
    }
}
