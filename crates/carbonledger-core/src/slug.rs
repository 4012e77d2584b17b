//! Slug derivation for organization names.

/// Derive a URL slug from an organization name: lower-cased, runs of
/// non-alphanumeric characters collapsed to a single `-`, trimmed.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true; // suppress a leading dash
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
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

/// Append a collision suffix to a taken slug.
pub fn with_suffix(slug: &str, suffix: u32) -> String {
    format!("{}-{:03}", slug, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Acme Corp"), "acme-corp");
    }

    #[test]
    fn test_slugify_collapses_symbols() {
        assert_eq!(slugify("Acme & Sons, Ltd."), "acme-sons-ltd");
        assert_eq!(slugify("  Über GmbH  "), "ber-gmbh");
    }

    #[test]
    fn test_slugify_trims_dashes() {
        assert_eq!(slugify("--Acme--"), "acme");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_with_suffix_is_three_digits() {
        assert_eq!(with_suffix("acme-corp", 7), "acme-corp-007");
        assert_eq!(with_suffix("acme-corp", 123), "acme-corp-123");
    }
}
