use unicode_normalization::UnicodeNormalization;

/// Produce a filesystem- and URL-safe token from arbitrary text.
///
/// NFD-normalizes so accented letters contribute their base character, keeps
/// ASCII alphanumerics, folds whitespace and hyphen runs into single hyphens,
/// and lowercases. Total: any input maps to a (possibly empty) token matching
/// `[a-z0-9-]*` with no leading or trailing hyphen.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_separator = false;

    for ch in text.nfd() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('-');
            }
            pending_separator = false;
            out.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' {
            pending_separator = true;
        }
        // Everything else (punctuation, combining marks, symbols) is dropped.
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic() {
        assert_eq!(slugify("Villa Panorama"), "villa-panorama");
        assert_eq!(slugify("  Lake   View  "), "lake-view");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
    }

    #[test]
    fn test_unicode_folding() {
        assert_eq!(slugify("Côte d'Azur"), "cote-dazur");
        assert_eq!(slugify("Štúdio Müller"), "studio-muller");
    }

    #[test]
    fn test_strips_symbols() {
        assert_eq!(slugify("50% off! (really)"), "50-off-really");
        assert_eq!(slugify("___"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_idempotent_and_charset() {
        let inputs = [
            "Villa Panorama",
            "Côte d'Azur",
            "--x--",
            "A  B\tC",
            "émile & co",
            "日本語タイトル",
        ];
        for input in inputs {
            let once = slugify(input);
            assert_eq!(slugify(&once), once, "not idempotent for {input:?}");
            assert!(
                once.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
                "bad charset for {input:?}: {once:?}"
            );
            assert!(!once.starts_with('-') && !once.ends_with('-'));
        }
    }
}
