use unicode_normalization::UnicodeNormalization;

/// Normalize extracted review text: NFC form, each line trimmed, runs of
/// blank lines collapsed to one.
///
/// Band and album names are full of accented characters, and the site
/// serves both precomposed and decomposed forms.
pub fn normalize_text(input: &str) -> String {
    let nfc: String = input.nfc().collect();

    let mut result = String::with_capacity(nfc.len());
    let mut prev_blank = false;

    for line in nfc.lines().map(str::trim) {
        let is_blank = line.is_empty();
        if is_blank && prev_blank {
            continue;
        }
        if !result.is_empty() {
            result.push('\n');
        }
        result.push_str(line);
        prev_blank = is_blank;
    }

    result.trim().to_string()
}

/// Collapse every run of whitespace (including newlines) to a single space.
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_nfc() {
        // o + combining diaeresis -> ö (precomposed)
        let decomposed = "Mo\u{0308}tley";
        assert_eq!(normalize_text(decomposed), "Mötley");
    }

    #[test]
    fn test_line_whitespace_and_blank_runs() {
        let input = "\n  First paragraph.   \n\n\n\nSecond paragraph.  \n\n";
        assert_eq!(normalize_text(input), "First paragraph.\n\nSecond paragraph.");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace(" January\n 1st,\t2020 "), "January 1st, 2020");
    }
}
