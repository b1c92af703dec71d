//! Greedy word wrapping by character count.

use std::ops::Range;

/// Column width used for the filing-history description.
pub const DESCRIPTION_WRAP_WIDTH: usize = 60;

/// Wrap `text` into lines of at most `width` characters.
///
/// Lines break at the last whitespace run that keeps the line within the
/// limit; the whitespace at a break is dropped. A token longer than
/// `width` is placed unbroken on a line of its own.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    wrap_spans(text, width)
        .into_iter()
        .map(|span| text[span].to_string())
        .collect()
}

/// Replace every whitespace run in `text` with a single space.
///
/// ```
/// use pdf_certifier::layout::normalize_whitespace;
/// assert_eq!(normalize_whitespace("a\t\tb\r\nc "), "a b c ");
/// ```
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out
}

/// Like [`wrap`], but returns each line as a byte range into `text`.
///
/// Whitespace inside a line is kept exactly as in `text`, so the ranges
/// can be used to map line positions back to the source string. Callers
/// that draw the lines pass text through [`normalize_whitespace`] first.
pub fn wrap_spans(text: &str, width: usize) -> Vec<Range<usize>> {
    let tokens = tokens(text);
    let mut lines = Vec::new();
    let mut iter = tokens.into_iter();
    let Some(mut current) = iter.next() else {
        return lines;
    };

    for token in iter {
        if token.char_end - current.char_start <= width {
            current.bytes.end = token.bytes.end;
            current.char_end = token.char_end;
        } else {
            lines.push(current.bytes);
            current = token;
        }
    }
    lines.push(current.bytes);
    lines
}

#[derive(Debug, Clone)]
struct Token {
    bytes: Range<usize>,
    char_start: usize,
    char_end: usize,
}

fn tokens(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut open: Option<(usize, usize)> = None;
    let mut char_count = 0;

    for (byte_idx, ch) in text.char_indices() {
        match (ch.is_whitespace(), open) {
            (false, None) => open = Some((byte_idx, char_count)),
            (true, Some((start, char_start))) => {
                tokens.push(Token {
                    bytes: start..byte_idx,
                    char_start,
                    char_end: char_count,
                });
                open = None;
            },
            _ => {},
        }
        char_count += 1;
    }
    if let Some((start, char_start)) = open {
        tokens.push(Token {
            bytes: start..text.len(),
            char_start,
            char_end: char_count,
        });
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_wrap_breaks_at_last_fitting_space() {
        let lines = wrap("aaa bbb ccc", 7);
        assert_eq!(lines, vec!["aaa bbb", "ccc"]);
    }

    #[test]
    fn test_wrap_exact_fit() {
        assert_eq!(wrap("abcde fghij", 11), vec!["abcde fghij"]);
        assert_eq!(wrap("abcde fghij", 10), vec!["abcde", "fghij"]);
    }

    #[test]
    fn test_long_token_alone() {
        let long = "x".repeat(70);
        let text = format!("short {} tail", long);
        let lines = wrap(&text, DESCRIPTION_WRAP_WIDTH);
        assert_eq!(lines, vec!["short".to_string(), long, "tail".to_string()]);
    }

    #[test]
    fn test_empty_and_blank() {
        assert!(wrap("", 60).is_empty());
        assert!(wrap("   \n ", 60).is_empty());
    }

    #[test]
    fn test_normalized_text_counts_single_spaces() {
        let text = normalize_whitespace("alpha\n\n\nbeta\tgamma");
        assert_eq!(text, "alpha beta gamma");
        assert_eq!(wrap(&text, 16), vec!["alpha beta gamma"]);
        assert!(!text.chars().any(char::is_control));
    }

    #[test]
    fn test_spans_index_source() {
        let text = "  héllo wörld again";
        let spans = wrap_spans(text, 11);
        assert_eq!(&text[spans[0].clone()], "héllo wörld");
        assert_eq!(&text[spans[1].clone()], "again");
    }

    #[test]
    fn test_description_wraps_at_sixty() {
        let text = "Registered office changedfrom 1 Test Lane to 2 Test Lane on 1 January 2023 (AD01)";
        let lines = wrap(text, DESCRIPTION_WRAP_WIDTH);
        assert_eq!(lines[0], "Registered office changedfrom 1 Test Lane to 2 Test Lane on");
        assert_eq!(lines[1], "1 January 2023 (AD01)");
    }

    proptest! {
        #[test]
        fn prop_lines_fit_or_are_single_tokens(text in "[a-z ]{0,20}( [a-z]{0,80}){0,12}", width in 1usize..80) {
            for line in wrap(&text, width) {
                let fits = line.chars().count() <= width;
                let single_token = !line.chars().any(char::is_whitespace);
                prop_assert!(fits || single_token, "line {:?} exceeds {}", line, width);
            }
        }

        #[test]
        fn prop_wrap_keeps_every_token(text in "\\PC{0,200}", width in 1usize..80) {
            let original: Vec<&str> = text.split_whitespace().collect();
            let lines = wrap(&text, width);
            let rewrapped: Vec<&str> = lines.iter().flat_map(|l| l.split_whitespace()).collect();
            prop_assert_eq!(original, rewrapped);
        }
    }
}
