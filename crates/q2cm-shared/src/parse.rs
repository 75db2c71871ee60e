// parse.rs — COM_Parse style tokenizer and numeric string classification

/// Splits the next token off `data`, skipping whitespace and `//` comments.
/// Quoted strings come back without their quotes and may be empty.
/// Returns `(token, remaining)`, or `None` once only whitespace is left.
pub fn com_parse(data: &str) -> Option<(&str, &str)> {
    let bytes = data.as_bytes();
    let mut i = 0;

    loop {
        // skip whitespace
        while i < bytes.len() && bytes[i] <= b' ' {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }

        // skip // comments
        if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'/') {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }
        break;
    }

    // handle quoted strings
    if bytes[i] == b'"' {
        let start = i + 1;
        let mut end = start;
        while end < bytes.len() && bytes[end] != b'"' {
            end += 1;
        }
        let rest = if end < bytes.len() { end + 1 } else { end };
        return Some((&data[start..end], &data[rest..]));
    }

    // parse a regular word
    let start = i;
    while i < bytes.len() && bytes[i] > b' ' {
        i += 1;
    }
    Some((&data[start..i], &data[i..]))
}

/// Optional leading '-' followed by one or more digits.
pub fn com_is_int(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|c| c.is_ascii_digit())
}

/// Optional leading '-', digits, and at most one '.'.
pub fn com_is_float(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() {
        return false;
    }
    let mut seen_dot = false;
    for c in digits.bytes() {
        if c == b'.' && !seen_dot {
            seen_dot = true;
        } else if !c.is_ascii_digit() {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(mut data: &str) -> Vec<&str> {
        let mut out = Vec::new();
        while let Some((tok, rest)) = com_parse(data) {
            out.push(tok);
            data = rest;
        }
        out
    }

    #[test]
    fn test_words_quotes_and_comments() {
        let src = "{ // worldspawn\n\"classname\" \"worldspawn\"\n\"message\" \"two words\" }";
        assert_eq!(
            tokens(src),
            vec!["{", "classname", "worldspawn", "message", "two words", "}"]
        );
    }

    #[test]
    fn test_empty_quoted_token() {
        assert_eq!(tokens("\"key\" \"\""), vec!["key", ""]);
    }

    #[test]
    fn test_unterminated_quote_runs_to_end() {
        assert_eq!(tokens("\"abc"), vec!["abc"]);
    }

    #[test]
    fn test_whitespace_only_is_end() {
        assert!(com_parse("   \n\t  // trailing").is_none());
    }

    #[test]
    fn test_numeric_classification() {
        assert!(com_is_int("-42"));
        assert!(!com_is_int("4.2"));
        assert!(!com_is_int("-"));
        assert!(com_is_float("4.2"));
        assert!(com_is_float("-.5"));
        assert!(com_is_float("7"));
        assert!(!com_is_float("1.2.3"));
        assert!(!com_is_float("1 2"));
    }
}
