//! Quoting-aware argument splitting for bang arguments.
//!
//! Three token forms are recognized:
//! - `"""raw text"""` keeps every character between the triple quotes, embedded quotes included
//! - `"quoted text"` runs to the next quote; quotes are stripped
//! - `bare` runs to the next space; quotes are stripped
//!
//! The tokenizer is a pure function of its input.

const TRIPLE_QUOTE: &str = "\"\"\"";

/// Split `input` into tokens.
///
/// A quoted token without its closing quote ends the scan and the unterminated
/// remainder is dropped. A bare token at the end of the input needs no
/// delimiter.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = input;

    while let Some(pos) = rest.find(|c: char| c != ' ') {
        rest = &rest[pos..];

        if let Some(raw) = rest.strip_prefix(TRIPLE_QUOTE) {
            let closing = match raw.find("\"\"\" ") {
                Some(end) => Some((end, 4)),
                None => raw.find(TRIPLE_QUOTE).map(|end| (end, 3)),
            };
            let Some((end, marker_len)) = closing else {
                break;
            };
            tokens.push(raw[..end].to_string());
            rest = &raw[end + marker_len..];
            continue;
        }

        if let Some(quoted) = rest.strip_prefix('"') {
            let Some(end) = quoted.find('"') else {
                break;
            };
            tokens.push(strip_quotes(&quoted[..end]));
            rest = &quoted[end + 1..];
            continue;
        }

        match rest.find(' ') {
            Some(end) => {
                tokens.push(strip_quotes(&rest[..end]));
                rest = &rest[end + 1..];
            }
            None => {
                tokens.push(strip_quotes(rest));
                break;
            }
        }
    }

    tokens
}

fn strip_quotes(token: &str) -> String {
    token.chars().filter(|&c| c != '"').collect()
}

/// Quote a token so that [`tokenize`] yields it back unchanged.
///
/// Tokens that themselves contain quotes use the raw triple-quote form.
pub fn quote(token: &str) -> String {
    if token.contains('"') {
        format!("{TRIPLE_QUOTE}{token}{TRIPLE_QUOTE}")
    } else {
        format!("\"{token}\"")
    }
}

/// Split a batch argument (`[!Cmd1 a] [!Cmd2 [b]]`) into its top-level
/// bracketed commands, in order.
///
/// Nesting is tracked with a depth counter; brackets inside `"""raw"""`
/// spans do not count. Leading whitespace of each command is trimmed.
pub fn split_bracketed(arg: &str) -> Vec<String> {
    let bytes = arg.as_bytes();
    let mut commands = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'[' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            b']' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let command = &arg[start + 1..i];
                    commands.push(
                        command
                            .trim_start_matches([' ', '\t', '\r', '\n'])
                            .to_string(),
                    );
                }
            }
            b'"' if arg[i..].starts_with(TRIPLE_QUOTE) => {
                let body = i + TRIPLE_QUOTE.len();
                match arg[body..].find(TRIPLE_QUOTE) {
                    Some(close) => {
                        i = body + close + TRIPLE_QUOTE.len();
                        continue;
                    }
                    None => {
                        i = body;
                        continue;
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_and_quoted_tokens() {
        assert_eq!(
            tokenize("Var1 \"Hello World\" MySkin"),
            vec!["Var1", "Hello World", "MySkin"]
        );
    }

    #[test]
    fn test_triple_quotes_keep_inner_quotes() {
        assert_eq!(
            tokenize("\"\"\"She said \"hi\" to me\"\"\" Next"),
            vec!["She said \"hi\" to me", "Next"]
        );
    }

    #[test]
    fn test_triple_quote_at_end_of_input() {
        assert_eq!(tokenize("a \"\"\"b \"c\"\"\"\""), vec!["a", "b \"c"]);
    }

    #[test]
    fn test_empty_and_blank_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("     ").is_empty());
    }

    #[test]
    fn test_extra_spaces_between_tokens() {
        assert_eq!(tokenize("  a   b  "), vec!["a", "b"]);
    }

    #[test]
    fn test_quotes_inside_bare_token_are_stripped() {
        assert_eq!(tokenize("ab\"cd\" ef"), vec!["abcd", "ef"]);
    }

    #[test]
    fn test_empty_quoted_token_is_kept() {
        assert_eq!(tokenize("\"\" Skin"), vec!["", "Skin"]);
    }

    #[test]
    fn test_unterminated_quote_drops_remainder() {
        assert_eq!(tokenize("one \"two three"), vec!["one"]);
    }

    #[test]
    fn test_unterminated_triple_quote_drops_remainder() {
        assert_eq!(tokenize("a \"\"\"abc def"), vec!["a"]);
    }

    #[test]
    fn test_quote_round_trips_through_tokenize() {
        let tokens = ["plain", "two words", "has \"quotes\" inside"];
        let joined = tokens.iter().map(|t| quote(t)).collect::<Vec<_>>().join(" ");
        assert_eq!(tokenize(&joined), tokens);
    }

    #[test]
    fn test_split_bracketed_commands() {
        assert_eq!(
            split_bracketed("[!Show A] [ !Hide B]"),
            vec!["!Show A", "!Hide B"]
        );
    }

    #[test]
    fn test_split_bracketed_nested() {
        assert_eq!(
            split_bracketed("[!Execute [!Show A][!Hide B]] [!Update]"),
            vec!["!Execute [!Show A][!Hide B]", "!Update"]
        );
    }

    #[test]
    fn test_split_bracketed_skips_raw_quoted_brackets() {
        assert_eq!(
            split_bracketed("[!SetVariable V \"\"\"]x[\"\"\"] [!Update]"),
            vec!["!SetVariable V \"\"\"]x[\"\"\"", "!Update"]
        );
    }

    #[test]
    fn test_split_bracketed_ignores_stray_closing_bracket() {
        assert_eq!(split_bracketed("] [!Show A]"), vec!["!Show A"]);
    }

    proptest! {
        #[test]
        fn prop_bare_words_round_trip(words in prop::collection::vec("[A-Za-z0-9_.\\\\]{1,12}", 0..8)) {
            let joined = words.join(" ");
            prop_assert_eq!(tokenize(&joined), words);
        }

        #[test]
        fn prop_non_raw_tokens_never_contain_quotes(input in "[a-z \"]{0,40}") {
            prop_assume!(!input.contains("\"\"\""));
            for token in tokenize(&input) {
                prop_assert!(!token.contains('"'));
            }
        }
    }
}
