//! POSIX-ish shell tokenizer for argv values in toolchain files.
//!
//! Supports single quotes (literal), double quotes (backslash escapes), and
//! unquoted backslash escapes. Good enough for compiler flag strings; this
//! is not a shell.

/// Split a string into shell-style words.
pub fn split_shell_string(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                for q in chars.by_ref() {
                    if q == '\'' {
                        break;
                    }
                    current.push(q);
                }
            }
            '"' => {
                in_word = true;
                while let Some(q) = chars.next() {
                    match q {
                        '"' => break,
                        '\\' => {
                            if let Some(esc) = chars.next() {
                                current.push(esc);
                            }
                        }
                        other => current.push(other),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(esc) = chars.next() {
                    current.push(esc);
                }
            }
            other => {
                in_word = true;
                current.push(other);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_plain_words() {
        assert_eq!(split_shell_string("-Wall -Wextra"), vec!["-Wall", "-Wextra"]);
    }

    #[test]
    fn test_split_collapses_whitespace() {
        assert_eq!(split_shell_string("  a \t b\n c  "), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_empty() {
        assert_eq!(split_shell_string(""), Vec::<String>::new());
        assert_eq!(split_shell_string("   "), Vec::<String>::new());
    }

    #[test]
    fn test_single_quotes_are_literal() {
        assert_eq!(
            split_shell_string(r#"-D'NAME=some value' x"#),
            vec!["-DNAME=some value", "x"]
        );
        assert_eq!(split_shell_string(r#"'a\b'"#), vec![r"a\b"]);
    }

    #[test]
    fn test_double_quotes_with_escapes() {
        assert_eq!(
            split_shell_string(r#""a b" "say \"hi\"""#),
            vec!["a b", r#"say "hi""#]
        );
    }

    #[test]
    fn test_unquoted_backslash() {
        assert_eq!(split_shell_string(r"a\ b c"), vec!["a b", "c"]);
    }

    #[test]
    fn test_empty_quoted_word() {
        assert_eq!(split_shell_string("'' b"), vec!["", "b"]);
    }

    #[test]
    fn test_adjacent_quoted_segments_join() {
        assert_eq!(split_shell_string(r#"a'b'"c""#), vec!["abc"]);
    }
}
