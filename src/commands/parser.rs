// src/commands/parser.rs
use serde_json::{Number, Value};

use super::common::{Command, Diagnostic, COMMAND_NAMES};
use super::dotted;

/// Splits a line into words the way a POSIX shell would. Single and double
/// quotes group words. Outside quotes a backslash escapes the next character;
/// inside double quotes it only escapes `"` and `\`, and is kept otherwise.
pub fn tokenize(line: &str) -> Result<Vec<String>, Diagnostic> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') => match chars.peek() {
                Some(&next) if next == '"' || next == '\\' => {
                    current.push(next);
                    chars.next();
                }
                Some(_) => current.push(c),
                None => return Err(Diagnostic::DanglingEscape(line.to_string())),
            },
            (Some(_), c) => current.push(c),
            (None, '"') | (None, '\'') => {
                quote = Some(c);
                in_token = true;
            }
            (None, '\\') => match chars.next() {
                Some(next) => {
                    current.push(next);
                    in_token = true;
                }
                None => return Err(Diagnostic::DanglingEscape(line.to_string())),
            },
            (None, c) if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        return Err(Diagnostic::UnbalancedQuotes(line.to_string()));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Turns update input into an integer, else a finite float, else keeps the text.
pub fn coerce_value(raw: &str) -> Value {
    if let Ok(integer) = raw.parse::<i64>() {
        return Value::Number(integer.into());
    }
    if let Ok(integer) = raw.parse::<u64>() {
        return Value::Number(integer.into());
    }
    if let Ok(float) = raw.parse::<f64>() {
        if let Some(number) = Number::from_f64(float) {
            return Value::Number(number);
        }
    }
    Value::String(raw.to_string())
}

/// Parses one non-empty console line into a command.
pub fn parse_line(line: &str) -> Result<Command, Diagnostic> {
    let first_word = line.split_whitespace().next().unwrap_or_default();

    if COMMAND_NAMES.contains(&first_word) {
        let tokens = tokenize(line)?;
        return Command::from_tokens(&tokens)
            .ok_or_else(|| Diagnostic::UnknownSyntax(line.to_string()));
    }

    dotted::parse(line).ok_or_else(|| Diagnostic::UnknownSyntax(line.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_tokenize_plain_words() {
        assert_eq!(tokenize("  show  User   42 ").unwrap(), vec!["show", "User", "42"]);
        assert!(tokenize("   ").unwrap().is_empty());
    }

    #[test]
    fn test_tokenize_quotes() {
        assert_eq!(
            tokenize(r#"update Place 1 name "My little house""#).unwrap(),
            vec!["update", "Place", "1", "name", "My little house"]
        );
        assert_eq!(
            tokenize("update User 1 bio 'says \"hi\"'").unwrap(),
            vec!["update", "User", "1", "bio", "says \"hi\""]
        );
        assert_eq!(tokenize(r#"a"b c"d"#).unwrap(), vec!["ab cd"]);
        assert_eq!(tokenize(r#"x "" y"#).unwrap(), vec!["x", "", "y"]);
    }

    #[test]
    fn test_tokenize_escapes() {
        assert_eq!(tokenize(r"one\ word").unwrap(), vec!["one word"]);
        assert_eq!(tokenize(r#""a \"quoted\" b""#).unwrap(), vec![r#"a "quoted" b"#]);
        assert_eq!(tokenize(r#""back\\slash""#).unwrap(), vec![r"back\slash"]);
        assert_eq!(tokenize(r"'C:\new'").unwrap(), vec![r"C:\new"]);
        assert_eq!(
            tokenize(r#"update User 1 path "C:\new""#).unwrap(),
            vec!["update", "User", "1", "path", r"C:\new"]
        );
    }

    #[test]
    fn test_tokenize_dangling_backslash() {
        let line = r"update User 1 name abc\";
        assert_eq!(tokenize(line), Err(Diagnostic::DanglingEscape(line.to_string())));
        let quoted = r#"update User 1 name "abc\"#;
        assert_eq!(tokenize(quoted), Err(Diagnostic::DanglingEscape(quoted.to_string())));
    }

    #[test]
    fn test_tokenize_unbalanced_quotes() {
        let line = r#"update User 1 name "John"#;
        assert_eq!(tokenize(line), Err(Diagnostic::UnbalancedQuotes(line.to_string())));
        assert!(tokenize("show 'User").is_err());
    }

    #[test]
    fn test_coerce_value() {
        assert_eq!(coerce_value("50"), json!(50));
        assert_eq!(coerce_value("-3"), json!(-3));
        assert_eq!(coerce_value("18446744073709551615"), json!(u64::MAX));
        assert!(coerce_value("18446744073709551615").is_u64());
        assert_eq!(coerce_value("50.5"), json!(50.5));
        assert_eq!(coerce_value("1e3"), json!(1000.0));
        assert_eq!(coerce_value("Lagos"), json!("Lagos"));
        assert_eq!(coerce_value("inf"), json!("inf"));
        assert_eq!(coerce_value("NaN"), json!("NaN"));
        assert_eq!(coerce_value(""), json!(""));
    }

    #[test]
    fn test_parse_line_routes_primary_and_dotted_forms() {
        assert_eq!(
            parse_line("show User 1").unwrap(),
            Command::Show { class_name: Some("User".to_string()), id: Some("1".to_string()) }
        );
        assert_eq!(
            parse_line("User.show(\"1\")").unwrap(),
            Command::Show { class_name: Some("User".to_string()), id: Some("1".to_string()) }
        );
        assert_eq!(
            parse_line("launch rockets"),
            Err(Diagnostic::UnknownSyntax("launch rockets".to_string()))
        );
    }

    proptest! {
        #[test]
        fn coerce_integers_stay_integers(n in any::<i64>()) {
            prop_assert_eq!(coerce_value(&n.to_string()), json!(n));
        }

        #[test]
        fn coerce_alphabetic_text_is_unchanged(s in "[a-zA-Z_]{1,12}") {
            prop_assume!(!["inf", "infinity", "nan"].contains(&s.to_lowercase().as_str()));
            prop_assert_eq!(coerce_value(&s), Value::String(s.clone()));
        }

        #[test]
        fn tokenize_unquoted_words_matches_whitespace_split(words in prop::collection::vec("[a-zA-Z0-9._-]{1,8}", 0..6)) {
            let line = words.join(" ");
            prop_assert_eq!(tokenize(&line).unwrap(), words);
        }
    }
}
