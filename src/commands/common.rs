use serde_json::{Map, Value};
use std::io::{self, Write};
use thiserror::Error;

/// Console commands with their raw arguments. An argument is `None` when the
/// user did not supply it; validation happens at execution time because some
/// checks need the storage cache.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create {
        class_name: Option<String>,
    },
    Show {
        class_name: Option<String>,
        id: Option<String>,
    },
    Destroy {
        class_name: Option<String>,
        id: Option<String>,
    },
    All {
        class_name: Option<String>,
    },
    Count {
        class_name: Option<String>,
    },
    Update {
        class_name: Option<String>,
        id: Option<String>,
        attribute: Option<String>,
        value: Option<String>,
    },
    UpdateMany {
        class_name: Option<String>,
        id: Option<String>,
        attributes: Map<String, Value>,
    },
    Help {
        topic: Option<String>,
    },
    Quit,
    Eof,
}

/// Names accepted as the first word of a console line.
pub const COMMAND_NAMES: [&str; 8] = ["EOF", "all", "create", "destroy", "help", "quit", "show", "update"];

impl Command {
    /// Builds a command from already tokenized input. Returns `None` when the
    /// first token is not a command name.
    pub fn from_tokens(tokens: &[String]) -> Option<Command> {
        let (name, args) = tokens.split_first()?;
        let arg = |index: usize| args.get(index).cloned();

        let command = match name.as_str() {
            "create" => Command::Create { class_name: arg(0) },
            "show" => Command::Show { class_name: arg(0), id: arg(1) },
            "destroy" => Command::Destroy { class_name: arg(0), id: arg(1) },
            "all" => Command::All { class_name: arg(0) },
            "update" => Command::Update {
                class_name: arg(0),
                id: arg(1),
                attribute: arg(2),
                value: arg(3),
            },
            "help" => Command::Help { topic: arg(0) },
            "quit" => Command::Quit,
            "EOF" => Command::Eof,
            _ => return None,
        };
        Some(command)
    }
}

/// One-line diagnostics printed when a command is rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Diagnostic {
    #[error("** class name missing **")]
    ClassNameMissing,
    #[error("** class doesn't exist **")]
    ClassUnknown,
    #[error("** instance id missing **")]
    InstanceIdMissing,
    #[error("** no instance found **")]
    InstanceNotFound,
    #[error("** attribute name missing **")]
    AttributeNameMissing,
    #[error("** value missing **")]
    ValueMissing,
    #[error("** attribute can't be updated **")]
    AttributeReserved,
    #[error("*** Unbalanced quotes: {0}")]
    UnbalancedQuotes(String),
    #[error("*** No escaped character: {0}")]
    DanglingEscape(String),
    #[error("*** Unknown syntax: {0}")]
    UnknownSyntax(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleState {
    Reading,
    Terminated,
}

pub trait CommandExecutor {
    fn execute_command<W: Write>(&mut self, command: Command, output: &mut W) -> io::Result<ConsoleState>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_from_tokens_fills_present_arguments() {
        let command = Command::from_tokens(&tokens(&["update", "Place", "1", "name"])).unwrap();
        assert_eq!(
            command,
            Command::Update {
                class_name: Some("Place".to_string()),
                id: Some("1".to_string()),
                attribute: Some("name".to_string()),
                value: None,
            }
        );
    }

    #[test]
    fn test_from_tokens_rejects_unknown_names() {
        assert_eq!(Command::from_tokens(&tokens(&["count", "User"])), None);
        assert_eq!(Command::from_tokens(&tokens(&["Quit"])), None);
        assert_eq!(Command::from_tokens(&[]), None);
    }

    #[test]
    fn test_every_command_name_parses() {
        for name in COMMAND_NAMES {
            assert!(Command::from_tokens(&tokens(&[name])).is_some(), "{}", name);
        }
    }

    #[test]
    fn test_diagnostic_text() {
        assert_eq!(Diagnostic::InstanceNotFound.to_string(), "** no instance found **");
        assert_eq!(
            Diagnostic::UnknownSyntax("foo".to_string()).to_string(),
            "*** Unknown syntax: foo"
        );
    }
}
