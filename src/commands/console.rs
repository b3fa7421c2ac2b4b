// src/commands/console.rs
use itertools::Itertools;
use log::{debug, error};
use serde_json::Value;
use std::io::{self, BufRead, Write};

use crate::core::error::StorageError;
use crate::core::file_storage::FileStorage;
use crate::core::models::{Entity, Kind};
use super::common::{Command, CommandExecutor, ConsoleState, Diagnostic};
use super::parser::{coerce_value, parse_line};

const HELP_TOPICS: [(&str, &str); 9] = [
    ("EOF", "EOF - exit the console (Ctrl+D)"),
    ("all", "all [class name]\n    Print every instance, or only those of one class."),
    ("count", "<class name>.count()\n    Print how many instances of a class exist."),
    ("create", "create <class name>\n    Create an instance, save it and print its id."),
    ("destroy", "destroy <class name> <id>\n    Delete an instance and save the change."),
    ("help", "help [command]\n    List commands, or describe one."),
    ("quit", "quit - exit the console"),
    ("show", "show <class name> <id>\n    Print an instance."),
    (
        "update",
        "update <class name> <id> <attribute name> \"<attribute value>\"\n    \
         Add or replace one attribute and save. Numeric values are stored as numbers.\n    \
         <class name>.update(<id>, {\"attribute\": value, ...}) sets several at once.",
    ),
];

/// The interactive interpreter. Owns the storage engine for the session.
pub struct Console {
    storage: FileStorage,
    prompt: String,
}

impl Console {
    pub fn new(storage: FileStorage, prompt: impl Into<String>) -> Self {
        Self {
            storage,
            prompt: prompt.into(),
        }
    }

    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }

    /// Reads lines until `quit` or end of input. The prompt is only printed
    /// when `interactive` is set.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, output: &mut W, interactive: bool) -> io::Result<()> {
        let mut line = String::new();
        loop {
            if interactive {
                write!(output, "{}", self.prompt)?;
                output.flush()?;
            }

            line.clear();
            let state = if input.read_line(&mut line)? == 0 {
                self.execute_command(Command::Eof, output)?
            } else {
                self.onecmd(&line, output)?
            };

            if state == ConsoleState::Terminated {
                return Ok(());
            }
        }
    }

    /// Interprets a single line of input.
    pub fn onecmd<W: Write>(&mut self, line: &str, output: &mut W) -> io::Result<ConsoleState> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(ConsoleState::Reading);
        }

        match parse_line(line) {
            Ok(command) => self.execute_command(command, output),
            Err(diagnostic) => {
                writeln!(output, "{}", diagnostic)?;
                Ok(ConsoleState::Reading)
            }
        }
    }

    fn create(&mut self, class_name: Option<&str>) -> Result<String, CommandFailure> {
        let kind = resolve_kind(class_name)?;
        let id = self.storage.create(kind).id().to_string();
        self.storage.save_entity(kind, &id)?;
        debug!("Created {}.{}", kind, id);
        Ok(id)
    }

    fn show(&self, class_name: Option<&str>, id: Option<&str>) -> Result<String, CommandFailure> {
        let (kind, id) = self.resolve_instance(class_name, id)?;
        let entity = self.storage.get(kind, id).ok_or(Diagnostic::InstanceNotFound)?;
        Ok(entity.to_string())
    }

    fn destroy(&mut self, class_name: Option<&str>, id: Option<&str>) -> Result<(), CommandFailure> {
        let (kind, id) = self.resolve_instance(class_name, id)?;
        self.storage.remove(kind, id);
        self.storage.save()?;
        debug!("Destroyed {}.{}", kind, id);
        Ok(())
    }

    fn all(&self, class_name: Option<&str>) -> Result<Vec<String>, CommandFailure> {
        let renderings: Vec<String> = match class_name {
            None => self.storage.all().values().map(ToString::to_string).collect(),
            Some(_) => {
                let kind = resolve_kind(class_name)?;
                self.storage.of_kind(kind).map(ToString::to_string).collect()
            }
        };
        Ok(renderings)
    }

    fn count(&self, class_name: Option<&str>) -> Result<usize, CommandFailure> {
        let kind = resolve_kind(class_name)?;
        Ok(self.storage.count(kind))
    }

    fn update(
        &mut self,
        class_name: Option<&str>,
        id: Option<&str>,
        attribute: Option<&str>,
        value: Option<&str>,
    ) -> Result<(), CommandFailure> {
        let (kind, id) = self.resolve_instance(class_name, id)?;
        let attribute = attribute.ok_or(Diagnostic::AttributeNameMissing)?;
        let value = value.ok_or(Diagnostic::ValueMissing)?;
        self.assign(kind, id, [(attribute.to_string(), coerce_value(value))])
    }

    fn update_many(
        &mut self,
        class_name: Option<&str>,
        id: Option<&str>,
        attributes: serde_json::Map<String, Value>,
    ) -> Result<(), CommandFailure> {
        let (kind, id) = self.resolve_instance(class_name, id)?;
        if attributes.is_empty() {
            return Err(Diagnostic::AttributeNameMissing.into());
        }
        self.assign(kind, id, attributes)
    }

    fn assign(
        &mut self,
        kind: Kind,
        id: &str,
        attributes: impl IntoIterator<Item = (String, Value)>,
    ) -> Result<(), CommandFailure> {
        let attributes: Vec<(String, Value)> = attributes.into_iter().collect();
        if attributes.iter().any(|(name, _)| Entity::is_reserved(name)) {
            return Err(Diagnostic::AttributeReserved.into());
        }

        let entity = self.storage.get_mut(kind, id).ok_or(Diagnostic::InstanceNotFound)?;
        for (name, value) in attributes {
            entity
                .set_attribute(&name, value)
                .map_err(|_| Diagnostic::AttributeReserved)?;
        }
        self.storage.save_entity(kind, id)?;
        Ok(())
    }

    /// Class present, class known, id present, instance cached; in that order.
    fn resolve_instance<'a>(
        &self,
        class_name: Option<&str>,
        id: Option<&'a str>,
    ) -> Result<(Kind, &'a str), Diagnostic> {
        let kind = resolve_kind(class_name)?;
        let id = id.ok_or(Diagnostic::InstanceIdMissing)?;
        if !self.storage.contains(kind, id) {
            return Err(Diagnostic::InstanceNotFound);
        }
        Ok((kind, id))
    }
}

fn resolve_kind(class_name: Option<&str>) -> Result<Kind, Diagnostic> {
    let class_name = class_name.ok_or(Diagnostic::ClassNameMissing)?;
    Kind::from_name(class_name).ok_or(Diagnostic::ClassUnknown)
}

/// Why a command did not complete: bad input, or a storage fault after the
/// cache was already changed.
#[derive(Debug)]
enum CommandFailure {
    Rejected(Diagnostic),
    Storage(StorageError),
}

impl From<Diagnostic> for CommandFailure {
    fn from(diagnostic: Diagnostic) -> Self {
        CommandFailure::Rejected(diagnostic)
    }
}

impl From<StorageError> for CommandFailure {
    fn from(e: StorageError) -> Self {
        CommandFailure::Storage(e)
    }
}

/// Prints the outcome of a command. A storage fault is not recoverable here and
/// is returned as an error; the cache keeps the change that failed to persist.
fn report<W: Write, T>(
    output: &mut W,
    result: Result<T, CommandFailure>,
    on_success: impl FnOnce(&mut W, T) -> io::Result<()>,
) -> io::Result<ConsoleState> {
    match result {
        Ok(value) => on_success(output, value)?,
        Err(CommandFailure::Rejected(diagnostic)) => writeln!(output, "{}", diagnostic)?,
        Err(CommandFailure::Storage(e)) => {
            error!("Failed to save objects: {}", e);
            return Err(io::Error::new(io::ErrorKind::Other, e));
        }
    }
    Ok(ConsoleState::Reading)
}

fn print_help<W: Write>(output: &mut W, topic: Option<&str>) -> io::Result<()> {
    match topic {
        None => {
            writeln!(output)?;
            writeln!(output, "Documented commands (type help <topic>):")?;
            writeln!(output, "========================================")?;
            writeln!(output, "{}", HELP_TOPICS.iter().map(|(name, _)| name).join("  "))?;
            writeln!(output)
        }
        Some(topic) => match HELP_TOPICS.iter().find(|(name, _)| *name == topic) {
            Some((_, text)) => writeln!(output, "{}\n", text),
            None => writeln!(output, "*** No help on {}", topic),
        },
    }
}

impl CommandExecutor for Console {
    fn execute_command<W: Write>(&mut self, command: Command, output: &mut W) -> io::Result<ConsoleState> {
        match command {
            Command::Create { class_name } => {
                let result = self.create(class_name.as_deref());
                report(output, result, |out, id| writeln!(out, "{}", id))
            }
            Command::Show { class_name, id } => {
                let result = self.show(class_name.as_deref(), id.as_deref());
                report(output, result, |out, rendering| writeln!(out, "{}", rendering))
            }
            Command::Destroy { class_name, id } => {
                let result = self.destroy(class_name.as_deref(), id.as_deref());
                report(output, result, |_, ()| Ok(()))
            }
            Command::All { class_name } => {
                let result = self.all(class_name.as_deref());
                report(output, result, |out, renderings| {
                    if renderings.is_empty() {
                        return Ok(());
                    }
                    writeln!(out, "[{}]", renderings.iter().join(", "))
                })
            }
            Command::Count { class_name } => {
                let result = self.count(class_name.as_deref());
                report(output, result, |out, count| writeln!(out, "{}", count))
            }
            Command::Update { class_name, id, attribute, value } => {
                let result = self.update(
                    class_name.as_deref(),
                    id.as_deref(),
                    attribute.as_deref(),
                    value.as_deref(),
                );
                report(output, result, |_, ()| Ok(()))
            }
            Command::UpdateMany { class_name, id, attributes } => {
                let result = self.update_many(class_name.as_deref(), id.as_deref(), attributes);
                report(output, result, |_, ()| Ok(()))
            }
            Command::Help { topic } => {
                print_help(output, topic.as_deref())?;
                Ok(ConsoleState::Reading)
            }
            Command::Quit => Ok(ConsoleState::Terminated),
            Command::Eof => {
                writeln!(output)?;
                Ok(ConsoleState::Terminated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_console() -> (TempDir, Console) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path().join("file.json"));
        (temp_dir, Console::new(storage, "(hbnb) "))
    }

    fn run_line(console: &mut Console, line: &str) -> String {
        let mut output = Vec::new();
        console.onecmd(line, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    fn create(console: &mut Console, class_name: &str) -> String {
        run_line(console, &format!("create {}", class_name)).trim().to_string()
    }

    #[test]
    fn test_create_prints_id_and_persists() {
        let (_dir, mut console) = create_test_console();
        let id = create(&mut console, "User");
        assert!(console.storage().contains(Kind::User, &id));

        let on_disk = FileStorage::open(console.storage().path());
        assert!(on_disk.contains(Kind::User, &id));
    }

    #[test]
    fn test_create_diagnostics() {
        let (_dir, mut console) = create_test_console();
        assert_eq!(run_line(&mut console, "create"), "** class name missing **\n");
        assert_eq!(run_line(&mut console, "create MyModel"), "** class doesn't exist **\n");
        assert!(console.storage().is_empty());
    }

    #[test]
    fn test_show_and_destroy_validation_order() {
        let (_dir, mut console) = create_test_console();
        for command in ["show", "destroy"] {
            assert_eq!(run_line(&mut console, command), "** class name missing **\n");
            assert_eq!(run_line(&mut console, &format!("{} Foo 1", command)), "** class doesn't exist **\n");
            assert_eq!(run_line(&mut console, &format!("{} User", command)), "** instance id missing **\n");
            assert_eq!(run_line(&mut console, &format!("{} User 1", command)), "** no instance found **\n");
        }
    }

    #[test]
    fn test_update_validation_order() {
        let (_dir, mut console) = create_test_console();
        let id = create(&mut console, "Place");

        assert_eq!(run_line(&mut console, "update"), "** class name missing **\n");
        assert_eq!(run_line(&mut console, "update Foo"), "** class doesn't exist **\n");
        assert_eq!(run_line(&mut console, "update Place"), "** instance id missing **\n");
        assert_eq!(run_line(&mut console, "update Place nope name"), "** no instance found **\n");
        assert_eq!(
            run_line(&mut console, &format!("update Place {}", id)),
            "** attribute name missing **\n"
        );
        assert_eq!(
            run_line(&mut console, &format!("update Place {} name", id)),
            "** value missing **\n"
        );
    }

    #[test]
    fn test_update_coerces_values() {
        let (_dir, mut console) = create_test_console();
        let id = create(&mut console, "Place");

        run_line(&mut console, &format!("update Place {} number_rooms 50", id));
        run_line(&mut console, &format!("update Place {} latitude 50.5", id));
        run_line(&mut console, &format!("update Place {} name Lagos", id));
        run_line(&mut console, &format!("update Place {} description \"Two words\" ignored", id));

        let place = console.storage().get(Kind::Place, &id).unwrap();
        assert_eq!(place.attribute("number_rooms"), Some(json!(50)));
        assert_eq!(place.attribute("latitude"), Some(json!(50.5)));
        assert_eq!(place.attribute("name"), Some(json!("Lagos")));
        assert_eq!(place.attribute("description"), Some(json!("Two words")));
    }

    #[test]
    fn test_update_refuses_reserved_attributes() {
        let (_dir, mut console) = create_test_console();
        let id = create(&mut console, "User");
        assert_eq!(
            run_line(&mut console, &format!("update User {} id other", id)),
            "** attribute can't be updated **\n"
        );
        assert!(console.storage().contains(Kind::User, &id));
    }

    #[test]
    fn test_all_filters_and_suppresses_empty_lists() {
        let (_dir, mut console) = create_test_console();
        assert_eq!(run_line(&mut console, "all"), "");
        let id = create(&mut console, "State");

        assert_eq!(run_line(&mut console, "all City"), "");
        assert_eq!(run_line(&mut console, "all Nope"), "** class doesn't exist **\n");

        let listing = run_line(&mut console, "all State");
        assert!(listing.starts_with(&format!("[[State] ({})", id)));
        assert!(listing.ends_with("}]\n"));
        assert_eq!(run_line(&mut console, "all"), listing);
    }

    #[test]
    fn test_dotted_calls_match_primary_commands() {
        let (_dir, mut console) = create_test_console();
        let id = run_line(&mut console, "User.create()").trim().to_string();
        create(&mut console, "User");

        assert_eq!(run_line(&mut console, "User.count()"), "2\n");
        assert_eq!(run_line(&mut console, "City.count()"), "0\n");
        assert_eq!(run_line(&mut console, "Nope.count()"), "** class doesn't exist **\n");
        assert_eq!(
            run_line(&mut console, &format!("User.show(\"{}\")", id)),
            run_line(&mut console, &format!("show User {}", id))
        );
        assert_eq!(run_line(&mut console, "User.show()"), "** instance id missing **\n");
        assert_eq!(run_line(&mut console, "User.all()"), run_line(&mut console, "all User"));

        run_line(&mut console, &format!("User.update(\"{}\", \"age\", \"89\")", id));
        run_line(
            &mut console,
            &format!("User.update(\"{}\", {{\"first_name\": \"John\", \"score\": 9.5}})", id),
        );
        let user = console.storage().get(Kind::User, &id).unwrap();
        assert_eq!(user.attribute("age"), Some(json!(89)));
        assert_eq!(user.attribute("first_name"), Some(json!("John")));
        assert_eq!(user.attribute("score"), Some(json!(9.5)));

        assert_eq!(
            run_line(&mut console, &format!("User.update(\"{}\", {{}})", id)),
            "** attribute name missing **\n"
        );

        run_line(&mut console, &format!("User.destroy(\"{}\")", id));
        assert_eq!(run_line(&mut console, "User.count()"), "1\n");
    }

    #[test]
    fn test_unknown_and_malformed_input() {
        let (_dir, mut console) = create_test_console();
        assert_eq!(run_line(&mut console, "fly away"), "*** Unknown syntax: fly away\n");
        assert_eq!(run_line(&mut console, "User.fly()"), "*** Unknown syntax: User.fly()\n");
        assert_eq!(
            run_line(&mut console, "show User \"abc"),
            "*** Unbalanced quotes: show User \"abc\n"
        );
        assert_eq!(
            run_line(&mut console, r"show User abc\"),
            "*** No escaped character: show User abc\\\n"
        );
        assert_eq!(run_line(&mut console, "   "), "");
    }

    #[test]
    fn test_help_output() {
        let (_dir, mut console) = create_test_console();
        let listing = run_line(&mut console, "help");
        assert!(listing.contains("EOF  all  count  create  destroy  help  quit  show  update"));
        assert!(run_line(&mut console, "help create").starts_with("create <class name>"));
        assert_eq!(run_line(&mut console, "help fly"), "*** No help on fly\n");
    }

    #[test]
    fn test_quit_and_eof_terminate() {
        let (_dir, mut console) = create_test_console();
        let mut output = Vec::new();
        assert_eq!(console.onecmd("quit", &mut output).unwrap(), ConsoleState::Terminated);
        assert!(output.is_empty());
        assert_eq!(console.onecmd("EOF", &mut output).unwrap(), ConsoleState::Terminated);
        assert_eq!(output, b"\n");
        assert_eq!(console.onecmd("all", &mut output).unwrap(), ConsoleState::Reading);
    }

    #[test]
    fn test_run_loop() {
        let (_dir, mut console) = create_test_console();
        let input = "create State\n\nall Nope\nquit\ncreate State\n";
        let mut output = Vec::new();
        console.run(input.as_bytes(), &mut output, true).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("(hbnb) "));
        assert!(output.contains("** class doesn't exist **"));
        assert_eq!(output.matches("(hbnb) ").count(), 4);
        assert_eq!(console.storage().count(Kind::State), 1);
    }

    #[test]
    fn test_run_loop_end_of_input() {
        let (_dir, mut console) = create_test_console();
        let mut output = Vec::new();
        console.run("create City\n".as_bytes(), &mut output, false).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(!output.contains("(hbnb)"));
        assert!(output.ends_with("\n\n"));
        assert_eq!(console.storage().count(Kind::City), 1);
    }

    #[test]
    fn test_failed_save_propagates() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("file.json");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();

        let mut console = Console::new(FileStorage::new(&target), "(hbnb) ");
        let mut output = Vec::new();
        let err = console.onecmd("create User", &mut output).unwrap_err();
        assert!(output.is_empty());
        let source = err.into_inner().unwrap();
        assert!(matches!(source.downcast_ref::<StorageError>(), Some(StorageError::Io { .. })));
        // No rollback: the instance stays cached.
        assert_eq!(console.storage().count(Kind::User), 1);

        let mut output = Vec::new();
        let result = console.run("all\nupdate User x name y\n".as_bytes(), &mut output, false);
        assert!(result.is_ok());
        let result = console.run("User.create()\nall\n".as_bytes(), &mut output, false);
        assert!(result.is_err());
    }
}
