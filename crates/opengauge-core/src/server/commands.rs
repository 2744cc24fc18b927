//! Operator console commands
//!
//! ```text
//! set <name> <unit> <value>   force a var
//! unset <name> <unit>         stop forcing a var
//! watch <name> [unit]         log the next values of a var
//! vehicle [name]              force the vehicle name, or clear it
//! quit | exit                 stop the server
//! ```
//!
//! Arguments containing spaces are double-quoted:
//! `set "INDICATED ALTITUDE" feet 5000`.

use thiserror::Error;

use super::ServerHandle;
use crate::var::VarKey;

/// Errors from parsing a console line
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid value '{0}', expected a number")]
    InvalidValue(String),
}

/// A parsed console command
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Force a var to a value
    Set { key: VarKey, value: f64 },
    /// Stop forcing a var
    Unset { key: VarKey },
    /// Watch a var, optionally only one unit
    Watch { name: String, unit: Option<String> },
    /// Force the vehicle name, `None` clears it
    Vehicle(Option<String>),
    /// Stop the server
    Quit,
}

impl ConsoleCommand {
    /// Parse one console line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut args = split_args(line).into_iter();

        let command = match args.next() {
            Some(command) => command.to_lowercase(),
            None => return Ok(None),
        };

        let command = match command.as_str() {
            "quit" | "exit" => ConsoleCommand::Quit,
            "set" => {
                let name = args.next().ok_or(CommandError::MissingArgument("var name"))?;
                let unit = args.next().ok_or(CommandError::MissingArgument("unit"))?;
                let raw = args.next().ok_or(CommandError::MissingArgument("value"))?;
                let value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or(CommandError::InvalidValue(raw))?;
                ConsoleCommand::Set {
                    key: VarKey::new(name, unit),
                    value,
                }
            }
            "unset" => {
                let name = args.next().ok_or(CommandError::MissingArgument("var name"))?;
                let unit = args.next().ok_or(CommandError::MissingArgument("unit"))?;
                ConsoleCommand::Unset {
                    key: VarKey::new(name, unit),
                }
            }
            "watch" => {
                let name = args.next().ok_or(CommandError::MissingArgument("var name"))?;
                ConsoleCommand::Watch {
                    name,
                    unit: args.next(),
                }
            }
            "vehicle" => ConsoleCommand::Vehicle(args.next()),
            _ => return Err(CommandError::Unknown(line.trim().to_string())),
        };

        Ok(Some(command))
    }

    /// Run the command against a server
    pub fn apply(self, server: &ServerHandle) {
        match self {
            ConsoleCommand::Set { key, value } => server.force_var(&key, value),
            ConsoleCommand::Unset { key } => server.clear_forced_var(&key),
            ConsoleCommand::Watch { name, unit } => server.watch(&name, unit.as_deref()),
            ConsoleCommand::Vehicle(Some(name)) => server.force_vehicle(name),
            ConsoleCommand::Vehicle(None) => server.clear_forced_vehicle(),
            ConsoleCommand::Quit => server.shutdown(),
        }
    }
}

/// Split on whitespace, keeping double-quoted runs together
fn split_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in input.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if c.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}
