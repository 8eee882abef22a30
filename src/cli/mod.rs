//! Interactive user administration over a local store.
//!
//! Commands are parsed into [`Command`] and applied with [`execute`]; the
//! rustyline loop in [`run_repl`] only handles prompting.

use anyhow::{bail, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::security::hash_password;
use crate::storage::Store;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Add { username: String, display_name: Option<String> },
    Delete { username: String },
    Passwd { username: String },
    Help,
    Quit,
}

impl Command {
    pub fn needs_password(&self) -> bool {
        matches!(self, Command::Add { .. } | Command::Passwd { .. })
    }
}

pub const HELP: &str = "commands:
  list                          list users
  add <username> [display name] create a user (prompts for a password)
  delete <username>             delete a user and everything they own
  passwd <username>             change a user's password
  help                          show this help
  quit | exit                   leave";

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((v, r)) => (v, r.trim()),
        None => (line, ""),
    };
    let cmd = match verb.to_lowercase().as_str() {
        "list" | "ls" => Command::List,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "add" => {
            let (username, display) = match rest.split_once(char::is_whitespace) {
                Some((u, d)) => (u, Some(d.trim().to_string()).filter(|d| !d.is_empty())),
                None => (rest, None),
            };
            Command::Add { username: required_name(username, "add")?, display_name: display }
        }
        "delete" | "rm" => Command::Delete { username: required_name(rest, "delete")? },
        "passwd" => Command::Passwd { username: required_name(rest, "passwd")? },
        other => bail!("unknown command '{}'; type 'help'", other),
    };
    Ok(Some(cmd))
}

fn required_name(s: &str, verb: &str) -> Result<String> {
    let s = s.trim();
    if s.is_empty() || s.contains(char::is_whitespace) {
        bail!("usage: {} <username>", verb);
    }
    Ok(s.to_string())
}

fn check_password(password: Option<&str>) -> Result<&str> {
    match password {
        Some(p) if p.chars().count() >= MIN_PASSWORD_LEN => Ok(p),
        Some(_) => bail!("password must be at least {} characters", MIN_PASSWORD_LEN),
        None => bail!("a password is required"),
    }
}

/// Apply a command and return the text to show the operator.
pub fn execute(store: &Store, cmd: &Command, password: Option<&str>) -> Result<String> {
    match cmd {
        Command::List => {
            let users = store.list_users()?;
            if users.is_empty() {
                return Ok("no users".to_string());
            }
            let lines: Vec<String> = users
                .iter()
                .map(|u| format!("{:>4}  {:<20} {}", u.id, u.username, u.display_name.as_deref().unwrap_or("")))
                .collect();
            Ok(lines.join("\n"))
        }
        Command::Add { username, display_name } => {
            let hash = hash_password(check_password(password)?)?;
            let id = store.create_user(username, &hash, display_name.as_deref())?;
            tracing::info!(target: "waypoint", user_id = id, %username, "user created");
            Ok(format!("created user '{}' (id {})", username, id))
        }
        Command::Delete { username } => {
            if store.delete_user(username)? {
                tracing::info!(target: "waypoint", %username, "user deleted");
                Ok(format!("deleted user '{}'", username))
            } else {
                Ok(format!("no such user '{}'", username))
            }
        }
        Command::Passwd { username } => {
            let hash = hash_password(check_password(password)?)?;
            if store.set_password(username, &hash)? {
                Ok(format!("password changed for '{}'", username))
            } else {
                Ok(format!("no such user '{}'", username))
            }
        }
        Command::Help => Ok(HELP.to_string()),
        Command::Quit => Ok(String::new()),
    }
}

pub fn run_repl(store: &Store) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    println!("waypoint user admin. Type 'help' for commands.");
    loop {
        let line = match rl.readline("waypoint> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let _ = rl.add_history_entry(line.as_str());
        let cmd = match parse_command(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };
        if cmd == Command::Quit {
            break;
        }
        let password = if cmd.needs_password() {
            match rl.readline("password: ") {
                Ok(p) => Some(p),
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => continue,
                Err(e) => return Err(e.into()),
            }
        } else {
            None
        };
        match execute(store, &cmd, password.as_deref()) {
            Ok(out) => println!("{}", out),
            Err(e) => eprintln!("error: {}", e),
        }
    }
    Ok(())
}
