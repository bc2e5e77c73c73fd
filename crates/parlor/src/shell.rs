// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parlor chat` command implementation.
//!
//! Interactive REPL with a colored prompt and readline history. Plain lines
//! go to the active conversation; lines starting with `/` are commands.

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use parlor_chat::{ReplyKind, SendOutcome};
use parlor_core::{ConversationId, FileSource, Lookup, ParlorError};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::app::App;
use crate::status;

const HELP: &str = "\
/new               start a new conversation
/list              list conversations
/switch N          make conversation N active
/rename NAME       rename the active conversation
/delete N          delete conversation N
/download          download the default model
/refresh           re-check the default model download
/delete-model      delete the default model file
/use PATH          use the model file at PATH
/import PATH       copy PATH into the cache and use it
/status            show model and conversation status
/theme             toggle the dark theme preference
/quit              exit";

/// A parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    New,
    List,
    Switch(ConversationId),
    Rename(String),
    Delete(ConversationId),
    Download,
    Refresh,
    DeleteModel,
    Use(String),
    Import(String),
    Status,
    Theme,
    Quit,
}

impl ShellCommand {
    /// Parses the text after the leading `/`.
    pub fn parse(input: &str) -> Result<Self, String> {
        let input = input.trim();
        let (name, rest) = match input.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (input, ""),
        };

        let command = match name {
            "help" | "?" => Self::Help,
            "new" => Self::New,
            "list" | "ls" => Self::List,
            "switch" => Self::Switch(parse_id(rest)?),
            "rename" if !rest.is_empty() => Self::Rename(rest.to_string()),
            "rename" => return Err("usage: /rename NAME".into()),
            "delete" => Self::Delete(parse_id(rest)?),
            "download" => Self::Download,
            "refresh" => Self::Refresh,
            "delete-model" => Self::DeleteModel,
            "use" if !rest.is_empty() => Self::Use(rest.to_string()),
            "use" => return Err("usage: /use PATH".into()),
            "import" if !rest.is_empty() => Self::Import(rest.to_string()),
            "import" => return Err("usage: /import PATH".into()),
            "status" => Self::Status,
            "theme" => Self::Theme,
            "quit" | "exit" => Self::Quit,
            other => return Err(format!("unknown command /{other}, try /help")),
        };
        Ok(command)
    }
}

/// Resolves a typed model path against the current directory, so the stored
/// path keeps working from anywhere.
pub fn absolute_model_path(path: impl AsRef<Path>) -> Result<String, ParlorError> {
    let absolute = std::path::absolute(path)?;
    Ok(absolute.to_string_lossy().into_owned())
}

fn parse_id(raw: &str) -> Result<ConversationId, String> {
    raw.parse::<u64>()
        .map(ConversationId)
        .map_err(|_| format!("expected a conversation number, got {raw:?}"))
}

/// Runs the `parlor chat` interactive REPL.
pub async fn run_shell(app: &App) -> Result<(), ParlorError> {
    let mut rl = DefaultEditor::new()
        .map_err(|e| ParlorError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", app.config.app.name.bold().green());
    println!(
        "Type {} for commands, {} to exit.",
        "/help".yellow(),
        "/quit".yellow()
    );
    let model = app.manager.status().await;
    if !model.engine_loaded {
        println!(
            "{}",
            "No model loaded. Use /download or /use PATH.".dimmed()
        );
    }
    println!();

    loop {
        let prompt = match app.store.active().await {
            Some(conversation) => format!("{}> ", conversation.name.green()),
            None => format!("{}> ", app.config.app.name.green()),
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                if let Some(input) = trimmed.strip_prefix('/') {
                    match ShellCommand::parse(input) {
                        Ok(ShellCommand::Quit) => break,
                        Ok(command) => {
                            if let Err(e) = run_command(app, command).await {
                                eprintln!("{}: {e}", "error".red());
                            }
                        }
                        Err(message) => eprintln!("{}", message.yellow()),
                    }
                } else {
                    send(app, trimmed).await;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    println!("{}", "goodbye".dimmed());
    Ok(())
}

async fn send(app: &App, text: &str) {
    let id = match app.store.active_id().await {
        Some(id) => id,
        None => match app.store.create().await {
            Ok(conversation) => conversation.id,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                return;
            }
        },
    };

    match app.pipeline.send_message(id, text).await {
        SendOutcome::Started(handle) => {
            println!("{}", "thinking...".dimmed());
            match handle.wait().await {
                Ok(report) => match report.kind {
                    ReplyKind::Generated => println!("{}\n", report.reply),
                    ReplyKind::NoModel => println!("{}\n", report.reply.yellow()),
                    ReplyKind::EngineFailed => println!("{}\n", report.reply.red()),
                },
                Err(e) => eprintln!("{}: {e}", "error".red()),
            }
        }
        SendOutcome::Busy => println!("{}", "still answering the previous message".yellow()),
        SendOutcome::ConversationNotFound => eprintln!("{}", "conversation no longer exists".red()),
        SendOutcome::Ignored => {}
    }
}

fn report_lookup(lookup: Lookup, id: ConversationId, done: &str) {
    match lookup {
        Lookup::Found => println!("{}", done.dimmed()),
        Lookup::NotFound => println!("{}", format!("no conversation {id}").yellow()),
    }
}

async fn run_command(app: &App, command: ShellCommand) -> Result<(), ParlorError> {
    match command {
        ShellCommand::Help => println!("{HELP}"),
        ShellCommand::New => {
            let conversation = app.store.create().await?;
            println!("{}", format!("started {}", conversation.name).dimmed());
        }
        ShellCommand::List => {
            let snapshot = app.store.snapshot().await;
            if snapshot.conversations.is_empty() {
                println!("{}", "no conversations, /new starts one".dimmed());
            }
            for conversation in &snapshot.conversations {
                let marker = if snapshot.active_id == Some(conversation.id) {
                    "*".green().to_string()
                } else {
                    " ".to_string()
                };
                let busy = if app.pipeline.is_generating(conversation.id) {
                    " (answering)".dimmed().to_string()
                } else {
                    String::new()
                };
                println!(
                    "{marker} {:>3}  {}  {}{busy}",
                    conversation.id,
                    conversation.name,
                    format!("{} messages", conversation.messages.len()).dimmed()
                );
            }
        }
        ShellCommand::Switch(id) => {
            let lookup = app.store.select(id).await?;
            report_lookup(lookup, id, &format!("switched to {id}"));
            if lookup.is_found()
                && let Some(conversation) = app.store.get(id).await
            {
                for message in &conversation.messages {
                    let who = if message.is_from_user { "you".cyan() } else { "model".magenta() };
                    println!("{who}: {}", message.text);
                }
            }
        }
        ShellCommand::Rename(name) => match app.store.active_id().await {
            Some(id) => {
                let lookup = app.store.rename(id, name).await?;
                report_lookup(lookup, id, "renamed");
            }
            None => println!("{}", "no active conversation".yellow()),
        },
        ShellCommand::Delete(id) => {
            let lookup = app.store.delete(id).await?;
            report_lookup(lookup, id, &format!("deleted {id}"));
        }
        ShellCommand::Download => {
            let id = app.manager.start_default_download().await?;
            println!(
                "{}",
                format!("downloading the default model ({id}), /refresh to check").dimmed()
            );
        }
        ShellCommand::Refresh => {
            let state = app.manager.refresh_download_status().await;
            println!("default model: {}", status::describe_default_model(state));
        }
        ShellCommand::DeleteModel => {
            if app.manager.delete_default_model().await {
                println!("{}", "default model deleted".dimmed());
            } else {
                println!("{}", "default model not present".yellow());
            }
        }
        ShellCommand::Use(path) => {
            app.manager.set_model_path(absolute_model_path(&path)?).await?;
            print_engine_state(app).await;
        }
        ShellCommand::Import(path) => {
            let imported = app
                .manager
                .import_custom_model(Arc::new(FileSource::new(&path)))
                .await;
            if imported.is_empty() {
                println!("{}", format!("could not import {path}").red());
            } else {
                println!("{}", format!("imported to {imported}").dimmed());
                print_engine_state(app).await;
            }
        }
        ShellCommand::Status => {
            let report = status::collect(app).await;
            status::print_report(&report, false);
        }
        ShellCommand::Theme => {
            let dark = !app.preferences.dark_theme().await?;
            app.preferences.set_dark_theme(dark).await?;
            let label = if dark { "dark theme on" } else { "dark theme off" };
            println!("{}", label.dimmed());
        }
        ShellCommand::Quit => {}
    }
    Ok(())
}

async fn print_engine_state(app: &App) {
    if app.manager.status().await.engine_loaded {
        println!("{}", "model loaded".green());
    } else {
        println!("{}", "model could not be loaded, replies will say so".yellow());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(ShellCommand::parse("new"), Ok(ShellCommand::New));
        assert_eq!(
            ShellCommand::parse("switch 3"),
            Ok(ShellCommand::Switch(ConversationId(3)))
        );
        assert_eq!(
            ShellCommand::parse("rename  Trip plans "),
            Ok(ShellCommand::Rename("Trip plans".into()))
        );
        assert_eq!(
            ShellCommand::parse("use /models/a b.gguf"),
            Ok(ShellCommand::Use("/models/a b.gguf".into()))
        );
        assert_eq!(ShellCommand::parse("delete-model"), Ok(ShellCommand::DeleteModel));
        assert_eq!(ShellCommand::parse("exit"), Ok(ShellCommand::Quit));
    }

    #[test]
    fn relative_model_paths_become_absolute() {
        let resolved = absolute_model_path("models/tiny.gguf").unwrap();
        let expected = std::env::current_dir().unwrap().join("models/tiny.gguf");
        assert_eq!(Path::new(&resolved), expected.as_path());
        #[cfg(unix)]
        assert_eq!(absolute_model_path("/m/a.gguf").unwrap(), "/m/a.gguf");
    }

    #[test]
    fn rejects_bad_input() {
        assert!(ShellCommand::parse("switch one").is_err());
        assert!(ShellCommand::parse("delete").is_err());
        assert!(ShellCommand::parse("rename").is_err());
        assert!(ShellCommand::parse("use").is_err());
        assert!(ShellCommand::parse("frobnicate").unwrap_err().contains("/frobnicate"));
    }
}
