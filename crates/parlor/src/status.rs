// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parlor status` command implementation.
//!
//! Summarizes the model configuration and the stored conversations, as
//! colored text or as JSON for scripting.

use std::io::IsTerminal;

use colored::Colorize;
use parlor_core::ParlorError;
use parlor_model::DefaultModelState;
use serde::Serialize;

use crate::app::App;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub model_path: String,
    pub engine_loaded: bool,
    pub default_model: String,
    pub default_model_path: String,
    pub conversations: usize,
    pub messages: usize,
    pub active_conversation: Option<String>,
}

pub fn describe_default_model(state: DefaultModelState) -> String {
    match state {
        DefaultModelState::Absent => "absent".to_string(),
        DefaultModelState::Downloading(id) => format!("downloading ({id})"),
        DefaultModelState::Downloaded => "downloaded".to_string(),
    }
}

pub async fn collect(app: &App) -> StatusReport {
    let status = app.manager.status().await;
    let snapshot = app.store.snapshot().await;
    let active_conversation = snapshot.active_id.and_then(|id| {
        snapshot
            .conversations
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
    });

    StatusReport {
        model_path: status.model_path,
        engine_loaded: status.engine_loaded,
        default_model: describe_default_model(status.default_model),
        default_model_path: status.default_model_path.display().to_string(),
        conversations: snapshot.conversations.len(),
        messages: snapshot.conversations.iter().map(|c| c.messages.len()).sum(),
        active_conversation,
    }
}

/// Prints the report. Colors are off for `plain` or when stdout is not a TTY.
pub fn print_report(report: &StatusReport, plain: bool) {
    let color = !plain && std::io::stdout().is_terminal();
    colored::control::set_override(color);

    let model = if report.model_path.is_empty() {
        "none".dimmed().to_string()
    } else {
        report.model_path.clone()
    };
    let engine = if report.engine_loaded {
        "loaded".green().to_string()
    } else {
        "not loaded".yellow().to_string()
    };

    println!("{} {model}", "model:".bold());
    println!("{} {engine}", "engine:".bold());
    println!(
        "{} {} ({})",
        "default model:".bold(),
        report.default_model,
        report.default_model_path
    );
    println!(
        "{} {} ({} messages)",
        "conversations:".bold(),
        report.conversations,
        report.messages
    );
    if let Some(active) = &report.active_conversation {
        println!("{} {active}", "active:".bold());
    }

    colored::control::unset_override();
}

/// Run the `parlor status` command.
pub async fn run_status(app: &App, json: bool, plain: bool) -> Result<(), ParlorError> {
    let report = collect(app).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, plain);
    }
    Ok(())
}
