//! `cfgsync state` - inspect the state file

use anyhow::{Context as AnyhowContext, Result, bail};
use colored::Colorize;

use super::Workspace;
use crate::Context;
use crate::cli::StateCommand;
use crate::engine::Target;
use crate::state::StateFile;
use crate::ui;

pub fn run(ctx: &Context, cmd: StateCommand) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    match cmd {
        StateCommand::List { target } => {
            list(&ws.state, &Target::parse(target.as_deref()));
            Ok(())
        }
        StateCommand::Show { address } => show(&ws.state, &address),
    }
}

fn list(state: &StateFile, target: &Target) {
    let entries: Vec<_> = state
        .entities
        .iter()
        .filter(|(address, _)| target.matches(address))
        .collect();

    if entries.is_empty() {
        ui::info("No entities in the state file");
        return;
    }

    ui::header("State");
    for (address, snapshot) in &entries {
        let id = snapshot.remote_id();
        println!(
            "  {:<45} {}",
            address,
            if id.is_empty() { "-".dimmed() } else { id.dimmed() }
        );
    }
    println!();
    ui::kv("Entities", &entries.len().to_string());
    ui::kv(
        "Last updated",
        &state.last_updated.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
}

fn show(state: &StateFile, address: &str) -> Result<()> {
    let Some(snapshot) = state.get(address) else {
        bail!("No entity '{address}' in the state file. Run 'cfgsync state list' to see addresses.");
    };
    let json = serde_json::to_string_pretty(snapshot).context("Failed to render snapshot")?;
    println!("{json}");
    Ok(())
}
