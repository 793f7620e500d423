//! Execution engine - run planned lifecycle calls and persist their outcomes

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use declarative::{Outcome, Persist};
use rayon::prelude::*;
use std::path::Path;

use super::planner::{Action, Change, ExecutionPlan};
use crate::remote::Api;
use crate::resource::{Catalog, Kind, Snapshot};
use crate::state::StateFile;
use crate::ui;

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Number of parallel jobs
    pub jobs: usize,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Print diagnostics details and every entity result
    pub verbose: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            jobs: 4,
            yes: false,
            verbose: false,
        }
    }
}

/// Summary of execution results
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub refreshed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub warnings: usize,
}

impl ExecuteSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Result of one lifecycle call
#[derive(Debug)]
pub struct ChangeResult {
    pub address: String,
    pub action: &'static str,
    pub outcome: Outcome<Snapshot>,
}

fn action_name(action: &Action) -> &'static str {
    match action {
        Action::Create { .. } => "create",
        Action::Update { .. } => "update",
        Action::Delete { .. } => "delete",
        Action::Refresh { .. } => "refresh",
        Action::Unchanged => "none",
    }
}

/// Run one change through the lifecycle engine
pub fn run_change(catalog: &Catalog, client: &Api, change: &Change) -> Option<ChangeResult> {
    log::debug!("{} {}", action_name(&change.action), change.address);
    let outcome = match &change.action {
        Action::Create { desired } => catalog.create(client, desired),
        Action::Update { persisted, desired } => catalog.update(client, persisted, desired),
        Action::Delete { persisted } => catalog.delete(client, persisted),
        Action::Refresh { persisted } => catalog.read(client, persisted),
        Action::Unchanged => return None,
    };
    Some(ChangeResult {
        address: change.address.clone(),
        action: action_name(&change.action),
        outcome,
    })
}

/// Group pending changes into waves that respect kind dependencies
///
/// Writes run branches first; deletes run in the reverse order so nothing is
/// removed before what lives inside it.
fn waves(plan: &ExecutionPlan) -> Vec<Vec<&Change>> {
    let mut out = Vec::new();
    for kind in Kind::ALL {
        let wave: Vec<_> = plan
            .pending()
            .filter(|c| c.kind == kind && !matches!(c.action, Action::Delete { .. }))
            .collect();
        if !wave.is_empty() {
            out.push(wave);
        }
    }
    for kind in Kind::ALL.iter().rev() {
        let wave: Vec<_> = plan
            .pending()
            .filter(|c| c.kind == *kind && matches!(c.action, Action::Delete { .. }))
            .collect();
        if !wave.is_empty() {
            out.push(wave);
        }
    }
    out
}

/// Run every pending change, record outcomes in `state` and save it once
pub fn execute(
    plan: &ExecutionPlan,
    catalog: &Catalog,
    client: &Api,
    state: &mut StateFile,
    state_path: &Path,
    opts: &ExecuteOptions,
) -> Result<ExecuteSummary> {
    let mut summary = ExecuteSummary::default();
    if plan.is_empty() {
        return Ok(summary);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .context("Failed to create apply thread pool")?;

    println!();
    println!(
        "  {} Applying {} changes...",
        "→".cyan(),
        plan.pending_count()
    );

    let mut dirty = false;
    for wave in waves(plan) {
        let results: Vec<ChangeResult> = pool.install(|| {
            wave.par_iter()
                .filter_map(|change| run_change(catalog, client, change))
                .collect()
        });

        for result in results {
            dirty |= record(state, &mut summary, result, opts.verbose);
        }
    }

    if dirty {
        state.save(state_path)?;
    }

    print_summary(&summary);
    Ok(summary)
}

/// Apply one result to state and summary, returns whether the state changed
fn record(
    state: &mut StateFile,
    summary: &mut ExecuteSummary,
    result: ChangeResult,
    verbose: bool,
) -> bool {
    let ChangeResult {
        address,
        action,
        outcome,
    } = result;

    for diagnostic in &outcome.diagnostics {
        ui::diagnostic(&address, diagnostic);
    }
    summary.warnings += outcome.diagnostics.warnings().count();

    let failed = outcome.diagnostics.has_error();
    if failed {
        summary.failed += 1;
        println!("    {} {} {}", "✗".red(), action, address);
    } else {
        match action {
            "create" => summary.created += 1,
            "update" => summary.modified += 1,
            "delete" => summary.removed += 1,
            "refresh" => summary.refreshed += 1,
            _ => summary.skipped += 1,
        }
        if verbose {
            println!("    {} {} {}", "✓".green(), action, address);
        }
    }

    let persist = outcome.persist;
    if matches!(persist, Persist::Write(_)) && failed {
        log::info!("Keeping partial result for {address}");
    }
    state.apply(&address, persist)
}

/// Confirm with user
pub fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Changes applied successfully!", "✓".green().bold());
    } else {
        println!("  {} Changes applied with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} entities created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} entities updated", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} entities removed", summary.removed);
    }
    if summary.refreshed > 0 {
        println!("    • {} entities refreshed", summary.refreshed);
    }
    if summary.warnings > 0 {
        println!("    • {} {}", summary.warnings, "warnings".yellow());
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "entities".red());
    }
}

// ============================================================================
// Tests
// ============================================================================
