//! Plan display

use colored::Colorize;
use serde_json::Value;
use similar::{ChangeTag, TextDiff};

use super::planner::{Action, ExecutionPlan};
use crate::resource::Snapshot;
use crate::ui;

const VALUE_WIDTH: usize = 60;

/// One attribute that differs between persisted and desired
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub name: String,
    pub from: Value,
    pub to: Value,
}

/// Attributes `desired` sets to something other than `persisted`
pub fn field_changes(persisted: &Snapshot, desired: &Snapshot) -> Vec<FieldChange> {
    let (Value::Object(have), Value::Object(want)) = (persisted.to_value(), desired.to_value())
    else {
        return Vec::new();
    };

    want.into_iter()
        .filter(|(_, to)| !to.is_null())
        .filter_map(|(name, to)| {
            let from = have.get(&name).cloned().unwrap_or(Value::Null);
            let same = match (&from, &to) {
                (Value::String(a), Value::String(b)) => a == b || content::equivalent(a, b),
                _ => from == to,
            };
            (!same).then_some(FieldChange { name, from, to })
        })
        .collect()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "(unset)".to_string(),
        Value::String(s) => ui::truncate(&format!("{s:?}"), VALUE_WIDTH),
        Value::Array(items) => format!("[{} items]", items.len()),
        other => ui::truncate(&other.to_string(), VALUE_WIDTH),
    }
}

/// Payload text in display encoding, for line diffs
fn payload_lines(text: &str) -> Option<String> {
    let map = content::decode(text).ok()?;
    content::encode_display(&map, "").ok()
}

/// Line diff of two payload texts, `None` when either is not a payload
pub fn payload_diff(from: &str, to: &str) -> Option<Vec<String>> {
    let old = payload_lines(from)?;
    let new = payload_lines(to)?;

    let diff = TextDiff::from_lines(&old, &new);
    let lines = diff
        .iter_all_changes()
        .filter_map(|change| {
            let line = change.value().trim_end_matches('\n').replace('\t', "  ");
            match change.tag() {
                ChangeTag::Delete => Some(format!("- {line}")),
                ChangeTag::Insert => Some(format!("+ {line}")),
                ChangeTag::Equal => None,
            }
        })
        .collect();
    Some(lines)
}

fn print_field_change(change: &FieldChange) {
    if let (Value::String(from), Value::String(to)) = (&change.from, &change.to)
        && let Some(lines) = payload_diff(from, to)
    {
        println!("│       {} {}", "~".yellow(), change.name);
        for line in lines {
            let colored = if line.starts_with('+') {
                line.green()
            } else {
                line.red()
            };
            println!("│           {colored}");
        }
        return;
    }

    println!(
        "│       {} {}: {} → {}",
        "~".yellow(),
        change.name,
        display_value(&change.from).dimmed(),
        display_value(&change.to)
    );
}

fn print_known_fields(snapshot: &Snapshot) {
    let Value::Object(fields) = snapshot.to_value() else {
        return;
    };
    for (name, value) in fields.iter().filter(|(_, v)| !v.is_null()) {
        println!(
            "│       {} {} = {}",
            "+".green(),
            name,
            display_value(value).dimmed()
        );
    }
}

/// Display the plan in a user-friendly format
pub fn display_plan(plan: &ExecutionPlan, verbose: bool) {
    if plan.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Execution Plan".bold()
    );
    println!("│");

    let (mut creates, mut updates, mut deletes, mut refreshes) = (0, 0, 0, 0);
    for change in plan.pending() {
        match &change.action {
            Action::Create { desired } => {
                creates += 1;
                println!(
                    "│   {} {:<40} {}",
                    "+".green(),
                    change.address,
                    "(create)".dimmed()
                );
                if verbose {
                    print_known_fields(desired);
                }
            }
            Action::Update { persisted, desired } => {
                updates += 1;
                println!(
                    "│   {} {:<40} {}",
                    "~".yellow(),
                    change.address,
                    persisted.remote_id().dimmed()
                );
                for field in field_changes(persisted, desired) {
                    print_field_change(&field);
                }
            }
            Action::Delete { persisted } => {
                deletes += 1;
                println!(
                    "│   {} {:<40} {}",
                    "-".red(),
                    change.address,
                    persisted.remote_id().dimmed()
                );
            }
            Action::Refresh { .. } => {
                refreshes += 1;
                println!("│   {} {}", "↻".cyan(), change.address);
            }
            Action::Unchanged => {}
        }
    }

    println!("│");
    println!("├─────────────────────────────────────────────────────┤");
    if refreshes > 0 {
        println!("│ Summary: {} to refresh", refreshes.to_string().bold());
    } else {
        println!(
            "│ Summary: {} to create, {} to update, {} to delete",
            creates.to_string().green(),
            updates.to_string().yellow(),
            deletes.to_string().red()
        );
    }
    println!("└─────────────────────────────────────────────────────┘");
}

// ============================================================================
// Tests
// ============================================================================
