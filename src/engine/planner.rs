//! Execution planner - turn manifest and state into per-entity actions

use serde_json::Value;
use std::collections::BTreeMap;

use crate::resource::{Kind, Snapshot};
use crate::state::StateFile;

/// What the executor will do with one entity
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Create { desired: Snapshot },
    Update { persisted: Snapshot, desired: Snapshot },
    Delete { persisted: Snapshot },
    Refresh { persisted: Snapshot },
    Unchanged,
}

impl Action {
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub address: String,
    pub kind: Kind,
    pub action: Action,
}

#[derive(Debug, Default)]
pub struct ExecutionPlan {
    pub changes: Vec<Change>,
}

impl ExecutionPlan {
    /// Changes that do something, in the order they were planned
    pub fn pending(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(|c| c.action.is_change())
    }

    pub fn pending_count(&self) -> usize {
        self.pending().count()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_count() == 0
    }
}

/// Filter from `--target kind` or `--target kind.label`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    pub kind: Option<String>,
    pub label: Option<String>,
}

impl Target {
    pub fn parse(target: Option<&str>) -> Self {
        match target {
            Some(t) => {
                let (kind, label) = parse_target(t);
                Self { kind, label }
            }
            None => Self::default(),
        }
    }

    pub fn matches(&self, address: &str) -> bool {
        let (kind, label) = address.split_once('.').unwrap_or((address, ""));
        matches_filter(kind, label, self.kind.as_deref(), self.label.as_deref())
    }
}

/// Parse a target string like "configuration.extractor" into (kind, label)
pub fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = target.split('.').collect();
    match parts.len() {
        1 => (Some(parts[0].to_string()), None),
        2 => (Some(parts[0].to_string()), Some(parts[1].to_string())),
        _ => (None, Some(target.to_string())),
    }
}

/// Check if an address matches the filter
pub fn matches_filter(kind: &str, label: &str, want_kind: Option<&str>, want: Option<&str>) -> bool {
    if let Some(k) = want_kind {
        // Allow plural forms like "configurations"
        if kind != k && k.strip_suffix('s') != Some(kind) {
            return false;
        }
    }

    if let Some(n) = want
        && label != n
    {
        return false;
    }

    true
}

/// Plan create/update/delete for every address in the manifest or the state
pub fn plan(
    desired: &BTreeMap<String, Snapshot>,
    state: &StateFile,
    target: &Target,
) -> ExecutionPlan {
    let mut changes = Vec::new();

    for (address, snapshot) in desired.iter().filter(|(a, _)| target.matches(a)) {
        let kind = snapshot.kind();
        let action = match state.get(address) {
            None => Action::Create {
                desired: snapshot.clone(),
            },
            Some(persisted) => {
                let mut desired = snapshot.clone();
                desired.inherit_computed(persisted);
                if differs(&desired, persisted) {
                    Action::Update {
                        persisted: persisted.clone(),
                        desired,
                    }
                } else {
                    Action::Unchanged
                }
            }
        };
        changes.push(Change {
            address: address.clone(),
            kind,
            action,
        });
    }

    for (address, persisted) in &state.entities {
        if desired.contains_key(address) || !target.matches(address) {
            continue;
        }
        changes.push(Change {
            address: address.clone(),
            kind: persisted.kind(),
            action: Action::Delete {
                persisted: persisted.clone(),
            },
        });
    }

    log::debug!(
        "Planned {} changes over {} addresses",
        changes.iter().filter(|c| c.action.is_change()).count(),
        changes.len()
    );
    ExecutionPlan { changes }
}

/// Plan a delete for every entity in the state
pub fn plan_destroy(state: &StateFile, target: &Target) -> ExecutionPlan {
    build(state, target, |persisted| Action::Delete { persisted })
}

/// Plan a read for every entity in the state
pub fn plan_refresh(state: &StateFile, target: &Target) -> ExecutionPlan {
    build(state, target, |persisted| Action::Refresh { persisted })
}

fn build(state: &StateFile, target: &Target, action: impl Fn(Snapshot) -> Action) -> ExecutionPlan {
    let changes = state
        .entities
        .iter()
        .filter(|(address, _)| target.matches(address))
        .map(|(address, persisted)| Change {
            address: address.clone(),
            kind: persisted.kind(),
            action: action(persisted.clone()),
        })
        .collect();
    ExecutionPlan { changes }
}

// ============================================================================
// Comparison
// ============================================================================

/// Whether `desired` asks for something `persisted` does not hold
pub fn differs(desired: &Snapshot, persisted: &Snapshot) -> bool {
    !is_subset(&desired.to_value(), &persisted.to_value())
}

/// Desired nulls are left to the remote and never count as a difference
fn is_subset(desired: &Value, persisted: &Value) -> bool {
    match (desired, persisted) {
        (Value::Null, _) => true,
        (Value::Object(want), Value::Object(have)) => want
            .iter()
            .all(|(key, value)| is_subset(value, have.get(key).unwrap_or(&Value::Null))),
        (Value::Array(want), Value::Array(have)) => {
            want.len() == have.len() && want.iter().zip(have).all(|(w, h)| is_subset(w, h))
        }
        (Value::String(want), Value::String(have)) => {
            want == have || (want.starts_with('{') && content::equivalent(want, have))
        }
        _ => desired == persisted,
    }
}

// ============================================================================
// Tests
// ============================================================================
