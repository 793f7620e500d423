//! Entity kinds managed by cfgsync
//!
//! Each kind pairs a snapshot type with an [`EntityMapper`] and the remote
//! operations of an [`EntityKind`]. [`Catalog`] dispatches lifecycle calls
//! over the closed set of kinds so the planner and executor can treat every
//! entity as a [`Snapshot`].
//!
//! [`EntityMapper`]: declarative::EntityMapper
//! [`EntityKind`]: declarative::EntityKind

use crate::remote::Api;
use anyhow::bail;
use declarative::{Diagnostics, Lifecycle, Outcome};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod branch;
pub mod branch_metadata;
pub mod configuration;
pub mod encryption;
pub mod scheduler;

pub use branch::{BranchKind, DevBranch};
pub use branch_metadata::{BranchMetadata, BranchMetadataKind};
pub use configuration::{Configuration, ConfigurationKind, ConfigurationRow};
pub use encryption::{Encryption, EncryptionKind};
pub use scheduler::{Scheduler, SchedulerKind};

/// Entity kind name, as used in addresses (`kind.label`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Configuration,
    Encryption,
    Branch,
    BranchMetadata,
    Scheduler,
}

impl Kind {
    /// Kinds in dependency order: branches before what lives in them
    pub const ALL: [Self; 5] = [
        Self::Branch,
        Self::BranchMetadata,
        Self::Configuration,
        Self::Scheduler,
        Self::Encryption,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Encryption => "encryption",
            Self::Branch => "branch",
            Self::BranchMetadata => "branch_metadata",
            Self::Scheduler => "scheduler",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "configuration" => Ok(Self::Configuration),
            "encryption" => Ok(Self::Encryption),
            "branch" => Ok(Self::Branch),
            "branch_metadata" => Ok(Self::BranchMetadata),
            "scheduler" => Ok(Self::Scheduler),
            _ => bail!(
                "Unknown kind '{s}'. Valid kinds: configuration, encryption, branch, branch_metadata, scheduler"
            ),
        }
    }
}

/// A snapshot of any kind, tagged for the state file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "snapshot", rename_all = "snake_case")]
pub enum Snapshot {
    Configuration(Configuration),
    Encryption(Encryption),
    Branch(DevBranch),
    BranchMetadata(BranchMetadata),
    Scheduler(Scheduler),
}

impl Snapshot {
    pub fn kind(&self) -> Kind {
        match self {
            Self::Configuration(_) => Kind::Configuration,
            Self::Encryption(_) => Kind::Encryption,
            Self::Branch(_) => Kind::Branch,
            Self::BranchMetadata(_) => Kind::BranchMetadata,
            Self::Scheduler(_) => Kind::Scheduler,
        }
    }

    /// Remote identifier, empty until the entity is created
    pub fn remote_id(&self) -> String {
        match self {
            Self::Configuration(c) => c.id.as_str().to_string(),
            Self::Encryption(e) => e.id.as_str().to_string(),
            Self::Branch(b) => b.id.as_known().map(i64::to_string).unwrap_or_default(),
            Self::BranchMetadata(m) => m.id.as_str().to_string(),
            Self::Scheduler(s) => s.id.as_str().to_string(),
        }
    }

    /// Fill attributes the manifest left to the remote from `persisted`
    pub fn inherit_computed(&mut self, persisted: &Self) {
        match (self, persisted) {
            (Self::Configuration(d), Self::Configuration(p)) => d.inherit_computed(p),
            (Self::Encryption(d), Self::Encryption(p)) => {
                d.id.inherit(&p.id);
                d.value.inherit(&p.value);
                d.encrypted_value.inherit(&p.encrypted_value);
            }
            (Self::Branch(d), Self::Branch(p)) => {
                d.id.inherit(&p.id);
                d.description.inherit(&p.description);
                d.is_default.inherit(&p.is_default);
            }
            (Self::BranchMetadata(d), Self::BranchMetadata(p)) => d.id.inherit(&p.id),
            (Self::Scheduler(d), Self::Scheduler(p)) => {
                d.id.inherit(&p.id);
                d.configuration_version.inherit(&p.configuration_version);
            }
            _ => {}
        }
    }

    /// JSON form used for comparisons and display
    pub fn to_value(&self) -> serde_json::Value {
        let value = match self {
            Self::Configuration(c) => serde_json::to_value(c),
            Self::Encryption(e) => serde_json::to_value(e),
            Self::Branch(b) => serde_json::to_value(b),
            Self::BranchMetadata(m) => serde_json::to_value(m),
            Self::Scheduler(s) => serde_json::to_value(s),
        };
        // Snapshots hold only strings, numbers, booleans and lists
        value.unwrap_or(serde_json::Value::Null)
    }
}

fn kind_mismatch(persisted: &Snapshot, desired: &Snapshot) -> Outcome<Snapshot> {
    let mut diagnostics = Diagnostics::new();
    diagnostics.add_error(
        "Kind mismatch",
        format!(
            "Cannot update a {} with a {} snapshot",
            persisted.kind(),
            desired.kind()
        ),
    );
    Outcome::keep(diagnostics)
}

/// Lifecycle dispatch over every kind
#[derive(Debug, Default)]
pub struct Catalog {
    configuration: ConfigurationKind,
    encryption: EncryptionKind,
    branch: BranchKind,
    branch_metadata: BranchMetadataKind,
    scheduler: SchedulerKind,
}

impl Catalog {
    /// `pretty_payloads` stores configuration payloads in display encoding
    pub fn new(pretty_payloads: bool) -> Self {
        Self {
            configuration: ConfigurationKind::new(pretty_payloads),
            ..Self::default()
        }
    }

    pub fn create(&self, client: &Api, desired: &Snapshot) -> Outcome<Snapshot> {
        match desired {
            Snapshot::Configuration(s) => Lifecycle::new(&self.configuration, client)
                .create(s)
                .map(Snapshot::Configuration),
            Snapshot::Encryption(s) => Lifecycle::new(&self.encryption, client)
                .create(s)
                .map(Snapshot::Encryption),
            Snapshot::Branch(s) => Lifecycle::new(&self.branch, client)
                .create(s)
                .map(Snapshot::Branch),
            Snapshot::BranchMetadata(s) => Lifecycle::new(&self.branch_metadata, client)
                .create(s)
                .map(Snapshot::BranchMetadata),
            Snapshot::Scheduler(s) => Lifecycle::new(&self.scheduler, client)
                .create(s)
                .map(Snapshot::Scheduler),
        }
    }

    pub fn read(&self, client: &Api, persisted: &Snapshot) -> Outcome<Snapshot> {
        match persisted {
            Snapshot::Configuration(s) => Lifecycle::new(&self.configuration, client)
                .read(s)
                .map(Snapshot::Configuration),
            Snapshot::Encryption(s) => Lifecycle::new(&self.encryption, client)
                .read(s)
                .map(Snapshot::Encryption),
            Snapshot::Branch(s) => Lifecycle::new(&self.branch, client)
                .read(s)
                .map(Snapshot::Branch),
            Snapshot::BranchMetadata(s) => Lifecycle::new(&self.branch_metadata, client)
                .read(s)
                .map(Snapshot::BranchMetadata),
            Snapshot::Scheduler(s) => Lifecycle::new(&self.scheduler, client)
                .read(s)
                .map(Snapshot::Scheduler),
        }
    }

    pub fn update(&self, client: &Api, persisted: &Snapshot, desired: &Snapshot) -> Outcome<Snapshot> {
        match (persisted, desired) {
            (Snapshot::Configuration(p), Snapshot::Configuration(d)) => {
                Lifecycle::new(&self.configuration, client)
                    .update(p, d)
                    .map(Snapshot::Configuration)
            }
            (Snapshot::Encryption(p), Snapshot::Encryption(d)) => {
                Lifecycle::new(&self.encryption, client)
                    .update(p, d)
                    .map(Snapshot::Encryption)
            }
            (Snapshot::Branch(p), Snapshot::Branch(d)) => Lifecycle::new(&self.branch, client)
                .update(p, d)
                .map(Snapshot::Branch),
            (Snapshot::BranchMetadata(p), Snapshot::BranchMetadata(d)) => {
                Lifecycle::new(&self.branch_metadata, client)
                    .update(p, d)
                    .map(Snapshot::BranchMetadata)
            }
            (Snapshot::Scheduler(p), Snapshot::Scheduler(d)) => {
                Lifecycle::new(&self.scheduler, client)
                    .update(p, d)
                    .map(Snapshot::Scheduler)
            }
            _ => kind_mismatch(persisted, desired),
        }
    }

    pub fn delete(&self, client: &Api, persisted: &Snapshot) -> Outcome<Snapshot> {
        match persisted {
            Snapshot::Configuration(s) => Lifecycle::new(&self.configuration, client)
                .delete(s)
                .map(Snapshot::Configuration),
            Snapshot::Encryption(s) => Lifecycle::new(&self.encryption, client)
                .delete(s)
                .map(Snapshot::Encryption),
            Snapshot::Branch(s) => Lifecycle::new(&self.branch, client)
                .delete(s)
                .map(Snapshot::Branch),
            Snapshot::BranchMetadata(s) => Lifecycle::new(&self.branch_metadata, client)
                .delete(s)
                .map(Snapshot::BranchMetadata),
            Snapshot::Scheduler(s) => Lifecycle::new(&self.scheduler, client)
                .delete(s)
                .map(Snapshot::Scheduler),
        }
    }
}
