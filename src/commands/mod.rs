//! Command implementations
//!
//! Every command loads settings and the state file the same way; the helpers
//! here keep that in one place.

pub mod apply;
pub mod destroy;
pub mod plan;
pub mod refresh;
pub mod state;

use anyhow::{Context as AnyhowContext, Result, bail};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::Context;
use crate::config::Settings;
use crate::engine::{ExecuteOptions, ExecuteSummary};
use crate::paths;
use crate::remote::http::HttpStorage;
use crate::resource::{Catalog, Snapshot};
use crate::schema::Manifest;
use crate::state::StateFile;

/// Settings, state and its location for one command run
pub struct Workspace {
    pub settings: Settings,
    pub state_path: PathBuf,
    pub state: StateFile,
}

impl Workspace {
    pub fn open(ctx: &Context) -> Result<Self> {
        let settings = Settings::load()?;
        let state_path = match &ctx.state {
            Some(path) => paths::expand(&path.to_string_lossy()),
            None => paths::state_file()?,
        };
        let state = StateFile::load(&state_path)?;
        log::debug!("Using state file {}", state_path.display());

        Ok(Self {
            settings,
            state_path,
            state,
        })
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.settings.pretty_payloads)
    }

    /// HTTP client for the configured stack
    pub fn connect(&self) -> Result<HttpStorage> {
        let token = self.settings.token()?;
        log::info!("Connecting to {}", self.settings.host);
        Ok(HttpStorage::new(&self.settings.host, token))
    }

    pub fn options(&self, ctx: &Context, jobs: Option<usize>, yes: bool) -> ExecuteOptions {
        ExecuteOptions {
            jobs: jobs.unwrap_or(self.settings.jobs),
            yes,
            verbose: ctx.verbose > 0,
        }
    }
}

/// Desired snapshots from the manifest at `path`
pub fn desired(path: &Path) -> Result<BTreeMap<String, Snapshot>> {
    let path = paths::expand(&path.to_string_lossy());
    let manifest = Manifest::load(&path).context("Failed to load manifest")?;
    if manifest.is_empty() {
        log::warn!(
            "{} declares no entities; everything in the state will be deleted",
            path.display()
        );
    }
    Ok(manifest.snapshots())
}

fn aborted() {
    println!();
    println!("  {} Aborted", "✗".red());
}

/// Turn failed entities into a non-zero exit
fn finish(summary: &ExecuteSummary) -> Result<()> {
    if !summary.is_success() {
        bail!("{} entities failed", summary.failed);
    }
    Ok(())
}
