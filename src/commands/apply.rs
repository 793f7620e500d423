//! `cfgsync apply` - make the project match the manifest

use anyhow::Result;

use super::Workspace;
use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{Target, confirm_proceed, differ, execute, planner};

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let mut ws = Workspace::open(ctx)?;
    let desired = super::desired(&args.manifest.manifest)?;
    let target = Target::parse(args.target.target.as_deref());

    let plan = planner::plan(&desired, &ws.state, &target);
    if !ctx.quiet {
        differ::display_plan(&plan, ctx.verbose > 0);
    }
    if plan.is_empty() {
        return Ok(());
    }

    let opts = ws.options(ctx, args.run.jobs, args.run.yes);
    if !opts.yes && !confirm_proceed()? {
        super::aborted();
        return Ok(());
    }

    let client = ws.connect()?;
    let catalog = ws.catalog();
    let summary = execute(
        &plan,
        &catalog,
        &client,
        &mut ws.state,
        &ws.state_path,
        &opts,
    )?;
    super::finish(&summary)
}
