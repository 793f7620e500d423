//! `cfgsync destroy` - delete every tracked entity from the project

use anyhow::Result;

use super::Workspace;
use crate::Context;
use crate::cli::DestroyArgs;
use crate::engine::{Target, confirm_proceed, differ, execute, planner};
use crate::ui;

pub fn run(ctx: &Context, args: DestroyArgs) -> Result<()> {
    let mut ws = Workspace::open(ctx)?;
    let target = Target::parse(args.target.target.as_deref());

    let plan = planner::plan_destroy(&ws.state, &target);
    if plan.is_empty() {
        ui::info("Nothing tracked in the state file");
        return Ok(());
    }
    if !ctx.quiet {
        differ::display_plan(&plan, ctx.verbose > 0);
    }

    let opts = ws.options(ctx, args.run.jobs, args.run.yes);
    if !opts.yes {
        println!();
        ui::warn(&format!(
            "This deletes {} entities from the project",
            plan.pending_count()
        ));
        if !confirm_proceed()? {
            super::aborted();
            return Ok(());
        }
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
