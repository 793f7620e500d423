//! `cfgsync refresh` - read every tracked entity back into the state file

use anyhow::Result;

use super::Workspace;
use crate::Context;
use crate::cli::RefreshArgs;
use crate::engine::{Target, differ, execute, planner};
use crate::ui;

pub fn run(ctx: &Context, args: RefreshArgs) -> Result<()> {
    let mut ws = Workspace::open(ctx)?;
    let target = Target::parse(args.target.target.as_deref());

    let plan = planner::plan_refresh(&ws.state, &target);
    if plan.is_empty() {
        ui::info("Nothing tracked in the state file");
        return Ok(());
    }
    if !ctx.quiet {
        differ::display_plan(&plan, ctx.verbose > 0);
    }

    let opts = ws.options(ctx, args.jobs, true);
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
