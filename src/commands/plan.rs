//! `cfgsync plan` - compare the manifest with the state file

use anyhow::Result;

use super::Workspace;
use crate::Context;
use crate::cli::PlanArgs;
use crate::engine::{Target, differ, planner};

pub fn run(ctx: &Context, args: PlanArgs) -> Result<()> {
    let ws = Workspace::open(ctx)?;
    let desired = super::desired(&args.manifest.manifest)?;
    let target = Target::parse(args.target.target.as_deref());

    let plan = planner::plan(&desired, &ws.state, &target);
    differ::display_plan(&plan, ctx.verbose > 0);
    Ok(())
}
