use anyhow::Result;
use deployer::{Deployer, GatewayDeployer};

use crate::Context;
use crate::settings::Overrides;
use crate::ui;

pub fn run(ctx: &Context, overrides: &Overrides) -> Result<()> {
    let (request, settings) = super::load_request(ctx, overrides)?;
    let deployer = GatewayDeployer::new(super::connect(&settings)?);

    let plan = deployer.plan(&request)?;
    ui::kv("digest", plan.digest.as_str());
    ui::changes(&plan.changes);

    let summary = plan.summary();
    if summary.has_changes() {
        println!();
        ui::info(&format!(
            "{} to create, {} to modify, {} to remove",
            summary.additions, summary.modifications, summary.removals
        ));
        ui::dim("Run `webda-deploy deploy` to apply");
    }
    Ok(())
}
