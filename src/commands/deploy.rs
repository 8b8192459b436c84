use anyhow::Result;
use declarative::ConfirmCallback;
use deployer::{Deployer, GatewayDeployer};
use std::io;

use crate::Context;
use crate::progress::QueueProgress;
use crate::settings::Overrides;
use crate::ui;

pub fn run(ctx: &Context, overrides: &Overrides, confirm: &mut dyn ConfirmCallback) -> Result<()> {
    let (request, settings) = super::load_request(ctx, overrides)?;
    let deployer = GatewayDeployer::new(super::connect(&settings)?);

    let plan = deployer.plan(&request)?;
    ui::changes(&plan.changes);
    if !plan.has_changes() {
        return Ok(());
    }

    println!();
    if !confirm.confirm("Deploy these changes?")? {
        ui::warn("Aborted");
        return Ok(());
    }

    let mut progress = QueueProgress::new(ctx.quiet, ctx.verbose > 0);
    let report = deployer.deploy_with(&request, &mut progress)?;

    ui::summary(&report.summary);
    ui::kv("api", &report.api.id);
    ui::kv("digest", report.digest.as_str());
    ui::success(&format!("Stage {} is live", report.stage.name));
    Ok(())
}

/// Asks on the terminal
pub struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()
            .map_err(io::Error::other)
    }
}
