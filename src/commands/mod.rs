pub mod deploy;
pub mod digest;
pub mod plan;

use crate::Context;
use crate::settings::{DeploymentFile, Overrides};
use crate::ui;
use anyhow::Result;
use deployer::{DeployRequest, DeploymentSettings};

/// Load the deployment file and validate the request it describes.
fn load_request(ctx: &Context, overrides: &Overrides) -> Result<(DeployRequest, DeploymentSettings)> {
    let file = DeploymentFile::load(&ctx.config)?;
    let request = file.into_request(overrides)?;
    let settings = request.validate()?;

    ui::header(&format!("{} → {}", settings.rest_api_name, request.deployment));
    ui::kv("function", &settings.function_name);
    ui::kv("artifact", &request.artifact.display().to_string());
    if let Some(region) = &settings.region {
        ui::kv("region", region);
    }
    Ok((request, settings))
}

#[cfg(feature = "aws")]
fn connect(settings: &DeploymentSettings) -> Result<cloudkit::backend::aws::AwsBackend> {
    use anyhow::Context as _;

    cloudkit::backend::aws::AwsBackend::connect(
        settings.region.as_deref(),
        settings.credentials.as_ref(),
    )
    .context("Could not configure the AWS clients")
}

#[cfg(not(feature = "aws"))]
fn connect(_settings: &DeploymentSettings) -> Result<cloudkit::MockBackend> {
    anyhow::bail!("webda-deploy was built without the `aws` feature")
}
