use anyhow::Result;
use deployer::ArtifactInspector;
use std::path::Path;

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context, artifact: &Path) -> Result<()> {
    let artifact = ArtifactInspector::inspect(artifact)?;
    if ctx.quiet {
        println!("{}", artifact.digest());
        return Ok(());
    }
    ui::kv("path", &artifact.path().display().to_string());
    ui::kv("size", &format!("{} bytes", artifact.len()));
    ui::kv("digest", artifact.digest().as_str());
    Ok(())
}
