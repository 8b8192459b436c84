use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "webda-deploy")]
#[command(version)]
#[command(about = "Deploy an HTTP route table onto API Gateway backed by one Lambda function", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Deployment file (TOML, or JSON by extension)
    #[arg(
        short,
        long,
        global = true,
        env = "WEBDA_DEPLOYMENT_FILE",
        default_value = "webda.toml"
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Converge the remote deployment onto the deployment file
    Deploy(DeployArgs),

    /// Show what deploy would change, without changing anything
    Plan(TargetArgs),

    /// Print the digest of a packaged artifact
    Digest {
        /// Artifact path
        artifact: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    /// Deployment identifier (stage name); overrides the file's `deployment`
    #[arg(short, long)]
    pub stage: Option<String>,

    /// Artifact path; overrides the file's `artifact`
    #[arg(short, long)]
    pub artifact: Option<PathBuf>,

    /// Rebuild every route's methods even when they already match
    #[arg(long)]
    pub force_rebind: bool,
}

#[derive(Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_deploy_flags() {
        let cli = Cli::parse_from([
            "webda-deploy",
            "-vv",
            "deploy",
            "--yes",
            "--stage",
            "prod",
            "--force-rebind",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, PathBuf::from("webda.toml"));
        match cli.command {
            Command::Deploy(args) => {
                assert!(args.yes);
                assert!(args.target.force_rebind);
                assert_eq!(args.target.stage.as_deref(), Some("prod"));
            }
            _ => panic!("expected deploy"),
        }
    }
}
