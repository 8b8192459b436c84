mod cli;
mod commands;
mod progress;
mod settings;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use declarative::AutoConfirm;
use settings::Overrides;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
    };

    match run(&ctx, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(ctx: &Context, command: Command) -> Result<()> {
    match command {
        Command::Deploy(args) => {
            let overrides = Overrides {
                stage: args.target.stage,
                artifact: args.target.artifact,
                force_rebind: args.target.force_rebind,
            };
            if args.yes {
                commands::deploy::run(ctx, &overrides, &mut AutoConfirm)
            } else {
                commands::deploy::run(ctx, &overrides, &mut commands::deploy::PromptConfirm)
            }
        }
        Command::Plan(args) => {
            let overrides = Overrides {
                stage: args.stage,
                artifact: args.artifact,
                force_rebind: args.force_rebind,
            };
            commands::plan::run(ctx, &overrides)
        }
        Command::Digest { artifact } => commands::digest::run(ctx, &artifact),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "webda-deploy", &mut io::stdout());
            Ok(())
        }
    }
}

/// Print an error chain, with advice for remote failures
fn report(err: &anyhow::Error) {
    ui::error(&format!("{err:#}"));
    if let Some(category) = err
        .downcast_ref::<deployer::Error>()
        .and_then(deployer::Error::category)
    {
        ui::dim(category.advice());
    }
}
