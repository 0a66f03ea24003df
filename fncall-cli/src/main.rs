//! `fncall`: build, inspect and run function-calling tools and agents.

mod cli;
mod commands;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use fncall_runtime::{EXIT_SOFTWARE, EXIT_USAGE, InvokeError};
use fncall_telemetry::tracing_support;

use crate::cli::{Cli, Command, UsageError};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = tracing_support::init(cli.verbose) {
        eprintln!("warning: {err}");
    }

    match execute(cli).await {
        Ok(status) => ExitCode::from(status),
        Err(err) => {
            eprintln!("error: {}", render(&err));
            ExitCode::from(exit_status(&err))
        }
    }
}

async fn execute(cli: Cli) -> Result<u8> {
    let root = std::path::absolute(&cli.root)
        .with_context(|| format!("failed to resolve root `{}`", cli.root.display()))?;
    let config = fncall_config::load(&root)?;
    tracing::debug!(root = %root.display(), "configuration loaded");

    match cli.command {
        Command::Build => commands::build(&config).await,
        Command::Run(args) => commands::run(&config, args).await,
        Command::Check => commands::check(&config).await,
        Command::List(args) => commands::list(&config, &args).await,
    }
}

/// Joins the error chain, skipping causes a message already embeds.
fn render(err: &anyhow::Error) -> String {
    let mut message = err.to_string();
    for cause in err.chain().skip(1) {
        let cause = cause.to_string();
        if !message.contains(&cause) {
            message.push_str(": ");
            message.push_str(&cause);
        }
    }
    message
}

/// Child failures keep the child's status; usage and resolution errors map
/// to 64; everything else to 70.
fn exit_status(err: &anyhow::Error) -> u8 {
    let code = if let Some(invoke) = err.downcast_ref::<InvokeError>() {
        invoke.exit_code()
    } else if err.downcast_ref::<UsageError>().is_some() {
        EXIT_USAGE
    } else {
        EXIT_SOFTWARE
    };
    u8::try_from(code).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_status_follows_error_kind() {
        let child = anyhow::Error::new(InvokeError::Execution {
            name: "echo".into(),
            exit_code: 2,
            stderr: String::new(),
        });
        assert_eq!(exit_status(&child), 2);

        let usage = anyhow::Error::new(UsageError::VariablesOnTool);
        assert_eq!(exit_status(&usage), 64);

        let internal = anyhow::anyhow!("disk on fire");
        assert_eq!(exit_status(&internal), 70);
    }

    #[test]
    fn rendered_chain_skips_embedded_causes() {
        let err = anyhow::Error::new(std::io::Error::other("denied"))
            .context("failed to read `tools.txt`");
        assert_eq!(render(&err), "failed to read `tools.txt`: denied");

        let invoke = anyhow::Error::new(InvokeError::Io {
            path: "/repo/functions.json".into(),
            source: std::io::Error::other("denied"),
        });
        assert_eq!(render(&invoke), "failed to access `/repo/functions.json`: denied");
    }
}
