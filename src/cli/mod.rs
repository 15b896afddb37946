//! CLI module for SiteForge
//!
//! Provides commands:
//! - `run`: research a business and publish its site
//! - `prompts`: inspect, lint and hot-patch the prompt registry
//! - `config`: print the effective configuration

use crate::app::AppConfig;
use clap::{Parser, Subcommand};

pub mod prompts;
pub mod run;

/// SiteForge CLI
#[derive(Parser, Debug)]
#[command(name = "siteforge")]
#[command(about = "Research local businesses and generate their websites")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and publish a site
    Run(run::RunArgs),
    /// Manage prompts
    #[command(subcommand)]
    Prompts(prompts::PromptsCommand),
    /// Print the effective configuration
    Config,
}

/// Run the CLI command
pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Run(args)) => run::run(args, &config).await,
        Some(Commands::Prompts(cmd)) => prompts::run(cmd, &config).await,
        Some(Commands::Config) => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "siteforge",
            "run",
            "harbor-dental",
            "--name",
            "Harbor Dental",
            "--phone",
            "+1 555 0199",
            "--place-id",
            "p-1",
            "--build-version",
            "4",
        ])
        .unwrap();

        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.slug, "harbor-dental");
        assert_eq!(args.build_version, 4);
        let req = args.to_request();
        assert_eq!(req.user.phone.as_deref(), Some("+1 555 0199"));
        assert_eq!(req.place_id.as_deref(), Some("p-1"));
    }

    #[test]
    fn test_parse_prompts_sync_filter() {
        let cli = Cli::try_parse_from(["siteforge", "prompts", "sync", "--id", "website_html"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Prompts(prompts::PromptsCommand::Sync { id: Some(ref id) })) if id == "website_html"
        ));
    }
}
