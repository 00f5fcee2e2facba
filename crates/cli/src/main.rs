use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use webcast_cli::{cli::Cli, config::ScenarioConfig, error::CliError, logging, scenario};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	match run(cli).await {
		Ok(()) => println!("{}", "Done".green().bold()),
		Err(err) => {
			eprintln!("{} {:#}", "error:".red().bold(), err);
			if err.downcast_ref::<CliError>().is_some_and(CliError::is_page_mismatch) {
				eprintln!("{} the page did not look as the scenario expects; rerun with -v to see each step", "hint:".cyan().bold());
			}
			std::process::exit(1);
		}
	}
}

async fn run(cli: Cli) -> anyhow::Result<()> {
	let config = ScenarioConfig::from_cli(&cli)?;
	tracing::debug!(?config, "Scenario config");

	scenario::run(&config)
		.await
		.with_context(|| format!("walkthrough of {} failed", config.url))
}
