use anyhow::{Context, Result};
use clap::{value_parser, Arg, Command};
use gov_dash::{inspect_plugin, simulate, DashboardConfig, VERSION};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("gov-dash")
        .version(VERSION)
        .about("Governance dashboard views over a seeded in-memory source")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("page-size")
                .long("page-size")
                .global(true)
                .value_parser(value_parser!(usize))
                .help("History page size"),
        )
        .arg(
            Arg::new("proposals")
                .long("proposals")
                .global(true)
                .value_parser(value_parser!(usize))
                .help("Closed proposals seeded into the demo DAO"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Load the DAO history page by page, then apply a live vote"),
        )
        .subcommand(
            Command::new("plugin")
                .about("Mount a plugin page and print its kind and tabs")
                .arg(
                    Arg::new("id")
                        .required(true)
                        .help("Plugin id (e.g. contribution-reward, competition, bounties)"),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let config = DashboardConfig::load_or_default(
        matches.get_one::<PathBuf>("config").map(PathBuf::as_path),
    )?
    .with_overrides(
        matches.get_one::<usize>("page-size").copied(),
        matches.get_one::<usize>("proposals").copied(),
    );
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    match matches.subcommand() {
        Some(("simulate", _)) => {
            println!("Seeding {} closed proposals, page size {}", config.proposals, config.page_size);
            println!();
            let report = simulate(&config).await?;
            println!("{}", report.render());
            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("plugin", args)) => {
            let id = args
                .get_one::<String>("id")
                .context("plugin id is required")?;
            let report = inspect_plugin(&config, id).await?;
            println!("{}", report.render());
        }
        _ => {}
    }

    Ok(())
}
