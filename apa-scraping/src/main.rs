use std::path::PathBuf;

use apa_scraping::{
    actions::{
        cache::Cache,
        player::ExtractPlayer,
        session::{Login, VerifySession},
        state::ClearState,
        team::ExtractTeam,
    },
    config::{Config, DEFAULT_CONFIG_PATH},
};
use clap::{Parser, Subcommand};
use log::error;

#[derive(Parser)]
#[command(about = "Collects player and team statistics from the APA league site")]
struct Opts {
    /// Created with default values when missing.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    sub: Sub,
}

#[derive(Subcommand)]
enum Sub {
    /// Signs in and keeps the browser profile for later commands.
    Login(Login),
    VerifySession(VerifySession),
    /// Current and past teams of one member.
    ExtractPlayer(ExtractPlayer),
    /// Roster of one team, optionally with each player's history.
    ExtractTeam(ExtractTeam),
    Cache(Cache),
    /// Wipes the browser profile, logs, cache and temporary files.
    ClearState(ClearState),
}

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    let config = Config::load_or_create(&opts.config)?;
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    let result = match opts.sub {
        Sub::Login(sub) => sub.run(&config),
        Sub::VerifySession(sub) => sub.run(&config),
        Sub::ExtractPlayer(sub) => sub.run(&config),
        Sub::ExtractTeam(sub) => sub.run(&config),
        Sub::Cache(sub) => sub.run(&config),
        Sub::ClearState(sub) => sub.run(&config),
    };
    if let Err(e) = &result {
        error!("{e:#}");
    }
    result
}
