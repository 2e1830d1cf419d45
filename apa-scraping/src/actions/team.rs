use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use log::info;

use super::{present, start_authenticated_session, CacheRequest};
use crate::{
    cache::{CacheKind, CacheStore},
    config::Config,
    data_collector,
    export::Format,
    schema::{League, TeamId, TeamReport},
};

#[derive(Args)]
pub struct ExtractTeam {
    /// Numeric id from `/team/<TEAM_ID>`.
    team_id: TeamId,
    /// League used for the member pages visited by `--expand`.
    #[arg(long)]
    league: Option<League>,
    /// Visit each player's team history for skill range and season count.
    #[arg(long)]
    expand: bool,
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t)]
    format: Format,
    #[arg(long)]
    no_cache: bool,
    #[arg(long)]
    plain: bool,
    #[arg(long)]
    headless: bool,
}

impl ExtractTeam {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let league = config.resolve_league(self.league);
        info!(
            "Extracting team {}{}",
            self.team_id,
            if self.expand { " with expansion" } else { "" }
        );

        let cache = CacheRequest {
            store: CacheStore::from_config(config),
            enabled: !self.no_cache,
            kind: CacheKind::Team,
            id: self.team_id.to_string(),
            league: &league,
            expanded: self.expand,
        };
        let report = match cache.lookup::<TeamReport>() {
            Some(report) => report,
            None => {
                let session = start_authenticated_session(config, self.headless)?;
                let report = data_collector::extract_team(
                    &session,
                    &self.team_id,
                    &league,
                    self.expand,
                    &config.pagination,
                )
                .with_context(|| format!("Failed to extract team {}", self.team_id))?;
                cache.remember(&report);
                report
            }
        };
        present(&report, self.plain, self.output.as_deref(), self.format)
    }
}
