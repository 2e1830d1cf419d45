use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;
use log::info;

use super::{present, start_authenticated_session, CacheRequest};
use crate::{
    cache::{CacheKind, CacheStore},
    config::Config,
    data_collector,
    export::Format,
    schema::{League, PlayerReport, UserId},
    site,
};

#[derive(Args)]
pub struct ExtractPlayer {
    /// Numeric UserId from `/<league>/member/<UserId>`. Asked for when neither this nor
    /// `--url` is given.
    user_id: Option<String>,
    /// A member page URL to take the UserId from.
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    league: Option<League>,
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

/// The URL wins over the positional argument.
fn resolve_user_id(url: Option<&str>, user_id: Option<&str>) -> anyhow::Result<Option<UserId>> {
    if let Some(url) = url {
        return site::user_id_from_member_url(url).map(Some);
    }
    user_id.map(str::parse).transpose()
}

impl ExtractPlayer {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let user_id = match resolve_user_id(self.url.as_deref(), self.user_id.as_deref())? {
            Some(user_id) => user_id,
            None => match inquire::Text::new("UserId:").prompt() {
                Ok(answer) => answer.parse()?,
                Err(
                    inquire::InquireError::OperationInterrupted
                    | inquire::InquireError::OperationCanceled,
                ) => bail!("Cancelled"),
                Err(e) => return Err(e.into()),
            },
        };
        let league = config.resolve_league(self.league);
        info!("Extracting player {user_id} in {league}");

        let cache = CacheRequest {
            store: CacheStore::from_config(config),
            enabled: !self.no_cache,
            kind: CacheKind::Player,
            id: user_id.to_string(),
            league: &league,
            expanded: false,
        };
        let report = match cache.lookup::<PlayerReport>() {
            Some(report) => report,
            None => {
                let session = start_authenticated_session(config, self.headless)?;
                let report =
                    data_collector::extract_player(&session, &league, &user_id, &config.pagination)
                        .with_context(|| format!("Failed to extract player {user_id}"))?;
                cache.remember(&report);
                report
            }
        };
        present(&report, self.plain, self.output.as_deref(), self.format)
    }
}
