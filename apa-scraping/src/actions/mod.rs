//! One module per subcommand. Actions print their results to stdout and return `Err` for
//! anything the user has to fix.

use std::path::Path;

use anyhow::bail;
use log::info;
use serde::de::DeserializeOwned;

use crate::{
    cache::{CacheKind, CacheStore},
    config::Config,
    display::Render,
    export::{self, Export, Format},
    schema::League,
    session::Session,
};

pub mod cache;
pub mod player;
pub mod session;
pub mod state;
pub mod team;

/// `--headless` only ever turns headless mode on.
fn start_session(config: &Config, headless: bool) -> anyhow::Result<Session> {
    let mut config = config.clone();
    config.browser.headless |= headless;
    Session::start(&config)
}

fn start_authenticated_session(config: &Config, headless: bool) -> anyhow::Result<Session> {
    let session = start_session(config, headless)?;
    if !session.is_authenticated() {
        bail!("No valid session found. Run `apa-scraping login` first.");
    }
    info!("Session found");
    session.dismiss_transient_dialog();
    Ok(session)
}

/// Where a report lives in the cache and whether the cache may be used at all.
struct CacheRequest<'a> {
    store: CacheStore,
    enabled: bool,
    kind: CacheKind,
    id: String,
    league: &'a League,
    expanded: bool,
}

impl CacheRequest<'_> {
    fn lookup<T: DeserializeOwned>(&self) -> Option<T> {
        if !self.enabled {
            println!("Cache disabled, extracting from the site.");
            return None;
        }
        let entry = self
            .store
            .get::<T>(self.kind, &self.id, Some(self.league), self.expanded)?;
        println!("Using cached data from {}.", entry.cache_info.cached_at);
        Some(entry.report)
    }

    fn remember(&self, report: &impl Export) {
        if self.enabled
            && !self
                .store
                .put(self.kind, &self.id, Some(self.league), self.expanded, report)
        {
            println!("Warning: the result could not be cached.");
        }
    }
}

fn present<T: Render + Export>(
    report: &T,
    plain: bool,
    output: Option<&Path>,
    format: Format,
) -> anyhow::Result<()> {
    println!("{}", report.render(plain));
    if let Some(output) = output {
        export::save(report, output, format)?;
        println!("Saved to {output:?}.");
    }
    Ok(())
}
