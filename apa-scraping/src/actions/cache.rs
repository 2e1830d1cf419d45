use anyhow::bail;
use clap::{Args, Subcommand};

use crate::{
    cache::{CacheKind, CacheStore},
    config::Config,
    display::field_table,
    export::or_na,
};

#[derive(Args)]
pub struct Cache {
    #[command(subcommand)]
    sub: CacheSub,
}

#[derive(Subcommand)]
enum CacheSub {
    /// Entry counts, sizes and ages.
    Stats,
    /// Removes entries: everything, one kind, or one identifier of a kind.
    Clear(Clear),
    /// Removes expired entries.
    Cleanup,
}

#[derive(Args)]
struct Clear {
    #[arg(long, value_enum)]
    kind: Option<CacheKind>,
    #[arg(long, requires = "kind")]
    id: Option<String>,
}

impl Cache {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let store = CacheStore::from_config(config);
        match self.sub {
            CacheSub::Stats => print_stats(&store),
            CacheSub::Clear(Clear { kind, id }) => {
                let removed = match (kind, id) {
                    (Some(kind), Some(id)) => store.clear(kind, &id)?,
                    (Some(kind), None) => store.clear_kind(kind)?,
                    (None, None) => store.clear_all()?,
                    (None, Some(_)) => bail!("--id requires --kind"),
                };
                println!("Removed {removed} cache file(s).");
                Ok(())
            }
            CacheSub::Cleanup => {
                let removed = store.cleanup_expired()?;
                println!("Removed {removed} expired cache file(s).");
                Ok(())
            }
        }
    }
}

fn print_stats(store: &CacheStore) -> anyhow::Result<()> {
    let stats = store.stats()?;
    let mut rows = vec![
        ("Directory".to_owned(), store.dir().display().to_string()),
        ("Total Files".to_owned(), stats.total_files.to_string()),
        ("Valid Files".to_owned(), stats.valid_files.to_string()),
        ("Expired Files".to_owned(), stats.expired_files.to_string()),
        (
            "Total Size".to_owned(),
            format!("{:.2} KiB", stats.total_bytes as f64 / 1024.),
        ),
        ("Expanded".to_owned(), stats.expanded_files.to_string()),
        ("Not Expanded".to_owned(), stats.unexpanded_files.to_string()),
    ];
    rows.extend(
        stats
            .by_kind
            .iter()
            .map(|(kind, count)| (format!("{kind} entries"), count.to_string())),
    );
    rows.push(("Oldest".to_owned(), or_na(stats.oldest.map(|t| t.to_rfc3339()))));
    rows.push(("Newest".to_owned(), or_na(stats.newest.map(|t| t.to_rfc3339()))));
    println!("{}", field_table(&rows));
    Ok(())
}
