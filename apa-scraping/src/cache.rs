//! Extraction results cached on disk as `<cache_dir>/<sha256 of the request>.json`.
//!
//! An entry is the serialized report with a `_cache_info` object alongside its fields. It is
//! valid while its modification time is younger than the configured timeout.

use std::{
    collections::BTreeMap,
    io::{self, BufReader},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use apa_scraping_utils::fs_json_util::write_json_pretty;
use chrono::{DateTime, Local};
use fs_err::File;
use log::{debug, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    config::{CacheConfig, Config},
    schema::League,
};

#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Debug,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CacheKind {
    Team,
    Player,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheInfo {
    pub cached_at: DateTime<Local>,
    pub cache_key: String,
    pub action_type: CacheKind,
    pub identifier: String,
    pub league: Option<League>,
    pub expanded: bool,
    pub timeout_hours: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    #[serde(rename = "_cache_info")]
    pub cache_info: CacheInfo,
    #[serde(flatten)]
    pub report: T,
}

/// Reads only the metadata of an entry, whatever report it holds.
#[derive(Deserialize)]
struct InfoOnly {
    #[serde(rename = "_cache_info")]
    cache_info: CacheInfo,
}

#[derive(Debug, thiserror::Error)]
pub enum CacheLoadError {
    #[error("Cache entry was not found.")]
    NotFound,
    #[error("Cache entry is {0:?} old and has expired.")]
    Expired(Duration),
    #[error("An I/O error occurred when loading the cache entry: {0:?}")]
    IOError(io::Error),
    #[error("The cache entry is corrupted and could not be loaded: {0:?}")]
    JsonError(#[from] serde_json::Error),
}
impl From<io::Error> for CacheLoadError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            _ => Self::IOError(e),
        }
    }
}

#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct CacheStats {
    pub total_files: usize,
    pub valid_files: usize,
    pub expired_files: usize,
    pub total_bytes: u64,
    /// Entries whose metadata cannot be read are counted as `unknown`.
    pub by_kind: BTreeMap<String, usize>,
    pub expanded_files: usize,
    pub unexpanded_files: usize,
    pub oldest: Option<DateTime<Local>>,
    pub newest: Option<DateTime<Local>>,
}

pub struct CacheStore {
    dir: PathBuf,
    timeout_hours: f64,
    timeout: Duration,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>, timeout_hours: f64) -> Self {
        Self {
            dir: dir.into(),
            timeout_hours,
            timeout: CacheConfig { timeout_hours }.timeout(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.paths.cache_dir(), config.cache.timeout_hours)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// SHA-256 of `<kind>:<id>[:<league>][:expanded]`, hex encoded.
    pub fn key(kind: CacheKind, id: &str, league: Option<&League>, expanded: bool) -> String {
        let mut request = format!("{kind}:{id}");
        if let Some(league) = league {
            request.push(':');
            request.push_str(league.as_ref());
        }
        if expanded {
            request.push_str(":expanded");
        }
        hex::encode(Sha256::digest(request.as_bytes()))
    }

    fn path_of(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn age(path: &Path) -> io::Result<Duration> {
        let modified = fs_err::metadata(path)?.modified()?;
        Ok(SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO))
    }

    fn is_valid(&self, path: &Path) -> bool {
        Self::age(path).is_ok_and(|age| age < self.timeout)
    }

    pub fn load<T: DeserializeOwned>(
        &self,
        kind: CacheKind,
        id: &str,
        league: Option<&League>,
        expanded: bool,
    ) -> Result<CacheEntry<T>, CacheLoadError> {
        let path = self.path_of(&Self::key(kind, id, league, expanded));
        let age = Self::age(&path)?;
        if age >= self.timeout {
            return Err(CacheLoadError::Expired(age));
        }
        Ok(serde_json::from_reader(BufReader::new(File::open(&path)?))?)
    }

    /// `None` for missing, expired and unreadable entries alike.
    pub fn get<T: DeserializeOwned>(
        &self,
        kind: CacheKind,
        id: &str,
        league: Option<&League>,
        expanded: bool,
    ) -> Option<CacheEntry<T>> {
        match self.load(kind, id, league, expanded) {
            Ok(entry) => Some(entry),
            Err(e @ (CacheLoadError::NotFound | CacheLoadError::Expired(_))) => {
                debug!("No cached {kind} {id}: {e}");
                None
            }
            Err(e) => {
                warn!("Ignoring cached {kind} {id}: {e}");
                None
            }
        }
    }

    /// Returns whether the entry was written.
    pub fn put<T: Serialize>(
        &self,
        kind: CacheKind,
        id: &str,
        league: Option<&League>,
        expanded: bool,
        report: &T,
    ) -> bool {
        let cache_key = Self::key(kind, id, league, expanded);
        let entry = CacheEntry {
            cache_info: CacheInfo {
                cached_at: Local::now(),
                cache_key: cache_key.clone(),
                action_type: kind,
                identifier: id.to_owned(),
                league: league.cloned(),
                expanded,
                timeout_hours: self.timeout_hours,
            },
            report,
        };
        let path = self.path_of(&cache_key);
        let result = fs_err::create_dir_all(&self.dir)
            .map_err(anyhow::Error::from)
            .and_then(|()| write_json_pretty(&path, &entry));
        match result {
            Ok(()) => {
                debug!("Cached {kind} {id} at {path:?}");
                true
            }
            Err(e) => {
                warn!("Failed to cache {kind} {id}: {e:#}");
                false
            }
        }
    }

    fn entries(&self) -> io::Result<Vec<PathBuf>> {
        let read_dir = match fs_err::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e),
        };
        let mut paths = vec![];
        for entry in read_dir {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn info_of(path: &Path) -> Option<CacheInfo> {
        let file = File::open(path).ok()?;
        serde_json::from_reader::<_, InfoOnly>(BufReader::new(file))
            .ok()
            .map(|i| i.cache_info)
    }

    fn remove_where(&self, mut pred: impl FnMut(&Path) -> bool) -> anyhow::Result<usize> {
        let mut removed = 0;
        for path in self.entries()? {
            if pred(&path) {
                fs_err::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Every entry for this identifier, expanded or not, in any league.
    pub fn clear(&self, kind: CacheKind, id: &str) -> anyhow::Result<usize> {
        self.remove_where(|path| {
            Self::info_of(path).is_some_and(|info| info.action_type == kind && info.identifier == id)
        })
    }

    /// Unreadable entries go as well.
    pub fn clear_kind(&self, kind: CacheKind) -> anyhow::Result<usize> {
        self.remove_where(|path| Self::info_of(path).map_or(true, |info| info.action_type == kind))
    }

    pub fn clear_all(&self) -> anyhow::Result<usize> {
        self.remove_where(|_| true)
    }

    pub fn cleanup_expired(&self) -> anyhow::Result<usize> {
        self.remove_where(|path| !self.is_valid(path))
    }

    pub fn stats(&self) -> anyhow::Result<CacheStats> {
        let mut stats = CacheStats::default();
        for path in self.entries()? {
            let metadata = match fs_err::metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!("Skipping {path:?}: {e}");
                    continue;
                }
            };
            stats.total_files += 1;
            stats.total_bytes += metadata.len();
            if self.is_valid(&path) {
                stats.valid_files += 1;
            } else {
                stats.expired_files += 1;
            }
            if let Ok(modified) = metadata.modified() {
                let modified = DateTime::<Local>::from(modified);
                stats.oldest = Some(stats.oldest.map_or(modified, |t| t.min(modified)));
                stats.newest = Some(stats.newest.map_or(modified, |t| t.max(modified)));
            }
            match Self::info_of(&path) {
                Some(info) => {
                    *stats.by_kind.entry(info.action_type.to_string()).or_default() += 1;
                    if info.expanded {
                        stats.expanded_files += 1;
                    } else {
                        stats.unexpanded_files += 1;
                    }
                }
                None => *stats.by_kind.entry("unknown".to_owned()).or_default() += 1,
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Local;

    use super::{CacheKind, CacheLoadError, CacheStore};
    use crate::schema::{League, PlayerRecord, TeamInfo, TeamReport};

    fn report() -> TeamReport {
        TeamReport {
            url: "https://league.poolplayers.com/team/12821920".to_owned(),
            page_title: "Team".to_owned(),
            extracted_at: Local::now(),
            team_info: TeamInfo {
                name: Some("Café Crew".to_owned()),
                ..Default::default()
            },
            players: vec![PlayerRecord {
                name: "Jane Doe".to_owned(),
                skill_level: Some(5),
                ..Default::default()
            }],
            links: vec![],
        }
    }

    fn league() -> League {
        League::from("Philadelphia".to_owned())
    }

    #[test]
    fn keys_depend_on_every_part() {
        let league = league();
        let plain = CacheStore::key(CacheKind::Team, "1", None, false);
        assert_eq!(plain.len(), 64);
        assert_ne!(plain, CacheStore::key(CacheKind::Player, "1", None, false));
        assert_ne!(plain, CacheStore::key(CacheKind::Team, "1", Some(&league), false));
        assert_ne!(plain, CacheStore::key(CacheKind::Team, "1", None, true));
    }

    #[test]
    fn put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("cache"), 12.);
        let league = league();
        assert!(store.put(CacheKind::Team, "12821920", Some(&league), false, &report()));

        let entry = store
            .get::<TeamReport>(CacheKind::Team, "12821920", Some(&league), false)
            .unwrap();
        assert_eq!(entry.report.team_info.name.as_deref(), Some("Café Crew"));
        assert_eq!(entry.report.players[0].skill_level, Some(5));
        assert_eq!(entry.cache_info.identifier, "12821920");
        assert_eq!(entry.cache_info.action_type, CacheKind::Team);
        assert!(!entry.cache_info.expanded);

        assert!(store
            .get::<TeamReport>(CacheKind::Team, "12821920", Some(&league), true)
            .is_none());
        let text = fs_err::read_to_string(
            store
                .dir()
                .join(format!("{}.json", entry.cache_info.cache_key)),
        )
        .unwrap();
        assert!(text.contains("\"_cache_info\": {"));
        assert!(text.contains("Café Crew"));
    }

    #[test]
    fn zero_timeout_expires_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), 0.);
        assert!(store.put(CacheKind::Player, "7", None, false, &report()));
        assert!(matches!(
            store.load::<TeamReport>(CacheKind::Player, "7", None, false),
            Err(CacheLoadError::Expired(_))
        ));
        assert!(store.get::<TeamReport>(CacheKind::Player, "7", None, false).is_none());
        assert_eq!(store.stats().unwrap().expired_files, 1);
        assert_eq!(store.cleanup_expired().unwrap(), 1);
        assert_eq!(store.stats().unwrap().total_files, 0);
    }

    #[test]
    fn corrupt_entries_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), 12.);
        let key = CacheStore::key(CacheKind::Team, "5", None, false);
        fs_err::write(dir.path().join(format!("{key}.json")), "{ not json").unwrap();
        assert!(matches!(
            store.load::<TeamReport>(CacheKind::Team, "5", None, false),
            Err(CacheLoadError::JsonError(_))
        ));
        assert!(store.get::<TeamReport>(CacheKind::Team, "5", None, false).is_none());
        assert!(matches!(
            store.load::<TeamReport>(CacheKind::Team, "6", None, false),
            Err(CacheLoadError::NotFound)
        ));
        assert_eq!(store.stats().unwrap().by_kind.get("unknown"), Some(&1));
    }

    #[test]
    fn clearing_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), 12.);
        let league = league();
        let report = report();
        assert!(store.put(CacheKind::Team, "1", Some(&league), false, &report));
        assert!(store.put(CacheKind::Team, "1", Some(&league), true, &report));
        assert!(store.put(CacheKind::Team, "2", None, false, &report));
        assert!(store.put(CacheKind::Player, "1", None, false, &report));

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_files, 4);
        assert_eq!(stats.valid_files, 4);
        assert_eq!(stats.by_kind.get("team"), Some(&3));
        assert_eq!(stats.by_kind.get("player"), Some(&1));
        assert_eq!((stats.expanded_files, stats.unexpanded_files), (1, 3));
        assert!(stats.oldest <= stats.newest);
        assert!(stats.total_bytes > 0);

        assert_eq!(store.clear(CacheKind::Team, "1").unwrap(), 2);
        assert_eq!(store.clear_kind(CacheKind::Player).unwrap(), 1);
        assert_eq!(store.clear_all().unwrap(), 1);
        assert_eq!(store.stats().unwrap(), Default::default());
    }
}
