//! Filters rows that are site chrome rather than data.
//!
//! The scanner selects every `<table>` row on the page, so navigation menus, footers and
//! header leftovers arrive here and must be rejected.

use crate::schema::{PlayerRecord, TeamRecord};

const CHROME_PHRASES: &[&str] = &[
    "member services",
    "dashboard",
    "matches",
    "news",
    "events",
    "my stats",
    "rules",
    "my leagues",
    "apa national",
    "store",
    "tournament info",
    "discounts",
    "contact",
    "need help",
    "logout",
    "login",
    "settings",
    "edit profile",
    "payments",
    "my membership",
    "card/id",
    "ac",
    "note: this table displays",
    "team statistics are not available",
];

const ROSTER_HEADER_PHRASES: &[&str] = &[
    "player name",
    "skill level",
    "matches won/played",
    "win %",
    "ppm",
    "pa",
];

/// Phrases this short only match the whole name; as substrings they hit real names.
const EXACT_MATCH_MAX_LEN: usize = 3;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RowKind {
    TeamHistory,
    Roster,
}

pub fn is_valid_team_record(record: &TeamRecord) -> bool {
    is_valid_name(&record.name, RowKind::TeamHistory) && record.has_season_or_stats()
}

pub fn is_valid_player_record(record: &PlayerRecord) -> bool {
    is_valid_name(&record.name, RowKind::Roster)
}

pub fn is_valid_name(name: &str, kind: RowKind) -> bool {
    let name = name.trim();
    if name.chars().count() < 3 {
        return false;
    }
    let lower = name.to_lowercase();
    let extra = match kind {
        RowKind::TeamHistory => &[][..],
        RowKind::Roster => ROSTER_HEADER_PHRASES,
    };
    if CHROME_PHRASES
        .iter()
        .chain(extra)
        .any(|phrase| matches_phrase(&lower, phrase))
    {
        return false;
    }
    if is_numeric(name) || name.ends_with('%') {
        return false;
    }
    let total = name.chars().count();
    let special = name
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
        .count();
    special * 2 <= total
}

fn matches_phrase(lower_name: &str, phrase: &str) -> bool {
    if phrase.len() <= EXACT_MATCH_MAX_LEN {
        lower_name == phrase
    } else {
        lower_name.contains(phrase)
    }
}

fn is_numeric(name: &str) -> bool {
    let digits = name.replace('.', "");
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}
