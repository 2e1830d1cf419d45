use std::collections::BTreeMap;

use anyhow::bail;
use apa_scraping_utils::regex;
use chrono::{DateTime, Local};
use derive_more::{AsRef, Display, From, FromStr};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

macro_rules! numeric_id {
    ($(#[$attr: meta])* $name: ident, $what: literal) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Eq, Hash, Debug, AsRef, Display, Serialize, Deserialize)]
        #[as_ref(forward)]
        #[serde(transparent)]
        pub struct $name(String);
        impl FromStr for $name {
            type Err = anyhow::Error;
            fn from_str(s: &str) -> anyhow::Result<Self> {
                let s = s.trim();
                if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                    bail!("{} must be numeric, found {s:?}", $what);
                }
                Ok(Self(s.to_owned()))
            }
        }
    };
}

numeric_id!(
    /// Numeric id in `/team/<id>`.
    TeamId,
    "Team ID"
);
numeric_id!(
    /// Numeric id in `/<league>/member/<id>`; the site calls it "UserId".
    UserId,
    "UserId"
);
numeric_id!(
    /// The `#<digits>` suffix printed after a player's name on a roster.
    MemberId,
    "Member ID"
);

#[derive(Clone, PartialEq, Eq, Hash, Debug, From, FromStr, AsRef, Display, Serialize, Deserialize)]
#[as_ref(forward)]
#[serde(transparent)]
pub struct League(String);
impl Default for League {
    fn default() -> Self {
        Self("Philadelphia".to_owned())
    }
}

/// `"<Season-word> <4-digit year>"`, e.g. `Fall 2025`. Two-column layouts sometimes carry
/// a bare year instead, which is kept verbatim.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, From, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Season(String);
impl Season {
    pub fn from_parts(word: &str, year: &str) -> Self {
        Self(format!("{word} {year}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `20xx` token, if any.
    pub fn year(&self) -> Option<u16> {
        regex!(r"20\d{2}").find(&self.0)?.as_str().parse().ok()
    }

    pub fn is_blank(&self) -> bool {
        let s = self.0.trim();
        s.is_empty() || s.eq_ignore_ascii_case("N/A")
    }
}

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
    strum::IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Role {
    Captain,
    #[serde(rename = "Co-Captain")]
    #[strum(serialize = "Co-Captain")]
    CoCaptain,
    Member,
}

#[derive(
    Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TeamStatus {
    Current,
    Past,
}

/// One row of a member's team history.
#[skip_serializing_none]
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct TeamRecord {
    pub name: String,
    pub season: Option<Season>,
    pub role: Option<Role>,
    pub skill_level: Option<u32>,
    pub matches_played: Option<u32>,
    pub matches_won: Option<u32>,
    pub win_percentage: Option<f64>,
    pub mvp_rank: Option<String>,
    pub status: Option<TeamStatus>,
}

/// Pagination identity of a [`TeamRecord`].
pub type TeamKey = (String, Option<Season>);

impl TeamRecord {
    pub fn key(&self) -> TeamKey {
        (self.name.clone(), self.season.clone())
    }

    pub fn recompute_win_percentage(&mut self) {
        if let (Some(won), Some(played)) = (self.matches_won, self.matches_played) {
            if let Some(pct) = win_percentage(won, played) {
                self.win_percentage = Some(pct);
            }
        }
    }

    pub fn has_season_or_stats(&self) -> bool {
        self.season.is_some()
            || self.skill_level.is_some()
            || self.matches_played.is_some()
            || self.matches_won.is_some()
    }
}

/// One row of a team roster.
#[skip_serializing_none]
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub member_id: Option<MemberId>,
    pub user_id: Option<UserId>,
    pub skill_level: Option<u32>,
    pub matches_won: Option<u32>,
    pub matches_played: Option<u32>,
    pub win_percentage: Option<f64>,
    pub ppm: Option<f64>,
    pub pa: Option<f64>,
    pub expansion: Option<Expansion>,
}

impl PlayerRecord {
    pub fn recompute_win_percentage(&mut self) {
        if let (Some(won), Some(played)) = (self.matches_won, self.matches_played) {
            if let Some(pct) = win_percentage(won, played) {
                self.win_percentage = Some(pct);
            }
        }
    }

    pub fn history(&self) -> Option<&AggregatedHistory> {
        match &self.expansion {
            Some(Expansion::Expanded(history)) => Some(history),
            _ => None,
        }
    }
}

/// `round(100 * won / played, 1)`, ties to even; `None` when nothing was played.
pub fn win_percentage(won: u32, played: u32) -> Option<f64> {
    (played > 0).then(|| (1000. * f64::from(won) / f64::from(played)).round_ties_even() / 10.)
}

#[skip_serializing_none]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct AggregatedHistory {
    pub min_skill: Option<u32>,
    pub max_skill: Option<u32>,
    pub seasons_played: u32,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Expansion {
    Expanded(AggregatedHistory),
    Unavailable { reason: String },
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub text: String,
}

#[skip_serializing_none]
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub name: Option<String>,
}

#[skip_serializing_none]
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct TeamInfo {
    pub name: Option<String>,
    pub team_id: Option<TeamId>,
    pub member_id: Option<UserId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerReport {
    pub url: String,
    pub page_title: String,
    pub extracted_at: DateTime<Local>,
    pub player_info: PlayerInfo,
    pub team_info: TeamInfo,
    pub statistics: BTreeMap<String, f64>,
    pub current_teams: Vec<TeamRecord>,
    pub past_teams: Vec<TeamRecord>,
    pub links: Vec<Link>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TeamReport {
    pub url: String,
    pub page_title: String,
    pub extracted_at: DateTime<Local>,
    pub team_info: TeamInfo,
    pub players: Vec<PlayerRecord>,
    pub links: Vec<Link>,
}

impl TeamReport {
    pub fn is_expanded(&self) -> bool {
        self.players.iter().any(|p| p.expansion.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::{win_percentage, AggregatedHistory, Expansion, PlayerRecord, Role, Season, TeamId};

    #[test]
    fn win_percentage_rounds_to_one_decimal() {
        assert_eq!(win_percentage(1, 2), Some(50.0));
        assert_eq!(win_percentage(8, 12), Some(66.7));
        assert_eq!(win_percentage(1, 3), Some(33.3));
        assert_eq!(win_percentage(0, 0), None);
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("co-captain".parse::<Role>().unwrap(), Role::CoCaptain);
        assert_eq!("CAPTAIN".parse::<Role>().unwrap(), Role::Captain);
        assert_eq!(Role::CoCaptain.to_string(), "Co-Captain");
        assert_eq!(serde_json::to_string(&Role::CoCaptain).unwrap(), r#""Co-Captain""#);
    }

    #[test]
    fn season_year_is_first_20xx_token() {
        assert_eq!(Season::from_parts("Fall", "2025").year(), Some(2025));
        assert_eq!(Season::from("2019".to_owned()).year(), Some(2019));
        assert_eq!(Season::from("Session 1999".to_owned()).year(), None);
        assert!(Season::from("N/A".to_owned()).is_blank());
    }

    #[test]
    fn ids_must_be_numeric() {
        assert!("12345".parse::<TeamId>().is_ok());
        assert!("12a45".parse::<TeamId>().is_err());
        assert!("".parse::<TeamId>().is_err());
    }

    #[test]
    fn expansion_serializes_with_status_tag() {
        let player = PlayerRecord {
            name: "Jane Doe".to_owned(),
            expansion: Some(Expansion::Expanded(AggregatedHistory {
                min_skill: Some(3),
                max_skill: Some(5),
                seasons_played: 4,
            })),
            ..Default::default()
        };
        let json = serde_json::to_value(&player).unwrap();
        assert_eq!(json["expansion"]["status"], "expanded");
        assert_eq!(json["expansion"]["max_skill"], 5);
        assert!(json.get("member_id").is_none());
        let back: PlayerRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, player);
    }
}
