use std::collections::HashSet;

use crate::schema::{AggregatedHistory, TeamRecord};

const SKILL_LEVELS: std::ops::RangeInclusive<u32> = 1..=9;

/// Skill range and season count over a player's whole team history. Skill levels outside
/// 1 to 9 are parser noise and ignored.
pub fn aggregate<'a>(records: impl IntoIterator<Item = &'a TeamRecord>) -> AggregatedHistory {
    let mut min_skill = None::<u32>;
    let mut max_skill = None::<u32>;
    let mut seasons = HashSet::new();
    for record in records {
        if let Some(skill) = record.skill_level.filter(|s| SKILL_LEVELS.contains(s)) {
            min_skill = Some(min_skill.map_or(skill, |m| m.min(skill)));
            max_skill = Some(max_skill.map_or(skill, |m| m.max(skill)));
        }
        if let Some(season) = record.season.as_ref().filter(|s| !s.is_blank()) {
            seasons.insert(season.as_str().trim());
        }
    }
    AggregatedHistory {
        min_skill,
        max_skill,
        seasons_played: seasons.len() as u32,
    }
}
