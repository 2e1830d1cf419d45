//! Fallback for history rows rendered without table cells.
//!
//! The whole row text is `<name><Season><Role><digits><pct>%<mvp>`, e.g.
//! `Rack AttackFall 2024Member712866.67%35th`, where the digits are skill level, matches
//! played, matches won and the integer part of the win percentage glued together. The
//! split is ambiguous in general; the one whose recomputed percentage agrees with the
//! displayed one is taken.

use apa_scraping_utils::regex;
use log::trace;

use super::team_row::split_team_cell;
use crate::schema::TeamRecord;

#[derive(Clone, PartialEq, Eq, Debug)]
struct Stats {
    skill_level: u32,
    matches_played: u32,
    matches_won: u32,
    /// Digits left over for the integer part of the percentage.
    percentage_digits: String,
}

pub fn parse_text(text: &str) -> Option<TeamRecord> {
    let text = text.trim();
    let Some(captures) = regex!(r"(?s)^(.*?)([0-9]+)(?:\.([0-9]+))?%\s*(.*)$").captures(text) else {
        let (name, season, role) = split_team_cell(text);
        return (!name.is_empty()).then(|| TeamRecord {
            name,
            season,
            role,
            ..Default::default()
        });
    };
    let head = captures.get(1).map_or("", |m| m.as_str());
    let digits = &captures[2];
    let frac = captures.get(3).map_or("", |m| m.as_str());
    let tail = captures.get(4).map_or("", |m| m.as_str());

    let (name, season, role) = split_team_cell(head);
    if name.is_empty() {
        return None;
    }
    let stats = split_matching(digits, frac).or_else(|| split_fixed_width(digits));
    trace!("Blob digits {digits:?}.{frac:?} split as {stats:?}");
    let displayed = stats
        .as_ref()
        .and_then(|s| displayed_percentage(&s.percentage_digits, frac));
    // A guess that wins more than it plays only tells the skill level.
    let plausible = stats.as_ref().filter(|s| s.matches_won <= s.matches_played);

    let mut record = TeamRecord {
        name,
        season,
        role,
        skill_level: stats.as_ref().map(|s| s.skill_level),
        matches_played: plausible.map(|s| s.matches_played),
        matches_won: plausible.map(|s| s.matches_won),
        win_percentage: displayed.filter(|_| plausible.is_some()),
        mvp_rank: regex!(r"[0-9]+(?:st|nd|rd|th)")
            .find(tail)
            .map(|m| m.as_str().to_owned()),
        status: None,
    };
    record.recompute_win_percentage();
    Some(record)
}

fn displayed_percentage(int: &str, frac: &str) -> Option<f64> {
    let int = if int.is_empty() { "0" } else { int };
    let frac = if frac.is_empty() { "0" } else { frac };
    format!("{int}.{frac}").parse().ok()
}

fn split_matching(digits: &str, frac: &str) -> Option<Stats> {
    let skill_level = digits.get(..1)?.parse().ok()?;
    let rest = &digits[1..];
    let frac_value: f64 = if frac.is_empty() {
        0.
    } else {
        format!("0.{frac}").parse().ok()?
    };
    for i in 1..rest.len() {
        for j in i + 1..rest.len() {
            let (played, won, pct) = (&rest[..i], &rest[i..j], &rest[j..]);
            if [played, won, pct].iter().any(|s| has_leading_zero(s)) {
                continue;
            }
            let (Ok(played), Ok(won), Ok(pct)) =
                (played.parse::<u32>(), won.parse::<u32>(), pct.parse::<u32>())
            else {
                continue;
            };
            let shown = f64::from(pct) + frac_value;
            let consistent = match played {
                0 => won == 0 && shown == 0.,
                _ => {
                    won <= played
                        && (100. * f64::from(won) / f64::from(played) - shown).abs() < 0.01
                }
            };
            if consistent {
                return Some(Stats {
                    skill_level,
                    matches_played: played,
                    matches_won: won,
                    percentage_digits: rest[j..].to_owned(),
                });
            }
        }
    }
    None
}

fn split_fixed_width(digits: &str) -> Option<Stats> {
    let field = |range: std::ops::Range<usize>| digits.get(range)?.parse().ok();
    let (played, won) = match digits.len() {
        6 => (1..3, 3..4),
        n if n >= 3 => (1..2, 2..3),
        _ => return None,
    };
    Some(Stats {
        skill_level: field(0..1)?,
        matches_played: field(played)?,
        percentage_digits: digits[won.end..].to_owned(),
        matches_won: field(won)?,
    })
}

fn has_leading_zero(s: &str) -> bool {
    s.len() > 1 && s.starts_with('0')
}
