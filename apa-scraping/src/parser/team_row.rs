//! Parses one row of a member's team history table.
//!
//! The six-column layout is `Team | Skill | Played | Won | Win % | MVP`, where the team
//! cell holds the team name, the season and the member's role run together, e.g.
//! `All in the GameFall 2025Captain`.

use apa_scraping_utils::regex;
use regex::Match;

use crate::schema::{Role, Season, TeamRecord};

/// Returns `None` when there are fewer than two cells or no name could be recovered.
pub fn parse_cells<S: AsRef<str>>(cells: &[S]) -> Option<TeamRecord> {
    let texts: Vec<&str> = cells.iter().map(|c| c.as_ref().trim()).collect();
    let record = match texts.len() {
        0 | 1 => return None,
        2 => parse_two_columns(texts[0], texts[1]),
        3..=5 => TeamRecord {
            name: texts[0].to_owned(),
            season: non_empty(texts[1]).map(|s| Season::from(s.to_owned())),
            ..Default::default()
        },
        _ => parse_full_row(&texts),
    };
    (!record.name.is_empty()).then_some(record)
}

fn parse_two_columns(first: &str, second: &str) -> TeamRecord {
    let (season, name) = if first.len() == 4 && first.bytes().all(|b| b.is_ascii_digit()) {
        (first, second)
    } else {
        (second, first)
    };
    TeamRecord {
        name: name.to_owned(),
        season: non_empty(season).map(|s| Season::from(s.to_owned())),
        ..Default::default()
    }
}

fn parse_full_row(texts: &[&str]) -> TeamRecord {
    let (name, season, role) = split_team_cell(texts[0]);
    let mut record = TeamRecord {
        name,
        season,
        role,
        skill_level: parse_count(texts[1]),
        matches_played: parse_count(texts[2]),
        matches_won: parse_count(texts[3]),
        win_percentage: parse_percentage(texts[4]),
        mvp_rank: parse_mvp_rank(texts[5]),
        status: None,
    };
    record.recompute_win_percentage();
    record
}

/// Splits `<name><Season word><year><Role>` into its parts.
pub fn split_team_cell(cell: &str) -> (String, Option<Season>, Option<Role>) {
    let mut rest = cell.to_owned();

    let season = regex!(r"(?i)(Fall|Spring|Summer|Winter)\s*(20\d{2})")
        .captures(&rest)
        .and_then(|c| {
            let range = c.get(0)?.range();
            let season = Season::from_parts(c.get(1)?.as_str(), c.get(2)?.as_str());
            Some((range, season))
        })
        .map(|(range, season)| {
            rest.replace_range(range, "");
            season
        });

    // The role trails the season, so a role word inside the team name must not win.
    let role_match = |text: &str| -> Option<(std::ops::Range<usize>, Role)> {
        let found: Match = regex!(r"(?i)(Co-Captain|Captain|Member)\s*$")
            .captures(text)
            .or_else(|| regex!(r"(?i)(Co-Captain|Captain|Member)").captures(text))?
            .get(1)?;
        Some((found.range(), found.as_str().parse().ok()?))
    };
    let role = role_match(&rest).map(|(range, role)| {
        rest.replace_range(range, "");
        role
    });

    (rest.trim().to_owned(), season, role)
}

pub(crate) fn parse_count(cell: &str) -> Option<u32> {
    let cell = cell.trim();
    if cell.is_empty() || !cell.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    cell.parse().ok()
}

pub(crate) fn parse_percentage(cell: &str) -> Option<f64> {
    regex!(r"(\d+(?:\.\d+)?)%")
        .captures(cell)
        .and_then(|c| c[1].parse().ok())
}

fn parse_mvp_rank(cell: &str) -> Option<String> {
    let cell = cell.trim();
    (!cell.is_empty() && cell != "-").then(|| cell.to_owned())
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::{parse_cells, split_team_cell};
    use crate::schema::{Role, Season};

    #[test]
    fn parses_six_column_row() {
        let record = parse_cells(&[
            "All in the GameFall 2025Captain",
            "7",
            "2",
            "1",
            "50.00%",
            "-",
        ])
        .unwrap();
        assert_eq!(record.name, "All in the Game");
        assert_eq!(record.season, Some(Season::from_parts("Fall", "2025")));
        assert_eq!(record.role, Some(Role::Captain));
        assert_eq!(record.skill_level, Some(7));
        assert_eq!(record.matches_played, Some(2));
        assert_eq!(record.matches_won, Some(1));
        assert_eq!(record.win_percentage, Some(50.0));
        assert_eq!(record.mvp_rank, None);
    }

    #[test]
    fn recomputes_displayed_percentage() {
        let record = parse_cells(&[
            "Rack AttackSpring 2024Member",
            "5",
            "12",
            "8",
            "66.00%",
            "35th",
        ])
        .unwrap();
        assert_eq!(record.win_percentage, Some(66.7));
        assert_eq!(record.mvp_rank.as_deref(), Some("35th"));
        assert_eq!(record.role, Some(Role::Member));
    }

    #[test]
    fn zero_played_keeps_displayed_percentage() {
        let record =
            parse_cells(&["Cue CrewWinter 2023Co-Captain", "4", "0", "0", "0.00%", "-"]).unwrap();
        assert_eq!(record.win_percentage, Some(0.0));
        assert_eq!(record.role, Some(Role::CoCaptain));
    }

    #[test]
    fn malformed_stats_become_absent() {
        let record =
            parse_cells(&["Cue CrewSummer 2022", "N/A", "3a", "", "n/a", ""]).unwrap();
        assert_eq!(record.skill_level, None);
        assert_eq!(record.matches_played, None);
        assert_eq!(record.matches_won, None);
        assert_eq!(record.win_percentage, None);
        assert_eq!(record.role, None);
    }

    #[test]
    fn role_word_inside_team_name() {
        let (name, season, role) = split_team_cell("Captain MorgansFall 2025Member");
        assert_eq!(name, "Captain Morgans");
        assert_eq!(season, Some(Season::from_parts("Fall", "2025")));
        assert_eq!(role, Some(Role::Member));
    }

    #[test]
    fn season_word_case_is_kept() {
        let (name, season, _) = split_team_cell("Break Pointsfall2025Captain");
        assert_eq!(name, "Break Points");
        assert_eq!(season.unwrap().as_str(), "fall 2025");
    }

    #[test]
    fn two_column_rows() {
        let record = parse_cells(&["2024", "Sharks"]).unwrap();
        assert_eq!(record.name, "Sharks");
        assert_eq!(record.season.unwrap().as_str(), "2024");
        let record = parse_cells(&["Sharks", "Fall 2024"]).unwrap();
        assert_eq!(record.name, "Sharks");
        assert_eq!(record.season.unwrap().as_str(), "Fall 2024");
        assert_eq!(record.skill_level, None);
    }

    #[test]
    fn short_rows() {
        assert!(parse_cells(&["Sharks"]).is_none());
        assert!(parse_cells(&["", "Fall 2024", "x"]).is_none());
        let record = parse_cells(&["Sharks", "Fall 2024", "x"]).unwrap();
        assert_eq!(record.season.unwrap().as_str(), "Fall 2024");
    }
}
