//! Terminal rendering of reports: a `Field | Value` summary followed by per-team or
//! per-player tables, or a compact list with `--plain`.

use itertools::Itertools;

use crate::{
    export::{or_na, percentage, title_case, NOT_AVAILABLE},
    schema::{PlayerReport, TeamRecord, TeamReport},
};

const VALUE_WIDTH: usize = 50;
const RULE_WIDTH: usize = 80;

/// Cuts `text` to `width` characters, marking the cut with `...`.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_owned()
    } else {
        let kept = text.chars().take(width.saturating_sub(3)).collect::<String>();
        format!("{kept}...")
    }
}

pub fn field_table(rows: &[(String, String)]) -> String {
    let label_width = rows
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0)
        .max("Field".len());
    let mut lines = vec![
        format!("{:<label_width$} | Value", "Field"),
        format!("{}|{}", "-".repeat(label_width + 1), "-".repeat(VALUE_WIDTH)),
    ];
    lines.extend(rows.iter().map(|(label, value)| {
        format!("{label:<label_width$} | {}", truncate(value, VALUE_WIDTH))
    }));
    lines.join("\n")
}

/// Fixed-width columns; every cell is truncated to its column.
fn column_table(headers: &[(&str, usize)], rows: impl IntoIterator<Item = Vec<String>>) -> String {
    let line = |cells: &mut dyn Iterator<Item = String>| {
        cells
            .zip(headers)
            .map(|(cell, &(_, width))| format!("{:<width$}", truncate(&cell, width)))
            .join(" | ")
    };
    let total = headers.iter().map(|(_, w)| w + 3).sum::<usize>();
    let mut lines = vec![
        "-".repeat(total),
        line(&mut headers.iter().map(|(h, _)| h.to_string())),
        "-".repeat(total),
    ];
    lines.extend(rows.into_iter().map(|row| line(&mut row.into_iter())));
    lines.join("\n")
}

fn team_summary(team: &TeamRecord) -> String {
    format!(
        "{} ({}, {}, Skill {}, {} games, {} wins, {}%)",
        team.name,
        or_na(team.season.as_ref()),
        or_na(team.role),
        or_na(team.skill_level),
        or_na(team.matches_played),
        or_na(team.matches_won),
        percentage(team.win_percentage),
    )
}

fn teams_table(teams: &[TeamRecord]) -> String {
    column_table(
        &[
            ("Team Name", 20),
            ("Season", 12),
            ("Role", 10),
            ("Skill", 5),
            ("Played", 7),
            ("Won", 4),
            ("Win%", 6),
            ("MVP Rank", 8),
        ],
        teams.iter().map(|team| {
            vec![
                team.name.clone(),
                or_na(team.season.as_ref()),
                or_na(team.role),
                or_na(team.skill_level),
                or_na(team.matches_played),
                or_na(team.matches_won),
                format!("{}%", percentage(team.win_percentage)),
                or_na(team.mvp_rank.as_ref()),
            ]
        }),
    )
}

pub trait Render {
    fn render_table(&self) -> String;
    fn render_plain(&self) -> String;

    fn render(&self, plain: bool) -> String {
        if plain {
            self.render_plain()
        } else {
            self.render_table()
        }
    }
}

impl Render for PlayerReport {
    fn render_table(&self) -> String {
        let mut rows = vec![];
        let mut push = |label: &str, value: String| rows.push((label.to_owned(), value));
        if let Some(name) = &self.player_info.name {
            push("Player Name", name.clone());
        }
        if let Some(name) = &self.team_info.name {
            push("Team Name", name.clone());
        }
        if let Some(id) = &self.team_info.team_id {
            push("Team ID", id.to_string());
        }
        if let Some(id) = &self.team_info.member_id {
            push("Member ID", id.to_string());
        }
        for (key, value) in &self.statistics {
            push(&title_case(key), value.to_string());
        }
        for (heading, label, teams) in [
            ("Current Teams", "Team", &self.current_teams),
            ("Past Teams", "Past Team", &self.past_teams),
        ] {
            if teams.is_empty() {
                continue;
            }
            push(heading, format!("{} team(s)", teams.len()));
            for (i, team) in teams.iter().enumerate() {
                push(&format!("  {label} {}", i + 1), team_summary(team));
            }
        }
        push("URL", self.url.clone());
        push("Extracted", self.extracted_at.to_rfc3339());

        let rule = "=".repeat(RULE_WIDTH);
        let mut out = vec![rule.clone(), "EXTRACTED PLAYER DATA".to_owned(), rule.clone()];
        out.push(field_table(&rows));
        out.push(rule.clone());
        for (heading, teams) in [
            ("CURRENT TEAMS", &self.current_teams),
            ("PAST TEAMS", &self.past_teams),
        ] {
            if !teams.is_empty() {
                out.push(format!("\n{heading} ({} team(s)):", teams.len()));
                out.push(teams_table(teams));
            }
        }
        out.join("\n")
    }

    fn render_plain(&self) -> String {
        let mut out = vec![];
        out.push(format!(
            "Player: {}",
            self.player_info.name.as_deref().unwrap_or(NOT_AVAILABLE)
        ));
        if let Some(name) = &self.team_info.name {
            out.push(format!("Team: {name}"));
        }
        if let Some(id) = &self.team_info.member_id {
            out.push(format!("Member ID: {id}"));
        }
        for (heading, teams) in [
            ("Current teams", &self.current_teams),
            ("Past teams", &self.past_teams),
        ] {
            out.push(format!("{heading} ({}):", teams.len()));
            out.extend(
                teams
                    .iter()
                    .enumerate()
                    .map(|(i, team)| format!("  {}. {}", i + 1, team_summary(team))),
            );
        }
        out.push(format!("URL: {}", self.url));
        out.push(format!("Extracted: {}", self.extracted_at.to_rfc3339()));
        out.join("\n")
    }
}

impl Render for TeamReport {
    fn render_table(&self) -> String {
        let mut rows = vec![];
        if let Some(name) = &self.team_info.name {
            rows.push(("Team Name".to_owned(), name.clone()));
        }
        if let Some(id) = &self.team_info.team_id {
            rows.push(("Team ID".to_owned(), id.to_string()));
        }
        if !self.players.is_empty() {
            rows.push(("Players".to_owned(), format!("{} player(s)", self.players.len())));
        }
        rows.push(("URL".to_owned(), self.url.clone()));
        rows.push(("Extracted".to_owned(), self.extracted_at.to_rfc3339()));

        let rule = "=".repeat(RULE_WIDTH);
        let mut out = vec![rule.clone(), "EXTRACTED TEAM DATA".to_owned(), rule.clone()];
        out.push(field_table(&rows));
        out.push(rule);
        if self.players.is_empty() {
            return out.join("\n");
        }

        let expanded = self.is_expanded();
        let mut headers = vec![
            ("Player Name", 20),
            ("Member ID", 10),
            ("UserId", 10),
            ("Skill Level", 11),
            ("Matches Won/Played", 18),
            ("Win %", 6),
            ("PPM", 6),
            ("PA", 6),
        ];
        if expanded {
            headers.extend([("Min Skill", 9), ("Max Skill", 9), ("Seasons", 7)]);
        }
        let rows = self.players.iter().map(|player| {
            let mut row = vec![
                player.name.clone(),
                or_na(player.member_id.as_ref()),
                or_na(player.user_id.as_ref()),
                or_na(player.skill_level),
                format!("{}/{}", or_na(player.matches_won), or_na(player.matches_played)),
                format!("{}%", percentage(player.win_percentage)),
                or_na(player.ppm.map(|v| format!("{v:.1}"))),
                or_na(player.pa.map(|v| format!("{v:.1}"))),
            ];
            if expanded {
                let history = player.history();
                row.extend([
                    or_na(history.and_then(|h| h.min_skill)),
                    or_na(history.and_then(|h| h.max_skill)),
                    or_na(history.map(|h| h.seasons_played)),
                ]);
            }
            row
        });
        out.push(format!(
            "\nTEAM PLAYERS - Team ID: {} ({} player(s)):",
            or_na(self.team_info.team_id.as_ref()),
            self.players.len()
        ));
        out.push(column_table(&headers, rows));
        out.join("\n")
    }

    fn render_plain(&self) -> String {
        let mut out = vec![];
        out.push(format!(
            "Team: {}",
            self.team_info.name.as_deref().unwrap_or(NOT_AVAILABLE)
        ));
        if let Some(id) = &self.team_info.team_id {
            out.push(format!("Team ID: {id}"));
        }
        out.push(format!("Players ({}):", self.players.len()));
        for (i, player) in self.players.iter().enumerate() {
            let mut line = format!(
                "  {}. {} (Member ID: {}, UserId: {}, Skill: {}, {}/{}, {}%, PPM: {}, PA: {})",
                i + 1,
                player.name,
                or_na(player.member_id.as_ref()),
                or_na(player.user_id.as_ref()),
                or_na(player.skill_level),
                or_na(player.matches_won),
                or_na(player.matches_played),
                percentage(player.win_percentage),
                or_na(player.ppm),
                or_na(player.pa),
            );
            if let Some(history) = player.history() {
                line += &format!(
                    " [skill {}-{}, {} seasons]",
                    or_na(history.min_skill),
                    or_na(history.max_skill),
                    history.seasons_played
                );
            }
            out.push(line);
        }
        out.push(format!("URL: {}", self.url));
        out.push(format!("Extracted: {}", self.extracted_at.to_rfc3339()));
        out.join("\n")
    }
}
