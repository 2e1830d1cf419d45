//! Writes reports to `--output` as pretty JSON or as a two-column `Field,Value` CSV.

use std::{fmt::Display, path::Path};

use anyhow::Context;
use apa_scraping_utils::fs_json_util::write_json_pretty;
use fs_err::File;
use itertools::Itertools;
use serde::Serialize;

use crate::schema::{Expansion, PlayerRecord, PlayerReport, TeamRecord, TeamReport};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Csv,
}

/// Placeholder for fields the page did not provide.
pub const NOT_AVAILABLE: &str = "N/A";

pub fn or_na<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_owned(), |v| v.to_string())
}

pub fn percentage(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_owned(), |v| format!("{v:.1}"))
}

/// `skill level` and `skill_level` both become `Skill Level`.
pub fn title_case(key: &str) -> String {
    key.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars
                .next()
                .map(|first| first.to_uppercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        })
        .join(" ")
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct FieldRows(Vec<(String, String)>);

impl FieldRows {
    fn push(&mut self, field: impl Into<String>, value: impl Display) {
        self.0.push((field.into(), value.to_string()));
    }

    fn push_some(&mut self, field: &str, value: Option<impl Display>) {
        if let Some(value) = value {
            self.push(field, value);
        }
    }

    fn blank(&mut self) {
        self.0.push((String::new(), String::new()));
    }

    pub fn rows(&self) -> &[(String, String)] {
        &self.0
    }

    fn team_block(&mut self, label: &str, team: &TeamRecord) {
        self.blank();
        self.push(format!("{label} Name"), &team.name);
        self.push(format!("{label} Season"), or_na(team.season.as_ref()));
        self.push(format!("{label} Role"), or_na(team.role));
        self.push(format!("{label} Skill Level"), or_na(team.skill_level));
        self.push(format!("{label} Matches Played"), or_na(team.matches_played));
        self.push(format!("{label} Matches Won"), or_na(team.matches_won));
        self.push(format!("{label} Win %"), percentage(team.win_percentage));
        self.push(format!("{label} MVP Rank"), or_na(team.mvp_rank.as_ref()));
    }

    fn player_block(&mut self, label: &str, player: &PlayerRecord) {
        self.blank();
        self.push(format!("{label} Name"), &player.name);
        self.push(format!("{label} Member ID"), or_na(player.member_id.as_ref()));
        self.push(format!("{label} User ID"), or_na(player.user_id.as_ref()));
        self.push(format!("{label} Skill Level"), or_na(player.skill_level));
        self.push(format!("{label} Matches Won"), or_na(player.matches_won));
        self.push(format!("{label} Matches Played"), or_na(player.matches_played));
        self.push(format!("{label} Win %"), percentage(player.win_percentage));
        self.push(format!("{label} PPM"), or_na(player.ppm));
        self.push(format!("{label} PA"), or_na(player.pa));
        match &player.expansion {
            Some(Expansion::Expanded(history)) => {
                self.push(format!("{label} Min Skill"), or_na(history.min_skill));
                self.push(format!("{label} Max Skill"), or_na(history.max_skill));
                self.push(format!("{label} Seasons Played"), history.seasons_played);
            }
            Some(Expansion::Unavailable { reason }) => {
                self.push(format!("{label} Expansion"), format!("unavailable: {reason}"));
            }
            None => {}
        }
    }
}

pub trait Export: Serialize {
    fn field_rows(&self) -> FieldRows;
}

impl Export for PlayerReport {
    fn field_rows(&self) -> FieldRows {
        let mut rows = FieldRows::default();
        rows.push_some("Player Name", self.player_info.name.as_ref());
        rows.push_some("Team Name", self.team_info.name.as_ref());
        rows.push_some("Team ID", self.team_info.team_id.as_ref());
        rows.push_some("Member ID", self.team_info.member_id.as_ref());
        for (key, value) in &self.statistics {
            rows.push(title_case(key), value);
        }
        for (i, team) in self.current_teams.iter().enumerate() {
            rows.team_block(&format!("Team {}", i + 1), team);
        }
        for (i, team) in self.past_teams.iter().enumerate() {
            rows.team_block(&format!("Past Team {}", i + 1), team);
        }
        rows.push("URL", &self.url);
        rows.push("Extraction Time", self.extracted_at.to_rfc3339());
        rows
    }
}

impl Export for TeamReport {
    fn field_rows(&self) -> FieldRows {
        let mut rows = FieldRows::default();
        rows.push_some("Team Name", self.team_info.name.as_ref());
        rows.push_some("Team ID", self.team_info.team_id.as_ref());
        for (i, player) in self.players.iter().enumerate() {
            rows.player_block(&format!("Player {}", i + 1), player);
        }
        rows.push("URL", &self.url);
        rows.push("Extraction Time", self.extracted_at.to_rfc3339());
        rows
    }
}

pub fn save(report: &impl Export, path: &Path, format: Format) -> anyhow::Result<()> {
    match format {
        Format::Json => write_json_pretty(path, report),
        Format::Csv => write_csv(path, &report.field_rows()),
    }
    .with_context(|| format!("Failed to save the report to {path:?}"))
}

fn write_csv(path: &Path, rows: &FieldRows) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    writer.write_record(["Field", "Value"])?;
    for (field, value) in rows.rows() {
        writer.write_record([field, value])?;
    }
    writer.flush()?;
    Ok(())
}
