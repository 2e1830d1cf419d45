//! Parses the roster table on a team page.
//!
//! Columns: `Player Name | Skill Level | Matches Won/Played | Win % | PPM | PA`. The name
//! cell reads `Jane Doe #19162437` and links to `/<league>/member/<user id>`.

use apa_scraping_utils::{regex, selector};
use itertools::Itertools;
use log::debug;
use scraper::{ElementRef, Html};

use super::{
    team_row::{parse_count, parse_percentage},
    validator::is_valid_player_record,
};
use crate::schema::PlayerRecord;

pub fn parse(html: &Html) -> Vec<PlayerRecord> {
    html.select(selector!("table tbody tr"))
        .filter_map(|row| {
            let record = parse_row(row)?;
            if is_valid_player_record(&record) {
                Some(record)
            } else {
                debug!("Skipping roster row {:?}", record.name);
                None
            }
        })
        .collect()
}

/// Rows with fewer than six cells, header rows included, yield `None`.
pub fn parse_row(row: ElementRef) -> Option<PlayerRecord> {
    let cells = row.select(selector!("td")).collect_vec();
    if cells.len() < 6 {
        return None;
    }
    let texts = cells
        .iter()
        .map(|cell| cell.text().collect::<String>().trim().to_owned())
        .collect_vec();

    let (name, member_id) = match regex!(r"#(\d+)$").captures(&texts[0]) {
        Some(captures) => {
            let start = captures.get(0)?.start();
            (
                texts[0][..start].trim().to_owned(),
                captures[1].parse().ok(),
            )
        }
        None => (texts[0].clone(), None),
    };
    if name.is_empty() {
        return None;
    }
    let user_id = cells[0]
        .select(selector!("a"))
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| regex!(r"/member/(\d+)").captures(href))
        .and_then(|c| c[1].parse().ok());
    let (matches_won, matches_played) = parse_won_played(&texts[2]).unzip();

    let mut record = PlayerRecord {
        name,
        member_id,
        user_id,
        skill_level: parse_count(&texts[1]),
        matches_won,
        matches_played,
        win_percentage: parse_percentage(&texts[3]),
        ppm: parse_decimal(&texts[4]),
        pa: parse_decimal(&texts[5]),
        expansion: None,
    };
    record.recompute_win_percentage();
    Some(record)
}

fn parse_won_played(cell: &str) -> Option<(u32, u32)> {
    let (won, played) = cell.trim().split_once('/')?;
    Some((parse_count(won)?, parse_count(played)?))
}

fn parse_decimal(cell: &str) -> Option<f64> {
    regex!(r"\d+(?:\.\d+)?")
        .find(cell)
        .and_then(|m| m.as_str().parse().ok())
}
