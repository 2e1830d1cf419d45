//! Reveals lazily loaded team history by scrolling and clicking "load more" until a rescan
//! stops producing records we have not seen.

use indexmap::{map::Entry, IndexMap};
use log::{debug, info, warn};

use crate::{
    browser::{settle, Control, Page, Scroll},
    config::PaginationConfig,
    scanner::scan_page,
    schema::{TeamKey, TeamRecord},
};

pub const LOAD_MORE_CONTROLS: &[Control] = &[
    Control::with_text("button", "Load More"),
    Control::with_text("button", "Show More"),
    Control::css(r#"[class*="load-more"]"#),
    Control::css(r#"[class*="show-more"]"#),
    Control::css(r#"[data-testid*="load-more"]"#),
    Control::css(r#"button[aria-label*="load"]"#),
    Control::css(r#"button[aria-label*="more"]"#),
];

/// Records merged by `(name, season)`, in the order they were first seen.
#[derive(Default, Debug)]
pub struct MergedTeams(IndexMap<TeamKey, TeamRecord>);

impl MergedTeams {
    /// Returns how many of `records` were not known yet. Known keys keep their first record.
    pub fn merge(&mut self, records: impl IntoIterator<Item = TeamRecord>) -> usize {
        let mut added = 0;
        for record in records {
            if let Entry::Vacant(entry) = self.0.entry(record.key()) {
                entry.insert(record);
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_records(self) -> Vec<TeamRecord> {
        self.0.into_values().collect()
    }
}

pub fn collect_all_teams(page: &impl Page, config: &PaginationConfig) -> Vec<TeamRecord> {
    let mut teams = MergedTeams::default();
    let mut misses = 0;
    loop {
        let added = teams.merge(scan_page(page));
        if added > 0 {
            debug!("{added} new records, {} in total", teams.len());
            misses = 0;
        } else {
            misses += 1;
            if misses > config.max_scroll_attempts {
                debug!("Giving up after {misses} scans without new records");
                break;
            }
            reveal_more(page, config);
            let added = teams.merge(scan_page(page));
            if added == 0 {
                debug!("Nothing new appeared after scrolling");
                break;
            }
            debug!("{added} new records after scrolling, {} in total", teams.len());
            misses = 0;
        }
        // An unreadable position is treated as the end of the page.
        if page.at_bottom(config.bottom_slack_px).unwrap_or(true) {
            debug!("Reached the bottom of the page");
            break;
        }
    }
    info!("Collected {} team records", teams.len());
    teams.into_records()
}

fn reveal_more(page: &impl Page, config: &PaginationConfig) {
    if let Err(e) = page.scroll(Scroll::Bottom) {
        warn!("Failed to scroll to the bottom: {e:#}");
    }
    settle(config.settle_after_scroll);

    match find_visible(page, LOAD_MORE_CONTROLS) {
        Some(control) => match page.click(control) {
            Ok(_) => {
                debug!("Clicked {:?}", control.selector);
                settle(config.settle_after_click);
            }
            Err(e) => warn!("Failed to click {:?}: {e:#}", control.selector),
        },
        None => {
            if let Err(e) = page.scroll(Scroll::By(config.nudge_offset_px)) {
                warn!("Failed to scroll: {e:#}");
            }
            settle(config.settle_after_nudge);
        }
    }
}

/// The first control that currently resolves to a visible element. Lookup errors count as
/// not found.
pub fn find_visible<'c>(page: &impl Page, controls: &'c [Control]) -> Option<&'c Control> {
    controls.iter().find(|control| match page.probe(control) {
        Ok(state) => state.visible,
        Err(e) => {
            debug!("Probe of {:?} failed: {e:#}", control.selector);
            false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{collect_all_teams, MergedTeams};
    use crate::{
        browser::{fake::FakePage, Scroll},
        config::PaginationConfig,
        schema::{Season, TeamRecord},
    };

    fn row(name: &str, season: &str) -> String {
        format!("<tr><td>{name}{season}Member</td><td>5</td><td>4</td><td>2</td><td>50%</td><td>-</td></tr>")
    }

    fn snapshot(rows: &[String], load_more: bool) -> String {
        format!(
            "<table><thead><tr><th>Team</th></tr></thead><tbody>{}</tbody></table>{}",
            rows.concat(),
            if load_more { "<button>Load More</button>" } else { "" }
        )
    }

    #[test]
    fn merging_the_same_key_twice_adds_nothing() {
        let record = TeamRecord {
            name: "Sharks".to_owned(),
            season: Some(Season::from_parts("Fall", "2024")),
            ..Default::default()
        };
        let mut teams = MergedTeams::default();
        assert_eq!(teams.merge([record.clone()]), 1);
        assert_eq!(teams.merge([record.clone(), record]), 0);
        assert_eq!(teams.len(), 1);
    }

    #[test]
    fn clicks_load_more_until_nothing_new() {
        let first = [row("Sharks", "Fall 2025"), row("Jets", "Fall 2025")];
        let more = [
            row("Sharks", "Fall 2025"),
            row("Jets", "Fall 2025"),
            row("Sharks", "Spring 2024"),
        ];
        let page = FakePage::with_snapshots([
            snapshot(&first, true),
            snapshot(&more, true),
            snapshot(&more, true),
        ]);
        let teams = collect_all_teams(&page, &PaginationConfig::immediate());
        let keys = teams
            .iter()
            .map(|t| format!("{} / {}", t.name, t.season.as_ref().unwrap()))
            .collect::<Vec<_>>();
        assert_eq!(keys, ["Sharks / Fall 2025", "Jets / Fall 2025", "Sharks / Spring 2024"]);
        assert_eq!(page.clicked.borrow().len(), 2);
    }

    #[test]
    fn nudges_when_there_is_no_control() {
        let page = FakePage::with_snapshots([
            snapshot(&[row("Sharks", "Fall 2025")], false),
            snapshot(&[row("Sharks", "Fall 2025"), row("Jets", "Winter 2024")], false),
        ]);
        let teams = collect_all_teams(&page, &PaginationConfig::immediate());
        assert_eq!(teams.len(), 2);
        assert!(page.clicked.borrow().is_empty());
        assert!(page.scrolls.borrow().contains(&Scroll::By(500)));
    }

    #[test]
    fn stops_at_the_bottom() {
        let page = FakePage::with_snapshots([snapshot(&[row("Sharks", "Fall 2025")], true)])
            .bottom_at_last_snapshot();
        let teams = collect_all_teams(&page, &PaginationConfig::immediate());
        assert_eq!(teams.len(), 1);
        assert!(page.scrolls.borrow().is_empty());
    }

    #[test]
    fn zero_attempts_never_scrolls() {
        let config = PaginationConfig {
            max_scroll_attempts: 0,
            ..PaginationConfig::immediate()
        };
        let page = FakePage::with_snapshots([
            snapshot(&[row("Sharks", "Fall 2025")], true),
            snapshot(&[row("Jets", "Fall 2025")], true),
        ]);
        let teams = collect_all_teams(&page, &config);
        assert_eq!(teams.len(), 1);
        assert!(page.clicked.borrow().is_empty());
    }

    #[test]
    fn empty_page() {
        let page = FakePage::with_snapshots(["<p>No teams</p>"]);
        assert!(collect_all_teams(&page, &PaginationConfig::immediate()).is_empty());
    }
}
