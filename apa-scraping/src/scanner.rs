//! Collects team-history records from whatever layout the member page currently renders.
//!
//! Several selectors overlap on purpose so that plain tables, the separate "Current Teams"
//! and "Past Teams" sub-tables and the older card layout are all covered. Each DOM node is
//! parsed at most once no matter how many selectors reach it.

use std::collections::HashSet;

use apa_scraping_utils::selector;
use ego_tree::NodeId;
use itertools::Itertools;
use log::{debug, trace, warn};
use scraper::{ElementRef, Html, Selector};

use crate::{
    browser::Page,
    parser::{legacy_blob, team_row, validator::is_valid_team_record},
    schema::TeamRecord,
};

const SECTION_HEADINGS: [&str; 2] = ["Current Teams", "Past Teams"];

fn row_selectors() -> [&'static Selector; 6] {
    [
        selector!("table tbody tr"),
        selector!("table tr"),
        selector!(".team-row"),
        selector!(".history-row"),
        selector!(r#"[data-testid*="team"]"#),
        selector!(r#"[data-testid*="history"]"#),
    ]
}

/// Validated records in first-seen order. A row that fails to parse is skipped.
pub fn scan(html: &Html) -> Vec<TeamRecord> {
    let mut seen = HashSet::<NodeId>::new();
    let mut records = vec![];
    for element in candidates(html) {
        if !seen.insert(element.id()) {
            continue;
        }
        let Some(record) = parse_candidate(element) else {
            continue;
        };
        if is_valid_team_record(&record) {
            records.push(record);
        } else {
            trace!("Rejected row {:?}", record.name);
        }
    }
    debug!("Scanned {} records from {} nodes", records.len(), seen.len());
    records
}

/// Scans the live page; a page that cannot be read counts as an empty scan.
pub fn scan_page(page: &impl Page) -> Vec<TeamRecord> {
    match page.content() {
        Ok(content) => scan(&Html::parse_document(&content)),
        Err(e) => {
            warn!("Could not read the page for scanning: {e:#}");
            vec![]
        }
    }
}

fn candidates(html: &Html) -> Vec<ElementRef<'_>> {
    let mut elements = row_selectors()
        .into_iter()
        .flat_map(|selector| html.select(selector))
        .collect_vec();
    for heading in SECTION_HEADINGS {
        let section = html
            .select(selector!("div"))
            .find(|div| div.text().collect::<String>().contains(heading));
        if let Some(section) = section {
            elements.extend(section.select(selector!("table tbody tr")));
        }
    }
    elements
}

fn parse_candidate(element: ElementRef) -> Option<TeamRecord> {
    let cells = || {
        element
            .select(selector!("td"))
            .map(|td| td.text().collect::<String>())
            .collect_vec()
    };
    if element.value().name() == "tr" {
        if is_first_row_of_table(element) {
            return None;
        }
        let cells = cells();
        return (cells.len() >= 2).then(|| team_row::parse_cells(&cells)).flatten();
    }
    // Containers of whole tables are covered by the row selectors.
    if element.select(selector!("tr")).next().is_some() {
        return None;
    }
    let cells = cells();
    match cells.len() {
        0 => legacy_blob::parse_text(&element.text().collect::<String>()),
        1 => None,
        _ => team_row::parse_cells(&cells),
    }
}

fn is_first_row_of_table(row: ElementRef) -> bool {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "table")
        .and_then(|table| table.select(selector!("tr")).next())
        .is_some_and(|first| first.id() == row.id())
}
