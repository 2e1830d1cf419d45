use std::collections::BTreeMap;

use apa_scraping_utils::{regex, selector};
use scraper::{Html, Selector};

use crate::{schema::Link, site};

pub fn player_name(html: &Html) -> Option<String> {
    heading_name(
        html,
        [
            selector!("h1"),
            selector!("h2"),
            selector!(".player-name"),
            selector!(".member-name"),
            selector!(r#"[class*="player"]"#),
            selector!(r#"[class*="member"]"#),
            selector!("title"),
        ],
    )
}

pub fn team_name(html: &Html) -> Option<String> {
    heading_name(
        html,
        [
            selector!("h1"),
            selector!("h2"),
            selector!(".team-name"),
            selector!(".team-title"),
            selector!(r#"[class*="team"]"#),
            selector!("title"),
        ],
    )
}

/// The team mentioned on a member page: the first team-ish element whose text says "team".
pub fn member_page_team_name(html: &Html) -> Option<String> {
    [
        selector!(".team-name"),
        selector!(".team-title"),
        selector!(r#"[class*="team"]"#),
        selector!("h2"),
        selector!("h3"),
    ]
    .into_iter()
    .filter_map(|selector| html.select(selector).next())
    .map(|element| element.text().collect::<String>().trim().to_owned())
    .find(|text| text.to_lowercase().contains("team"))
}

/// Only the first match of each selector is considered, in order.
fn heading_name<'a>(html: &Html, selectors: impl IntoIterator<Item = &'a Selector>) -> Option<String> {
    selectors
        .into_iter()
        .filter_map(|selector| html.select(selector).next())
        .filter_map(|element| clean_name(&element.text().collect::<String>()))
        .next()
}

/// Strips a leading `Player:`/`Member -`/`Team` label and anything after a dash or colon.
pub fn clean_name(text: &str) -> Option<String> {
    let name = regex!(r"(?i)^(Player|Member|Team)\s*[-:]?\s*").replace(text.trim(), "");
    let name = regex!(r"\s*[-:]\s*.*$").replace(&name, "");
    (name.chars().count() > 2).then(|| name.into_owned())
}

/// `key: number` lines found in tables and stat panels, keyed by the lowercased label.
pub fn statistics(html: &Html) -> BTreeMap<String, f64> {
    let mut stats = BTreeMap::new();
    for element in html.select(selector!(
        r#"table, .stats, .statistics, [class*="stat"]"#
    )) {
        let text = element.text().collect::<String>();
        for line in text.lines() {
            let Some((key, value)) = line.trim().split_once(':') else {
                continue;
            };
            let value = value.trim();
            let digits = value.replace('.', "");
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            if let Ok(value) = value.parse() {
                stats.insert(key.trim().to_lowercase(), value);
            }
        }
    }
    stats
}

pub fn links(html: &Html, page_url: &str) -> Vec<Link> {
    html.select(selector!("a[href]"))
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            let text = a.text().collect::<String>().trim().to_owned();
            (!href.is_empty() && !text.is_empty()).then(|| Link {
                url: site::absolutize(page_url, href),
                text,
            })
        })
        .collect()
}
