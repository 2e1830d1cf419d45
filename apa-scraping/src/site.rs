use anyhow::Context;
use apa_scraping_utils::regex;
use url::Url;

use crate::schema::{League, TeamId, UserId};

pub const BASE_URL: &str = "https://league.poolplayers.com";
pub const LOGIN_URL: &str = "https://league.poolplayers.com/login";

pub fn home_url() -> String {
    format!("{BASE_URL}/")
}

pub fn team_url(team_id: &TeamId) -> String {
    format!("{BASE_URL}/team/{team_id}")
}

pub fn member_url(league: &League, user_id: &UserId) -> String {
    format!("{BASE_URL}/{league}/member/{user_id}")
}

pub fn member_teams_url(league: &League, user_id: &UserId) -> String {
    format!("{BASE_URL}/{league}/member/{user_id}/teams")
}

/// Accepts `/<league>/member/<id>` and the legacy `/<league>/member/<id>/<team>/teams`.
pub fn user_id_from_member_url(url: &str) -> anyhow::Result<UserId> {
    let captures = regex!(r"https://league\.poolplayers\.com/[^/]+/member/(\d+)")
        .captures(url)
        .with_context(|| format!("Not a member page URL: {url:?}"))?;
    captures[1].parse()
}

pub fn team_id_from_url(url: &str) -> Option<TeamId> {
    regex!(r"/team/(\d+)")
        .captures(url)
        .and_then(|c| c[1].parse().ok())
}

pub fn user_id_from_url(url: &str) -> Option<UserId> {
    regex!(r"/member/(\d+)")
        .captures(url)
        .and_then(|c| c[1].parse().ok())
}

/// The team segment of a legacy `/<league>/member/<id>/<team>/teams` URL.
pub fn team_id_from_member_url(url: &str) -> Option<TeamId> {
    regex!(r"/member/\d+/(\d+)/")
        .captures(url)
        .and_then(|c| c[1].parse().ok())
}

/// Resolves a possibly relative `href` against the page it was found on.
pub fn absolutize(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|base| base.join(href))
        .map_or_else(|_| href.to_owned(), String::from)
}

pub fn is_login_url(url: &str) -> bool {
    url.to_ascii_lowercase().contains("login")
}
