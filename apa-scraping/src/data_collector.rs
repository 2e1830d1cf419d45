//! Page-level extraction flows: a member's team history, a team roster and the per-player
//! expansion that visits every roster member in turn.

use std::time::Duration;

use anyhow::bail;
use chrono::Local;
use log::{debug, info, warn};
use rand::Rng;
use scraper::Html;

use crate::{
    aggregator::aggregate,
    browser::{settle, Control, Page},
    classifier::classify,
    config::PaginationConfig,
    pagination::collect_all_teams,
    parser::{page_info, roster},
    retry::{retry, RetryPolicy},
    schema::{
        AggregatedHistory, Expansion, League, PlayerInfo, PlayerRecord, PlayerReport, TeamId,
        TeamInfo, TeamReport, UserId,
    },
    session::Session,
    site,
};

const TEAMS_TAB_CONTROLS: &[Control] = &[
    Control::css(r#"button[data-tab="teams"]"#),
    Control::css(r#"a[data-tab="teams"]"#),
    Control::with_text("button", "Teams"),
    Control::with_text("a", "Teams"),
    Control::with_text(r#"[role="tab"]"#, "Teams"),
    Control::with_text(".tab", "Teams"),
    Control::css(r#"button[aria-label*="Teams"]"#),
    Control::css(r#"a[aria-label*="Teams"]"#),
];

/// Anything short enough to be a tab label.
const TEAMS_TEXT_FALLBACK: Control =
    Control::with_text("button, a, div, span", "Teams").shorter_than(20);

/// Sleeps for a random duration in `[min, max]`.
pub fn jitter([min, max]: [Duration; 2]) {
    let duration = if max <= min {
        min
    } else {
        rand::thread_rng().gen_range(min..=max)
    };
    settle(duration);
}

/// A single attempt. An already selected tab counts as success without a click.
pub fn click_teams_tab(page: &impl Page, tab_settle: Duration) -> anyhow::Result<()> {
    for control in TEAMS_TAB_CONTROLS {
        let state = match page.probe(control) {
            Ok(state) if state.found => state,
            Ok(_) => continue,
            Err(e) => {
                debug!("Probe of {:?} failed: {e:#}", control.selector);
                continue;
            }
        };
        if state.selected {
            debug!("Teams tab is already active");
            return Ok(());
        }
        match page.click(control) {
            Ok(true) => {
                info!("Clicked the Teams tab");
                settle(tab_settle);
                page.wait_until_settled()?;
                return Ok(());
            }
            Ok(false) => {}
            Err(e) => debug!("Click on {:?} failed: {e:#}", control.selector),
        }
    }
    if page.click(&TEAMS_TEXT_FALLBACK).unwrap_or(false) {
        info!("Clicked an element labelled Teams");
        settle(tab_settle);
        page.wait_until_settled()?;
        return Ok(());
    }
    bail!("Teams tab not found")
}

pub fn open_teams_tab<P: Page>(session: &Session<P>) -> anyhow::Result<()> {
    let timing = session.timing();
    retry(&RetryPolicy::from_config(timing), "Opening the Teams tab", |_| {
        click_teams_tab(session.page(), timing.tab_settle)
    })
}

/// Navigates with the retry policy and dismisses whatever dialog the site opens.
fn load<P: Page>(session: &Session<P>, url: &str) -> anyhow::Result<()> {
    retry(
        &RetryPolicy::from_config(session.timing()),
        &format!("Loading {url}"),
        |_| session.navigate(url),
    )
}

pub fn extract_player<P: Page>(
    session: &Session<P>,
    league: &League,
    user_id: &UserId,
    pagination: &PaginationConfig,
) -> anyhow::Result<PlayerReport> {
    load(session, &site::member_url(league, user_id))?;
    let page = session.page();
    let url = page.url();
    let page_title = page.title()?;
    let html = Html::parse_document(&page.content()?);
    info!("Extracting from {page_title:?}");

    let player_info = PlayerInfo {
        name: page_info::player_name(&html),
    };
    let team_info = TeamInfo {
        name: page_info::member_page_team_name(&html),
        team_id: site::team_id_from_member_url(&url),
        member_id: site::user_id_from_url(&url),
    };
    let statistics = page_info::statistics(&html);
    let links = page_info::links(&html, &url);

    if let Err(e) = open_teams_tab(session) {
        warn!("{e:#}; reading whatever the page shows");
    }
    let (current_teams, past_teams) = classify(collect_all_teams(page, pagination));
    info!(
        "Found {} current and {} past teams",
        current_teams.len(),
        past_teams.len()
    );

    Ok(PlayerReport {
        url,
        page_title,
        extracted_at: Local::now(),
        player_info,
        team_info,
        statistics,
        current_teams,
        past_teams,
        links,
    })
}

/// With `expand`, every rostered player with a member page link is visited afterwards.
pub fn extract_team<P: Page>(
    session: &Session<P>,
    team_id: &TeamId,
    league: &League,
    expand: bool,
    pagination: &PaginationConfig,
) -> anyhow::Result<TeamReport> {
    load(session, &site::team_url(team_id))?;
    let page = session.page();
    let url = page.url();
    let page_title = page.title()?;
    let html = Html::parse_document(&page.content()?);

    let team_info = TeamInfo {
        name: page_info::team_name(&html),
        team_id: site::team_id_from_url(&url),
        member_id: None,
    };
    let mut players = roster::parse(&html);
    info!("Found {} players", players.len());
    let links = page_info::links(&html, &url);

    if expand {
        expand_roster(session, league, &mut players, pagination);
    }

    Ok(TeamReport {
        url,
        page_title,
        extracted_at: Local::now(),
        team_info,
        players,
        links,
    })
}

/// Skill range and season count from one player's team history page. An empty history is
/// treated as a failed load and retried.
pub fn expand_player<P: Page>(
    session: &Session<P>,
    league: &League,
    user_id: &UserId,
    pagination: &PaginationConfig,
) -> anyhow::Result<AggregatedHistory> {
    let timing = session.timing();
    let url = site::member_teams_url(league, user_id);
    retry(
        &RetryPolicy::from_config(timing),
        &format!("Team history of {user_id}"),
        |attempt| {
            debug!("Team history of {user_id}, attempt {attempt}");
            jitter(timing.jitter_before_navigation);
            session.navigate(&url)?;
            jitter(timing.jitter_after_navigation);
            open_teams_tab(session)?;
            let teams = collect_all_teams(session.page(), pagination);
            if teams.is_empty() {
                bail!("No teams found for {user_id}");
            }
            Ok(aggregate(&teams))
        },
    )
}

/// Expands players one after another. A failure only marks that player as unavailable.
pub fn expand_roster<P: Page>(
    session: &Session<P>,
    league: &League,
    players: &mut [PlayerRecord],
    pagination: &PaginationConfig,
) {
    let total = players.len();
    for (i, player) in players.iter_mut().enumerate() {
        let Some(user_id) = player.user_id.clone() else {
            debug!("{} has no member page; skipping", player.name);
            continue;
        };
        info!("Expanding {} ({}/{total})", player.name, i + 1);
        player.expansion = Some(match expand_player(session, league, &user_id, pagination) {
            Ok(history) => Expansion::Expanded(history),
            Err(e) => {
                warn!("Could not expand {}: {e:#}", player.name);
                Expansion::Unavailable {
                    reason: format!("{e:#}"),
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{click_teams_tab, expand_player, expand_roster, extract_player, extract_team};
    use crate::{
        browser::fake::FakePage,
        config::{PaginationConfig, ScrapingConfig},
        schema::{AggregatedHistory, Expansion, League, PlayerRecord, Role, TeamRecord, TeamStatus},
        session::Session,
    };

    const TEAMS_URL: &str = "https://league.poolplayers.com/Philadelphia/member/3287288/teams";

    fn history_page(tab: &str) -> String {
        format!(
            r#"<h1>Member: Jane Doe</h1>
            <div class="player-stats">Skill Level: 5</div>
            {tab}
            <table>
              <thead><tr><th>Team</th><th>SL</th><th>Played</th><th>Won</th><th>Win %</th><th>MVP</th></tr></thead>
              <tbody>
                <tr><td>SharksFall 2025Captain</td><td>5</td><td>10</td><td>6</td><td>60.00%</td><td>-</td></tr>
                <tr><td>JetsSpring 2024Member</td><td>3</td><td>8</td><td>2</td><td>25.00%</td><td>35th</td></tr>
                <tr><td>Cue BallsFall 2024Member</td><td>4</td><td>6</td><td>3</td><td>50.00%</td><td>-</td></tr>
              </tbody>
            </table>
            <a href="/Philadelphia/member/3287288/teams">Teams</a>"#
        )
    }

    fn league() -> League {
        League::from("Philadelphia".to_owned())
    }

    fn session(page: FakePage) -> Session<FakePage> {
        Session::with_page(page, ScrapingConfig::immediate())
    }

    #[test]
    fn selected_tab_is_not_clicked() {
        let page = FakePage::with_snapshots([
            r#"<button data-tab="teams" aria-selected="true">Teams</button>"#,
        ]);
        click_teams_tab(&page, Duration::ZERO).unwrap();
        assert!(page.clicked.borrow().is_empty());
    }

    #[test]
    fn tab_found_by_text() {
        let page = FakePage::with_snapshots([
            r#"<div role="tablist"><div role="tab">Profile</div><div role="tab">Teams</div></div>"#,
        ]);
        click_teams_tab(&page, Duration::ZERO).unwrap();
        assert_eq!(page.clicked.borrow().as_slice(), [r#"[role="tab"]"#]);
    }

    #[test]
    fn short_label_fallback() {
        let page = FakePage::with_snapshots([
            r#"<p>Browse all Teams in the division and their standings</p><span>My Teams</span>"#,
        ]);
        click_teams_tab(&page, Duration::ZERO).unwrap();
        assert_eq!(page.clicked.borrow().as_slice(), ["button, a, div, span"]);
    }

    #[test]
    fn missing_tab_is_an_error() {
        let page = FakePage::with_snapshots(["<p>Profile</p>"]);
        assert!(click_teams_tab(&page, Duration::ZERO).is_err());
    }

    #[test]
    fn player_history_is_split_by_latest_year() {
        let url = "https://league.poolplayers.com/Philadelphia/member/3287288";
        let page = FakePage::default()
            .route(url, [history_page(r#"<button data-tab="teams">Teams</button>"#)])
            .with_title("Member Profile");
        let session = session(page);
        let report = extract_player(
            &session,
            &league(),
            &"3287288".parse().unwrap(),
            &PaginationConfig::immediate(),
        )
        .unwrap();

        assert_eq!(report.url, url);
        assert_eq!(report.page_title, "Member Profile");
        assert_eq!(report.player_info.name.as_deref(), Some("Jane Doe"));
        assert_eq!(report.team_info.member_id.unwrap().to_string(), "3287288");
        assert!(report.team_info.team_id.is_none());
        assert_eq!(report.statistics.get("skill level"), Some(&5.));

        let names = |teams: &[TeamRecord]| teams.iter().map(|t| t.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&report.current_teams), ["Sharks"]);
        assert_eq!(names(&report.past_teams), ["Jets", "Cue Balls"]);
        assert_eq!(report.current_teams[0].role, Some(Role::Captain));
        assert_eq!(report.past_teams[0].status, Some(TeamStatus::Past));
        assert_eq!(report.links.len(), 1);
        assert_eq!(
            session.page().clicked.borrow().as_slice(),
            [r#"button[data-tab="teams"]"#]
        );
    }

    #[test]
    fn expansion_retries_a_timed_out_navigation() {
        let page = FakePage::default()
            .route(TEAMS_URL, [history_page("")])
            .fail_navigation(TEAMS_URL, 1);
        let session = session(page);
        let history = expand_player(
            &session,
            &league(),
            &"3287288".parse().unwrap(),
            &PaginationConfig::immediate(),
        )
        .unwrap();
        assert_eq!(
            history,
            AggregatedHistory {
                min_skill: Some(3),
                max_skill: Some(5),
                seasons_played: 3,
            }
        );
        assert_eq!(session.page().visited.borrow().len(), 2);
    }

    #[test]
    fn roster_expansion_continues_past_failures() {
        let broken = "https://league.poolplayers.com/Philadelphia/member/999/teams";
        let page = FakePage::default()
            .route(TEAMS_URL, [history_page("")])
            .fail_navigation(broken, usize::MAX);
        let session = session(page);
        let mut players = vec![
            PlayerRecord {
                name: "Jane Doe".to_owned(),
                user_id: Some("3287288".parse().unwrap()),
                ..Default::default()
            },
            PlayerRecord {
                name: "No Link".to_owned(),
                ..Default::default()
            },
            PlayerRecord {
                name: "Gone Player".to_owned(),
                user_id: Some("999".parse().unwrap()),
                ..Default::default()
            },
        ];
        expand_roster(&session, &league(), &mut players, &PaginationConfig::immediate());

        assert_eq!(players[0].history().unwrap().seasons_played, 3);
        assert!(players[1].expansion.is_none());
        match &players[2].expansion {
            Some(Expansion::Unavailable { reason }) => assert!(reason.contains("timed out"), "{reason}"),
            other => panic!("unexpected expansion {other:?}"),
        }
        let visited = session.page().visited.borrow();
        assert_eq!(visited.iter().filter(|url| *url == broken).count(), 3);
    }

    #[test]
    fn team_roster_with_expansion() {
        let team_url = "https://league.poolplayers.com/team/12821920";
        let roster = r#"
            <h1>Team: Sharks</h1>
            <table><tbody>
              <tr><td><a href="/Philadelphia/member/3287288">Jane Doe</a> #19162437</td>
                <td>5</td><td>8/12</td><td>66.00%</td><td>1.75</td><td>12.5</td></tr>
            </tbody></table>"#;
        let page = FakePage::default()
            .route(team_url, [roster])
            .route(TEAMS_URL, [history_page("")]);
        let session = session(page);
        let report = extract_team(
            &session,
            &"12821920".parse().unwrap(),
            &league(),
            true,
            &PaginationConfig::immediate(),
        )
        .unwrap();

        assert_eq!(report.team_info.name.as_deref(), Some("Sharks"));
        assert_eq!(report.team_info.team_id.as_ref().unwrap().to_string(), "12821920");
        assert_eq!(report.players.len(), 1);
        assert!(report.is_expanded());
        assert_eq!(report.players[0].history().unwrap().max_skill, Some(5));
    }
}
