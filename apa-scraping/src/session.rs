//! Browser session on the league site: login state, navigation and the promotional dialogs
//! the site likes to open on top of every page.

use anyhow::Context;
use apa_scraping_utils::credentials::Credentials;
use headless_chrome::Browser;
use log::{debug, info, warn};

use crate::{
    browser::{self, settle, Control, HeadlessPage, Page},
    config::{Config, ScrapingConfig},
    pagination::find_visible,
    site,
};

const EMAIL_FIELD: Control = Control::css("#email");
const PASSWORD_FIELD: Control = Control::css("#password");
const LOG_IN_BUTTON: Control = Control::with_text("button", "Log In");
const CONTINUE_BUTTON: Control = Control::with_text("button", "Continue");

const NO_THANKS_CONTROLS: &[Control] = &[
    Control::with_text("a", "No Thanks"),
    Control::with_text("button", "No Thanks"),
    Control::with_text(r#"[role="button"]"#, "No Thanks"),
];

const NOTIFICATION_CONTAINERS: &[&str] = &[
    r#"[class*="notification"]"#,
    r#"[class*="alert"]"#,
    r#"[class*="modal"]"#,
    r#"[class*="dialog"]"#,
    r#"[class*="popup"]"#,
    r#"[class*="toast"]"#,
    r#"[role="dialog"]"#,
    r#"[role="alert"]"#,
];

const CLOSE_CONTROLS: &[Control] = &[
    Control::with_text("button", "Close"),
    Control::with_text("button", "Dismiss"),
    Control::with_text("button", "OK"),
    Control::with_text("button", "Got it"),
    Control::with_text("button", "×"),
    Control::with_text("button", "✕"),
    Control::css(r#"[aria-label="Close"]"#),
    Control::css(r#"[aria-label="Dismiss"]"#),
    Control::css(".close"),
    Control::css(".dismiss"),
    Control::css(".btn-close"),
];

pub struct Session<P: Page = HeadlessPage> {
    page: P,
    timing: ScrapingConfig,
    _browser: Option<Browser>,
}

impl Session<HeadlessPage> {
    /// Launches Chrome on the persistent profile under `var_dir/browser_data`.
    pub fn start(config: &Config) -> anyhow::Result<Self> {
        let (browser, tab) = browser::launch(&config.browser, &config.paths.browser_data_dir())?;
        info!(
            "Browser started ({})",
            if config.browser.headless {
                "headless"
            } else {
                "windowed"
            }
        );
        Ok(Self {
            page: HeadlessPage::new(tab, config.browser.timeout),
            timing: config.scraping.clone(),
            _browser: Some(browser),
        })
    }
}

impl<P: Page> Session<P> {
    pub fn with_page(page: P, timing: ScrapingConfig) -> Self {
        Self {
            page,
            timing,
            _browser: None,
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn timing(&self) -> &ScrapingConfig {
        &self.timing
    }

    /// Visits the site root; a redirect to the login page or a non-dashboard title means the
    /// stored session is gone. Any failure counts as not authenticated.
    pub fn is_authenticated(&self) -> bool {
        let check = || -> anyhow::Result<bool> {
            self.page.navigate(&site::home_url())?;
            let url = self.page.url();
            let title = self.page.title()?;
            debug!("Authentication check landed on {url} ({title:?})");
            Ok(!site::is_login_url(&url) && title.to_lowercase().contains("dashboard"))
        };
        check().unwrap_or_else(|e| {
            warn!("Authentication check failed: {e:#}");
            false
        })
    }

    /// Returns whether the session ends up logged in.
    pub fn login(&self, credentials: &Credentials) -> anyhow::Result<bool> {
        if self.is_authenticated() {
            info!("Already logged in.");
            return Ok(true);
        }
        info!("Logging in as {}", credentials.email);
        self.page.navigate(site::LOGIN_URL)?;
        self.page
            .type_into(&EMAIL_FIELD, credentials.email.as_ref())
            .context("Email field not found")?;
        self.page
            .type_into(&PASSWORD_FIELD, credentials.password.as_ref())
            .context("Password field not found")?;
        if !self.page.click(&LOG_IN_BUTTON)? {
            anyhow::bail!("Log In button not found");
        }
        settle(self.timing.login_submit_settle);
        if !self.page.click(&CONTINUE_BUTTON)? {
            debug!("No Continue button after submitting the form");
        }
        settle(self.timing.login_continue_settle);
        self.page.wait_until_settled()?;

        let url = self.page.url();
        debug!("Login finished on {url}");
        Ok(!site::is_login_url(&url))
    }

    /// Dismisses a promotional or notification overlay, if one is showing. Never fails.
    pub fn dismiss_transient_dialog(&self) -> bool {
        settle(self.timing.dialog_settle);
        if let Some(control) = find_visible(&self.page, NO_THANKS_CONTROLS) {
            if self.page.click(control).unwrap_or(false) {
                info!("Dismissed the \"No Thanks\" dialog");
                settle(self.timing.dialog_settle);
                return true;
            }
        }
        for &container in NOTIFICATION_CONTAINERS {
            let visible = self
                .page
                .probe(&Control::css(container))
                .is_ok_and(|state| state.visible);
            if !visible {
                continue;
            }
            debug!("Found an overlay matching {container}");
            let scoped = CLOSE_CONTROLS
                .iter()
                .map(|control| control.within(container))
                .collect::<Vec<_>>();
            let target = find_visible(&self.page, &scoped)
                .cloned()
                .unwrap_or_else(|| Control::css("button").within(container));
            if self.page.click(&target).unwrap_or(false) {
                info!("Dismissed an overlay with {:?}", target.selector);
                settle(self.timing.dialog_settle);
                return true;
            }
        }
        false
    }

    pub fn navigate(&self, url: &str) -> anyhow::Result<()> {
        info!("Navigating to {url}");
        self.page.navigate(url)?;
        self.dismiss_transient_dialog();
        debug!("Now at {}", self.page.url());
        Ok(())
    }

    /// Authenticated and showing the dashboard (or its welcome page).
    pub fn verify(&self) -> anyhow::Result<bool> {
        if !self.is_authenticated() {
            return Ok(false);
        }
        self.dismiss_transient_dialog();
        if !self.is_authenticated() {
            return Ok(false);
        }
        let title = self.page.title()?.to_lowercase();
        Ok(title.contains("dashboard") || title.contains("welcome"))
    }
}
