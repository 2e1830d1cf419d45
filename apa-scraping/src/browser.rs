//! The live-page capability the scraping core is written against.
//!
//! [`HeadlessPage`] drives one Chrome tab through `headless_chrome`. Controls that need a
//! text filter (the site has no stable ids on its buttons) are resolved inside the page,
//! and results come back as primitives or JSON strings.

use std::{borrow::Cow, ffi::OsStr, path::Path, sync::Arc, thread::sleep, time::Duration};

use anyhow::Context;
use headless_chrome::{Browser, LaunchOptionsBuilder, Tab};
use log::trace;
use serde::{Deserialize, Serialize};

use crate::config::BrowserConfig;

/// A CSS selector, optionally narrowed to elements whose trimmed text contains `text`
/// (case-insensitively) and is shorter than `max_text_len` characters.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Control {
    pub selector: Cow<'static, str>,
    pub text: Option<&'static str>,
    pub max_text_len: Option<usize>,
}
impl Control {
    pub const fn css(selector: &'static str) -> Self {
        Self {
            selector: Cow::Borrowed(selector),
            text: None,
            max_text_len: None,
        }
    }

    pub const fn with_text(selector: &'static str, text: &'static str) -> Self {
        Self {
            selector: Cow::Borrowed(selector),
            text: Some(text),
            max_text_len: None,
        }
    }

    pub const fn shorter_than(mut self, len: usize) -> Self {
        self.max_text_len = Some(len);
        self
    }

    /// The same control, looked up only inside elements matching `container`.
    pub fn within(&self, container: &str) -> Self {
        let scoped = self
            .selector
            .split(',')
            .map(|part| format!("{container} {}", part.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            selector: Cow::Owned(scoped),
            text: self.text,
            max_text_len: self.max_text_len,
        }
    }
}

/// What a [`Control`] currently resolves to. Visible matches are preferred over hidden ones.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
pub struct ControlState {
    pub found: bool,
    pub visible: bool,
    pub selected: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Scroll {
    Bottom,
    By(u32),
}

pub trait Page {
    /// Navigates and waits for the load to finish.
    fn navigate(&self, url: &str) -> anyhow::Result<()>;
    fn url(&self) -> String;
    fn title(&self) -> anyhow::Result<String>;
    /// The current DOM serialized as HTML.
    fn content(&self) -> anyhow::Result<String>;
    fn probe(&self, control: &Control) -> anyhow::Result<ControlState>;
    /// Clicks the first match, visible ones first; `false` when nothing matched.
    fn click(&self, control: &Control) -> anyhow::Result<bool>;
    fn type_into(&self, control: &Control, text: &str) -> anyhow::Result<()>;
    fn scroll(&self, scroll: Scroll) -> anyhow::Result<()>;
    /// Whether the viewport is within `slack_px` of the end of the document.
    fn at_bottom(&self, slack_px: u32) -> anyhow::Result<bool>;
    /// Waits for a navigation triggered by the last interaction, if any.
    fn wait_until_settled(&self) -> anyhow::Result<()>;
}

/// Fixed wait for asynchronous content; the site gives no loading-complete signal.
pub fn settle(duration: Duration) {
    if !duration.is_zero() {
        trace!("Settling for {duration:?}");
        sleep(duration);
    }
}

const FIND_CONTROL_JS: &str = r#"(spec) => {
    const wanted = spec.text === null ? null : spec.text.toLowerCase();
    const isVisible = (el) => {
        const rect = el.getBoundingClientRect();
        const style = window.getComputedStyle(el);
        return rect.width > 0 && rect.height > 0
            && style.visibility !== "hidden" && style.display !== "none";
    };
    const found = Array.from(document.querySelectorAll(spec.selector)).filter((el) => {
        const text = (el.innerText || el.textContent || "").trim();
        if (wanted !== null && !text.toLowerCase().includes(wanted)) return false;
        if (spec.maxTextLen !== null && text.length >= spec.maxTextLen) return false;
        return true;
    });
    const el = found.find(isVisible) || found[0] || null;
    return { el, visible: el !== null && isVisible(el) };
}"#;

pub struct HeadlessPage {
    tab: Arc<Tab>,
}

impl HeadlessPage {
    pub fn new(tab: Arc<Tab>, timeout: Duration) -> Self {
        tab.set_default_timeout(timeout);
        Self { tab }
    }

    fn evaluate(&self, script: &str) -> anyhow::Result<Option<serde_json::Value>> {
        Ok(self.tab.evaluate(script, false)?.value)
    }

    fn evaluate_on_control(
        &self,
        control: &Control,
        body: &str,
    ) -> anyhow::Result<Option<serde_json::Value>> {
        let spec = serde_json::to_string(control)?;
        self.evaluate(&format!(
            "(() => {{ const {{ el, visible }} = ({FIND_CONTROL_JS})({spec}); {body} }})()"
        ))
        .with_context(|| format!("While resolving {control:?}"))
    }
}

impl Page for HeadlessPage {
    fn navigate(&self, url: &str) -> anyhow::Result<()> {
        self.tab.navigate_to(url)?.wait_until_navigated()?;
        Ok(())
    }

    fn url(&self) -> String {
        self.tab.get_url()
    }

    fn title(&self) -> anyhow::Result<String> {
        self.tab.get_title()
    }

    fn content(&self) -> anyhow::Result<String> {
        self.tab.get_content()
    }

    fn probe(&self, control: &Control) -> anyhow::Result<ControlState> {
        let value = self.evaluate_on_control(
            control,
            r#"return JSON.stringify({
                found: el !== null,
                visible,
                selected: el !== null && el.getAttribute("aria-selected") === "true",
            });"#,
        )?;
        let json = value
            .as_ref()
            .and_then(|v| v.as_str())
            .with_context(|| format!("Probe of {control:?} returned {value:?}"))?;
        Ok(serde_json::from_str(json)?)
    }

    fn click(&self, control: &Control) -> anyhow::Result<bool> {
        let value = self.evaluate_on_control(
            control,
            r#"if (el === null) return false;
            el.scrollIntoView({ block: "center" });
            el.click();
            return true;"#,
        )?;
        Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    fn type_into(&self, control: &Control, text: &str) -> anyhow::Result<()> {
        self.tab.wait_for_element(&control.selector)?.type_into(text)?;
        Ok(())
    }

    fn scroll(&self, scroll: Scroll) -> anyhow::Result<()> {
        let script = match scroll {
            Scroll::Bottom => "window.scrollTo(0, document.body.scrollHeight)".to_owned(),
            Scroll::By(px) => format!("window.scrollBy(0, {px})"),
        };
        self.evaluate(&script)?;
        Ok(())
    }

    fn at_bottom(&self, slack_px: u32) -> anyhow::Result<bool> {
        let value = self.evaluate(&format!(
            "(window.innerHeight + window.scrollY) >= document.body.offsetHeight - {slack_px}"
        ))?;
        value
            .and_then(|v| v.as_bool())
            .context("Bottom check did not return a boolean")
    }

    fn wait_until_settled(&self) -> anyhow::Result<()> {
        self.tab.wait_until_navigated()?;
        Ok(())
    }
}

/// Launches Chrome with a persistent profile so the site's login survives across runs.
pub fn launch(config: &BrowserConfig, user_data_dir: &Path) -> anyhow::Result<(Browser, Arc<Tab>)> {
    fs_err::create_dir_all(user_data_dir)?;
    let user_agent = format!("--user-agent={}", config.user_agent);
    let browser = Browser::new(
        LaunchOptionsBuilder::default()
            .headless(config.headless)
            .sandbox(false)
            .window_size(Some((1920, 1080)))
            .user_data_dir(Some(user_data_dir.to_owned()))
            .idle_browser_timeout(Duration::from_secs(600))
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-blink-features=AutomationControlled"),
                OsStr::new(&user_agent),
            ])
            .build()?,
    )
    .context("Failed to launch the browser")?;
    let tab = browser.new_tab()?;
    Ok((browser, tab))
}

#[cfg(test)]
pub mod fake {
    //! A [`Page`] that serves scripted HTML snapshots and resolves controls with `scraper`.

    use std::{
        cell::{Cell, RefCell},
        collections::HashMap,
    };

    use anyhow::{bail, Context};
    use scraper::{Html, Selector};

    use super::{Control, ControlState, Page, Scroll};

    /// Snapshots advance by one on every successful click and every relative scroll; the
    /// last one sticks.
    #[derive(Default)]
    pub struct FakePage {
        routes: HashMap<String, Vec<String>>,
        snapshots: RefCell<Vec<String>>,
        index: Cell<usize>,
        url: RefCell<String>,
        title: String,
        bottom_at_last_snapshot: bool,
        navigation_failures: RefCell<HashMap<String, usize>>,
        pub visited: RefCell<Vec<String>>,
        pub clicked: RefCell<Vec<String>>,
        pub typed: RefCell<Vec<(String, String)>>,
        pub scrolls: RefCell<Vec<Scroll>>,
    }

    impl FakePage {
        pub fn with_snapshots(snapshots: impl IntoIterator<Item = impl Into<String>>) -> Self {
            Self {
                snapshots: RefCell::new(snapshots.into_iter().map(Into::into).collect()),
                ..Default::default()
            }
        }

        pub fn route(
            mut self,
            url: impl Into<String>,
            snapshots: impl IntoIterator<Item = impl Into<String>>,
        ) -> Self {
            self.routes
                .insert(url.into(), snapshots.into_iter().map(Into::into).collect());
            self
        }

        pub fn with_title(mut self, title: &str) -> Self {
            self.title = title.to_owned();
            self
        }

        pub fn bottom_at_last_snapshot(mut self) -> Self {
            self.bottom_at_last_snapshot = true;
            self
        }

        /// The next `times` navigations to `url` fail with a timeout.
        pub fn fail_navigation(self, url: impl Into<String>, times: usize) -> Self {
            self.navigation_failures.borrow_mut().insert(url.into(), times);
            self
        }

        pub fn set_url(&self, url: &str) {
            *self.url.borrow_mut() = url.to_owned();
        }

        fn advance(&self) {
            let last = self.snapshots.borrow().len().saturating_sub(1);
            self.index.set((self.index.get() + 1).min(last));
        }

        fn current(&self) -> String {
            self.snapshots
                .borrow()
                .get(self.index.get())
                .cloned()
                .unwrap_or_default()
        }

        fn resolve(&self, control: &Control) -> anyhow::Result<ControlState> {
            let html = Html::parse_document(&self.current());
            let selector = Selector::parse(&control.selector)
                .map_err(|e| anyhow::anyhow!("Bad selector {:?}: {e:?}", control.selector))?;
            let matches = html
                .select(&selector)
                .filter(|el| {
                    let text = el.text().collect::<String>();
                    let text = text.trim();
                    control
                        .text
                        .map_or(true, |t| text.to_lowercase().contains(&t.to_lowercase()))
                        && control
                            .max_text_len
                            .map_or(true, |max| text.chars().count() < max)
                })
                .collect::<Vec<_>>();
            let is_visible = |el: &scraper::ElementRef| {
                el.value().attr("hidden").is_none()
                    && !el
                        .value()
                        .attr("style")
                        .is_some_and(|s| s.replace(' ', "").contains("display:none"))
            };
            let el = matches
                .iter()
                .find(|el| is_visible(el))
                .or_else(|| matches.first());
            Ok(match el {
                None => ControlState::default(),
                Some(el) => ControlState {
                    found: true,
                    visible: is_visible(el),
                    selected: el.value().attr("aria-selected") == Some("true"),
                },
            })
        }
    }

    impl Page for FakePage {
        fn navigate(&self, url: &str) -> anyhow::Result<()> {
            self.visited.borrow_mut().push(url.to_owned());
            if let Some(left) = self.navigation_failures.borrow_mut().get_mut(url) {
                if *left > 0 {
                    *left -= 1;
                    bail!("Navigation to {url} timed out");
                }
            }
            *self.url.borrow_mut() = url.to_owned();
            if let Some(snapshots) = self.routes.get(url) {
                *self.snapshots.borrow_mut() = snapshots.clone();
                self.index.set(0);
            }
            Ok(())
        }

        fn url(&self) -> String {
            self.url.borrow().clone()
        }

        fn title(&self) -> anyhow::Result<String> {
            Ok(self.title.clone())
        }

        fn content(&self) -> anyhow::Result<String> {
            Ok(self.current())
        }

        fn probe(&self, control: &Control) -> anyhow::Result<ControlState> {
            self.resolve(control)
        }

        fn click(&self, control: &Control) -> anyhow::Result<bool> {
            if !self.resolve(control)?.found {
                return Ok(false);
            }
            self.clicked.borrow_mut().push(control.selector.to_string());
            self.advance();
            Ok(true)
        }

        fn type_into(&self, control: &Control, text: &str) -> anyhow::Result<()> {
            self.resolve(control)?
                .found
                .then_some(())
                .with_context(|| format!("No element for {:?}", control.selector))?;
            self.typed
                .borrow_mut()
                .push((control.selector.to_string(), text.to_owned()));
            Ok(())
        }

        fn scroll(&self, scroll: Scroll) -> anyhow::Result<()> {
            self.scrolls.borrow_mut().push(scroll);
            if let Scroll::By(_) = scroll {
                self.advance();
            }
            Ok(())
        }

        fn at_bottom(&self, _slack_px: u32) -> anyhow::Result<bool> {
            let last = self.snapshots.borrow().len().saturating_sub(1);
            Ok(self.bottom_at_last_snapshot && self.index.get() == last)
        }

        fn wait_until_settled(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }
}
