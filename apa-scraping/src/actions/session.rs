use std::path::PathBuf;

use anyhow::{bail, Context};
use apa_scraping_utils::{
    credentials::{Credentials, Email, Password},
    fs_json_util::read_json,
};
use clap::Args;
use inquire::InquireError;

use super::start_session;
use crate::{browser::Page, config::Config};

#[derive(Args)]
pub struct Login {
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    password: Option<String>,
    /// JSON file with `email` and `password`, used for whatever the flags leave out.
    #[arg(long)]
    credentials_path: Option<PathBuf>,
    #[arg(long)]
    headless: bool,
}

impl Login {
    fn credentials(&self) -> anyhow::Result<Credentials> {
        let from_file = match &self.credentials_path {
            Some(path) => Some(
                read_json::<_, Credentials>(path)
                    .with_context(|| format!("Failed to read credentials from {path:?}"))?,
            ),
            None => None,
        };
        let email = match (&self.email, &from_file) {
            (Some(email), _) => Email::from(email.clone()),
            (None, Some(file)) => file.email.clone(),
            (None, None) => prompt(inquire::Text::new("Email:").prompt())?.into(),
        };
        let password = match (&self.password, &from_file) {
            (Some(password), _) => Password::from(password.clone()),
            (None, Some(file)) => file.password.clone(),
            (None, None) => prompt(
                inquire::Password::new("Password:")
                    .without_confirmation()
                    .prompt(),
            )?
            .into(),
        };
        let credentials = Credentials::builder().email(email).password(password).build();
        if !credentials.is_complete() {
            bail!("Both email and password are required");
        }
        Ok(credentials)
    }

    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let credentials = self.credentials()?;
        let session = start_session(config, self.headless)?;
        println!("Logging in as {}...", credentials.email);
        if !session.login(&credentials)? {
            bail!("Login failed. Check your credentials and try again.");
        }
        println!("Login successful. The session is saved for later commands.");
        Ok(())
    }
}

fn prompt(answer: Result<String, InquireError>) -> anyhow::Result<String> {
    match answer {
        Err(InquireError::OperationInterrupted | InquireError::OperationCanceled) => {
            bail!("Cancelled")
        }
        answer => Ok(answer?),
    }
}

#[derive(Args)]
pub struct VerifySession {
    #[arg(long)]
    headless: bool,
}

impl VerifySession {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let session = start_session(config, self.headless)?;
        let valid = session.verify()?;
        let page = session.page();
        println!("Current URL: {}", page.url());
        println!("Page title: {}", page.title().unwrap_or_default());
        if !valid {
            bail!("Session is not valid. Run `apa-scraping login` first.");
        }
        println!("Session is valid.");
        Ok(())
    }
}
