use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use log::info;

use crate::config::{Config, PathsConfig};

#[derive(Args)]
pub struct ClearState {
    /// Skip the confirmation prompt.
    #[arg(long)]
    yes: bool,
}

/// Removes and recreates every state directory. Returns the ones that existed before.
fn reset_state_dirs(paths: &PathsConfig) -> anyhow::Result<Vec<PathBuf>> {
    let mut removed = vec![];
    for dir in paths.state_dirs() {
        if dir.exists() {
            fs_err::remove_dir_all(&dir)?;
            info!("Removed {dir:?}");
            removed.push(dir.clone());
        }
        fs_err::create_dir_all(&dir)?;
    }
    Ok(removed)
}

impl ClearState {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        println!(
            "This removes the browser profile, logs, cache and temporary files under {:?}.",
            config.paths.var_dir()
        );
        println!("You will need to log in again afterwards.");
        let confirmed = self.yes
            || inquire::Confirm::new("Continue?")
                .with_default(false)
                .prompt()
                .context("Confirmation failed")?;
        if !confirmed {
            println!("Nothing was removed.");
            return Ok(());
        }
        let removed = reset_state_dirs(&config.paths)?;
        if removed.is_empty() {
            println!("No state to clear.");
        } else {
            for dir in removed {
                println!("Removed {}", dir.display());
            }
        }
        println!("State cleared. Run `apa-scraping login` to sign in again.");
        Ok(())
    }
}
