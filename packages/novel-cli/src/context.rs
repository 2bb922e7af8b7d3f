//! Application context with shared state and utilities

use anyhow::{Context, Result};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use novel_client::NovelClient;

use crate::config::Config;
use crate::signal::{InterruptGuard, Interrupts};

/// Application context passed to all commands
pub struct AppContext {
    pub client: NovelClient,
    pub config: Config,
    interrupts: Interrupts,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let client = NovelClient::new(config.api_url.clone())
            .with_connect_timeout(config.connect_timeout)
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            config,
            interrupts: Interrupts::install(),
        })
    }

    /// Route Ctrl-C to the returned guard's token while it is alive.
    pub fn ctrl_c_token(&self) -> InterruptGuard {
        self.interrupts.guard()
    }

    pub fn theme(&self) -> ColorfulTheme {
        ColorfulTheme::default()
    }

    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        Ok(Confirm::with_theme(&self.theme())
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }

    pub fn print_header(&self, msg: &str) {
        println!();
        println!("{}", style(msg).bold());
    }

    pub fn print_success(&self, msg: &str) {
        println!("{}", style(msg).green());
    }

    pub fn print_warning(&self, msg: &str) {
        println!("{}", style(msg).yellow());
    }

    pub fn print_info(&self, msg: &str) {
        println!("{}", style(msg).cyan());
    }
}
