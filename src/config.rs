use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use crate::data::{BreakSide, Inebriated};

/// Bumper pool match predictions and odds
#[derive(Parser, Debug, Clone)]
#[command(name = "bumper-odds", version, about)]
pub struct Config {
    /// Match sheet: published Google Sheet CSV URL or a local CSV path
    #[arg(long, env = "CSV_URL")]
    pub source: String,

    /// HTTP listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    pub listen_addr: String,

    /// Give up on the match sheet download after this many seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value = "15")]
    pub fetch_timeout_secs: u64,

    /// Total implied probability when vig is requested (1.05 = 5% book margin)
    #[arg(long, env = "VIG_OVERROUND", default_value_t = crate::odds::DEFAULT_OVERROUND)]
    pub overround: f64,

    /// Reload the sheet and retrain on this interval (seconds); off when unset
    #[arg(long, env = "RETRAIN_INTERVAL_SECS")]
    pub retrain_interval_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve predictions over HTTP (default)
    Serve,
    /// Train once and print the odds sheet for one matchup
    Predict(PredictArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PredictArgs {
    #[arg(long, default_value = "Austin")]
    pub player_a: String,

    #[arg(long, default_value = "Brett")]
    pub player_b: String,

    /// Side player A breaks from ("Window Side" or "TV Side")
    #[arg(long, default_value = "Window Side")]
    pub break_side: BreakSide,

    /// "Yes" or "No"
    #[arg(long, default_value = "Yes")]
    pub inebriated: Inebriated,

    /// Add sportsbook-style vig to the odds
    #[arg(long)]
    pub vig: bool,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.source.trim().is_empty() {
            anyhow::bail!("CSV_URL / --source must point at the match sheet");
        }
        if self.fetch_timeout_secs == 0 {
            anyhow::bail!("fetch_timeout_secs must be positive");
        }
        if !(1.0..=2.0).contains(&self.overround) {
            anyhow::bail!("overround must be between 1.0 and 2.0");
        }
        if self.retrain_interval_secs == Some(0) {
            anyhow::bail!("retrain_interval_secs must be positive when set");
        }
        if let Some(Command::Predict(args)) = &self.command {
            if args.player_a == args.player_b {
                anyhow::bail!("player_a and player_b must be different players");
            }
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
