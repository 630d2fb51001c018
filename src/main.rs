use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

mod config;
mod data;
mod model;
mod odds;
mod pipeline;
mod predict;
mod server;

use config::{Command, Config, PredictArgs};
use model::ModelBundle;
use odds::format_odds;
use pipeline::{build_bundle, spawn_retrain_loop, ModelStore};
use predict::{predict_match_now, PredictionRequest, PredictionResult};
use server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Training blocks startup; a bad sheet never reaches the listener.
    info!("🎱 Loading match history from {}", config.source);
    let bundle = build_bundle(&config.source, config.fetch_timeout()).await?;
    info!(
        "Models ready: {} rows, {} players, margin σ={:.3}",
        bundle.trained_rows(),
        bundle.players.len(),
        bundle.margin_std_dev
    );

    match config.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, bundle).await,
        Command::Predict(args) => {
            print_odds_sheet(&bundle, &args, config.overround);
            Ok(())
        }
    }
}

async fn serve(config: &Config, bundle: ModelBundle) -> Result<()> {
    let store = ModelStore::new(bundle);

    if let Some(secs) = config.retrain_interval_secs {
        info!("Retraining every {}s", secs);
        spawn_retrain_loop(
            store.clone(),
            config.source.clone(),
            config.fetch_timeout(),
            Duration::from_secs(secs),
        );
    }

    let app = server::router(AppState {
        store,
        overround: config.overround,
    });
    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", config.listen_addr))?;
    info!("Prediction API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_odds_sheet(bundle: &ModelBundle, args: &PredictArgs, overround: f64) {
    let request = PredictionRequest {
        player_a: args.player_a.clone(),
        player_b: args.player_b.clone(),
        break_side: args.break_side,
        inebriated: args.inebriated,
        apply_vig: args.vig,
    };
    let result = predict_match_now(bundle, &request, overround);
    println!("{}", render_odds_sheet(&result));
}

fn render_odds_sheet(result: &PredictionResult) -> String {
    let ml = &result.moneyline;
    let spread = &result.spread;
    let sweep = &result.sweep_odds;
    let margin = &result.predicted_margin;

    let mut out = String::new();
    out.push_str("🎱 BUMPER POOL LIVE ODDS\n");
    out.push_str(&format!("Matchup: {} vs {}\n\n", ml.odds.player_a, ml.odds.player_b));

    out.push_str("Moneyline\n");
    out.push_str(&format!(
        "  {}: {}  (p = {:.1}%)\n",
        ml.odds.player_a,
        ml.odds.a,
        ml.probabilities.a * 100.0
    ));
    out.push_str(&format!(
        "  {}: {}  (p = {:.1}%)\n\n",
        ml.odds.player_b,
        ml.odds.b,
        ml.probabilities.b * 100.0
    ));

    out.push_str("Spread\n");
    out.push_str(&format!(
        "  {} {:+.1}: {}  (p = {:.1}%)\n",
        spread.odds.player_a,
        spread.line.a,
        spread.odds.a,
        spread.probabilities.a * 100.0
    ));
    out.push_str(&format!(
        "  {} {:+.1}: {}  (p = {:.1}%)\n\n",
        spread.odds.player_b,
        spread.line.b,
        spread.odds.b,
        spread.probabilities.b * 100.0
    ));

    out.push_str("Sweep (win 5-0)\n");
    out.push_str(&format!("  {}: {}\n", sweep.player_a, sweep.a));
    out.push_str(&format!("  {}: {}\n\n", sweep.player_b, sweep.b));

    out.push_str(&format!(
        "Predicted: {} over {} by {:.2}\n",
        margin.winner, margin.loser, margin.margin
    ));
    out.push_str("Exact margin    winner          loser\n");
    for (m, bucket) in &result.margin_distribution {
        out.push_str(&format!(
            "  {}             {:>6} ({:>5.1}%)  {:>6} ({:>5.1}%)\n",
            m,
            format_odds(bucket.winner_odds),
            bucket.winner_probability * 100.0,
            format_odds(bucket.loser_odds),
            bucket.loser_probability * 100.0
        ));
    }
    out
}
