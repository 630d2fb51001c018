use anyhow::{Context, Result};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{info, warn};

use crate::data::load_training_data;
use crate::model::{train_models, ModelBundle};

/// Holder for the bundle currently serving predictions.
///
/// Readers take a cloned `Arc`, so a request keeps one bundle for its whole
/// lifetime even if a retrain publishes a new one mid-flight.
#[derive(Clone)]
pub struct ModelStore {
    current: Arc<RwLock<Arc<ModelBundle>>>,
}

impl ModelStore {
    pub fn new(bundle: ModelBundle) -> Self {
        ModelStore {
            current: Arc::new(RwLock::new(Arc::new(bundle))),
        }
    }

    pub fn current(&self) -> Arc<ModelBundle> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn publish(&self, bundle: ModelBundle) {
        let bundle = Arc::new(bundle);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = bundle;
    }
}

/// Fetch the sheet, expand it, and fit both models.
pub async fn build_bundle(source: &str, fetch_timeout: Duration) -> Result<ModelBundle> {
    let data = load_training_data(source, fetch_timeout)
        .await
        .context("Failed to load match history")?;
    let bundle = train_models(&data).context("Failed to train models")?;
    Ok(bundle)
}

/// Rebuild the bundle every `interval` and publish it. A failed rebuild
/// keeps the previous bundle serving.
pub fn spawn_retrain_loop(
    store: ModelStore,
    source: String,
    fetch_timeout: Duration,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick fires immediately; startup already trained.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match build_bundle(&source, fetch_timeout).await {
                Ok(bundle) => {
                    info!(
                        "Retrained on {} rows, publishing new models",
                        bundle.trained_rows()
                    );
                    store.publish(bundle);
                }
                Err(e) => warn!("Retrain failed, keeping previous models: {:#}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{
        BREAK_SIDE_COL, INEBRIATED_COL, LOSER_COL, MARGIN_COL, TIMESTAMP_COL, WINNER_COL,
    };
    use crate::model::tests::austin_brett_history;

    fn sheet(rows: &[&str]) -> String {
        let mut csv = format!(
            "{},{},{},{},{},{}\n",
            TIMESTAMP_COL, WINNER_COL, LOSER_COL, BREAK_SIDE_COL, MARGIN_COL, INEBRIATED_COL
        );
        for row in rows {
            csv.push_str(row);
            csv.push('\n');
        }
        csv
    }

    async fn write_sheet(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "bumper-odds-{}-{}.csv",
            name,
            std::process::id()
        ));
        tokio::fs::write(&path, contents).await.unwrap();
        path
    }

    #[test]
    fn publish_swaps_without_touching_held_snapshots() {
        let first = train_models(&austin_brett_history()).unwrap();
        let first_trained_at = first.trained_at;
        let store = ModelStore::new(first);

        let held = store.current();
        let mut second = train_models(&austin_brett_history()).unwrap();
        second.skipped_rows = 42;
        store.publish(second);

        assert_eq!(held.trained_at, first_trained_at);
        assert_eq!(held.skipped_rows, 0);
        assert_eq!(store.current().skipped_rows, 42);
    }

    #[tokio::test]
    async fn builds_bundle_from_file() {
        let path = write_sheet(
            "build",
            &sheet(&[
                "8/15/2025 21:03:11,Austin,Brett,Window Side,3,Yes",
                "8/15/2025 21:30:00,Brett,Austin,TV Side,1,Yes",
                "8/15/2025 22:00:00,Austin,Brett,TV Side,x,No",
            ]),
        )
        .await;

        let bundle = build_bundle(path.to_str().unwrap(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(bundle.trained_rows(), 4);
        assert_eq!(bundle.skipped_rows, 1);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_retrain_keeps_serving_previous_models() {
        let original = train_models(&austin_brett_history()).unwrap();
        let trained_at = original.trained_at;
        let store = ModelStore::new(original);

        let interval = Duration::from_secs(60);
        let handle = spawn_retrain_loop(
            store.clone(),
            "/definitely/not/here.csv".to_string(),
            Duration::from_secs(5),
            interval,
        );

        for _ in 0..3 {
            tokio::time::sleep(interval + Duration::from_secs(1)).await;
        }

        assert!(!handle.is_finished());
        let current = store.current();
        assert_eq!(current.trained_at, trained_at);
        assert_eq!(current.trained_rows(), 20);
        handle.abort();
    }

    #[tokio::test]
    async fn header_only_sheet_fails_to_build() {
        let path = write_sheet("empty", &sheet(&[])).await;
        let err = build_bundle(path.to_str().unwrap(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("no usable match rows"));
        let _ = tokio::fs::remove_file(&path).await;
    }
}
