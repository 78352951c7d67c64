use crate::error::Result;
use crate::models::{SyncConfig, SyncSummary};
use crate::services::{analyze_all, DataSync, EventSink, MseClient, PageSource};
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

pub const DEFAULT_INTERVAL_HOURS: u64 = 24;

/// Result of one scheduled iteration
#[derive(Debug)]
pub struct IterationOutcome {
    pub summary: SyncSummary,
    pub analyzed: usize,
    pub analysis_failed: usize,
}

/// Stop signal shared between the worker loop and whoever cancels it
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn flag(&self) -> Arc<AtomicBool> {
        self.flag.clone()
    }

    /// Stop on Ctrl-C
    pub fn listen_for_ctrl_c(&self) {
        let handle = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl-C received, stopping after in-flight instruments finish");
                handle.stop();
            }
        });
    }

    async fn sleep_or_stop(&self, duration: Duration) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent stop() is not missed
        notified.as_mut().enable();
        if self.is_stopped() {
            return;
        }

        tokio::select! {
            _ = sleep(duration) => {}
            _ = notified => {}
        }
    }
}

/// One sync followed by the analysis pass
pub async fn run_iteration(
    config: &SyncConfig,
    source: Arc<dyn PageSource>,
    events: EventSink,
    stop: &StopHandle,
) -> Result<IterationOutcome> {
    let sync = DataSync::with_source(config.clone(), source)
        .with_events(events)
        .with_stop_flag(stop.flag());
    let summary = sync.sync_all().await?;

    let results = analyze_all(sync.store(), None, config.rsi_period)?;
    let analyzed = results.iter().filter(|(_, r)| r.is_ok()).count();

    Ok(IterationOutcome {
        summary,
        analyzed,
        analysis_failed: results.len() - analyzed,
    })
}

/// Scheduled sync loop against the exchange website
pub async fn run(config: SyncConfig, every: Duration, once: bool, stop: StopHandle) -> Result<u64> {
    let client: Arc<dyn PageSource> = Arc::new(MseClient::new(&config)?);
    Ok(run_with_source(config, client, every, once, stop).await)
}

/// Scheduled sync loop; returns the number of iterations run
#[instrument(skip_all, fields(every_secs = every.as_secs(), once))]
pub async fn run_with_source(
    config: SyncConfig,
    source: Arc<dyn PageSource>,
    every: Duration,
    once: bool,
    stop: StopHandle,
) -> u64 {
    info!("Starting scheduled sync worker");

    let mut iteration_count = 0u64;

    while !stop.is_stopped() {
        iteration_count += 1;
        let loop_start = std::time::Instant::now();

        // Each iteration syncs up to the current day
        let mut iteration_config = config.clone();
        iteration_config.end_date = Local::now().date_naive();

        info!(iteration = iteration_count, "Scheduled sync: starting");

        match run_iteration(&iteration_config, source.clone(), EventSink::disabled(), &stop).await {
            Ok(outcome) => {
                info!(
                    iteration = iteration_count,
                    updated = outcome.summary.stats.updated,
                    up_to_date = outcome.summary.stats.up_to_date,
                    incomplete = outcome.summary.stats.incomplete,
                    failed = outcome.summary.stats.failed,
                    new_records = outcome.summary.stats.total_new_records,
                    analyzed = outcome.analyzed,
                    analysis_failed = outcome.analysis_failed,
                    duration_secs = loop_start.elapsed().as_secs_f64(),
                    "Scheduled sync: completed"
                );
                for report in outcome.summary.failures() {
                    warn!(
                        iteration = iteration_count,
                        instrument = %report.instrument,
                        status = ?report.status,
                        "Scheduled sync: instrument failed"
                    );
                }
                for report in outcome.summary.incomplete() {
                    warn!(
                        iteration = iteration_count,
                        instrument = %report.instrument,
                        lost_windows = report.lost_windows,
                        "Scheduled sync: instrument incomplete"
                    );
                }
            }
            Err(e) => {
                error!(iteration = iteration_count, error = %e, "Scheduled sync: failed");
            }
        }

        if once || stop.is_stopped() {
            break;
        }

        info!(
            iteration = iteration_count,
            next_in_secs = every.as_secs(),
            "Scheduled sync: sleeping"
        );
        stop.sleep_or_stop(every).await;
    }

    info!(iterations = iteration_count, "Scheduled sync worker stopped");
    iteration_count
}
