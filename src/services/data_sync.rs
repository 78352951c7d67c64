use crate::error::{Error, Result};
use crate::models::{
    Instrument, InstrumentReport, InstrumentStatus, SyncConfig, SyncStats, SyncSummary,
};
use crate::services::events::EventSink;
use crate::services::history_store::HistoryStore;
use crate::services::mse_client::{discover_instruments, MseClient, PageSource};
use crate::services::page_walker::fetch_window;
use crate::services::sync_planner::plan;
use crate::utils::format_date;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// Fans instrument synchronization out over a bounded set of tasks
///
/// Each instrument runs in exactly one task, so its history file has a
/// single writer. Inside a task, windows run in ascending order and each
/// window is merged before the next one is fetched.
pub struct DataSync {
    config: Arc<SyncConfig>,
    source: Arc<dyn PageSource>,
    store: HistoryStore,
    events: EventSink,
    stop: Arc<AtomicBool>,
}

impl DataSync {
    /// Create orchestrator talking to the exchange website
    pub fn new(config: SyncConfig) -> Result<Self> {
        let client = MseClient::new(&config)?;
        Ok(Self::with_source(config, Arc::new(client)))
    }

    /// Create orchestrator over any page source
    pub fn with_source(config: SyncConfig, source: Arc<dyn PageSource>) -> Self {
        let store = HistoryStore::new(config.data_dir.clone());
        Self {
            config: Arc::new(config),
            source,
            store,
            events: EventSink::disabled(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Flag checked before each instrument starts; in-flight instruments finish
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Configured instruments, or the discovered list when none are configured
    pub async fn resolve_instruments(&self) -> Result<Vec<Instrument>> {
        match &self.config.instruments {
            Some(instruments) => Ok(instruments.clone()),
            None => discover_instruments(self.source.as_ref(), &self.config).await,
        }
    }

    /// Discover instruments and synchronize all of them
    pub async fn sync_all(&self) -> Result<SyncSummary> {
        let instruments = self.resolve_instruments().await?;
        if instruments.is_empty() {
            return Err(Error::NotFound("no instruments to synchronize".to_string()));
        }
        Ok(self.run(instruments).await)
    }

    /// Synchronize the given instruments concurrently
    ///
    /// Never fails as a whole: every instrument ends up in the summary with
    /// its own status.
    pub async fn run(&self, instruments: Vec<Instrument>) -> SyncSummary {
        let start_time = Instant::now();
        let total = instruments.len();

        info!(
            instruments = total,
            workers = self.config.workers,
            end_date = %format_date(self.config.end_date),
            "Starting sync"
        );
        self.events
            .info(None, format!("Syncing {} instruments with {} workers", total, self.config.workers));

        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let mut tasks = Vec::with_capacity(total);

        for instrument in instruments {
            let semaphore = semaphore.clone();
            let config = self.config.clone();
            let source = self.source.clone();
            let store = self.store.clone();
            let events = self.events.clone();
            let stop = self.stop.clone();
            let task_instrument = instrument.clone();

            let task = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return None,
                };
                if stop.load(Ordering::SeqCst) {
                    return None;
                }
                Some(sync_instrument(source.as_ref(), &store, &config, &events, task_instrument).await)
            });

            tasks.push((instrument, task));
        }

        let (instruments, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
        let results = futures::future::join_all(handles).await;

        let mut summary = SyncSummary::default();
        let mut stats = SyncStats::new();

        for (instrument, result) in instruments.into_iter().zip(results) {
            let report = match result {
                Ok(Some(report)) => report,
                Ok(None) => {
                    stats.skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!(instrument = %instrument, error = %e, "Sync task panicked");
                    let mut report = InstrumentReport::new(instrument);
                    report.status = InstrumentStatus::Failed(format!("task failed: {}", e));
                    report
                }
            };
            stats.record(&report);
            summary.reports.push(report);
        }

        stats.elapsed = start_time.elapsed();
        summary.reports.sort_by(|a, b| a.instrument.cmp(&b.instrument));

        info!(
            updated = stats.updated,
            up_to_date = stats.up_to_date,
            incomplete = stats.incomplete,
            failed = stats.failed,
            skipped = stats.skipped,
            new_records = stats.total_new_records,
            duration_s = stats.elapsed.as_secs_f64(),
            "Sync complete"
        );
        self.events.info(
            None,
            format!(
                "Sync complete: {} updated, {} up to date, {} incomplete, {} failed, {} skipped",
                stats.updated, stats.up_to_date, stats.incomplete, stats.failed, stats.skipped
            ),
        );

        summary.stats = stats;
        summary
    }
}

/// Plan, walk and merge one instrument, window by window
async fn sync_instrument(
    source: &dyn PageSource,
    store: &HistoryStore,
    config: &SyncConfig,
    events: &EventSink,
    instrument: Instrument,
) -> InstrumentReport {
    let start_time = Instant::now();
    let mut report = InstrumentReport::new(instrument.clone());

    let fail = |mut report: InstrumentReport, reason: String| {
        error!(instrument = %instrument, error = %reason, "Instrument sync failed");
        events.error(Some(&instrument), reason.clone());
        report.status = InstrumentStatus::Failed(reason);
        report.elapsed = start_time.elapsed();
        report
    };

    let existing = match store.read_series(&instrument) {
        Ok(series) => series,
        Err(e) => return fail(report, e.to_string()),
    };
    report.total_records = existing.len();
    let last_persisted = existing.iter().map(|r| r.date).max();
    drop(existing);

    let windows = plan(&instrument, last_persisted, config);
    if windows.is_empty() {
        info!(instrument = %instrument, "Already up to date");
        events.info(Some(&instrument), "already up to date");
        report.elapsed = start_time.elapsed();
        return report;
    }

    for window in &windows {
        report.windows += 1;

        let outcome = match fetch_window(
            source,
            &config.base_url,
            window,
            config.number_locale,
            config.max_pages,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                // Malformed row or unreadable page: nothing from this window
                // is kept and later windows are not attempted
                let reason = format!("{} window: {}", window.year(), e);
                return fail(report, reason);
            }
        };
        report.pages += outcome.pages;

        if !outcome.is_complete() {
            // A partial window holds the newest rows only; persisting them
            // would move the last date past rows never fetched
            report.lost_windows += 1;
            warn!(
                instrument = %instrument,
                year = window.year(),
                stop = ?outcome.stop,
                discarded = outcome.records.len(),
                "Window discarded, walk did not reach the last page"
            );
            events.warn(
                Some(&instrument),
                format!("{}: window discarded ({:?})", window.year(), outcome.stop),
            );
            continue;
        }

        if outcome.records.is_empty() {
            continue;
        }

        match store.merge(&instrument, &outcome.records) {
            Ok(merged) => {
                report.new_records += merged.appended;
                report.total_records = merged.total;
            }
            Err(e) => return fail(report, e.to_string()),
        }
    }

    report.status = if report.lost_windows > 0 {
        InstrumentStatus::Incomplete
    } else if report.new_records > 0 {
        InstrumentStatus::Updated
    } else {
        InstrumentStatus::UpToDate
    };
    report.elapsed = start_time.elapsed();

    info!(
        instrument = %instrument,
        windows = report.windows,
        pages = report.pages,
        new_records = report.new_records,
        total = report.total_records,
        lost_windows = report.lost_windows,
        "Instrument synced"
    );
    if report.lost_windows > 0 {
        events.warn(
            Some(&instrument),
            format!(
                "incomplete: {} of {} windows lost, {} new records, {} total",
                report.lost_windows, report.windows, report.new_records, report.total_records
            ),
        );
    } else {
        events.info(
            Some(&instrument),
            format!("{} new records, {} total", report.new_records, report.total_records),
        );
    }

    report
}
