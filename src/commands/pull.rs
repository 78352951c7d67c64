use crate::error::Error;
use crate::models::{InstrumentStatus, SyncConfig, SyncSummary};
use crate::services::{DataSync, EventLevel, EventSink};
use crate::worker::StopHandle;

pub fn run(
    config: SyncConfig,
    issuers: Vec<String>,
    from: Option<String>,
    to: Option<String>,
    workers: Option<usize>,
) {
    // Overrides are validated before anything touches the network
    let config = match prepare_config(config, &issuers, from.as_deref(), to.as_deref(), workers) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Invalid arguments: {}", e);
            std::process::exit(1);
        }
    };

    match &config.instruments {
        Some(instruments) => println!("🎯 Instruments: {}", join_codes(instruments)),
        None => println!("🔎 Discovering instruments from {}", config.base_url),
    }
    println!(
        "📅 Up to {}, {} workers, data dir {}",
        crate::utils::format_date(config.end_date),
        config.workers,
        config.data_dir.display()
    );
    if let Some(start) = config.start_override {
        println!("⏪ Backfill from {}", crate::utils::format_date(start));
    }

    match run_sync(config) {
        Ok(summary) => {
            print_summary(&summary);
            if summary.stats.has_problems() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("\n❌ Data sync failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn prepare_config(
    config: SyncConfig,
    issuers: &[String],
    from: Option<&str>,
    to: Option<&str>,
    workers: Option<usize>,
) -> Result<SyncConfig, Error> {
    let mut config = config.with_overrides(issuers, from, to)?;
    if let Some(workers) = workers {
        config.workers = workers;
    }
    config.validate()?;
    Ok(config)
}

fn run_sync(config: SyncConfig) -> Result<SyncSummary, Error> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create runtime: {}", e)))?;

    let (events, receiver) = EventSink::channel();
    let printer = std::thread::spawn(move || {
        for event in receiver {
            match event.level {
                EventLevel::Info => println!("   {}", event),
                EventLevel::Warn => println!("⚠️  {}", event),
                EventLevel::Error => eprintln!("❌ {}", event),
            }
        }
    });

    let result = runtime.block_on(async {
        let stop = StopHandle::new();
        stop.listen_for_ctrl_c();

        let sync = DataSync::new(config)?
            .with_events(events)
            .with_stop_flag(stop.flag());
        sync.sync_all().await
    });

    // All senders are gone once the sync is dropped
    let _ = printer.join();
    result
}

fn print_summary(summary: &SyncSummary) {
    let stats = &summary.stats;
    println!("\n{}", "=".repeat(60));
    println!("🎉 SYNC COMPLETE");
    println!("{}", "=".repeat(60));
    println!(
        "📊 Results: ✅{} updated, ⏭️ {} up to date, ⚠️ {} incomplete, ❌{} failed, 🛑{} skipped",
        stats.updated, stats.up_to_date, stats.incomplete, stats.failed, stats.skipped
    );
    println!("📈 New records: {}", stats.total_new_records);
    println!("⏱️  Took {:.1}s", stats.elapsed.as_secs_f64());

    for report in summary.incomplete() {
        println!(
            "   ⚠️  {}: {} of {} windows lost",
            report.instrument, report.lost_windows, report.windows
        );
    }
    if stats.incomplete > 0 {
        println!("   Re-run, or use --issuer with --from to backfill the lost windows");
    }

    for report in summary.failures() {
        if let InstrumentStatus::Failed(reason) = &report.status {
            println!("   ❌ {}: {}", report.instrument, reason);
        }
    }
}

fn join_codes(instruments: &[crate::models::Instrument]) -> String {
    instruments
        .iter()
        .map(|i| i.code())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn config() -> SyncConfig {
        SyncConfig {
            end_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            ..SyncConfig::default()
        }
    }

    #[test]
    fn test_prepare_config_applies_workers() {
        let config = prepare_config(config(), &[], None, None, Some(4)).unwrap();
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn test_prepare_config_rejects_zero_workers() {
        assert!(matches!(
            prepare_config(config(), &[], None, None, Some(0)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_prepare_config_rejects_bad_dates() {
        assert!(matches!(
            prepare_config(config(), &["ABC".to_string()], Some("32.01.2024"), None, None),
            Err(Error::Planning(_))
        ));
    }
}
