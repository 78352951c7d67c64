use crate::error::Error;
use crate::models::{Instrument, SyncConfig};
use crate::services::{analyze_all, HistoryStore};

pub fn run(config: SyncConfig, issuers: Vec<String>, period: Option<usize>) {
    let period = period.unwrap_or(config.rsi_period);
    if period == 0 {
        eprintln!("❌ RSI period must be at least 1");
        std::process::exit(1);
    }

    let instruments = match parse_instruments(&issuers) {
        Ok(instruments) => instruments,
        Err(e) => {
            eprintln!("❌ Invalid arguments: {}", e);
            std::process::exit(1);
        }
    };

    let store = HistoryStore::new(config.data_dir.clone());
    println!("📐 Computing RSI_{} signals from {}", period, store.base_dir().display());

    let results = match analyze_all(&store, instruments.as_deref(), period) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("❌ Analysis failed: {}", e);
            std::process::exit(1);
        }
    };

    if results.is_empty() {
        println!("⚠️  No history found. Run 'pull' first.");
        return;
    }

    let mut failed = 0;
    for (instrument, result) in &results {
        match result {
            Ok(report) => {
                let signal = report
                    .last_signal
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("   {:<8} {:>6} records  latest: {}", instrument, report.records, signal);
            }
            Err(e) => {
                failed += 1;
                eprintln!("   ❌ {}: {}", instrument, e);
            }
        }
    }

    println!("\n✅ Analyzed {} instruments", results.len() - failed);
    if failed > 0 {
        std::process::exit(1);
    }
}

fn parse_instruments(issuers: &[String]) -> Result<Option<Vec<Instrument>>, Error> {
    if issuers.is_empty() {
        return Ok(None);
    }
    issuers
        .iter()
        .map(|code| Instrument::parse(code))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}
