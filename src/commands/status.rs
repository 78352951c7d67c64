use crate::models::SyncConfig;
use crate::services::{self, HistoryStore};
use crate::utils::format_date;

pub fn run(config: SyncConfig) {
    println!("📊 Market History Status\n");

    match show_status(&config) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn show_status(config: &SyncConfig) -> crate::error::Result<()> {
    let store = HistoryStore::new(config.data_dir.clone());
    let (stats, infos) = services::get_market_stats(&store, config.rsi_period)?;

    if !stats.has_data {
        println!("⚠️  No history found in {}. Run 'pull' first.", store.base_dir().display());
        return Ok(());
    }

    println!(
        "📈 Instruments: {}   Records: {}\n",
        stats.total_instruments,
        format_number(stats.total_records)
    );
    println!("═══════════════════════════════════════════════════════════\n");

    for (instrument, info) in infos {
        match info {
            Ok(info) => {
                let range = match (info.first_date, info.last_date) {
                    (Some(first), Some(last)) => format!("{} → {}", format_date(first), format_date(last)),
                    _ => "empty".to_string(),
                };
                let latest = info
                    .last_price
                    .map(|p| format!("{:.2} MKD", p))
                    .unwrap_or_else(|| "-".to_string());
                let signal = info
                    .last_signal
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "🔹 {:<8} {:>8} records  ({})  latest: {}  signal: {}",
                    instrument,
                    format_number(info.record_count),
                    range,
                    latest,
                    signal
                );
            }
            Err(e) => eprintln!("⚠️  Could not read {}: {}", instrument, e),
        }
    }

    println!("\n═══════════════════════════════════════════════════════════\n");
    println!("💡 Tip: one <CODE>.csv per instrument in {}", store.base_dir().display());

    Ok(())
}

fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }
    result
}
