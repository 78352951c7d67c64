use crate::error::Error;
use crate::models::{HistorySeries, Instrument, SyncConfig};
use crate::services::HistoryStore;
use crate::utils::{format_date, parse_override_date};

pub fn run(config: SyncConfig, issuer: String, from: String, to: String, json: bool) {
    let series = match filter(&config, &issuer, &from, &to) {
        Ok(series) => series,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    if json {
        match serde_json::to_string_pretty(&series) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("❌ Failed to serialize records: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    println!("🔹 {} ({} → {}): {} records\n", issuer.to_uppercase(), from, to, series.len());
    println!(
        "{:<12} {:>12} {:>12} {:>12} {:>12} {:>8} {:>10} {:>16}",
        "Date", "Last", "Max", "Min", "Avg", "%Chg", "Quantity", "Volume (MKD)"
    );
    for record in &series {
        let opt = |v: Option<f64>| v.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} {:>12.2} {:>12} {:>12} {:>12} {:>8} {:>10} {:>16.2}",
            format_date(record.date),
            record.last_price,
            opt(record.max_price),
            opt(record.min_price),
            opt(record.avg_price),
            opt(record.percent_change),
            record.quantity,
            record.market_volume
        );
    }
}

/// Records of one instrument with dates in `[from, to]`
pub fn filter(config: &SyncConfig, issuer: &str, from: &str, to: &str) -> Result<HistorySeries, Error> {
    let instrument = Instrument::parse(issuer)?;
    let from = parse_override_date("from", from)?;
    let to = parse_override_date("to", to)?;

    let store = HistoryStore::new(config.data_dir.clone());
    if !store.history_path(&instrument).exists() {
        return Err(Error::NotFound(format!("Instrument '{}' has no history", instrument)));
    }
    store.filter_range(&instrument, from, to)
}
