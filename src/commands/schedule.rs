use crate::error::Error;
use crate::models::SyncConfig;
use crate::worker::{run_daily_worker, StopHandle};
use std::time::Duration;

pub fn run(config: SyncConfig, every_hours: u64, once: bool) {
    let every = match schedule_interval(every_hours) {
        Ok(every) => every,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    if once {
        println!("🔁 Running one scheduled sync + analysis pass");
    } else {
        println!("🔁 Sync + analysis every {}h (Ctrl-C to stop)", every_hours);
    }

    match run_schedule(config, every, once) {
        Ok(iterations) => println!("\n✅ Scheduler stopped after {} runs", iterations),
        Err(e) => {
            eprintln!("\n❌ Scheduler failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn schedule_interval(every_hours: u64) -> Result<Duration, Error> {
    if every_hours == 0 {
        return Err(Error::Config("--every-hours must be at least 1".to_string()));
    }
    every_hours
        .checked_mul(3600)
        .map(Duration::from_secs)
        .ok_or_else(|| Error::Config(format!("--every-hours {} is too large", every_hours)))
}

fn run_schedule(config: SyncConfig, every: Duration, once: bool) -> Result<u64, Error> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create runtime: {}", e)))?;

    runtime.block_on(async {
        let stop = StopHandle::new();
        stop.listen_for_ctrl_c();
        run_daily_worker(config, every, once, stop).await
    })
}
