use std::process;
use std::time::Duration;

/// Print error message and exit with error code
pub fn exit_with_error(message: &str, code: i32) -> ! {
    eprintln!("tinyping: {}", message);
    process::exit(code);
}

/// Validate ping parameters
pub fn validate_ping_params(count: u32, ttl: u32) -> anyhow::Result<()> {
    if count == 0 {
        return Err(anyhow::anyhow!("count must be greater than 0"));
    }

    if ttl == 0 || ttl > 255 {
        return Err(anyhow::anyhow!("TTL must be in the range 1-255"));
    }

    Ok(())
}

/// Format a round trip in milliseconds, keeping microsecond resolution
pub fn format_time(rtt: Duration) -> String {
    format!("{:.3} ms", rtt.as_secs_f64() * 1000.0)
}

/// Handle Ctrl+C signal for graceful shutdown
pub fn setup_signal_handler() -> tokio::sync::oneshot::Receiver<()> {
    let (tx, rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(());
        }
    });

    rx
}
