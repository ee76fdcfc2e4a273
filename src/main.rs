mod cli;
mod utils;

use std::time::Duration;
use tinyping::icmp::PACKET_SIZE;
use tinyping::{PingSession, dns};
use tokio::time::sleep;

#[tokio::main]
async fn main() {
    // Enable debug logging if RUST_LOG is set
    if std::env::var("RUST_LOG").is_ok() {
        env_logger::init();
    }

    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => utils::exit_with_error(&format!("invalid arguments: {}", e), 2),
    };

    let target = match dns::resolve_ipv4_async(&args.target).await {
        Ok(ip) => ip,
        Err(e) => utils::exit_with_error(&e.to_string(), 2),
    };

    let mut session = match PingSession::open(args.session_config()) {
        Ok(session) => session,
        Err(e) => utils::exit_with_error(&e.to_string(), 2),
    };

    println!("PING {} ({}): {} bytes", args.target, target, PACKET_SIZE);

    let mut shutdown_signal = utils::setup_signal_handler();
    let mut sent = 0u32;
    let mut received = 0u32;

    for i in 0..args.count {
        if shutdown_signal.try_recv().is_ok() {
            break;
        }

        let sequence = session.next_sequence();

        // The probe blocks on the socket; keep it off the async workers.
        let joined = tokio::task::spawn_blocking(move || {
            let outcome = session.probe(target);
            (session, outcome)
        })
        .await;
        let (returned, outcome) = match joined {
            Ok(result) => result,
            Err(e) => utils::exit_with_error(&format!("probe task failed: {}", e), 2),
        };
        session = returned;

        sent += 1;
        match outcome {
            Ok(rtt) => {
                received += 1;
                println!("reply from {}: seq={} time={}", target, sequence, utils::format_time(rtt));
            }
            Err(e) => println!("seq={}: {}", sequence, e),
        }

        if i + 1 < args.count && args.interval_secs > 0 {
            sleep(Duration::from_secs(args.interval_secs)).await;
        }
    }

    session.close();
    println!("--- {}: {} sent, {} received ---", args.target, sent, received);

    if received == 0 {
        std::process::exit(1);
    }
}
