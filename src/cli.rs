use clap::{Arg, ArgAction, ArgMatches, Command};
use tinyping::{DEFAULT_TIMEOUT_SECS, DEFAULT_TTL, SessionConfig};

use crate::utils;

#[derive(Debug, Clone)]
pub struct PingArgs {
    pub target: String,
    pub count: u32,
    pub ttl: u32,
    pub timeout_secs: u64,
    pub interval_secs: u64,
    pub strict: bool,
}

impl Default for PingArgs {
    fn default() -> Self {
        Self {
            target: String::new(),
            count: 4,
            ttl: u32::from(DEFAULT_TTL),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            interval_secs: 1,
            strict: false,
        }
    }
}

impl PingArgs {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_ttl(u8::try_from(self.ttl).unwrap_or(DEFAULT_TTL))
            .with_timeout_secs(self.timeout_secs)
            .with_strict(self.strict)
    }
}

pub fn build_cli() -> Command {
    Command::new("tinyping")
        .version("0.1.0")
        .about("Send ICMP echo requests to an IPv4 host")
        .arg(
            Arg::new("target")
                .help("Target hostname or IPv4 address")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("count")
                .short('c')
                .help("Number of echo requests to send")
                .value_name("count")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("ttl")
                .short('t')
                .help("Time To Live")
                .value_name("TTL")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("timeout")
                .short('W')
                .help("Seconds to wait for each reply (0 waits forever)")
                .value_name("seconds")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("interval")
                .short('i')
                .help("Seconds between echo requests")
                .value_name("seconds")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("Ignore replies with a bad checksum or altered payload")
                .action(ArgAction::SetTrue),
        )
}

pub fn parse_args() -> anyhow::Result<PingArgs> {
    args_from_matches(&build_cli().get_matches())
}

pub fn args_from_matches(matches: &ArgMatches) -> anyhow::Result<PingArgs> {
    let mut args = PingArgs::default();

    args.target = matches
        .get_one::<String>("target")
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("missing target"))?;
    args.strict = matches.get_flag("strict");

    if let Some(count) = matches.get_one::<u32>("count") {
        args.count = *count;
    }

    if let Some(ttl) = matches.get_one::<u32>("ttl") {
        args.ttl = *ttl;
    }

    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        args.timeout_secs = *timeout;
    }

    if let Some(interval) = matches.get_one::<u64>("interval") {
        args.interval_secs = *interval;
    }

    utils::validate_ping_params(args.count, args.ttl)?;

    Ok(args)
}
