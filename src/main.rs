use std::process;

use clap::{CommandFactory, Parser};
use log::LevelFilter;

use check_influxdb::check;
use check_influxdb::config::{Cli, Config};
use check_influxdb::config_generator::print_icinga_command_config_if_env_and_exit;
use check_influxdb::executor::HttpExecutor;
use check_influxdb::{Runner, ServiceState};

/// Label used when the command line is unusable and no identifier can be built.
const FALLBACK_NAME: &str = "CHECK_INFLUXDB";

fn exit_unknown(message: &str) -> ! {
    println!("{} {}: {}", FALLBACK_NAME, ServiceState::Unknown, message);
    process::exit(ServiceState::Unknown.exit_code());
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() {
    if let Err(e) = print_icinga_command_config_if_env_and_exit("influxdb", &Cli::command()) {
        exit_unknown(&e.to_string());
    }

    // monitoring-plugins guidelines use UNKNOWN for --help and --version as well
    let cli = Cli::try_parse().unwrap_or_else(|e| match e.kind() {
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
            print!("{}", e);
            process::exit(ServiceState::Unknown.exit_code());
        }
        _ => {
            // keep the error itself, drop the usage hints
            let rendered = e.to_string();
            let message = rendered
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .take_while(|line| !line.starts_with("Usage:"))
                .collect::<Vec<_>>()
                .join(" ");
            exit_unknown(&message)
        }
    });

    init_logger(cli.verbose);

    let config = match Config::try_from(cli) {
        Ok(config) => config,
        Err(e) => exit_unknown(&e.to_string()),
    };
    log::debug!("{:?}", config.query);

    let executor = HttpExecutor::new(config.endpoint.clone());

    Runner::new(&config.identifier())
        .safe_run(|| check::run(&config, &executor))
        .print_and_exit()
}
