use std::process::ExitCode;

use clap::{CommandFactory, FromArgMatches};
use log::debug;

use pngmeta::cli::Cli;
use pngmeta::cli::Options;
use pngmeta::config::Config;
use pngmeta::process;

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .init();
}

fn main() -> ExitCode {
    // Parse the cli, the raw matches are kept for the --key/--text ordering check
    let matches = Cli::command().get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    init_logger(cli.verbose);

    let config = match cli.config.as_deref() {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("pngmeta: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    debug!("config: {:?}", config);

    let options = match Options::new(cli, &matches, &config) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("pngmeta: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    match process::run(&options, &mut stdout.lock(), &mut stderr.lock()) {
        Ok(report) if report.failed == 0 => ExitCode::SUCCESS,
        Ok(report) => {
            eprintln!("pngmeta: {} of {} files failed", report.failed, options.files.len());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("pngmeta: {}", e);
            ExitCode::FAILURE
        }
    }
}
