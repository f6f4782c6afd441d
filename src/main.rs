// memsentry - entry point

use nix::sys::mman::{mlockall, MlockAllFlags};
use memsentry::config::{Args, Config};
use memsentry::daemon;
use std::process;

/// Setup logging based on configuration
fn setup_logging(debug: bool) {
    let log_level = if debug { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();
}

fn main() {
    let args = Args::parse_args();

    setup_logging(args.debug);

    // Lock current and future pages so the monitor itself is not swapped
    // out under the very pressure it polices.
    match mlockall(MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE) {
        Ok(()) => log::info!("memory locked, daemon will not be swapped"),
        Err(e) => {
            log::warn!("failed to lock memory: {e}; daemon may be slow under memory pressure");
        }
    }

    let config = match Config::from_args(args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("configuration error: {e}");
            eprintln!("use --help for usage information");
            process::exit(1);
        }
    };

    if let Err(e) = daemon::run(config) {
        eprintln!("fatal error: {e:#}");
        process::exit(1);
    }
}
