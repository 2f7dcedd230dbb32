//! profview binary entry point.

use std::process::exit;

use profview::api::{serve, AppState};
use profview::cli::{parse_args, print_help, print_version};
use profview::config::Config;
use profview::{logging, RawArtifactLoader};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Run with --help for usage.");
            exit(2);
        }
    };

    if args.help {
        print_help();
        return;
    }
    if args.version {
        print_version();
        return;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(1);
        }
    };

    logging::init(config.log_filter());

    let server_config = match config.to_server_config() {
        Ok(server_config) => server_config,
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    };

    info!("profview v{}", env!("CARGO_PKG_VERSION"));
    info!(
        profiles = %config.profiles.base_dir.display(),
        ttl_secs = config.sessions.ttl_secs,
        "configuration loaded"
    );

    let state = AppState::new(config.to_resolver(), RawArtifactLoader)
        .with_session_ttl(config.session_ttl());

    if let Err(e) = serve(server_config, state).await {
        error!("server error: {}", e);
        exit(1);
    }
}
