//! shpipe: run word templates and pipelines described as JSON.
//!
//! Reads one request from stdin, writes one JSON response to stdout.
//! Exits 1 when the request fails.
//!
//! Flags:
//!   --dump-config   Print the effective configuration as TOML and exit.

use std::io::Read;

use shpipe::config::Config;
use shpipe::filter::OperationRegistry;
use shpipe::logging;
use shpipe::request::{Response, respond};

fn main() {
    let config = Config::load();

    if std::env::args().skip(1).any(|a| a == "--dump-config") {
        match config.to_toml() {
            Ok(text) => print!("{text}"),
            Err(e) => {
                eprintln!("shpipe: cannot render config: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    logging::init(&config.logging);

    let mut input = String::new();
    if std::io::stdin().read_to_string(&mut input).is_err() {
        eprintln!("failed to read stdin");
        std::process::exit(1);
    }
    log::info!("request: {}", logging::excerpt(&input));

    let registry = OperationRegistry::from_config(&config);
    let response = respond(&input, &registry);

    if response != Response::Streamed {
        match serde_json::to_string(&response) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("shpipe: cannot render response: {e}");
                std::process::exit(1);
            }
        }
    }
    if response.is_error() {
        std::process::exit(1);
    }
}
