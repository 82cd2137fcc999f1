// Copyright 2025 Vivian Voss. Licensed under the Apache Licence, Version 2.0.
// SPDX-Licence-Identifier: Apache-2.0

use hkv::{Server, ServerConfig};

/// Takes at most one `host:port` argument; argv parsing beyond that is an
/// external collaborator's job, not this crate's.
fn config_from_args(args: &[String]) -> ServerConfig {
    match args.first() {
        Some(addr) => match addr.parse() {
            Ok(addr) => ServerConfig { addr },
            Err(e) => {
                eprintln!("Error: invalid address '{addr}': {e}");
                std::process::exit(1);
            }
        },
        None => ServerConfig::default(),
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = config_from_args(&args);
    let server = Server::new();

    if let Err(e) = server.run(config).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
