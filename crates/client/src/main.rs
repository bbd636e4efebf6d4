// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use clap::Parser;
use parley::logging::setup_logging;
use parley::Cli;

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.log_file.as_deref());
    if let Err(e) = parley::run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
