//! safedata CLI - privacy risk, protection and utility for tabular data

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::process::ExitCode;

fn main() -> ExitCode {
    safedata::cli::run()
}
