//! A tool to summarize recent merge and commit activity across repositories.

use repo_pulse::{Host, run};
use std::io::Write;
use std::io::{stderr, stdout};

/// Default host that runs against the real process environment.
#[derive(Debug, Clone, Default)]
pub struct RealHost;

impl Host for RealHost {
    fn output(&mut self) -> impl Write {
        stdout()
    }

    fn error(&mut self) -> impl Write {
        stderr()
    }
}

#[tokio::main]
async fn main() -> Result<(), ohno::AppError> {
    run(&mut RealHost, std::env::args()).await
}
