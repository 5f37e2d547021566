//! meetnotes CLI: turn meeting notes, pages, PDFs and recordings into a
//! fixed four-section summary.

mod commands;
mod progress;
mod voice;

use std::process::ExitCode;

use color_eyre::eyre::Result;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let invocation = commands::parse();
    commands::init_tracing(&invocation.cli);
    commands::run(invocation).await
}
