// quill: a terminal UI for browsing and filing GitHub issues.

mod app;
mod cache;
mod error;
mod event;
mod github;
mod logging;
mod state;
mod ui;

use std::process;
use std::sync::Arc;

use clap::Parser;

use crate::app::App;
use crate::github::GitHubClient;

#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(about = "View and create GitHub issues from the terminal")]
#[command(version)]
struct Args {
    /// Repository to load on startup, as owner/name
    #[arg(short, long, value_name = "OWNER/NAME")]
    path: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Keep the guard alive so buffered log lines reach the file.
    let _log_guard = match logging::init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> error::Result<()> {
    let client = GitHubClient::from_env()?;

    let mut app = App::new(Arc::new(client), args.path);
    app.run().await
}
