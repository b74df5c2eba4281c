use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use taskquest_cli::app::App;
use taskquest_cli::components::task_board::short_id;
use taskquest_cli::config::Cli;
use taskquest_cli::session::SessionFile;
use taskquest_core::task::Task;
use taskquest_service::HttpService;

fn confirm_on_stdin(task: &Task) -> bool {
    eprint!("Delete \"{}\" ({})? [y/N] ", task.title, short_id(&task.id));
    let _ = std::io::stderr().flush();
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let service = Arc::new(HttpService::new(&cli.server));
    let session_file = SessionFile::in_dir(&cli.data_dir());
    let mut app = App::new(service, session_file, Box::new(confirm_on_stdin));

    let mut stdout = std::io::stdout().lock();
    app.run(cli.command, &mut stdout).await
}
