// Copyright 2026 The Sqlwiz Project
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sqlwiz::client::{QueryClient, Session};
use sqlwiz::config_path;
use sqlwiz::render::{Outcome, ViewObserver, ViewUpdate};
use sqlwiz::upload::UploadClient;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqlwiz", about = "Ask a database questions in plain language")]
struct Cli {
    /// Path to sqlwiz.yaml (defaults to $SQLWIZ_CONFIG, then ~/.sqlwiz/sqlwiz.yaml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate and run SQL for a question, streaming the answer
    Query {
        /// The question, in natural language
        question: String,
    },
    /// Add a schema or reference document (.pdf, .txt, .docx) to the index
    Upload {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = match config_path::load_resolved(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Query { question } => run_query(QueryClient::from_config(&config), &question).await,
        Command::Upload { file } => match UploadClient::from_config(&config).upload(&file).await {
            Ok(chunks) => {
                println!("{}: {chunks} chunks added", file.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        },
    }
}

async fn run_query(client: QueryClient, question: &str) -> ExitCode {
    let session = Arc::new(Session::new(Arc::new(client)));

    let interrupt = {
        let session = session.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                session.cancel();
            }
        })
    };

    let mut view = TerminalView::default();
    let outcome = session.submit(question, &mut view).await;
    interrupt.abort();

    if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

// ---------------------------------------------------------------------------
// Terminal presentation
// ---------------------------------------------------------------------------

/// Prints the SQL once it is final and streams result text as it arrives.
/// A terminal cannot take back printed text, so suppression is reported
/// rather than undone.
#[derive(Default)]
struct TerminalView {
    printed_result: usize,
}

impl ViewObserver for TerminalView {
    fn on_update(&mut self, update: &ViewUpdate) {
        let mut out = std::io::stdout().lock();
        match update {
            ViewUpdate::SqlFinalized(sql) => {
                let _ = writeln!(out, "{sql}\n");
            }
            ViewUpdate::Result(text) => {
                if let Some(delta) = text.get(self.printed_result..) {
                    let _ = write!(out, "{delta}");
                    self.printed_result = text.len();
                }
            }
            ViewUpdate::ResultSuppressed if self.printed_result > 0 => {
                let _ = writeln!(out);
                eprintln!("(the result above is incomplete and should be disregarded)");
            }
            ViewUpdate::Finished(outcome) => match outcome {
                Outcome::Rows { .. } => {
                    let _ = writeln!(out);
                }
                Outcome::EmptyResult { .. } => {
                    let _ = writeln!(out, "(query returned no rows)");
                }
                Outcome::Failed { error, .. } => eprintln!("error: {error}"),
            },
            // Partial SQL and error text are only shown in their final form.
            _ => {}
        }
        let _ = out.flush();
    }
}
