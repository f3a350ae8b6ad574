use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use volunteer_match::admin::{check_tables, is_confirmation, reset_workbook};
use volunteer_match::config::Config;
use volunteer_match::notify::{DisabledNotifier, Notifier, SmtpNotifier};
use volunteer_match::oracle::GeminiOracle;
use volunteer_match::pipeline::{MatchRunner, RunOutcome};
use volunteer_match::store::{CsvWorkbook, Workbook};

/// Volunteer Match - assign volunteers to open tasks with an LLM
#[derive(Parser)]
#[command(name = "volunteer-match")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Workbook directory (overrides VOLUNTEER_MATCH_WORKBOOK)
    #[arg(long, global = true)]
    workbook: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match every pending volunteer to an open task
    Run,
    /// Delete all volunteers and assignments, reopen every task
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Check that all tables exist
    Check,
    /// Create any missing tables with their default header
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(dir) = cli.workbook {
        config.workbook_dir = dir;
    }
    let workbook = Arc::new(CsvWorkbook::new(config.workbook_dir.clone()));

    match cli.command {
        Commands::Run => run_matching(config, workbook).await,
        Commands::Reset { yes } => reset(workbook.as_ref(), yes).await,
        Commands::Check => check(workbook.as_ref()).await,
        Commands::Init => {
            workbook.init().await?;
            eprintln!("✅ Workbook ready at {}", workbook.dir().display());
            Ok(())
        }
    }
}

async fn run_matching(config: Config, workbook: Arc<CsvWorkbook>) -> Result<()> {
    // lettre's rustls transport needs a process-wide crypto provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    let oracle = Arc::new(GeminiOracle::new(config.oracle.clone())?);
    let notifier: Arc<dyn Notifier> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpNotifier::new(smtp)?),
        None => Arc::new(DisabledNotifier),
    };

    eprintln!("⚡ Volunteer Match v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Workbook: {}", workbook.dir().display());
    eprintln!("   Model: {}", oracle.model());
    eprintln!(
        "   Email: {}",
        config
            .smtp
            .as_ref()
            .map(|s| format!("{}:{}", s.host, s.port))
            .unwrap_or_else(|| "disabled".to_string())
    );
    eprintln!("   Delay: {}s\n", config.run.delay.as_secs());

    let runner = MatchRunner::new(workbook, oracle, notifier, config.run);
    let report = runner
        .run()
        .await
        .context("Matching run stopped; run `volunteer-match check` to inspect the workbook")?;

    match report.outcome {
        RunOutcome::NoOpenTasks => eprintln!("⚠️  No tasks available (all full or table empty)"),
        RunOutcome::TasksExhausted => {
            eprintln!("⚠️  All tasks filled up; remaining volunteers wait for the next run")
        }
        RunOutcome::Completed => {}
    }
    eprintln!(
        "✅ Assigned {}, unmatched {}, skipped {} ({:.1}s)",
        report.assigned,
        report.unmatched,
        report.skipped_incomplete + report.skipped_processed,
        report.elapsed.as_secs_f64()
    );
    if !report.filled_tasks.is_empty() {
        eprintln!("   Filled: {}", report.filled_tasks.join(", "));
    }
    Ok(())
}

async fn reset(workbook: &dyn Workbook, yes: bool) -> Result<()> {
    if !yes {
        eprint!("⚠️  This will DELETE all volunteer and assignment rows. Type 'yes' to continue: ");
        let mut answer = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut answer)
            .await
            .context("Failed to read confirmation")?;
        if !is_confirmation(&answer) {
            eprintln!("Reset cancelled.");
            return Ok(());
        }
    }

    let summary = reset_workbook(workbook).await?;
    eprintln!(
        "✅ Reset complete: removed {} volunteers and {} assignments, reopened {} tasks",
        summary.volunteers_removed, summary.log_entries_removed, summary.tasks_reset
    );
    Ok(())
}

async fn check(workbook: &dyn Workbook) -> Result<()> {
    let checks = check_tables(workbook).await?;
    for check in &checks {
        match check.rows {
            Some(rows) => eprintln!("   ✅ {} ({} rows)", check.table, rows),
            None => eprintln!("   ❌ {} missing", check.table),
        }
    }
    if checks.iter().all(|c| c.present()) {
        eprintln!("✅ Tables found! Ready to run.");
        Ok(())
    } else {
        anyhow::bail!("one or more tables are missing (run `volunteer-match init` to create them)")
    }
}
