//! vetsweep CLI: runs the sweep worker and operator one-offs.

use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use uuid::Uuid;
use vetsweep::codec::ExportRecord;
use vetsweep::config::secrets::ExposeSecret;
use vetsweep::config::{Config, SweepSettings};
use vetsweep::db::Db;
use vetsweep::engine::{NoShowSweep, RecurrenceSweep, ReminderSweep, Sweep};
use vetsweep::queue::{JobQueue, TICK_QUEUE};
use vetsweep::scheduler;
use vetsweep::telemetry::{TelemetryConfig, TelemetryGuard, init_telemetry};
use vetsweep::worker::{Worker, WorkerConfig};

#[derive(Parser)]
#[command(name = "vetsweep", about = "Reminder and due-date sweeps for the practice")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register the recurring jobs and run the worker
    Serve {
        /// Override the configured sweep concurrency
        #[arg(long)]
        max_concurrent: Option<usize>,
    },
    /// Recurring job schedules
    Jobs {
        #[command(subcommand)]
        action: JobsAction,
    },
    /// Run one sweep now and print its report
    Sweep {
        #[arg(value_enum)]
        kind: SweepKind,
    },
    /// Export records in the external vocabulary
    Export {
        #[command(subcommand)]
        action: ExportAction,
    },
}

#[derive(Subcommand)]
enum JobsAction {
    /// Register (or update) every recurring job
    Register,
    /// List registered schedules
    List,
}

#[derive(Subcommand)]
enum ExportAction {
    /// Print one ticket as an export record
    Ticket {
        /// Ticket ID
        id: Uuid,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SweepKind {
    Reminders,
    NoShows,
    Recurrences,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let settings = config.sweep_settings()?;
    let _guard = telemetry(&config)?;

    let db = Arc::new(Db::connect(config.database_url.expose_secret()).await?);
    db.migrate().await?;

    match cli.command {
        Command::Serve { max_concurrent } => cmd_serve(db, settings, max_concurrent).await,
        Command::Jobs { action } => match action {
            JobsAction::Register => {
                scheduler::register_all(db.as_ref()).await?;
                println!("Registered {} job(s).", scheduler::RECURRING_JOBS.len());
                Ok(())
            }
            JobsAction::List => cmd_jobs_list(&db).await,
        },
        Command::Sweep { kind } => {
            let sweep = build_sweep(&db, &settings, kind);
            let report = sweep.run().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Export {
            action: ExportAction::Ticket { id },
        } => {
            let ticket = db.get_ticket(id).await?;
            let record = ExportRecord::from_ticket(&ticket);
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
    }
}

fn telemetry(config: &Config) -> anyhow::Result<TelemetryGuard> {
    Ok(init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "vetsweep".to_string(),
        log_level: config.log_level.clone(),
    })?)
}

fn build_sweep(db: &Arc<Db>, settings: &SweepSettings, kind: SweepKind) -> Arc<dyn Sweep> {
    match kind {
        SweepKind::Reminders => Arc::new(ReminderSweep::new(
            db.clone(),
            db.clone(),
            settings.clone(),
        )),
        SweepKind::NoShows => Arc::new(NoShowSweep::new(db.clone(), settings.clone())),
        SweepKind::Recurrences => Arc::new(RecurrenceSweep::new(db.clone(), settings.clone())),
    }
}

async fn cmd_serve(
    db: Arc<Db>,
    settings: SweepSettings,
    max_concurrent: Option<usize>,
) -> anyhow::Result<()> {
    db.create_queue(TICK_QUEUE).await?;
    scheduler::register_all(db.as_ref()).await?;

    let sweeps = [SweepKind::Reminders, SweepKind::NoShows, SweepKind::Recurrences]
        .into_iter()
        .map(|kind| build_sweep(&db, &settings, kind))
        .collect();

    let mut worker_config = WorkerConfig::from(&settings);
    if let Some(n) = max_concurrent {
        anyhow::ensure!(n > 0, "--max-concurrent must be at least 1");
        worker_config.max_concurrent = n;
    }

    let worker = Worker::new(db, sweeps, worker_config);

    let w = worker.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        w.shutdown();
    });

    worker.run().await?;
    Ok(())
}

async fn cmd_jobs_list(db: &Db) -> anyhow::Result<()> {
    let schedules = db.schedules().await?;

    if schedules.is_empty() {
        println!("No jobs registered.");
        return Ok(());
    }

    println!(
        "{:<32}  {:<18}  {:>10}  {:<16}  LAST ENQUEUED",
        "STABLE ID", "NAME", "EVERY", "NEXT RUN"
    );
    println!("{}", "-".repeat(100));

    for schedule in &schedules {
        println!(
            "{:<32}  {:<18}  {:>9}s  {:<16}  {}",
            schedule.stable_id,
            schedule.name,
            schedule.interval_millis / 1_000,
            schedule.next_run_at.format("%Y-%m-%d %H:%M"),
            schedule
                .last_enqueued_at
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }

    println!("\n{} job(s)", schedules.len());
    Ok(())
}
