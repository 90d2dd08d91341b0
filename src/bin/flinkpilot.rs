//! flinkpilot - Flink SQL job submitter and monitor
//!
//! Usage:
//!   flinkpilot submit --monitor
//!   flinkpilot health --wait 300
//!   flinkpilot jobs
//!   flinkpilot cancel <job-id>
//!   flinkpilot validate flink/sql/streaming_job.sql

use clap::{Parser, Subcommand};
use flinkpilot::flinkpilot::logging::init_logging;
use flinkpilot::{
    ClusterApi, ClusterHealthProbe, JobControl, JobMonitor, JobSubmissionOrchestrator,
    MonitorStopReason, PilotConfig, RestClusterClient, ShutdownCoordinator, StatementParser,
    TokioClock,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "flinkpilot")]
#[command(about = "Submit Flink SQL jobs through the SQL gateway and monitor them")]
#[command(version)]
struct Cli {
    /// JobManager host (overrides FLINK_JOBMANAGER_HOST)
    #[arg(long, global = true)]
    host: Option<String>,

    /// JobManager REST port (overrides FLINK_JOBMANAGER_PORT)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Directory holding create_tables.sql and streaming_job.sql
    #[arg(long, global = true)]
    sql_dir: Option<PathBuf>,

    /// YAML configuration file with a `flink:` section
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a SQL script and print its statements without submitting
    Validate { sql_file: PathBuf },
    #[command(flatten)]
    Cluster(ClusterCommand),
}

/// Commands that talk to the JobManager
#[derive(Subcommand)]
enum ClusterCommand {
    /// Submit all job scripts, optionally monitoring the jobs afterwards
    Submit {
        /// Keep monitoring the submitted jobs until idle or interrupted
        #[arg(long)]
        monitor: bool,
    },
    /// Monitor running jobs until idle or interrupted
    Monitor,
    /// Show cluster resources
    Health {
        /// Wait for the cluster to become ready (default budget: 300 seconds)
        #[arg(long, value_name = "SECS", num_args = 0..=1)]
        wait: Option<Option<u64>>,
    },
    /// Log cluster status periodically until interrupted
    Watch {
        /// Seconds between status checks
        #[arg(long, default_value = "30")]
        interval: u64,
    },
    /// List jobs known to the JobManager
    Jobs,
    /// Show details of one job
    Job { job_id: String },
    /// Cancel a job
    Cancel { job_id: String },
    /// Cancel a job (the original statement is not resubmitted)
    Restart { job_id: String },
    /// Show metrics of one job
    Metrics { job_id: String },
    /// List TaskManagers
    Taskmanagers,
}

fn build_config(cli: &Cli) -> Result<PilotConfig, Box<dyn std::error::Error>> {
    let mut config = PilotConfig::load(cli.config.as_deref())?;
    if let Some(host) = &cli.host {
        config = config.with_host(host.clone());
    }
    if let Some(port) = cli.port {
        config = config.with_port(port);
    }
    if let Some(dir) = &cli.sql_dir {
        config = config.with_sql_dir(dir.clone());
    }
    config.validate()?;
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => log::error!("Failed to render output: {}", e),
    }
}

async fn run_monitor(api: Arc<dyn ClusterApi>, config: &PilotConfig) {
    let coordinator = ShutdownCoordinator::new();
    let mut listener = coordinator.subscribe();
    let signals = coordinator.clone();
    let signal_task = tokio::spawn(async move { signals.wait_for_signal().await });

    let mut monitor = JobMonitor::new(api, Arc::new(TokioClock), config);
    let report = monitor.run(&mut listener).await;
    signal_task.abort();

    match report.stop_reason {
        MonitorStopReason::Idle => log::info!(
            "Monitor stopped after {} idle cycles ({} completed, {} failed)",
            config.monitor_max_idle_checks,
            report.completed.len(),
            report.failed.len()
        ),
        MonitorStopReason::Interrupted => log::info!(
            "Monitor interrupted after {} cycles",
            report.cycles
        ),
    }
}

fn validate(sql_file: &Path) -> ExitCode {
    match StatementParser::new().parse_file(sql_file) {
        Ok(statements) => {
            for statement in &statements {
                println!("[{}] {}: {}", statement.index + 1, statement.kind(), statement.text);
            }
            println!("{} statements", statements.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_cluster_command(cli: &Cli, command: &ClusterCommand) -> ExitCode {
    let config = match build_config(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let api: Arc<dyn ClusterApi> = match RestClusterClient::new(&config) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let clock = Arc::new(TokioClock);
    log::info!("flinkpilot initialized - JobManager: {}", config.base_url());

    match command {
        ClusterCommand::Submit { monitor } => {
            let orchestrator =
                JobSubmissionOrchestrator::new(Arc::clone(&api), clock, config.clone());
            let report = orchestrator.run().await;
            if !report.is_success() {
                eprintln!("Failed to submit jobs");
                return ExitCode::FAILURE;
            }
            println!("Jobs submitted successfully!");
            if *monitor {
                run_monitor(api, &config).await;
            }
        }
        ClusterCommand::Monitor => run_monitor(api, &config).await,
        ClusterCommand::Health { wait } => {
            let probe = ClusterHealthProbe::new(api, clock, &config);
            if let Some(secs) = wait {
                let max_wait = secs
                    .map(Duration::from_secs)
                    .unwrap_or(config.cluster_ready_max_wait);
                if !probe.wait_until_ready(max_wait).await {
                    return ExitCode::FAILURE;
                }
            }
            match probe.snapshot().await {
                Some(snapshot) => {
                    print_json(&snapshot);
                    if !snapshot.is_healthy() {
                        return ExitCode::FAILURE;
                    }
                }
                None => return ExitCode::FAILURE,
            }
        }
        ClusterCommand::Watch { interval } => {
            let coordinator = ShutdownCoordinator::new();
            let mut listener = coordinator.subscribe();
            let signals = coordinator.clone();
            tokio::spawn(async move { signals.wait_for_signal().await });
            let probe = ClusterHealthProbe::new(api, clock, &config);
            probe
                .watch(Duration::from_secs(*interval), &mut listener)
                .await;
        }
        ClusterCommand::Jobs => match api.list_jobs().await {
            Ok(jobs) => print_json(&jobs),
            Err(e) => {
                eprintln!("Error listing jobs: {}", e);
                return ExitCode::FAILURE;
            }
        },
        ClusterCommand::Job { job_id } => {
            let control = JobControl::new(api, clock, &config);
            match control.job_details(job_id).await {
                Some(info) => print_json(&info),
                None => return ExitCode::FAILURE,
            }
        }
        ClusterCommand::Cancel { job_id } => {
            let control = JobControl::new(api, clock, &config);
            if !control.cancel_job(job_id).await {
                return ExitCode::FAILURE;
            }
        }
        ClusterCommand::Restart { job_id } => {
            let control = JobControl::new(api, clock, &config);
            if !control.restart_job(job_id).await {
                return ExitCode::FAILURE;
            }
        }
        ClusterCommand::Metrics { job_id } => {
            let control = JobControl::new(api, clock, &config);
            match control.job_metrics(job_id).await {
                Some(metrics) => print_json(&metrics),
                None => return ExitCode::FAILURE,
            }
        }
        ClusterCommand::Taskmanagers => {
            let control = JobControl::new(api, clock, &config);
            print_json(&control.taskmanagers().await);
        }
    }

    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Validate { sql_file } => validate(sql_file),
        Commands::Cluster(command) => run_cluster_command(&cli, command).await,
    }
}
