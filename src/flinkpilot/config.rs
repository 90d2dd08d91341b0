//! flinkpilot configuration
//!
//! Supports layered configuration:
//! 1. Defaults (a docker-compose style `flink-jobmanager:8081` deployment)
//! 2. Optional YAML file (`flink:` section)
//! 3. Environment variables (for deployment)
//! 4. Builder pattern (CLI flags, tests)
//!
//! The resulting [`PilotConfig`] is built once at process start and handed to
//! every component constructor. Nothing below the binary reads the
//! environment on its own.
//!
//! # Examples
//!
//! ```rust,ignore
//! use flinkpilot::PilotConfig;
//!
//! // Environment variables (production)
//! // export FLINK_JOBMANAGER_HOST=jobmanager.internal
//! let config = PilotConfig::from_env();
//!
//! // Builder (tests)
//! let config = PilotConfig::new("localhost", 8081)
//!     .with_sql_dir("./flink/sql")
//!     .with_operation_timeout(Duration::from_secs(30));
//! ```

use super::error::{PilotError, PilotResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File holding table and catalog definitions, executed with a tolerant policy
pub const DEFAULT_DDL_FILE: &str = "create_tables.sql";

/// File holding the long-running INSERT jobs, executed with a strict policy
pub const DEFAULT_STREAMING_FILE: &str = "streaming_job.sql";

/// Properties sent with session creation and with every gateway statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProperties {
    pub session_name: String,
    pub planner: String,
    pub execution_type: String,
    /// `execution.runtime-mode`
    pub runtime_mode: String,
    /// `parallelism.default`
    pub default_parallelism: u32,
    /// `execution.checkpointing.interval`
    pub checkpoint_interval: String,
}

impl SessionProperties {
    /// Properties map for `POST /v1/sessions`
    pub fn session_properties(&self) -> BTreeMap<String, String> {
        let mut props = self.execution_config();
        props.insert(
            "execution.checkpointing.interval".to_string(),
            self.checkpoint_interval.clone(),
        );
        props
    }

    /// Execution config for `POST /v1/sessions/{h}/statements`
    pub fn execution_config(&self) -> BTreeMap<String, String> {
        let mut props = BTreeMap::new();
        props.insert(
            "execution.runtime-mode".to_string(),
            self.runtime_mode.clone(),
        );
        props.insert(
            "parallelism.default".to_string(),
            self.default_parallelism.to_string(),
        );
        props
    }
}

impl Default for SessionProperties {
    fn default() -> Self {
        Self {
            session_name: "iot-pipeline-session".to_string(),
            planner: "blink".to_string(),
            execution_type: "streaming".to_string(),
            runtime_mode: "STREAMING".to_string(),
            default_parallelism: 2,
            checkpoint_interval: "60s".to_string(),
        }
    }
}

/// Configuration for the submitter, the health probe and the job monitor
///
/// ## Environment Variables
/// - `FLINK_JOBMANAGER_HOST`: JobManager host (default: flink-jobmanager)
/// - `FLINK_JOBMANAGER_PORT`: JobManager REST port (default: 8081)
/// - `FLINK_SQL_DIR`: directory holding the job scripts (default: /app/flink/sql)
/// - `FLINK_PARALLELISM_DEFAULT`: default parallelism (default: 2)
/// - `FLINK_RUNTIME_MODE`: runtime mode (default: STREAMING)
/// - `FLINK_CHECKPOINTING_INTERVAL`: checkpoint interval (default: 60s)
/// - `FLINK_HEALTH_CHECK_INTERVAL`: monitor interval in seconds (default: 30)
/// - `FLINK_OPERATION_TIMEOUT_SECS`: gateway operation timeout (default: 120)
/// - `FLINK_MONITOR_MAX_IDLE_CHECKS`: idle-stop threshold (default: 10)
#[derive(Debug, Clone)]
pub struct PilotConfig {
    pub jobmanager_host: String,
    pub jobmanager_port: u16,

    /// Directory holding the DDL and streaming scripts
    pub sql_dir: PathBuf,
    pub ddl_file: String,
    pub streaming_file: String,

    pub session: SessionProperties,

    /// Timeout for simple reads (overview, jobs, status polls)
    pub read_timeout: Duration,
    /// Timeout for `POST /v1/sessions`
    pub session_timeout: Duration,
    /// Timeout for `POST /v1/sessions/{h}/statements`
    pub submit_timeout: Duration,

    /// JobManager reachability wait before submission
    pub readiness_attempts: u32,
    pub readiness_interval: Duration,

    /// Delay between health probes in `wait_until_ready`
    pub health_poll_interval: Duration,
    pub cluster_ready_max_wait: Duration,

    pub operation_poll_interval: Duration,
    pub operation_timeout: Duration,

    /// Pause between two statements of one file
    pub statement_pacing: Duration,
    /// Pause after the DDL file before the streaming file
    pub ddl_settle_delay: Duration,

    pub monitor_interval: Duration,
    pub monitor_error_backoff: Duration,
    pub monitor_max_idle_checks: u32,

    /// Wait between cancel and re-read in `restart_job`
    pub restart_grace: Duration,
}

impl PilotConfig {
    /// Create a configuration for the given JobManager with default timings
    pub fn new(jobmanager_host: impl Into<String>, jobmanager_port: u16) -> Self {
        Self {
            jobmanager_host: jobmanager_host.into(),
            jobmanager_port,
            sql_dir: PathBuf::from("/app/flink/sql"),
            ddl_file: DEFAULT_DDL_FILE.to_string(),
            streaming_file: DEFAULT_STREAMING_FILE.to_string(),
            session: SessionProperties::default(),
            read_timeout: Duration::from_secs(10),
            session_timeout: Duration::from_secs(30),
            submit_timeout: Duration::from_secs(60),
            readiness_attempts: 60,
            readiness_interval: Duration::from_secs(5),
            health_poll_interval: Duration::from_secs(10),
            cluster_ready_max_wait: Duration::from_secs(300),
            operation_poll_interval: Duration::from_secs(2),
            operation_timeout: Duration::from_secs(120),
            statement_pacing: Duration::from_secs(3),
            ddl_settle_delay: Duration::from_secs(5),
            monitor_interval: Duration::from_secs(30),
            monitor_error_backoff: Duration::from_secs(10),
            monitor_max_idle_checks: 10,
            restart_grace: Duration::from_secs(5),
        }
    }

    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| env::var(key).ok());
        config
    }

    /// Load defaults, then the YAML file, then environment variables
    pub fn load(yaml_path: Option<&Path>) -> PilotResult<Self> {
        let mut config = Self::default();
        if let Some(path) = yaml_path {
            let text = std::fs::read_to_string(path).map_err(|e| PilotError::io(e, path))?;
            config.apply_yaml(&text)?;
        }
        config.apply_env(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from an environment-like lookup
    ///
    /// Unparseable numeric values are ignored and the previous value kept.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("FLINK_JOBMANAGER_HOST") {
            self.jobmanager_host = host;
        }
        if let Some(port) = lookup("FLINK_JOBMANAGER_PORT").and_then(|v| v.parse().ok()) {
            self.jobmanager_port = port;
        }
        if let Some(dir) = lookup("FLINK_SQL_DIR") {
            self.sql_dir = PathBuf::from(dir);
        }
        if let Some(p) = lookup("FLINK_PARALLELISM_DEFAULT").and_then(|v| v.parse().ok()) {
            self.session.default_parallelism = p;
        }
        if let Some(mode) = lookup("FLINK_RUNTIME_MODE") {
            self.session.runtime_mode = mode;
        }
        if let Some(interval) = lookup("FLINK_CHECKPOINTING_INTERVAL") {
            self.session.checkpoint_interval = interval;
        }
        if let Some(secs) = lookup("FLINK_HEALTH_CHECK_INTERVAL").and_then(|v| v.parse().ok()) {
            self.monitor_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = lookup("FLINK_OPERATION_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.operation_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = lookup("FLINK_MONITOR_MAX_IDLE_CHECKS").and_then(|v| v.parse().ok()) {
            self.monitor_max_idle_checks = n;
        }
    }

    /// Overlay values from the `flink:` section of a YAML document
    pub fn apply_yaml(&mut self, text: &str) -> PilotResult<()> {
        let file: YamlFile = serde_yaml::from_str(text)?;
        let Some(flink) = file.flink else {
            return Ok(());
        };

        if let Some(jm) = flink.jobmanager {
            if let Some(host) = jm.host {
                self.jobmanager_host = host;
            }
            if let Some(port) = jm.web_port {
                self.jobmanager_port = port;
            }
        }
        if let Some(exec) = flink.execution {
            if let Some(p) = exec.parallelism_default {
                self.session.default_parallelism = p;
            }
            if let Some(mode) = exec.runtime_mode {
                self.session.runtime_mode = mode;
            }
        }
        if let Some(cp) = flink.checkpointing {
            if let Some(interval) = cp.interval {
                self.session.checkpoint_interval = interval;
            }
        }
        if let Some(jobs) = flink.jobs {
            if let Some(secs) = jobs.health_check_interval {
                self.monitor_interval = Duration::from_secs(secs);
            }
            if let Some(dir) = jobs.sql_dir {
                self.sql_dir = PathBuf::from(dir);
            }
        }
        Ok(())
    }

    /// Reject values that would make a polling loop spin or never start
    pub fn validate(&self) -> PilotResult<()> {
        if self.jobmanager_host.trim().is_empty() {
            return Err(PilotError::config("jobmanager host must not be empty"));
        }
        if self.jobmanager_port == 0 {
            return Err(PilotError::config("jobmanager port must be non-zero"));
        }
        if self.operation_poll_interval.is_zero()
            || self.health_poll_interval.is_zero()
            || self.monitor_interval.is_zero()
        {
            return Err(PilotError::config("poll intervals must be non-zero"));
        }
        if self.monitor_max_idle_checks == 0 {
            return Err(PilotError::config(
                "monitor idle-stop threshold must be at least 1",
            ));
        }
        Ok(())
    }

    /// `http://{host}:{port}`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.jobmanager_host, self.jobmanager_port)
    }

    /// SQL gateway root, `{base}/v1`
    pub fn gateway_url(&self) -> String {
        format!("{}/v1", self.base_url())
    }

    pub fn ddl_path(&self) -> PathBuf {
        self.sql_dir.join(&self.ddl_file)
    }

    pub fn streaming_path(&self) -> PathBuf {
        self.sql_dir.join(&self.streaming_file)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.jobmanager_host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.jobmanager_port = port;
        self
    }

    pub fn with_sql_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sql_dir = dir.into();
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = interval;
        self
    }

    pub fn with_max_idle_checks(mut self, checks: u32) -> Self {
        self.monitor_max_idle_checks = checks;
        self
    }

    pub fn with_readiness(mut self, attempts: u32, interval: Duration) -> Self {
        self.readiness_attempts = attempts;
        self.readiness_interval = interval;
        self
    }
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self::new("flink-jobmanager", 8081)
    }
}

#[derive(Debug, Default, Deserialize)]
struct YamlFile {
    flink: Option<YamlFlink>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlFlink {
    jobmanager: Option<YamlJobManager>,
    execution: Option<YamlExecution>,
    checkpointing: Option<YamlCheckpointing>,
    jobs: Option<YamlJobs>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlJobManager {
    host: Option<String>,
    web_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlExecution {
    parallelism_default: Option<u32>,
    runtime_mode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlCheckpointing {
    interval: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlJobs {
    health_check_interval: Option<u64>,
    sql_dir: Option<String>,
}
