//! Topic provisioner (v1)
//!
//! Provisions a topic the way a fleet of processes would on startup: every
//! process checks for the topic, creates it if missing, and accepts whichever
//! create won the race.
//!
//! # Architecture Overview
//!
//! ```text
//!   config (TOML) + flags
//!          │
//!          ▼
//!   ┌──────────────┐   N tasks   ┌──────────────────┐   get / create   ┌──────────────────┐
//!   │     main     │────────────▶│ TopicProvisioner │─────────────────▶│ InMemoryNamespace│
//!   └──────────────┘             │  + RetryExecutor │◀─────────────────│ (atomic create)  │
//!          ▲                     └──────────────────┘  BackendError    └──────────────────┘
//!          │ Ctrl-C                       │
//!   ┌──────────────┐  cancel              ▼
//!   │   Shutdown   │──────────▶  JSON report per process
//!   └──────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;

use topic_provisioner::backend::{BackendError, InMemoryNamespace, TopicDescriptor};
use topic_provisioner::config::{load_config, validate_config, ConfigError, ProvisionerConfig};
use topic_provisioner::lifecycle::{signals, Shutdown};
use topic_provisioner::observability::logging;
use topic_provisioner::provisioning::TopicProvisioner;

#[derive(Parser)]
#[command(name = "topic-provisioner")]
#[command(about = "Simulate concurrent processes provisioning one topic", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Topic name; overrides `topic.name`.
    #[arg(short, long)]
    topic: Option<String>,

    /// Require partitioning; overrides `topic.enable_partitioning`.
    #[arg(long, value_name = "BOOL")]
    enable_partitioning: Option<bool>,

    /// Number of provisioners racing for the topic.
    #[arg(short = 'n', long, default_value_t = 1)]
    processes: usize,

    /// Seed the namespace with the topic, partitioned or not.
    #[arg(long, value_name = "PARTITIONED")]
    existing: Option<bool>,

    /// Fail this many lookups and creates with "server busy" first.
    #[arg(long, default_value_t = 0)]
    transient_failures: usize,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProvisionerConfig::default(),
    };
    if let Some(topic) = cli.topic {
        config.topic.name = topic;
    }
    if let Some(enable) = cli.enable_partitioning {
        config.topic.enable_partitioning = enable;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability);
    tracing::info!("topic-provisioner v{} starting", env!("CARGO_PKG_VERSION"));

    let name = config.topic_name()?;
    let partitioning = config.topic.enable_partitioning;
    let policies = config.policies();

    tracing::info!(
        topic = %name,
        partitioning,
        processes = cli.processes,
        existence_attempts = %policies.existence.max_attempts,
        creation_attempts = %policies.creation.max_attempts,
        "Configuration loaded"
    );

    let namespace = Arc::new(InMemoryNamespace::new());
    if let Some(partitioned) = cli.existing {
        namespace.insert_topic(TopicDescriptor::new(name.clone(), partitioned));
    }
    let busy = || BackendError::ServerBusy("injected".to_string());
    namespace.fail_next_gets(std::iter::repeat_with(busy).take(cli.transient_failures));
    namespace.fail_next_creates(std::iter::repeat_with(busy).take(cli.transient_failures));

    let shutdown = Shutdown::new();
    let signal_task = signals::spawn_ctrl_c_handler(shutdown.clone());

    let runs = (0..cli.processes.max(1)).map(|process| {
        let namespace = Arc::clone(&namespace);
        let name = name.clone();
        let policies = policies.clone();
        let cancel = shutdown.subscribe();
        tokio::spawn(async move {
            let result = TopicProvisioner::new(&*namespace, name, partitioning, policies)
                .run(&cancel)
                .await;
            (process, result)
        })
    });
    let finished = futures_util::future::join_all(runs).await;

    let mut failures = 0usize;
    let mut report = Vec::with_capacity(finished.len());
    for joined in finished {
        let (process, result) = joined?;
        match result {
            Ok(provisioned) => report.push(json!({
                "process": process,
                "run_id": provisioned.run_id,
                "path": provisioned.path.as_str(),
                "topic": provisioned.descriptor,
            })),
            Err(e) => {
                failures += 1;
                report.push(json!({
                    "process": process,
                    "topic": e.topic().as_str(),
                    "stage": e.stage().to_string(),
                    "error": e.to_string(),
                }));
            }
        }
    }

    let summary = json!({
        "runs": report,
        "get_calls": namespace.get_calls(),
        "create_calls": namespace.create_calls(),
        "topics": namespace.topic_count(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    shutdown.trigger();
    signal_task.await?;

    if failures > 0 {
        tracing::error!(failures, "Provisioning failed");
        return Ok(ExitCode::FAILURE);
    }
    tracing::info!("Shutdown complete");
    Ok(ExitCode::SUCCESS)
}
