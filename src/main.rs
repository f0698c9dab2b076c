use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use paydesk::application::service::PaymentService;
use paydesk::config::{ApprovedConflictPolicy, ServiceConfig};
use paydesk::domain::ports::{MessagingGatewayArc, RecordStoreArc};
use paydesk::infrastructure::console::ConsoleGateway;
use paydesk::infrastructure::in_memory::InMemoryRecordStore;
#[cfg(feature = "storage-rocksdb")]
use paydesk::infrastructure::rocksdb::RocksDBRecordStore;
use paydesk::interfaces::csv::event_reader::EventReader;
use paydesk::interfaces::csv::record_writer::RecordWriter;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, ValueEnum)]
enum ApprovedPolicyArg {
    Warn,
    Allow,
    Block,
}

impl From<ApprovedPolicyArg> for ApprovedConflictPolicy {
    fn from(arg: ApprovedPolicyArg) -> Self {
        match arg {
            ApprovedPolicyArg::Warn => ApprovedConflictPolicy::Warn,
            ApprovedPolicyArg::Allow => ApprovedConflictPolicy::Allow,
            ApprovedPolicyArg::Block => ApprovedConflictPolicy::Block,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Inbound events CSV file to replay
    input: PathBuf,

    /// Identity allowed to approve and reject
    #[arg(long)]
    admin_id: i64,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// How long a submitter's in-flight claim waits for follow-up input
    #[arg(long, default_value_t = 600)]
    session_ttl_secs: u64,

    /// What to do when a submitter with an active approval submits again
    #[arg(long, value_enum, default_value_t = ApprovedPolicyArg::Warn)]
    approved_policy: ApprovedPolicyArg,
}

impl Cli {
    fn store(&self) -> Result<RecordStoreArc> {
        #[cfg(feature = "storage-rocksdb")]
        if let Some(db_path) = &self.db_path {
            let store = RocksDBRecordStore::open(db_path).into_diagnostic()?;
            return Ok(Arc::new(store));
        }
        Ok(Arc::new(InMemoryRecordStore::new()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig::new(cli.admin_id)
        .with_session_ttl(Duration::from_secs(cli.session_ttl_secs))
        .with_approved_conflict(cli.approved_policy.into());

    let store = cli.store()?;
    let gateway: MessagingGatewayArc = Arc::new(ConsoleGateway::new());
    let service = PaymentService::new(&config, store.clone(), gateway);

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = EventReader::new(file);
    for event_result in reader.events() {
        match event_result {
            Ok(event) => {
                if let Err(e) = service.handle(event).await {
                    eprintln!("Error processing event: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading event: {}", e);
            }
        }
    }

    // Final state of every record, ordered by id.
    let records = store.all_records().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = RecordWriter::new(stdout.lock());
    writer.write_records(records).into_diagnostic()?;

    Ok(())
}
