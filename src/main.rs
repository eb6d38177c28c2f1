use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use flow_allocator::domain::admission::{AdmissionConfig, AdmissionController};
use flow_allocator::domain::clock::SystemClock;
use flow_allocator::domain::forwarding::LogOnlyPlane;
use flow_allocator::error::Result;
use flow_allocator::transport::server::CommandServer;
use flow_allocator::{engine_from_provisioning, logger};

/// Bandwidth-guaranteed flow admission engine.
#[derive(Debug, Parser)]
#[command(name = "flow_allocator")]
struct Args {
    /// Address the JSON-line command server listens on.
    #[arg(long, default_value = "127.0.0.1:8765")]
    listen: String,

    /// Optional static provisioning file (topology + host bindings).
    #[arg(long)]
    provisioning: Option<String>,

    /// Reservation TTL in seconds.
    #[arg(long, default_value_t = 60)]
    ttl: i64,

    /// Interval of the expiry sweep in seconds.
    #[arg(long, default_value_t = 5)]
    sweep_interval: u64,

    /// How long an allocate waits for host learning, in seconds.
    #[arg(long, default_value_t = 3)]
    learning_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init();

    let args = Args::parse();
    log::info!("Initializing FlowAllocator...");

    let config = AdmissionConfig { reservation_ttl: args.ttl, learning_timeout: Duration::from_secs(args.learning_timeout) };
    let clock = Arc::new(SystemClock::new());
    let plane = Arc::new(LogOnlyPlane::new());

    let controller = match &args.provisioning {
        Some(path) => {
            log::info!("Loading provisioning from '{}'...", path);
            engine_from_provisioning(path, clock, plane, config)?
        }
        None => Arc::new(AdmissionController::new(clock, plane, config)),
    };

    let sweeper = controller.clone();
    let sweep_interval = Duration::from_secs(args.sweep_interval);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            let released = sweeper.expire_sweep().await;
            if released > 0 {
                log::info!("Expiry sweep released {} reservations", released);
            }
        }
    });

    CommandServer::new(controller).run(&args.listen).await
}
