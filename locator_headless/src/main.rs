use clap::{CommandFactory, Parser};
use common::{
    permission::{PermissionScope, StaticPermissions},
    position::Position,
    state::StartMode,
    subscription::SubscriptionConfig,
};
use gnss::{ProviderHub, gpsd_source::GpsdSource, route_source::RouteSource};
use module_core::{Event, EventBus, EventKind, EventKindType, Module, Request, payload_ref};
use notification::NotificationCenter;
use reporter::LocationReporter;
use service::LocationService;
use std::{str::FromStr, sync::Arc, time::Duration};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const HEADLESS_ADDR: u64 = 0x10CA;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Use the gpsd daemon as fine location provider.
    #[arg(short = 'd', long)]
    gpsd: bool,
    #[arg(long, default_value = GpsdSource::DEFAULT_ADDRESS)]
    gpsd_address: String,
    /// CSV file with `longitude,latitude` records driven as coarse provider.
    #[arg(short = 'f', long)]
    route_file: Option<String>,
    /// Route velocity in meters per second.
    #[arg(long, default_value_t = 10.0)]
    velocity: f64,
    #[arg(long, default_value_t = 1000)]
    tick_ms: u64,
    /// Minimum time between two reported fixes.
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
    /// Minimum distance between two reported fixes.
    #[arg(long, default_value_t = 1.0)]
    distance_m: f64,
    /// Simulate a withdrawn permission, `fine` or `coarse`.
    #[arg(long)]
    deny_permission: Vec<PermissionScope>,
}

fn read_route_from_file(file_path: &str) -> Result<Vec<Position>, ()> {
    let mut rdr = csv::Reader::from_path(file_path).map_err(|e| {
        error!("Failed to open route file {file_path}. Error: {e}");
    })?;
    let mut positions = Vec::new();

    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| error!("Failed to read route record {line}. Error: {e}"))?;
        let coordinate = |column: usize| {
            record
                .get(column)
                .and_then(|value| f64::from_str(value.trim()).ok())
                .ok_or_else(|| error!("Route record {line} has no valid coordinate in column {column}"))
        };
        let longitude = coordinate(0)?;
        let latitude = coordinate(1)?;
        positions.push(Position::new(&latitude, &longitude));
    }
    debug!("length of route: {}", positions.len());
    Ok(positions)
}

fn create_provider_hub(cli: &Cli) -> Result<ProviderHub, ()> {
    let mut hub = ProviderHub::new(Handle::current());
    if cli.gpsd {
        let gpsd = GpsdSource::new(&cli.gpsd_address).map_err(|e| {
            error!("Invalid gpsd address {}. Error: {e}", cli.gpsd_address);
        })?;
        hub = hub.with_source(gpsd);
    }
    if let Some(route_file) = &cli.route_file {
        let positions = read_route_from_file(route_file)?;
        let route = RouteSource::new(&positions, cli.velocity, Duration::from_millis(cli.tick_ms))
            .map_err(|e| error!("Failed to create route provider. Error: {e}"))?;
        hub = hub.with_source(route);
    }
    if hub.descriptors().is_empty() {
        error!("No location provider specified. Use --gpsd or --route-file");
        let _ = Cli::command().print_help();
        return Err(());
    }
    Ok(hub)
}

fn create_permissions(cli: &Cli) -> StaticPermissions {
    cli.deny_permission
        .iter()
        .fold(StaticPermissions::all_granted(), |permissions, scope| {
            warn!("Permission {scope} denied");
            permissions.revoke(*scope)
        })
}

async fn request_start(eb: &EventBus, config: SubscriptionConfig) -> Result<(), ()> {
    let mut ctx = eb.context();
    ctx.publish_event(EventKind::StartServiceRequestEvent(Arc::new(Request {
        id: 1,
        sender_addr: HEADLESS_ADDR,
        data: config,
    })))
    .map_err(|e| error!("Failed to request service start. Error: {e}"))?;
    let Some(event) = ctx
        .wait_for_event(1, HEADLESS_ADDR, &EventKindType::StartServiceResponseEvent)
        .await
    else {
        error!("Event bus closed before the service answered");
        return Err(());
    };
    match payload_ref!(event.kind, EventKind::StartServiceResponseEvent).map(|r| r.data) {
        Some(StartMode::Sticky) => {
            info!("Location service is running");
            Ok(())
        }
        _ => {
            error!("Location service failed to start");
            let _ = ctx.publish_event(EventKind::QuitEvent);
            Err(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), ()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = SubscriptionConfig::new(Duration::from_millis(cli.interval_ms), cli.distance_m)
        .map_err(|e| error!("Invalid subscription configuration. Error: {e}"))?;
    let hub = create_provider_hub(&cli)?;
    let eb = EventBus::default();
    let notifications = Arc::new(NotificationCenter::new());
    let reporter = LocationReporter::new(
        Arc::new(hub),
        notifications.clone(),
        Arc::new(create_permissions(&cli)),
        eb.sender(),
    );
    let mut service = LocationService::new(eb.context(), reporter, notifications);

    let quit_sender = eb.sender();
    ctrlc::set_handler(move || {
        let _ = quit_sender.send(Event {
            kind: EventKind::QuitEvent,
        });
    })
    .map_err(|e| error!("Failed to install Ctrl-C handler. Error: {e}"))?;

    info!("Starting location service...");
    let (service_result, start_result) = tokio::join!(service.run(), request_start(&eb, config));
    start_result.and(service_result)
}
