use std::path::PathBuf;

use anyhow::Result;
use dht_native::{
    config::{Config, PollConfig},
    externals::{
        i2c::services::LinuxI2cBusService, kernel_values::services::KernelValueServiceActual,
    },
    PiSensorBackend, SensorService, ServicePort,
};
use tokio::signal;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, level_filters::LevelFilter, warn};

#[cfg(feature = "pi-dht-driver")]
use dht_native::externals::dht_driver::services::PiDhtDriverService as DhtDriver;
#[cfg(not(feature = "pi-dht-driver"))]
use dht_native::externals::dht_driver::services::UnlinkedDhtDriverService as DhtDriver;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .with_max_level(LevelFilter::DEBUG)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    debug!("Loaded config: {:?}", config);

    let backend = PiSensorBackend::new(
        KernelValueServiceActual::new(
            &config.backend.humidity_path,
            &config.backend.temperature_path,
        ),
        DhtDriver,
        LinuxI2cBusService,
        config.backend.clone(),
    );
    let service = SensorService::start(backend);

    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    let token_clone = token.clone();
    let port = service.sender();
    let poll = config.poll.clone();
    tracker.spawn(async move { task_poll_sensor(token_clone, port, poll).await });
    tracker.close();

    tokio::select! {
        _ = token.cancelled() => {}
        res = signal::ctrl_c() => {
            if let Err(e) = res {
                error!("Failed to listen for ctrl_c. Error: {}", e);
            }
            token.cancel();
        },
    }

    tracker.wait().await;
    service.stop().await;

    Ok(())
}

/// Task: Runs periodically to read the configured sensor through the
/// service and log the outcome. Can be cancelled.
#[tracing::instrument(skip_all)]
async fn task_poll_sensor(token: CancellationToken, port: ServicePort, poll: PollConfig) {
    info!(
        "Started. Polling model {} on pin {} every {:?}.",
        poll.model,
        poll.pin,
        poll.interval()
    );
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                warn!("Cancelled.");
                break;
            },
            res = port.read(poll.model, poll.pin, poll.i2c_address) => match res {
                Ok(Some(reading)) => info!("Got reading: {}", reading),
                Ok(None) => warn!("Sensor read failed."),
                Err(e) => {
                    error!("Sensor service unavailable. Error: {}", e);
                    token.cancel();
                    break;
                }
            },
        };

        tokio::select! {
            _ = token.cancelled() => {
                warn!("Cancelled.");
                break;
            },
            _ = tokio::time::sleep(poll.interval()) => {}
        };
    }
}
