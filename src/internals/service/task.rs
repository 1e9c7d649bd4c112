use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::{
    internals::core::ports::SensorBackend,
    models::{message::Value, sensor_request::SensorRequest},
};

use super::{
    decoder::{decode, DecodeError},
    encoder::encode_and_send,
};

/// Task: Receive requests and answer them one at a time.
/// Each read runs on the blocking pool and is awaited before the next
/// request is taken, so the hardware is never accessed concurrently.
/// Can be cancelled. Requests still queued at that point are answered
/// with the failure marker.
#[tracing::instrument(skip_all)]
pub async fn task_sensor_service<B: SensorBackend>(
    token: CancellationToken,
    backend: Arc<B>,
    mut rx_requests: UnboundedReceiver<Value>,
) {
    info!("Started.");

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                warn!("Cancelled.");
                break;
            },
            message = rx_requests.recv() => match message {
                Some(message) => handle(&backend, message).await,
                None => {
                    debug!("Every service port was dropped.");
                    break;
                }
            },
        }
    }

    drain_with_failures(&mut rx_requests);
    info!("Stopped.");
}

/// Decode one message, read the sensor and post exactly one reply to the
/// request's reply port.
#[tracing::instrument(skip_all)]
pub async fn handle<B: SensorBackend>(backend: &Arc<B>, message: Value) {
    let request = match decode(message) {
        Ok(request) => request,
        Err(DecodeError { kind, reply }) => {
            warn!("Rejected request. Error: {}", kind);
            match reply {
                Some(reply) => {
                    encode_and_send(reply, None).ok();
                }
                None => error!("Request carried no reply port. Dropping it."),
            }
            return;
        }
    };
    debug!("Handling {}.", request);

    let SensorRequest {
        model,
        pin,
        i2c_address,
        reply,
    } = request;

    let backend = backend.clone();
    let outcome =
        tokio::task::spawn_blocking(move || backend.read(model, pin, i2c_address)).await;

    let reading = match outcome {
        Ok(Ok(reading)) => Some(reading),
        Ok(Err(e)) => {
            error!("Failed to read sensor. Error: {}", e);
            trace!("{:?}", e);
            None
        }
        Err(e) => {
            error!("Sensor read did not complete. Error: {}", e);
            None
        }
    };

    if encode_and_send(reply, reading).is_ok() {
        trace!("Request complete.");
    }
}

/// Close the queue and answer whatever is left in it with the failure
/// marker.
fn drain_with_failures(rx_requests: &mut UnboundedReceiver<Value>) {
    rx_requests.close();

    let mut drained = 0usize;
    while let Ok(message) = rx_requests.try_recv() {
        drained += 1;
        match decode(message) {
            Ok(request) => {
                encode_and_send(request.reply, None).ok();
            }
            Err(DecodeError {
                reply: Some(reply), ..
            }) => {
                encode_and_send(reply, None).ok();
            }
            Err(_) => {}
        }
    }

    if drained > 0 {
        warn!("Answered {} queued requests with failures.", drained);
    }
}
