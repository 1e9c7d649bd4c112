use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::info;

use crate::models::{message::Value, reply::ReplyPort, sensor_reading::SensorReading};

use self::task::task_sensor_service;

use super::core::ports::SensorBackend;

pub mod decoder;
pub mod encoder;
pub mod task;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ServiceError {
    /// The worker has stopped and no longer accepts requests.
    #[error("Sensor service is not running.")]
    Stopped,

    /// The reply port was dropped without an answer.
    #[error("Sensor service dropped the request without replying.")]
    NoReply,
}

/// Cloneable, non-blocking handle for posting requests to the service.
#[derive(Debug, Clone)]
pub struct ServicePort {
    tx: UnboundedSender<Value>,
}

impl ServicePort {
    /// Fire-and-forget. The reply arrives on the reply port embedded in the
    /// message.
    pub fn post(&self, message: Value) -> Result<(), ServiceError> {
        self.tx.send(message).map_err(|_| ServiceError::Stopped)
    }

    /// Post a request and wait for its reply. `Ok(None)` is the failure
    /// marker.
    pub async fn read(
        &self,
        model: i32,
        pin: i32,
        i2c_address: Option<i32>,
    ) -> Result<Option<SensorReading>, ServiceError> {
        let (reply, rx) = ReplyPort::channel();
        let message = match i2c_address {
            Some(address) => Value::addressed_request(model, pin, address, reply),
            None => Value::request(model, pin, reply),
        };
        self.post(message)?;

        let reply = rx.await.map_err(|_| ServiceError::NoReply)?;
        Ok(reply.reading())
    }
}

/// Owns the worker that serves sensor reads. Dropping the service cancels
/// the worker; `stop` also waits for it to finish.
pub struct SensorService {
    port: ServicePort,
    token: CancellationToken,
    tracker: TaskTracker,
}

impl SensorService {
    /// Spawn the worker on the current tokio runtime.
    pub fn start<B: SensorBackend>(backend: B) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let tracker = TaskTracker::new();

        tracker.spawn(task_sensor_service(token.clone(), Arc::new(backend), rx));
        tracker.close();
        info!("Sensor service started.");

        Self {
            port: ServicePort { tx },
            token,
            tracker,
        }
    }

    pub fn sender(&self) -> ServicePort {
        self.port.clone()
    }

    pub fn post(&self, message: Value) -> Result<(), ServiceError> {
        self.port.post(message)
    }

    pub async fn read(
        &self,
        model: i32,
        pin: i32,
        i2c_address: Option<i32>,
    ) -> Result<Option<SensorReading>, ServiceError> {
        self.port.read(model, pin, i2c_address).await
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled() && !self.tracker.is_empty()
    }

    /// Cancel the worker and wait until it exits. A read already in
    /// progress completes first.
    pub async fn stop(self) {
        self.token.cancel();
        self.tracker.wait().await;
        info!("Sensor service stopped.");
    }
}

impl Drop for SensorService {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            mpsc as std_mpsc, Mutex,
        },
        time::Duration,
    };

    use crate::{
        internals::core::ports::BackendError,
        models::reply::Reply,
    };

    use super::*;

    /// Returns a fixed reading for model 22 and fails for anything else.
    #[derive(Default)]
    struct FixedBackend {
        calls: Arc<AtomicUsize>,
        active: Arc<AtomicUsize>,
        max_active: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl SensorBackend for FixedBackend {
        fn read(
            &self,
            model: i32,
            _pin: i32,
            _i2c_address: Option<i32>,
        ) -> Result<SensorReading, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.active.fetch_sub(1, Ordering::SeqCst);

            if model == 22 {
                Ok(SensorReading::new(50.0, 20.0))
            } else {
                Err(BackendError::UnsupportedModel(model))
            }
        }
    }

    /// Blocks every read until the test releases it, like a wedged bus.
    struct GatedBackend {
        gate: Mutex<std_mpsc::Receiver<()>>,
    }

    impl SensorBackend for GatedBackend {
        fn read(
            &self,
            _model: i32,
            _pin: i32,
            _i2c_address: Option<i32>,
        ) -> Result<SensorReading, BackendError> {
            let gate = self.gate.lock().expect("Failed to lock gate");
            gate.recv().map_err(|_| BackendError::UnsupportedModel(-1))?;
            Ok(SensorReading::new(60.0, 25.0))
        }
    }

    fn gated() -> (GatedBackend, std_mpsc::Sender<()>) {
        let (tx, rx) = std_mpsc::channel();
        (
            GatedBackend {
                gate: Mutex::new(rx),
            },
            tx,
        )
    }

    #[tokio::test]
    async fn test_read_round_trip() {
        let service = SensorService::start(FixedBackend::default());

        let reading = service.read(22, 4, None).await.expect("Failed to read");
        assert_eq!(reading, Some(SensorReading::new(50.0, 20.0)));

        let reading = service.read(31, 1, Some(0x44)).await.expect("Failed to read");
        assert_eq!(reading, None);

        service.stop().await;
    }

    #[tokio::test]
    async fn test_reply_is_binary_payload() {
        let service = SensorService::start(FixedBackend::default());
        let (port, rx) = ReplyPort::channel();

        service
            .post(Value::request(22, 4, port))
            .expect("Failed to post request");

        match rx.await.expect("Failed to receive reply") {
            Reply::Reading(payload) => {
                assert_eq!(&payload.as_bytes()[0..4], &50.0f32.to_le_bytes());
                assert_eq!(&payload.as_bytes()[4..8], &20.0f32.to_le_bytes());
            }
            Reply::Failure => panic!("Expected a reading"),
        }

        service.stop().await;
    }

    #[tokio::test]
    async fn test_malformed_request_gets_failure_without_backend_call() {
        let backend = FixedBackend::default();
        let calls = backend.calls.clone();
        let service = SensorService::start(backend);

        let (port, rx) = ReplyPort::channel();
        service
            .post(Value::Array(vec![
                Value::String("22".into()),
                Value::Int32(4),
                Value::ReplyPort(port),
            ]))
            .expect("Failed to post request");
        assert_eq!(rx.await.expect("Failed to receive reply"), Reply::Failure);

        service
            .post(Value::Array(vec![Value::Int32(22)]))
            .expect("Failed to post request");
        service.post(Value::Null).expect("Failed to post request");

        // The service keeps serving after rejecting requests.
        let reading = service.read(22, 4, None).await.expect("Failed to read");
        assert!(reading.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        service.stop().await;
    }

    #[tokio::test]
    async fn test_wrong_arity_request_gets_failure() {
        let backend = FixedBackend::default();
        let calls = backend.calls.clone();
        let service = SensorService::start(backend);

        let (port, rx) = ReplyPort::channel();
        service
            .post(Value::Array(vec![Value::Int32(22), Value::ReplyPort(port)]))
            .expect("Failed to post request");
        assert_eq!(rx.await.expect("Failed to receive reply"), Reply::Failure);

        let (port, rx) = ReplyPort::channel();
        service
            .post(Value::Array(vec![
                Value::Int32(31),
                Value::Int32(1),
                Value::Int32(0x44),
                Value::Int32(0),
                Value::ReplyPort(port),
            ]))
            .expect("Failed to post request");
        assert_eq!(rx.await.expect("Failed to receive reply"), Reply::Failure);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        service.stop().await;
    }

    #[tokio::test]
    async fn test_requests_are_serialized() {
        let backend = FixedBackend {
            delay: Duration::from_millis(10),
            ..FixedBackend::default()
        };
        let calls = backend.calls.clone();
        let max_active = backend.max_active.clone();
        let service = SensorService::start(backend);
        let port = service.sender();

        let reads = (0..6).map(|_| port.read(22, 4, None));
        let results = futures::future::join_all(reads).await;

        assert_eq!(results.len(), 6);
        for result in results {
            assert_eq!(
                result.expect("Failed to read"),
                Some(SensorReading::new(50.0, 20.0))
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_eq!(max_active.load(Ordering::SeqCst), 1);

        service.stop().await;
    }

    #[tokio::test]
    async fn test_blocked_read_does_not_block_caller() {
        let (backend, release) = gated();
        let service = SensorService::start(backend);

        let (first, mut rx_first) = ReplyPort::channel();
        let (second, mut rx_second) = ReplyPort::channel();
        service
            .post(Value::request(22, 4, first))
            .expect("Failed to post request");
        service
            .post(Value::request(22, 4, second))
            .expect("Failed to post request");

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx_first.try_recv().is_err());
        assert!(rx_second.try_recv().is_err());

        release.send(()).expect("Failed to release read");
        release.send(()).expect("Failed to release read");

        let first = rx_first.await.expect("Failed to receive reply");
        let second = rx_second.await.expect("Failed to receive reply");
        assert_eq!(first.reading(), Some(SensorReading::new(60.0, 25.0)));
        assert_eq!(second.reading(), Some(SensorReading::new(60.0, 25.0)));

        service.stop().await;
    }

    #[tokio::test]
    async fn test_stop_answers_queued_requests() {
        let (backend, release) = gated();
        let service = SensorService::start(backend);
        let port = service.sender();

        let (in_flight, rx_in_flight) = ReplyPort::channel();
        port.post(Value::request(22, 4, in_flight))
            .expect("Failed to post request");
        tokio::time::sleep(Duration::from_millis(20)).await;

        let (queued_a, rx_a) = ReplyPort::channel();
        let (queued_b, rx_b) = ReplyPort::channel();
        port.post(Value::request(22, 4, queued_a))
            .expect("Failed to post request");
        port.post(Value::addressed_request(31, 1, 0x44, queued_b))
            .expect("Failed to post request");

        let stopping = tokio::spawn(service.stop());
        tokio::time::sleep(Duration::from_millis(20)).await;
        release.send(()).expect("Failed to release read");
        stopping.await.expect("Failed to stop service");

        assert_eq!(
            rx_in_flight.await.expect("Failed to receive reply").reading(),
            Some(SensorReading::new(60.0, 25.0))
        );
        assert_eq!(rx_a.await.expect("Failed to receive reply"), Reply::Failure);
        assert_eq!(rx_b.await.expect("Failed to receive reply"), Reply::Failure);

        assert_eq!(port.read(22, 4, None).await, Err(ServiceError::Stopped));
    }

    #[tokio::test]
    async fn test_drop_cancels_worker() {
        let backend = FixedBackend::default();
        let calls = backend.calls.clone();
        let service = SensorService::start(backend);
        let port = service.sender();
        assert!(service.is_running());

        drop(service);

        let result = port.read(22, 4, None).await;
        assert!(matches!(result, Ok(None) | Err(ServiceError::Stopped)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
