use thiserror::Error;
use tokio::sync::oneshot;

use super::sensor_reading::SensorReading;

/// Version of the reply payload layout. Version 1 posted a two element
/// array of f64 values and is not produced anymore.
pub const REPLY_ENCODING_VERSION: u8 = 2;

/// Size in bytes of an encoded reading.
pub const READING_PAYLOAD_LEN: usize = 8;

/// The binary form of a successful reading: humidity then temperature,
/// each an IEEE-754 f32 in little-endian byte order.
///
/// ```
/// use dht_native::models::{reply::ReadingPayload, sensor_reading::SensorReading};
/// let payload = ReadingPayload::encode(SensorReading::new(45.5, 21.25));
/// assert_eq!(&payload.as_bytes()[0..4], &45.5f32.to_le_bytes());
/// assert_eq!(payload.reading(), SensorReading::new(45.5, 21.25));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingPayload([u8; READING_PAYLOAD_LEN]);

impl ReadingPayload {
    pub fn encode(reading: SensorReading) -> Self {
        let mut bytes = [0u8; READING_PAYLOAD_LEN];
        bytes[0..4].copy_from_slice(&reading.humidity.to_le_bytes());
        bytes[4..8].copy_from_slice(&reading.temperature.to_le_bytes());
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; READING_PAYLOAD_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; READING_PAYLOAD_LEN] {
        &self.0
    }

    /// Decode the payload back into a reading.
    pub fn reading(&self) -> SensorReading {
        let [h0, h1, h2, h3, t0, t1, t2, t3] = self.0;
        SensorReading {
            humidity: f32::from_le_bytes([h0, h1, h2, h3]),
            temperature: f32::from_le_bytes([t0, t1, t2, t3]),
        }
    }
}

impl From<SensorReading> for ReadingPayload {
    fn from(value: SensorReading) -> Self {
        Self::encode(value)
    }
}

/// The single message posted back for every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// The read succeeded.
    Reading(ReadingPayload),

    /// Null marker: the read failed or the request was malformed.
    Failure,
}

impl Reply {
    /// The decoded reading, or `None` for the failure marker.
    pub fn reading(&self) -> Option<SensorReading> {
        match self {
            Reply::Reading(payload) => Some(payload.reading()),
            Reply::Failure => None,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReplyError {
    /// The receiving end of the reply port was dropped before the reply
    /// could be delivered.
    #[error("Reply receiver was dropped.")]
    ReceiverDropped,
}

/// One-shot delivery target supplied by the caller. Posting consumes the
/// port so a second reply cannot be sent through it.
#[derive(Debug)]
pub struct ReplyPort {
    tx: oneshot::Sender<Reply>,
}

impl ReplyPort {
    /// Create a reply port and the receiver the caller awaits on.
    pub fn channel() -> (Self, oneshot::Receiver<Reply>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    pub fn post(self, reply: Reply) -> Result<(), ReplyError> {
        self.tx
            .send(reply)
            .map_err(|_| ReplyError::ReceiverDropped)
    }

    /// True once the caller has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
