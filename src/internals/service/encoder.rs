use tracing::{debug, warn};

use crate::models::{
    reply::{ReadingPayload, Reply, ReplyError, ReplyPort},
    sensor_reading::SensorReading,
};

/// Map a read outcome onto the reply wire format.
pub fn encode(reading: Option<SensorReading>) -> Reply {
    match reading {
        Some(reading) => Reply::Reading(ReadingPayload::encode(reading)),
        None => Reply::Failure,
    }
}

/// Encode the outcome and post it. A caller that stopped listening is
/// logged and otherwise ignored.
pub fn encode_and_send(reply: ReplyPort, reading: Option<SensorReading>) -> Result<(), ReplyError> {
    let message = encode(reading);
    match reply.post(message) {
        Ok(()) => {
            debug!("Posted reply: {:?}", message);
            Ok(())
        }
        Err(e) => {
            warn!("Failed to post reply. Error: {}", e);
            Err(e)
        }
    }
}
