use thiserror::Error;

use crate::models::{message::Value, reply::ReplyPort, sensor_request::SensorRequest};

/// `[model, pin, reply]`
pub const SHORT_REQUEST_ARITY: usize = 3;

/// `[model, pin, address, reply]`
pub const ADDRESSED_REQUEST_ARITY: usize = 4;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeErrorKind {
    #[error("Request is a {0}, not an array.")]
    NotAnArray(&'static str),

    #[error("Request has {0} elements, expected 3 or 4.")]
    WrongArity(usize),

    #[error("Last request element is a {0}, not a reply port.")]
    MissingReplyPort(&'static str),

    #[error("Request element {index} is a {found}, expected {expected}.")]
    WrongElementType {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },
}

/// A rejected request. When the reply port could still be extracted it is
/// handed back so the caller can be told about the failure.
#[derive(Error, Debug)]
#[error("Malformed request. {kind}")]
pub struct DecodeError {
    pub kind: DecodeErrorKind,
    pub reply: Option<ReplyPort>,
}

impl DecodeError {
    fn without_reply(kind: DecodeErrorKind) -> Self {
        Self { kind, reply: None }
    }
}

fn expect_int32(value: &Value, index: usize) -> Result<i32, DecodeErrorKind> {
    match value {
        Value::Int32(v) => Ok(*v),
        other => Err(DecodeErrorKind::WrongElementType {
            index,
            expected: "int32",
            found: other.kind(),
        }),
    }
}

fn decode_fields(elements: &[Value]) -> Result<(i32, i32, Option<i32>), DecodeErrorKind> {
    let model = expect_int32(&elements[0], 0)?;
    let pin = expect_int32(&elements[1], 1)?;
    let i2c_address = match elements.get(2) {
        Some(value) => Some(expect_int32(value, 2)?),
        None => None,
    };
    Ok((model, pin, i2c_address))
}

/// Validate an untyped message and extract a request from it.
///
/// The reply port is taken out first so that a request with the wrong
/// number of elements or a bad field can still be answered with the failure
/// marker. No hardware is touched here.
pub fn decode(message: Value) -> Result<SensorRequest, DecodeError> {
    let mut elements = match message {
        Value::Array(elements) => elements,
        other => {
            return Err(DecodeError::without_reply(DecodeErrorKind::NotAnArray(
                other.kind(),
            )))
        }
    };

    let arity = elements.len();
    let reply = match elements.pop() {
        Some(Value::ReplyPort(reply)) => reply,
        Some(other) => {
            let kind = if arity == SHORT_REQUEST_ARITY || arity == ADDRESSED_REQUEST_ARITY {
                DecodeErrorKind::MissingReplyPort(other.kind())
            } else {
                DecodeErrorKind::WrongArity(arity)
            };
            return Err(DecodeError::without_reply(kind));
        }
        None => return Err(DecodeError::without_reply(DecodeErrorKind::WrongArity(0))),
    };

    if arity != SHORT_REQUEST_ARITY && arity != ADDRESSED_REQUEST_ARITY {
        return Err(DecodeError {
            kind: DecodeErrorKind::WrongArity(arity),
            reply: Some(reply),
        });
    }

    match decode_fields(&elements) {
        Ok((model, pin, i2c_address)) => Ok(SensorRequest {
            model,
            pin,
            i2c_address,
            reply,
        }),
        Err(kind) => Err(DecodeError {
            kind,
            reply: Some(reply),
        }),
    }
}
