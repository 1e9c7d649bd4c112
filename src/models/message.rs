use std::fmt::Display;

use super::reply::ReplyPort;

/// An untyped structured message as posted by a caller. Requests arrive in
/// this shape and are validated by the decoder before anything touches the
/// hardware.
#[derive(Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    TypedData(Vec<u8>),
    ReplyPort(ReplyPort),
}

impl Value {
    /// Name of the variant, used in decode errors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::TypedData(_) => "typed data",
            Value::ReplyPort(_) => "reply port",
        }
    }

    /// Build the short request form: `[model, pin, reply]`.
    pub fn request(model: i32, pin: i32, reply: ReplyPort) -> Self {
        Value::Array(vec![
            Value::Int32(model),
            Value::Int32(pin),
            Value::ReplyPort(reply),
        ])
    }

    /// Build the addressed request form: `[model, pin, address, reply]`.
    pub fn addressed_request(model: i32, pin: i32, address: i32, reply: ReplyPort) -> Self {
        Value::Array(vec![
            Value::Int32(model),
            Value::Int32(pin),
            Value::Int32(address),
            Value::ReplyPort(reply),
        ])
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Array(values) => write!(f, "<array of {}>", values.len()),
            other => write!(f, "<{}>", other.kind()),
        }
    }
}
