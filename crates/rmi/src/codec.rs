//! Wire format for remote calls.
//!
//! Every message is a single frame: a 4-byte big-endian payload length followed by a
//! JSON payload. One connection carries exactly one request frame followed by exactly
//! one response frame.
//!
//! ```text
//! request  = { "method": "list", "signature": ["Path"], "args": ["/a/b"] }
//! response = { "ok": true,  "payload": ["c.txt", "d.txt"] }
//!          | { "ok": false, "payload": { "application": <error value> } }
//!          | { "ok": false, "payload": { "dispatch": "<reason>" } }
//! ```

use crate::{RmiError, RmiResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{Read, Write};

/// Length prefix size for frames.
pub const FRAME_LEN_BYTES: usize = 4;

/// Largest payload accepted from a peer.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// A method call as sent by a stub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    /// Name of the method to invoke
    pub method: String,
    /// Parameter type identifiers, in declaration order
    pub signature: Vec<String>,
    /// Encoded arguments matching `signature`
    pub args: Vec<Value>,
}

/// A response as sent by a skeleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// `true` if `payload` is the return value, `false` if it is a [`Fault`]
    pub ok: bool,
    pub payload: Value,
}

/// Why a call did not return a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    /// The implementation returned an error value
    Application(Value),
    /// The call could not be decoded or dispatched
    Dispatch(String),
}

impl Response {
    /// A successful response carrying `value`.
    pub fn returned(value: Value) -> Self {
        Self {
            ok: true,
            payload: value,
        }
    }

    /// A failed response carrying `fault`.
    ///
    /// A fault that cannot be encoded is replaced by a dispatch fault saying so.
    pub fn fault(fault: Fault) -> Self {
        let payload = serde_json::to_value(&fault)
            .or_else(|e| serde_json::to_value(Fault::Dispatch(format!("unencodable fault: {e}"))))
            .unwrap_or(Value::Null);
        Self { ok: false, payload }
    }

    /// Splits the response into the return value or the fault.
    ///
    /// # Errors
    ///
    /// Returns [`RmiError::Decode`] if a failed response does not carry a valid fault.
    pub fn into_result(self) -> RmiResult<Result<Value, Fault>> {
        if self.ok {
            return Ok(Ok(self.payload));
        }
        serde_json::from_value(self.payload)
            .map(Err)
            .map_err(|e| RmiError::Decode(format!("malformed fault: {e}")))
    }
}

/// The outcome of invoking an implementation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The method returned normally
    Return(Value),
    /// The method returned an application error
    Raise(Value),
}

impl Reply {
    /// Encodes the result of a local invocation.
    ///
    /// # Errors
    ///
    /// Returns [`RmiError::Encode`] if either the value or the error cannot be encoded.
    /// Error variants that wrap a local transport failure are deliberately not encodable,
    /// so they surface at the caller as a dispatch failure rather than as an application
    /// error.
    pub fn from_result<T, E>(result: Result<T, E>) -> RmiResult<Self>
    where
        T: Serialize,
        E: Serialize + std::fmt::Display,
    {
        match result {
            Ok(value) => serde_json::to_value(value)
                .map(Reply::Return)
                .map_err(|e| RmiError::Encode(e.to_string())),
            Err(error) => serde_json::to_value(&error)
                .map(Reply::Raise)
                .map_err(|e| RmiError::Encode(format!("{error} ({e})"))),
        }
    }
}

impl From<Reply> for Response {
    fn from(reply: Reply) -> Self {
        match reply {
            Reply::Return(value) => Response::returned(value),
            Reply::Raise(error) => Response::fault(Fault::Application(error)),
        }
    }
}

/// Positional argument decoder handed to [`RemoteInterface::dispatch`].
///
/// [`RemoteInterface::dispatch`]: crate::RemoteInterface::dispatch
#[derive(Debug)]
pub struct Args {
    values: std::vec::IntoIter<Value>,
    position: usize,
}

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into_iter(),
            position: 0,
        }
    }

    /// Decodes the next argument.
    ///
    /// # Errors
    ///
    /// Returns [`RmiError::Decode`] if the argument is missing or has the wrong shape.
    pub fn next<T: DeserializeOwned>(&mut self) -> RmiResult<T> {
        let position = self.position;
        self.position += 1;

        let value = self
            .values
            .next()
            .ok_or_else(|| RmiError::Decode(format!("missing argument {position}")))?;

        serde_json::from_value(value)
            .map_err(|e| RmiError::Decode(format!("argument {position}: {e}")))
    }

    /// Asserts that every argument has been consumed.
    ///
    /// # Errors
    ///
    /// Returns [`RmiError::Decode`] if unread arguments remain.
    pub fn finish(mut self) -> RmiResult<()> {
        match self.values.next() {
            None => Ok(()),
            Some(_) => Err(RmiError::Decode(format!(
                "unexpected argument {}",
                self.position
            ))),
        }
    }
}

/// Encodes an argument tuple as a positional argument list.
///
/// Tuples (including 1-tuples) encode as JSON arrays; `()` encodes as no arguments.
pub fn encode_args<A: Serialize>(args: A) -> RmiResult<Vec<Value>> {
    match serde_json::to_value(args).map_err(|e| RmiError::Encode(e.to_string()))? {
        Value::Array(values) => Ok(values),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![other]),
    }
}

/// Writes a single length-prefixed frame.
///
/// # Errors
///
/// Returns [`RmiError::Encode`] if `message` cannot be encoded, [`RmiError::Protocol`]
/// if it exceeds [`MAX_FRAME_LEN`], and [`RmiError::Transport`] if writing fails.
pub fn write_frame<W, T>(writer: &mut W, message: &T) -> RmiResult<()>
where
    W: Write,
    T: Serialize,
{
    let payload = serde_json::to_vec(message).map_err(|e| RmiError::Encode(e.to_string()))?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(RmiError::Protocol(format!(
            "frame of {} bytes exceeds limit of {} bytes",
            payload.len(),
            MAX_FRAME_LEN
        )));
    }

    let len_bytes = (payload.len() as u32).to_be_bytes();
    writer.write_all(&len_bytes)?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

/// Reads a single length-prefixed frame.
///
/// # Errors
///
/// Returns [`RmiError::Transport`] if the stream fails or ends early,
/// [`RmiError::Protocol`] if the announced length exceeds [`MAX_FRAME_LEN`], and
/// [`RmiError::Decode`] if the payload is not a valid `T`.
pub fn read_frame<R, T>(reader: &mut R) -> RmiResult<T>
where
    R: Read,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; FRAME_LEN_BYTES];
    reader.read_exact(&mut len_buf)?;

    let payload_len = u32::from_be_bytes(len_buf) as usize;
    if payload_len > MAX_FRAME_LEN {
        return Err(RmiError::Protocol(format!(
            "announced frame of {payload_len} bytes exceeds limit of {MAX_FRAME_LEN} bytes"
        )));
    }

    let mut payload = vec![0u8; payload_len];
    reader.read_exact(&mut payload)?;

    serde_json::from_slice(&payload).map_err(|e| RmiError::Decode(e.to_string()))
}
