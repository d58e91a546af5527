//! # DFS RMI
//!
//! Remote method invocation for the distributed filesystem.
//!
//! Handles:
//! - Wire framing of calls and responses ([`codec`])
//! - The contract a remote interface must satisfy ([`RemoteInterface`])
//! - The server side: a thread-per-connection [`Skeleton`] bound to an implementation
//! - The client side: a [`Stub`] that forwards each call over a fresh connection
//!
//! Every remote interface names a single error type that must be constructible from
//! [`RmiError`]. That bound is how an interface declares its remote-failure outcome: an
//! interface that cannot represent a transport failure does not compile.

#![warn(rust_2018_idioms)]

pub mod codec;
mod interface;
mod skeleton;
mod stub;

pub use codec::{Args, Reply};
pub use interface::{Method, RemoteError, RemoteInterface};
pub use skeleton::{DefaultHooks, ListenAction, Skeleton, SkeletonHooks};
pub use stub::Stub;

/// Transport-level failures.
///
/// These are distinct from application errors raised by a remote implementation: an
/// application error arrives at the caller as the interface's own error value, while
/// anything that went wrong moving the call across the network, or finding something to
/// run it, is an `RmiError`.
#[derive(Debug, thiserror::Error)]
pub enum RmiError {
    /// Connecting, sending or receiving failed
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),

    /// A value could not be encoded for the wire
    #[error("failed to encode message: {0}")]
    Encode(String),

    /// A message or value could not be decoded
    #[error("failed to decode message: {0}")]
    Decode(String),

    /// The peer violated the framing protocol
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The remote skeleton could not dispatch the call
    #[error("remote dispatch failed: {0}")]
    Dispatch(String),

    /// The skeleton has not been given or assigned an address yet
    #[error("skeleton has no address assigned")]
    NoAddress,

    /// The skeleton is already running
    #[error("skeleton is already running")]
    AlreadyRunning,
}

/// Result type for transport operations.
pub type RmiResult<T> = Result<T, RmiError>;

#[cfg(test)]
pub(crate) mod testing {
    //! A small remote interface used to exercise the transport end to end.

    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, thiserror::Error, Serialize, Deserialize)]
    pub enum CalcError {
        #[error("division by zero")]
        DivideByZero,
        #[error("refusing to negate {0}")]
        Refused(i64),
        #[error(transparent)]
        #[serde(skip)]
        Rmi(#[from] RmiError),
    }

    pub trait Calculator: Send + Sync {
        fn add(&self, a: i64, b: i64) -> Result<i64, CalcError>;
        fn divide(&self, a: i64, b: i64) -> Result<i64, CalcError>;
        fn negate(&self, a: i64) -> Result<i64, CalcError>;
    }

    pub struct CalculatorApi;

    pub const ADD: Method = Method::new("add", &["i64", "i64"]);
    pub const DIVIDE: Method = Method::new("divide", &["i64", "i64"]);
    pub const NEGATE: Method = Method::new("negate", &["i64"]);

    impl RemoteInterface for CalculatorApi {
        const NAME: &'static str = "Calculator";
        const METHODS: &'static [Method] = &[ADD, DIVIDE, NEGATE];
        type Target = dyn Calculator;
        type Error = CalcError;

        fn dispatch(target: &Self::Target, method: &Method, mut args: Args) -> RmiResult<Reply> {
            match method.name {
                "add" => {
                    let (a, b) = (args.next()?, args.next()?);
                    args.finish()?;
                    Reply::from_result(target.add(a, b))
                }
                "divide" => {
                    let (a, b) = (args.next()?, args.next()?);
                    args.finish()?;
                    Reply::from_result(target.divide(a, b))
                }
                "negate" => {
                    let a = args.next()?;
                    args.finish()?;
                    Reply::from_result(target.negate(a))
                }
                other => Err(RmiError::Dispatch(format!("unknown method {other}"))),
            }
        }
    }

    impl Calculator for Stub<CalculatorApi> {
        fn add(&self, a: i64, b: i64) -> Result<i64, CalcError> {
            self.call(&ADD, (a, b))
        }

        fn divide(&self, a: i64, b: i64) -> Result<i64, CalcError> {
            self.call(&DIVIDE, (a, b))
        }

        fn negate(&self, a: i64) -> Result<i64, CalcError> {
            self.call(&NEGATE, (a,))
        }
    }

    #[derive(Default)]
    pub struct LocalCalculator;

    impl Calculator for LocalCalculator {
        fn add(&self, a: i64, b: i64) -> Result<i64, CalcError> {
            Ok(a + b)
        }

        fn divide(&self, a: i64, b: i64) -> Result<i64, CalcError> {
            if b == 0 {
                return Err(CalcError::DivideByZero);
            }
            Ok(a / b)
        }

        fn negate(&self, a: i64) -> Result<i64, CalcError> {
            if a == i64::MIN {
                panic!("cannot negate i64::MIN");
            }
            if a == 7 {
                return Err(CalcError::Refused(a));
            }
            Ok(-a)
        }
    }
}
