//! Client side of a remote interface.

use crate::codec::{self, Call, Fault, Response};
use crate::skeleton::wake_address;
use crate::{Method, RemoteInterface, RmiError, RmiResult, Skeleton};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::net::{SocketAddr, TcpStream};

/// A network handle to a remote object implementing interface `I`.
///
/// A stub is only an address: it holds no connection and is cheap to clone, compare,
/// hash and send over the wire. Each call opens a fresh connection to the skeleton, sends
/// one request and waits for one response.
///
/// Two stubs are equal when they implement the same interface and point at the same
/// host and port.
pub struct Stub<I: RemoteInterface> {
    host: String,
    port: u16,
    _interface: PhantomData<fn() -> I>,
}

impl<I: RemoteInterface> Stub<I> {
    /// Creates a stub for the skeleton at `host:port`.
    ///
    /// Nothing is contacted; a wrong address only shows up on the first call.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            _interface: PhantomData,
        }
    }

    /// Creates a stub for the skeleton at `address`.
    pub fn from_addr(address: SocketAddr) -> Self {
        Self::new(address.ip().to_string(), address.port())
    }

    /// Creates a stub for a local skeleton.
    ///
    /// A skeleton listening on the wildcard address is reached through loopback, so the
    /// result is only usable on the same machine. Remote clients need
    /// [`Stub::with_hostname`].
    ///
    /// # Errors
    ///
    /// Returns [`RmiError::NoAddress`] if the skeleton has neither been given an address
    /// nor been started.
    pub fn from_skeleton(skeleton: &Skeleton<I>) -> RmiResult<Self> {
        let address = skeleton.address().ok_or(RmiError::NoAddress)?;
        if address.port() == 0 {
            return Err(RmiError::NoAddress);
        }
        Ok(Self::from_addr(wake_address(address)))
    }

    /// Creates a stub for a skeleton using an externally reachable `hostname` and the
    /// skeleton's port.
    ///
    /// # Errors
    ///
    /// Returns [`RmiError::NoAddress`] if the skeleton has no port yet.
    pub fn with_hostname(skeleton: &Skeleton<I>, hostname: impl Into<String>) -> RmiResult<Self> {
        match skeleton.address() {
            Some(address) if address.port() != 0 => Ok(Self::new(hostname, address.port())),
            _ => Err(RmiError::NoAddress),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Invokes `method` on the remote object.
    ///
    /// `args` is a tuple of the method's arguments in declaration order, e.g. `(path,)`.
    ///
    /// # Errors
    ///
    /// An application error raised by the implementation is returned as is. Any failure
    /// to reach the skeleton, exchange messages with it, or have it dispatch the call is
    /// returned as the interface error built from the underlying [`RmiError`].
    pub fn call<A, T>(&self, method: &Method, args: A) -> Result<T, I::Error>
    where
        A: Serialize,
        T: DeserializeOwned,
    {
        let response = self.exchange(method, args).map_err(I::Error::from)?;

        match response.into_result().map_err(I::Error::from)? {
            Ok(value) => serde_json::from_value(value).map_err(|e| {
                I::Error::from(RmiError::Decode(format!(
                    "{}.{} return value: {e}",
                    I::NAME,
                    method.name
                )))
            }),
            Err(Fault::Application(value)) => {
                Err(serde_json::from_value(value).unwrap_or_else(|e| {
                    I::Error::from(RmiError::Decode(format!(
                        "{}.{} error value: {e}",
                        I::NAME,
                        method.name
                    )))
                }))
            }
            Err(Fault::Dispatch(reason)) => Err(I::Error::from(RmiError::Dispatch(reason))),
        }
    }

    fn exchange<A: Serialize>(&self, method: &Method, args: A) -> RmiResult<Response> {
        let call = Call {
            method: method.name.to_owned(),
            signature: method.signature(),
            args: codec::encode_args(args)?,
        };

        let mut stream = TcpStream::connect((self.host.as_str(), self.port))?;
        codec::write_frame(&mut stream, &call)?;
        codec::read_frame(&mut stream)
    }
}

impl<I: RemoteInterface> Clone for Stub<I> {
    fn clone(&self) -> Self {
        Self::new(self.host.clone(), self.port)
    }
}

impl<I: RemoteInterface> PartialEq for Stub<I> {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host && self.port == other.port
    }
}

impl<I: RemoteInterface> Eq for Stub<I> {}

impl<I: RemoteInterface> Hash for Stub<I> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        I::NAME.hash(state);
        self.host.hash(state);
        self.port.hash(state);
    }
}

impl<I: RemoteInterface> fmt::Debug for Stub<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stub")
            .field("interface", &I::NAME)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl<I: RemoteInterface> fmt::Display for Stub<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stub at {}:{}", I::NAME, self.host, self.port)
    }
}

#[derive(Serialize, Deserialize)]
struct StubRepr {
    interface: String,
    host: String,
    port: u16,
}

impl<I: RemoteInterface> Serialize for Stub<I> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StubRepr {
            interface: I::NAME.to_owned(),
            host: self.host.clone(),
            port: self.port,
        }
        .serialize(serializer)
    }
}

impl<'de, I: RemoteInterface> Deserialize<'de> for Stub<I> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = StubRepr::deserialize(deserializer)?;
        if repr.interface != I::NAME {
            return Err(serde::de::Error::custom(format!(
                "expected a {} stub, found a {} stub",
                I::NAME,
                repr.interface
            )));
        }
        Ok(Self::new(repr.host, repr.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CalcError, Calculator, CalculatorApi, LocalCalculator};
    use std::collections::HashSet;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn running_skeleton() -> Skeleton<CalculatorApi> {
        let skeleton = Skeleton::<CalculatorApi>::with_address(
            Arc::new(LocalCalculator),
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
        );
        skeleton.start().unwrap();
        skeleton
    }

    #[test]
    fn test_call_round_trip() {
        let skeleton = running_skeleton();
        let stub = Stub::from_skeleton(&skeleton).unwrap();

        assert_eq!(stub.add(20, 22).unwrap(), 42);
        assert_eq!(stub.divide(9, 3).unwrap(), 3);
        assert_eq!(stub.negate(5).unwrap(), -5);
    }

    #[test]
    fn test_application_error_is_reraised() {
        let skeleton = running_skeleton();
        let stub = Stub::from_skeleton(&skeleton).unwrap();

        assert!(matches!(stub.divide(1, 0), Err(CalcError::DivideByZero)));
        assert!(matches!(stub.negate(7), Err(CalcError::Refused(7))));
    }

    #[test]
    fn test_panicking_implementation_is_dispatch_failure() {
        let skeleton = running_skeleton();
        let stub = Stub::from_skeleton(&skeleton).unwrap();

        assert!(matches!(
            stub.negate(i64::MIN),
            Err(CalcError::Rmi(RmiError::Dispatch(_)))
        ));
        // The skeleton survives the panic.
        assert_eq!(stub.add(1, 1).unwrap(), 2);
    }

    #[test]
    fn test_nothing_listening_is_transport_failure() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let stub = Stub::<CalculatorApi>::new("127.0.0.1", port);

        assert!(matches!(
            stub.add(1, 2),
            Err(CalcError::Rmi(RmiError::Transport(_)))
        ));
    }

    #[test]
    fn test_concurrent_calls() {
        let skeleton = running_skeleton();
        let stub = Stub::from_skeleton(&skeleton).unwrap();
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let stub = stub.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    stub.add(i, 100).unwrap()
                })
            })
            .collect();

        let mut results: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        results.sort_unstable();
        assert_eq!(results, (100..108).collect::<Vec<_>>());
    }

    #[test]
    fn test_from_unstarted_skeleton_has_no_address() {
        let skeleton = Skeleton::<CalculatorApi>::new(Arc::new(LocalCalculator));

        assert!(matches!(
            Stub::from_skeleton(&skeleton),
            Err(RmiError::NoAddress)
        ));
        assert!(matches!(
            Stub::with_hostname(&skeleton, "example.org"),
            Err(RmiError::NoAddress)
        ));
    }

    #[test]
    fn test_with_hostname_uses_skeleton_port() {
        let address: SocketAddr = "0.0.0.0:7100".parse().unwrap();
        let skeleton = Skeleton::<CalculatorApi>::with_address(Arc::new(LocalCalculator), address);

        let stub = Stub::with_hostname(&skeleton, "storage-1").unwrap();
        assert_eq!(stub.host(), "storage-1");
        assert_eq!(stub.port(), 7100);

        let local = Stub::from_skeleton(&skeleton).unwrap();
        assert_eq!(local.host(), "127.0.0.1");
    }

    #[test]
    fn test_equality_and_hash() {
        let a = Stub::<CalculatorApi>::new("127.0.0.1", 9000);
        let b = Stub::<CalculatorApi>::from_addr("127.0.0.1:9000".parse().unwrap());
        let c = Stub::<CalculatorApi>::new("127.0.0.1", 9001);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a.clone(), b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&a));
    }

    #[test]
    fn test_display() {
        let stub = Stub::<CalculatorApi>::new("host-a", 1234);
        assert_eq!(stub.to_string(), "Calculator stub at host-a:1234");
    }

    #[test]
    fn test_serialized_stub_keeps_identity() {
        let stub = Stub::<CalculatorApi>::new("host-a", 1234);
        let json = serde_json::to_value(&stub).unwrap();
        assert_eq!(json["interface"], "Calculator");

        let back: Stub<CalculatorApi> = serde_json::from_value(json).unwrap();
        assert_eq!(back, stub);
    }

    #[test]
    fn test_deserialize_rejects_other_interface() {
        let json = serde_json::json!({ "interface": "Storage", "host": "h", "port": 1 });
        assert!(serde_json::from_value::<Stub<CalculatorApi>>(json).is_err());
    }
}
