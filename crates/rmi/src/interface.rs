//! The contract between a remote interface, its skeleton and its stub.

use crate::codec::{Args, Reply};
use crate::{RmiError, RmiResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A remote method as identified on the wire: its name and parameter type signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Method {
    pub name: &'static str,
    pub params: &'static [&'static str],
}

impl Method {
    pub const fn new(name: &'static str, params: &'static [&'static str]) -> Self {
        Self { name, params }
    }

    /// The parameter signature as sent in a call.
    pub fn signature(&self) -> Vec<String> {
        self.params.iter().map(|p| (*p).to_owned()).collect()
    }

    /// Returns `true` if a call naming `name` with `signature` targets this method.
    pub fn matches(&self, name: &str, signature: &[String]) -> bool {
        self.name == name
            && self.params.len() == signature.len()
            && self.params.iter().zip(signature).all(|(a, b)| *a == b.as_str())
    }
}

/// An error type able to describe both application failures and transport failures.
///
/// Application variants travel across the wire; the variant wrapping [`RmiError`] is
/// produced locally by the stub.
pub trait RemoteError:
    std::error::Error + From<RmiError> + Serialize + DeserializeOwned + Send + 'static
{
}

impl<E> RemoteError for E where
    E: std::error::Error + From<RmiError> + Serialize + DeserializeOwned + Send + 'static
{
}

/// Describes a remote interface.
///
/// Implemented by a zero-sized marker type per interface. The marker ties together the
/// trait that implementations provide (`Target`), the shared error type, the method table
/// the skeleton dispatches against, and the mapping from a decoded call onto a trait
/// method.
pub trait RemoteInterface: Send + Sync + 'static {
    /// Interface identity, part of every stub's identity.
    const NAME: &'static str;

    /// Every method the interface exposes.
    const METHODS: &'static [Method];

    /// The trait object implementations are bound as.
    type Target: ?Sized + Send + Sync + 'static;

    /// The error every method of the interface returns.
    type Error: RemoteError;

    /// Invokes `method` on `target` with decoded arguments.
    ///
    /// Only called with a method taken from [`Self::METHODS`].
    fn dispatch(target: &Self::Target, method: &Method, args: Args) -> RmiResult<Reply>;

    /// Finds the method a call refers to.
    fn lookup(name: &str, signature: &[String]) -> Option<&'static Method> {
        Self::METHODS.iter().find(|m| m.matches(name, signature))
    }
}
