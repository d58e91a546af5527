use crate::{NamingError, NamingResult, StorageStub};
use dfs_common::Path;
use dfs_rmi::{Args, Method, RemoteInterface, Reply, RmiError, RmiResult, Stub};
use std::collections::BTreeSet;

/// Client-facing operations of the naming server.
///
/// Paths are always absolute. Operations that need an existing directory report
/// [`NamingError::NotFound`] when it is missing, and report conflicts with existing
/// entries by returning `false`.
pub trait Service: Send + Sync {
    /// Returns `true` if `path` is a directory, `false` if it is a file.
    ///
    /// # Errors
    ///
    /// Returns [`NamingError::NotFound`] if `path` does not exist.
    fn is_directory(&self, path: &Path) -> NamingResult<bool>;

    /// Lists the names of the entries directly inside `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`NamingError::NotFound`] if `directory` does not exist or is a file.
    fn list(&self, directory: &Path) -> NamingResult<BTreeSet<String>>;

    /// Creates an empty file on one of the registered storage servers.
    ///
    /// Returns `false` if `path` is the root or already exists.
    ///
    /// # Errors
    ///
    /// Returns [`NamingError::NotFound`] if the parent directory does not exist,
    /// [`NamingError::NoStorageServers`] if there is nowhere to put the file, and
    /// [`NamingError::StorageUnavailable`] if the chosen server cannot be reached.
    fn create_file(&self, path: &Path) -> NamingResult<bool>;

    /// Creates an empty directory.
    ///
    /// Returns `false` if `path` is the root or already exists.
    ///
    /// # Errors
    ///
    /// Returns [`NamingError::NotFound`] if the parent directory does not exist.
    fn create_directory(&self, path: &Path) -> NamingResult<bool>;

    /// Deletes a file, or a directory and everything beneath it.
    ///
    /// Returns `false` for the root.
    ///
    /// # Errors
    ///
    /// Returns [`NamingError::NotFound`] if `path` or its parent does not exist.
    fn delete(&self, path: &Path) -> NamingResult<bool>;

    /// Returns a stub for the storage server holding the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`NamingError::NotFound`] if `path` is not a file.
    fn get_storage(&self, path: &Path) -> NamingResult<StorageStub>;
}

/// Remote descriptor of [`Service`].
pub struct ServiceApi;

/// Network handle to a naming server's [`Service`].
pub type ServiceStub = Stub<ServiceApi>;

const IS_DIRECTORY: Method = Method::new("is_directory", &["Path"]);
const LIST: Method = Method::new("list", &["Path"]);
const CREATE_FILE: Method = Method::new("create_file", &["Path"]);
const CREATE_DIRECTORY: Method = Method::new("create_directory", &["Path"]);
const DELETE: Method = Method::new("delete", &["Path"]);
const GET_STORAGE: Method = Method::new("get_storage", &["Path"]);

impl RemoteInterface for ServiceApi {
    const NAME: &'static str = "Service";
    const METHODS: &'static [Method] = &[
        IS_DIRECTORY,
        LIST,
        CREATE_FILE,
        CREATE_DIRECTORY,
        DELETE,
        GET_STORAGE,
    ];
    type Target = dyn Service;
    type Error = NamingError;

    fn dispatch(target: &Self::Target, method: &Method, mut args: Args) -> RmiResult<Reply> {
        let path: Path = args.next()?;
        args.finish()?;

        match method.name {
            "is_directory" => Reply::from_result(target.is_directory(&path)),
            "list" => Reply::from_result(target.list(&path)),
            "create_file" => Reply::from_result(target.create_file(&path)),
            "create_directory" => Reply::from_result(target.create_directory(&path)),
            "delete" => Reply::from_result(target.delete(&path)),
            "get_storage" => Reply::from_result(target.get_storage(&path)),
            other => Err(RmiError::Dispatch(format!("Service has no method {other}"))),
        }
    }
}

impl Service for ServiceStub {
    fn is_directory(&self, path: &Path) -> NamingResult<bool> {
        self.call(&IS_DIRECTORY, (path,))
    }

    fn list(&self, directory: &Path) -> NamingResult<BTreeSet<String>> {
        self.call(&LIST, (directory,))
    }

    fn create_file(&self, path: &Path) -> NamingResult<bool> {
        self.call(&CREATE_FILE, (path,))
    }

    fn create_directory(&self, path: &Path) -> NamingResult<bool> {
        self.call(&CREATE_DIRECTORY, (path,))
    }

    fn delete(&self, path: &Path) -> NamingResult<bool> {
        self.call(&DELETE, (path,))
    }

    fn get_storage(&self, path: &Path) -> NamingResult<StorageStub> {
        self.call(&GET_STORAGE, (path,))
    }
}
