use crate::{StorageError, StorageResult};
use dfs_common::Path;
use dfs_rmi::{Args, Method, RemoteInterface, Reply, RmiError, RmiResult, Stub};

/// Naming server control of a storage server's local files.
pub trait Command: Send + Sync {
    /// Creates an empty file, along with any missing parent directories.
    ///
    /// Returns `false` if `path` is the root or the file already exists.
    fn create(&self, path: &Path) -> StorageResult<bool>;

    /// Deletes a file, or a directory and everything beneath it.
    ///
    /// Returns `false` if `path` is the root or does not exist.
    fn delete(&self, path: &Path) -> StorageResult<bool>;
}

/// Remote descriptor of [`Command`].
pub struct CommandApi;

/// Network handle to a storage server's [`Command`] service.
pub type CommandStub = Stub<CommandApi>;

const CREATE: Method = Method::new("create", &["Path"]);
const DELETE: Method = Method::new("delete", &["Path"]);

impl RemoteInterface for CommandApi {
    const NAME: &'static str = "Command";
    const METHODS: &'static [Method] = &[CREATE, DELETE];
    type Target = dyn Command;
    type Error = StorageError;

    fn dispatch(target: &Self::Target, method: &Method, mut args: Args) -> RmiResult<Reply> {
        let path: Path = args.next()?;
        args.finish()?;

        match method.name {
            "create" => Reply::from_result(target.create(&path)),
            "delete" => Reply::from_result(target.delete(&path)),
            other => Err(RmiError::Dispatch(format!("Command has no method {other}"))),
        }
    }
}

impl Command for CommandStub {
    fn create(&self, path: &Path) -> StorageResult<bool> {
        self.call(&CREATE, (path,))
    }

    fn delete(&self, path: &Path) -> StorageResult<bool> {
        self.call(&DELETE, (path,))
    }
}
