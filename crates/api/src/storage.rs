use crate::{StorageError, StorageResult};
use dfs_common::Path;
use dfs_rmi::{Args, Method, RemoteInterface, Reply, RmiError, RmiResult, Stub};

/// Client-facing file data access on a storage server.
pub trait Storage: Send + Sync {
    /// Returns the length of the file in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if `path` is not a file on this server.
    fn size(&self, path: &Path) -> StorageResult<u64>;

    /// Reads `length` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if `path` is not a file on this server and
    /// [`StorageError::OutOfBounds`] if the range extends past the end of the file.
    fn read(&self, path: &Path, offset: u64, length: u64) -> StorageResult<Vec<u8>>;

    /// Writes `data` starting at `offset`, growing the file if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if `path` is not a file on this server.
    fn write(&self, path: &Path, offset: u64, data: &[u8]) -> StorageResult<()>;
}

/// Remote descriptor of [`Storage`].
pub struct StorageApi;

/// Network handle to a storage server's [`Storage`] service.
pub type StorageStub = Stub<StorageApi>;

const SIZE: Method = Method::new("size", &["Path"]);
const READ: Method = Method::new("read", &["Path", "u64", "u64"]);
const WRITE: Method = Method::new("write", &["Path", "u64", "Vec<u8>"]);

impl RemoteInterface for StorageApi {
    const NAME: &'static str = "Storage";
    const METHODS: &'static [Method] = &[SIZE, READ, WRITE];
    type Target = dyn Storage;
    type Error = StorageError;

    fn dispatch(target: &Self::Target, method: &Method, mut args: Args) -> RmiResult<Reply> {
        let path: Path = args.next()?;
        match method.name {
            "size" => {
                args.finish()?;
                Reply::from_result(target.size(&path))
            }
            "read" => {
                let (offset, length) = (args.next()?, args.next()?);
                args.finish()?;
                Reply::from_result(target.read(&path, offset, length))
            }
            "write" => {
                let offset = args.next()?;
                let data: Vec<u8> = args.next()?;
                args.finish()?;
                Reply::from_result(target.write(&path, offset, &data))
            }
            other => Err(RmiError::Dispatch(format!("Storage has no method {other}"))),
        }
    }
}

impl Storage for StorageStub {
    fn size(&self, path: &Path) -> StorageResult<u64> {
        self.call(&SIZE, (path,))
    }

    fn read(&self, path: &Path, offset: u64, length: u64) -> StorageResult<Vec<u8>> {
        self.call(&READ, (path, offset, length))
    }

    fn write(&self, path: &Path, offset: u64, data: &[u8]) -> StorageResult<()> {
        self.call(&WRITE, (path, offset, data))
    }
}
