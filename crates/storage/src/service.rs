//! Physical file operations under a storage server's root directory.

use dfs_api::{Command, Storage, StorageError, StorageResult};
use dfs_common::Path;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Serves file data from a local directory.
///
/// Every distributed filesystem path maps onto the same relative path beneath `root`.
/// Operations are serialised by an internal lock, so a read never observes a write half
/// done.
#[derive(Debug)]
pub struct StorageService {
    /// Local directory holding this server's files
    root: PathBuf,
    lock: Mutex<()>,
}

impl StorageService {
    /// Creates a service for the files beneath `root`.
    ///
    /// The directory is not checked here; [`crate::StorageServer::start`] refuses to
    /// start on a missing root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Lists every file this server holds.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the root cannot be walked.
    pub fn files(&self) -> StorageResult<Vec<Path>> {
        let _guard = self.lock();
        Path::list_local(&self.root).map_err(|e| StorageError::Io(e.to_string()))
    }

    /// Removes empty directories from the parent of `path` upwards, stopping at the first
    /// non-empty directory. The root itself is never removed.
    pub fn prune_empty_parents(&self, path: &Path) {
        let _guard = self.lock();
        self.prune_locked(path);
    }

    fn prune_locked(&self, path: &Path) {
        let mut current = path.parent().ok();
        while let Some(directory) = current.filter(|d| !d.is_root()) {
            let local = directory.to_local(&self.root);
            let empty = fs::read_dir(&local)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if !empty {
                break;
            }
            if let Err(e) = fs::remove_dir(&local) {
                tracing::warn!("failed to prune {}: {}", local.display(), e);
                break;
            }
            current = directory.parent().ok();
        }
    }

    /// Resolves `path` to an existing regular file.
    fn file(&self, path: &Path) -> StorageResult<PathBuf> {
        let local = path.to_local(&self.root);
        if path.is_root() || !local.is_file() {
            return Err(StorageError::NotFound(path.clone()));
        }
        Ok(local)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for StorageService {
    fn size(&self, path: &Path) -> StorageResult<u64> {
        let _guard = self.lock();
        let local = self.file(path)?;
        Ok(fs::metadata(local)?.len())
    }

    fn read(&self, path: &Path, offset: u64, length: u64) -> StorageResult<Vec<u8>> {
        let _guard = self.lock();
        let local = self.file(path)?;
        let mut file = fs::File::open(local)?;
        let size = file.metadata()?.len();

        let out_of_bounds = || StorageError::OutOfBounds {
            path: path.clone(),
            offset,
            length,
            size,
        };
        let end = offset.checked_add(length).ok_or_else(out_of_bounds)?;
        if end > size {
            return Err(out_of_bounds());
        }
        let length = usize::try_from(length).map_err(|_| out_of_bounds())?;

        let mut buffer = vec![0u8; length];
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn write(&self, path: &Path, offset: u64, data: &[u8]) -> StorageResult<()> {
        let _guard = self.lock();
        let local = self.file(path)?;
        let mut file = OpenOptions::new().write(true).open(local)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }
}

impl Command for StorageService {
    fn create(&self, path: &Path) -> StorageResult<bool> {
        if path.is_root() {
            return Ok(false);
        }

        let _guard = self.lock();
        let local = path.to_local(&self.root);
        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent)?;
        }

        match OpenOptions::new().write(true).create_new(true).open(&local) {
            Ok(_) => {
                tracing::debug!("created {}", local.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, path: &Path) -> StorageResult<bool> {
        if path.is_root() {
            return Ok(false);
        }

        let _guard = self.lock();
        let local = path.to_local(&self.root);
        let metadata = match fs::symlink_metadata(&local) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            fs::remove_dir_all(&local)?;
        } else {
            fs::remove_file(&local)?;
        }
        tracing::debug!("deleted {}", local.display());

        self.prune_locked(path);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dfs_api::{CommandApi, StorageApi};
    use dfs_rmi::{Args, RemoteInterface, RmiError};
    use serde_json::json;
    use tempfile::TempDir;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    fn with_file(relative: &str, contents: &[u8]) -> (TempDir, StorageService) {
        let temp = TempDir::new().unwrap();
        let local = temp.path().join(relative);
        fs::create_dir_all(local.parent().unwrap()).unwrap();
        fs::write(local, contents).unwrap();
        let service = StorageService::new(temp.path());
        (temp, service)
    }

    #[test]
    fn test_size() {
        let (_temp, service) = with_file("a/b.txt", b"hello");
        assert_eq!(service.size(&p("/a/b.txt")).unwrap(), 5);
    }

    #[test]
    fn test_missing_and_directories_are_not_found() {
        let (_temp, service) = with_file("a/b.txt", b"hello");

        for path in ["/a", "/a/missing", "/"] {
            assert!(matches!(
                service.size(&p(path)),
                Err(StorageError::NotFound(_))
            ));
        }
        assert!(matches!(
            service.read(&p("/a"), 0, 0),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            service.write(&p("/nope"), 0, b"x"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_read_ranges() {
        let (_temp, service) = with_file("f", b"0123456789");

        assert_eq!(service.read(&p("/f"), 2, 3).unwrap(), b"234");
        assert_eq!(service.read(&p("/f"), 0, 10).unwrap(), b"0123456789");
        assert!(service.read(&p("/f"), 10, 0).unwrap().is_empty());
    }

    #[test]
    fn test_read_out_of_bounds() {
        let (_temp, service) = with_file("f", b"0123456789");

        assert!(matches!(
            service.read(&p("/f"), 8, 3),
            Err(StorageError::OutOfBounds { size: 10, .. })
        ));
        assert!(matches!(
            service.read(&p("/f"), u64::MAX, 2),
            Err(StorageError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_write_overwrites_and_extends() {
        let (temp, service) = with_file("f", b"abcdef");

        service.write(&p("/f"), 2, b"XY").unwrap();
        assert_eq!(fs::read(temp.path().join("f")).unwrap(), b"abXYef");

        service.write(&p("/f"), 5, b"1234").unwrap();
        assert_eq!(fs::read(temp.path().join("f")).unwrap(), b"abXYe1234");
        assert_eq!(service.size(&p("/f")).unwrap(), 9);
    }

    #[test]
    fn test_write_past_end_leaves_zero_gap() {
        let (temp, service) = with_file("f", b"ab");

        service.write(&p("/f"), 4, b"z").unwrap();
        assert_eq!(fs::read(temp.path().join("f")).unwrap(), b"ab\0\0z");
    }

    #[test]
    fn test_create_builds_parents() {
        let temp = TempDir::new().unwrap();
        let service = StorageService::new(temp.path());

        assert!(service.create(&p("/x/y/z.txt")).unwrap());
        assert!(temp.path().join("x/y/z.txt").is_file());
        assert_eq!(service.size(&p("/x/y/z.txt")).unwrap(), 0);

        assert!(!service.create(&p("/x/y/z.txt")).unwrap());
        assert!(!service.create(&Path::root()).unwrap());
    }

    #[test]
    fn test_delete_file_prunes_empty_parents() {
        let (temp, service) = with_file("a/b/c.txt", b"x");
        fs::write(temp.path().join("keep.txt"), b"k").unwrap();

        assert!(service.delete(&p("/a/b/c.txt")).unwrap());

        assert!(!temp.path().join("a").exists());
        assert!(temp.path().join("keep.txt").is_file());
        assert!(temp.path().is_dir());
    }

    #[test]
    fn test_delete_stops_pruning_at_non_empty_directory() {
        let (temp, service) = with_file("a/b/c.txt", b"x");
        fs::write(temp.path().join("a/other.txt"), b"o").unwrap();

        assert!(service.delete(&p("/a/b/c.txt")).unwrap());

        assert!(!temp.path().join("a/b").exists());
        assert!(temp.path().join("a/other.txt").is_file());
    }

    #[test]
    fn test_delete_directory_is_recursive() {
        let (temp, service) = with_file("d/e/f.txt", b"x");
        fs::write(temp.path().join("d/g.txt"), b"y").unwrap();

        assert!(service.delete(&p("/d")).unwrap());
        assert!(!temp.path().join("d").exists());
    }

    #[test]
    fn test_delete_missing_and_root() {
        let (temp, service) = with_file("f", b"x");

        assert!(!service.delete(&p("/missing")).unwrap());
        assert!(!service.delete(&Path::root()).unwrap());
        assert!(temp.path().join("f").is_file());
    }

    #[test]
    fn test_files_lists_everything() {
        let (temp, service) = with_file("a/b.txt", b"");
        fs::write(temp.path().join("c.txt"), b"").unwrap();

        assert_eq!(service.files().unwrap(), vec![p("/a/b.txt"), p("/c.txt")]);
    }

    #[test]
    fn test_remote_paths_cannot_leave_root() {
        let outer = TempDir::new().unwrap();
        let root = outer.path().join("root");
        fs::create_dir_all(&root).unwrap();
        fs::write(outer.path().join("secret.txt"), b"outside").unwrap();
        let service = StorageService::new(&root);

        let read = StorageApi::lookup("read", &READ_SIGNATURE.map(String::from)).unwrap();
        let args = Args::new(vec![json!("/../secret.txt"), json!(0), json!(7)]);
        let result = StorageApi::dispatch(&service, read, args);
        assert!(matches!(result, Err(RmiError::Decode(_))));

        let delete = CommandApi::lookup("delete", &["Path".to_owned()]).unwrap();
        let result = CommandApi::dispatch(&service, delete, Args::new(vec![json!("/..")]));
        assert!(matches!(result, Err(RmiError::Decode(_))));

        assert!(root.is_dir());
        assert_eq!(fs::read(outer.path().join("secret.txt")).unwrap(), b"outside");
    }

    const READ_SIGNATURE: [&str; 3] = ["Path", "u64", "u64"];
}
