//! Client-side filesystem commands.
//!
//! Every command talks to the naming server's service interface; file data goes directly
//! to the storage server the naming server points at.

use anyhow::Context;
use dfs_api::{Service, Storage};
use dfs_common::Path;
use std::io::Write;

/// Largest slice of a file moved in one call.
const CHUNK_LEN: u64 = 1024 * 1024;

/// Prints the entries of a directory, one per line.
pub fn list(service: &dyn Service, path: &Path, out: &mut dyn Write) -> anyhow::Result<()> {
    for name in service.list(path)? {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

/// Prints whether `path` is a file or a directory.
pub fn stat(service: &dyn Service, path: &Path, out: &mut dyn Write) -> anyhow::Result<()> {
    let kind = if service.is_directory(path)? {
        "directory"
    } else {
        "file"
    };
    writeln!(out, "{path}: {kind}")?;
    Ok(())
}

/// Prints the storage server holding a file.
pub fn locate(service: &dyn Service, path: &Path, out: &mut dyn Write) -> anyhow::Result<()> {
    let storage = service.get_storage(path)?;
    writeln!(out, "{path}: {storage}")?;
    Ok(())
}

/// Copies a file's contents to `out`.
pub fn cat(service: &dyn Service, path: &Path, out: &mut dyn Write) -> anyhow::Result<()> {
    let storage = service.get_storage(path)?;
    let size = storage.size(path)?;

    let mut offset = 0;
    while offset < size {
        let length = CHUNK_LEN.min(size - offset);
        let data = storage
            .read(path, offset, length)
            .with_context(|| format!("reading {path} at offset {offset}"))?;
        out.write_all(&data)?;
        offset += length;
    }
    out.flush()?;
    Ok(())
}

/// Writes `data` to a file, creating it first if needed.
///
/// Existing contents beyond the length of `data` are left in place.
pub fn put(service: &dyn Service, path: &Path, data: &[u8]) -> anyhow::Result<()> {
    if !service.create_file(path)? {
        tracing::debug!("{} already exists, overwriting", path);
    }
    let storage = service.get_storage(path)?;

    let mut offset = 0u64;
    for chunk in data.chunks(CHUNK_LEN as usize) {
        storage
            .write(path, offset, chunk)
            .with_context(|| format!("writing {path} at offset {offset}"))?;
        offset += chunk.len() as u64;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dfs_naming::{NamingConfig, NamingServer};
    use dfs_storage::{StorageConfig, StorageServer};
    use tempfile::TempDir;

    struct Cluster {
        naming: NamingServer,
        _storage: StorageServer,
        _root: TempDir,
    }

    fn cluster() -> Cluster {
        let any_port = "127.0.0.1:0".parse().unwrap();
        let naming = NamingServer::new(&NamingConfig::new(any_port, any_port));
        naming.start().unwrap();

        let root = TempDir::new().unwrap();
        let storage = StorageServer::new(&StorageConfig::new(root.path()));
        storage
            .start("127.0.0.1", &naming.registration_stub().unwrap())
            .unwrap();

        Cluster {
            naming,
            _storage: storage,
            _root: root,
        }
    }

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    fn output(f: impl FnOnce(&mut dyn Write) -> anyhow::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_put_then_cat() {
        let cluster = cluster();
        let service = cluster.naming.service_stub().unwrap();

        put(&service, &p("/hello.txt"), b"hello, world").unwrap();

        assert_eq!(
            output(|out| cat(&service, &p("/hello.txt"), out)),
            "hello, world"
        );
        assert_eq!(
            output(|out| stat(&service, &p("/hello.txt"), out)),
            "/hello.txt: file\n"
        );
    }

    #[test]
    fn test_list_and_locate() {
        let cluster = cluster();
        let service = cluster.naming.service_stub().unwrap();
        service.create_directory(&p("/docs")).unwrap();
        put(&service, &p("/docs/a"), b"").unwrap();
        put(&service, &p("/docs/b"), b"").unwrap();

        assert_eq!(output(|out| list(&service, &p("/docs"), out)), "a\nb\n");
        assert!(output(|out| locate(&service, &p("/docs/a"), out)).contains("Storage stub at"));
    }

    #[test]
    fn test_cat_missing_file_fails() {
        let cluster = cluster();
        let service = cluster.naming.service_stub().unwrap();

        let mut out = Vec::new();
        assert!(cat(&service, &p("/missing"), &mut out).is_err());
        assert!(out.is_empty());
    }
}
