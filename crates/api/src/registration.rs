use crate::{CommandStub, NamingError, NamingResult, StorageStub};
use dfs_common::Path;
use dfs_rmi::{Args, Method, RemoteInterface, Reply, RmiError, RmiResult, Stub};

/// Storage-facing registration with the naming server.
pub trait Registration: Send + Sync {
    /// Registers a storage server and the files it holds.
    ///
    /// `storage` is the stub clients will be given for the server's files and `command`
    /// the stub the naming server uses to create and delete them. The command stub
    /// identifies the server: it may register only once.
    ///
    /// Returns the advertised paths that were not added because they clash with the
    /// existing tree. The storage server should delete those files locally.
    ///
    /// # Errors
    ///
    /// Returns [`NamingError::AlreadyRegistered`] if `command` has registered before.
    fn register(
        &self,
        storage: &StorageStub,
        command: &CommandStub,
        paths: &[Path],
    ) -> NamingResult<Vec<Path>>;
}

/// Remote descriptor of [`Registration`].
pub struct RegistrationApi;

/// Network handle to a naming server's [`Registration`] service.
pub type RegistrationStub = Stub<RegistrationApi>;

const REGISTER: Method = Method::new("register", &["StorageStub", "CommandStub", "Vec<Path>"]);

impl RemoteInterface for RegistrationApi {
    const NAME: &'static str = "Registration";
    const METHODS: &'static [Method] = &[REGISTER];
    type Target = dyn Registration;
    type Error = NamingError;

    fn dispatch(target: &Self::Target, method: &Method, mut args: Args) -> RmiResult<Reply> {
        match method.name {
            "register" => {
                let storage: StorageStub = args.next()?;
                let command: CommandStub = args.next()?;
                let paths: Vec<Path> = args.next()?;
                args.finish()?;
                Reply::from_result(target.register(&storage, &command, &paths))
            }
            other => Err(RmiError::Dispatch(format!(
                "Registration has no method {other}"
            ))),
        }
    }
}

impl Registration for RegistrationStub {
    fn register(
        &self,
        storage: &StorageStub,
        command: &CommandStub,
        paths: &[Path],
    ) -> NamingResult<Vec<Path>> {
        self.call(&REGISTER, (storage, command, paths))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Rejects every advertised path under `/dup`.
    struct RejectDup;

    impl Registration for RejectDup {
        fn register(
            &self,
            _storage: &StorageStub,
            _command: &CommandStub,
            paths: &[Path],
        ) -> NamingResult<Vec<Path>> {
            let dup = Path::parse("/dup").unwrap();
            Ok(paths.iter().filter(|p| p.is_subpath(&dup)).cloned().collect())
        }
    }

    #[test]
    fn test_dispatch_decodes_stubs_and_paths() {
        let signature = REGISTER.signature();
        let method = RegistrationApi::lookup("register", &signature).unwrap();
        let args = Args::new(vec![
            json!({ "interface": "Storage", "host": "s", "port": 7000 }),
            json!({ "interface": "Command", "host": "s", "port": 7001 }),
            json!(["/dup/x", "/keep"]),
        ]);

        let reply = RegistrationApi::dispatch(&RejectDup, method, args).unwrap();
        assert_eq!(reply, Reply::Return(json!(["/dup/x"])));
    }

    #[test]
    fn test_dispatch_rejects_swapped_stubs() {
        let signature = REGISTER.signature();
        let method = RegistrationApi::lookup("register", &signature).unwrap();
        let args = Args::new(vec![
            json!({ "interface": "Command", "host": "s", "port": 7001 }),
            json!({ "interface": "Storage", "host": "s", "port": 7000 }),
            json!([]),
        ]);

        let result = RegistrationApi::dispatch(&RejectDup, method, args);
        assert!(matches!(result, Err(RmiError::Decode(_))));
    }
}
