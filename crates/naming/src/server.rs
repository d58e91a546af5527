use crate::{NamingConfig, NamingService};
use dfs_api::{
    Registration, RegistrationApi, RegistrationStub, ServerHooks, Service, ServiceApi,
    ServiceStub,
};
use dfs_rmi::{RmiResult, Skeleton, Stub};
use std::sync::Arc;

/// The naming server process: one [`NamingService`] exposed through two skeletons.
///
/// Clients reach the service interface, storage servers the registration interface. Both
/// share the same directory tree and registry.
pub struct NamingServer {
    service: Arc<NamingService>,
    hooks: Arc<ServerHooks>,
    service_skeleton: Skeleton<ServiceApi>,
    registration_skeleton: Skeleton<RegistrationApi>,
}

impl NamingServer {
    pub fn new(config: &NamingConfig) -> Self {
        let service = Arc::new(NamingService::new());
        let hooks = Arc::new(ServerHooks::new("naming"));

        let service_skeleton = Skeleton::<ServiceApi>::with_address(
            Arc::clone(&service) as Arc<dyn Service>,
            config.service_addr(),
        )
        .with_hooks(hooks.clone());
        let registration_skeleton = Skeleton::<RegistrationApi>::with_address(
            Arc::clone(&service) as Arc<dyn Registration>,
            config.registration_addr(),
        )
        .with_hooks(hooks.clone());

        Self {
            service,
            hooks,
            service_skeleton,
            registration_skeleton,
        }
    }

    /// Starts both skeletons.
    ///
    /// # Errors
    ///
    /// Returns the skeleton error if either fails to start. Nothing is left running in
    /// that case.
    pub fn start(&self) -> RmiResult<()> {
        tracing::info!("-- Starting naming server");
        self.hooks.started();

        self.service_skeleton.start()?;
        if let Err(e) = self.registration_skeleton.start() {
            self.service_skeleton.stop();
            return Err(e);
        }

        tracing::info!(
            "-- Naming server ready (service {:?}, registration {:?})",
            self.service_skeleton.address(),
            self.registration_skeleton.address()
        );
        Ok(())
    }

    /// Stops both skeletons.
    pub fn stop(&self) {
        self.service_skeleton.stop();
        self.registration_skeleton.stop();
    }

    /// Blocks until either skeleton stops.
    pub fn wait(&self) {
        self.hooks.wait();
    }

    pub fn is_running(&self) -> bool {
        self.service_skeleton.is_running() && self.registration_skeleton.is_running()
    }

    /// The local naming service behind both skeletons.
    pub fn service(&self) -> &Arc<NamingService> {
        &self.service
    }

    /// A stub for the service interface, reachable from this machine.
    ///
    /// # Errors
    ///
    /// Returns [`dfs_rmi::RmiError::NoAddress`] if the server has never been started
    /// and was not given a fixed address.
    pub fn service_stub(&self) -> RmiResult<ServiceStub> {
        Stub::from_skeleton(&self.service_skeleton)
    }

    /// A stub for the registration interface, reachable from this machine.
    ///
    /// # Errors
    ///
    /// See [`NamingServer::service_stub`].
    pub fn registration_stub(&self) -> RmiResult<RegistrationStub> {
        Stub::from_skeleton(&self.registration_skeleton)
    }
}
