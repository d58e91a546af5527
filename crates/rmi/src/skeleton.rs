//! Server side of a remote interface.
//!
//! A [`Skeleton`] binds an implementation to a listening socket. Starting it spawns one
//! listening thread; every accepted connection gets its own handler thread, which reads
//! one call, runs it synchronously against the implementation, writes one response and
//! closes the connection. Calls on different connections therefore run in parallel and
//! implementations must be `Send + Sync`.
//!
//! Top-level failures are reported through [`SkeletonHooks`]:
//! - `listen_error` decides whether the listener resumes after an accept failure
//! - `service_error` receives failures a handler thread could not report to its caller
//! - `stopped` is called once the listener has exited, with the cause if it failed

use crate::codec::{self, Args, Call, Fault, Response};
use crate::{RemoteInterface, RmiError, RmiResult};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// What the listening thread does after an accept failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenAction {
    /// Keep accepting connections
    Resume,
    /// Shut the listener down
    Stop,
}

/// Callbacks for failures that have no caller to return to.
///
/// Hooks run on the skeleton's own threads and must not block for long. `stopped` is
/// never called with the skeleton's internal lock held, so it may restart the skeleton.
pub trait SkeletonHooks: Send + Sync + 'static {
    /// Called when accepting a connection fails. The default stops the listener.
    fn listen_error(&self, _error: &io::Error) -> ListenAction {
        ListenAction::Stop
    }

    /// Called when a handler thread fails to deliver its response.
    fn service_error(&self, _error: &RmiError) {}

    /// Called when the listener exits; `cause` is `None` after [`Skeleton::stop`].
    fn stopped(&self, _cause: Option<&RmiError>) {}
}

/// Hooks that stop on the first accept failure and otherwise do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHooks;

impl SkeletonHooks for DefaultHooks {}

struct Running {
    local: SocketAddr,
    stopping: Arc<AtomicBool>,
    listener: JoinHandle<()>,
}

struct State {
    address: Option<SocketAddr>,
    running: Option<Running>,
}

/// Multithreaded TCP server for the remote interface `I`.
pub struct Skeleton<I: RemoteInterface> {
    target: Arc<I::Target>,
    hooks: Arc<dyn SkeletonHooks>,
    state: Mutex<State>,
}

impl<I: RemoteInterface> Skeleton<I> {
    /// Creates a skeleton whose address is chosen by the system on [`start`].
    ///
    /// [`start`]: Skeleton::start
    pub fn new(target: Arc<I::Target>) -> Self {
        Self::build(target, None)
    }

    /// Creates a skeleton that will listen on `address`.
    ///
    /// Use this when the port is significant, for example for bootstrap services that
    /// clients reach at a well-known port.
    pub fn with_address(target: Arc<I::Target>, address: SocketAddr) -> Self {
        Self::build(target, Some(address))
    }

    fn build(target: Arc<I::Target>, address: Option<SocketAddr>) -> Self {
        Self {
            target,
            hooks: Arc::new(DefaultHooks),
            state: Mutex::new(State {
                address,
                running: None,
            }),
        }
    }

    /// Replaces the failure hooks.
    pub fn with_hooks(mut self, hooks: Arc<dyn SkeletonHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// The address the skeleton listens on, if one was given or has been assigned.
    pub fn address(&self) -> Option<SocketAddr> {
        lock(&self.state).address
    }

    /// Returns `true` while the listening thread is alive.
    pub fn is_running(&self) -> bool {
        lock(&self.state)
            .running
            .as_ref()
            .is_some_and(|r| !r.listener.is_finished())
    }

    /// Starts the listening thread and returns immediately.
    ///
    /// If no address was given, the system assigns a free port, which is kept as the
    /// skeleton's address for any later restart.
    ///
    /// # Errors
    ///
    /// Returns [`RmiError::AlreadyRunning`] if the skeleton is running, and
    /// [`RmiError::Transport`] if the socket cannot be bound or the thread cannot be
    /// created.
    pub fn start(&self) -> RmiResult<()> {
        let mut state = lock(&self.state);

        if let Some(running) = state.running.take() {
            if !running.listener.is_finished() {
                state.running = Some(running);
                return Err(RmiError::AlreadyRunning);
            }
            // The previous listener died on its own and has already reported why.
            join_listener::<I>(running.listener);
        }

        let bind_addr = state
            .address
            .unwrap_or_else(|| SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0));
        let listener = TcpListener::bind(bind_addr)?;
        let local = listener.local_addr()?;

        if state.address.map_or(true, |a| a.port() == 0) {
            state.address = Some(local);
        }

        let stopping = Arc::new(AtomicBool::new(false));
        let handle = {
            let target = Arc::clone(&self.target);
            let hooks = Arc::clone(&self.hooks);
            let stopping = Arc::clone(&stopping);
            thread::Builder::new()
                .name(format!("{}-listener", I::NAME))
                .spawn(move || listen::<I>(listener, target, hooks, stopping))?
        };

        tracing::info!("{} skeleton listening on {}", I::NAME, local);

        state.running = Some(Running {
            local,
            stopping,
            listener: handle,
        });
        Ok(())
    }

    /// Stops the skeleton if it is running.
    ///
    /// The listening socket is closed and the listening thread joined. Handler threads
    /// already serving a connection finish their exchange. The `stopped` hook is called
    /// with no cause. The skeleton may be started again afterwards.
    pub fn stop(&self) {
        let running = lock(&self.state).running.take();
        let Some(running) = running else {
            return;
        };

        if running.listener.is_finished() {
            join_listener::<I>(running.listener);
            return;
        }

        running.stopping.store(true, Ordering::SeqCst);

        // Unblock accept() with a throwaway connection.
        if let Err(e) = TcpStream::connect(wake_address(running.local)) {
            tracing::warn!("failed to wake {} listener: {}", I::NAME, e);
        }
        join_listener::<I>(running.listener);

        tracing::info!("{} skeleton on {} stopped", I::NAME, running.local);
        self.hooks.stopped(None);
    }
}

impl<I: RemoteInterface> Drop for Skeleton<I> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn join_listener<I: RemoteInterface>(listener: JoinHandle<()>) {
    if listener.join().is_err() {
        tracing::error!("{} listener thread panicked", I::NAME);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Connectable form of a listening address: wildcard IPs become loopback.
pub(crate) fn wake_address(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), addr.port())
        }
        _ => addr,
    }
}

fn listen<I: RemoteInterface>(
    listener: TcpListener,
    target: Arc<I::Target>,
    hooks: Arc<dyn SkeletonHooks>,
    stopping: Arc<AtomicBool>,
) {
    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                if stopping.load(Ordering::SeqCst) {
                    break;
                }

                let target = Arc::clone(&target);
                let handler_hooks = Arc::clone(&hooks);
                let spawned = thread::Builder::new()
                    .name(format!("{}-handler", I::NAME))
                    .spawn(move || serve::<I>(stream, peer, &*target, &*handler_hooks));

                if let Err(e) = spawned {
                    spawn_failed(I::NAME, &*hooks, peer, e);
                }
            }
            Err(e) => {
                if stopping.load(Ordering::SeqCst) {
                    break;
                }
                if accept_failed(I::NAME, &*hooks, e) == ListenAction::Stop {
                    break;
                }
            }
        }
    }
}

/// Asks the hooks what to do about an accept failure. When the answer is
/// [`ListenAction::Stop`], `stopped` has already been told the cause.
fn accept_failed(name: &str, hooks: &dyn SkeletonHooks, error: io::Error) -> ListenAction {
    let action = hooks.listen_error(&error);
    match action {
        ListenAction::Resume => {
            tracing::warn!("{}: accept failed, resuming: {}", name, error);
        }
        ListenAction::Stop => {
            tracing::error!("{}: accept failed, stopping: {}", name, error);
            hooks.stopped(Some(&RmiError::Transport(error)));
        }
    }
    action
}

fn spawn_failed(name: &str, hooks: &dyn SkeletonHooks, peer: SocketAddr, error: io::Error) {
    tracing::warn!("{}: failed to spawn handler for {}: {}", name, peer, error);
    hooks.service_error(&RmiError::Transport(error));
}

fn serve<I: RemoteInterface>(
    mut stream: TcpStream,
    peer: SocketAddr,
    target: &I::Target,
    hooks: &dyn SkeletonHooks,
) {
    let response = match codec::read_frame::<_, Call>(&mut stream) {
        Ok(call) => respond::<I>(target, call),
        Err(e) => {
            tracing::debug!("{}: unreadable call from {}: {}", I::NAME, peer, e);
            Response::fault(Fault::Dispatch(e.to_string()))
        }
    };

    if let Err(e) = codec::write_frame(&mut stream, &response) {
        tracing::warn!("{}: failed to answer {}: {}", I::NAME, peer, e);
        hooks.service_error(&e);
    }
}

fn respond<I: RemoteInterface>(target: &I::Target, call: Call) -> Response {
    let Some(method) = I::lookup(&call.method, &call.signature) else {
        return Response::fault(Fault::Dispatch(format!(
            "{} has no method {}({})",
            I::NAME,
            call.method,
            call.signature.join(", ")
        )));
    };

    tracing::debug!("{}.{} dispatched", I::NAME, method.name);

    let args = Args::new(call.args);
    match panic::catch_unwind(AssertUnwindSafe(|| I::dispatch(target, method, args))) {
        Ok(Ok(reply)) => reply.into(),
        Ok(Err(e)) => Response::fault(Fault::Dispatch(e.to_string())),
        Err(_) => {
            tracing::error!("{}.{} panicked", I::NAME, method.name);
            Response::fault(Fault::Dispatch(format!(
                "{}.{} panicked",
                I::NAME,
                method.name
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Calculator, CalculatorApi, LocalCalculator};
    use crate::Stub;
    use std::sync::mpsc;

    fn calculator() -> Arc<dyn Calculator> {
        Arc::new(LocalCalculator)
    }

    fn loopback() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    struct RecordingHooks {
        on_listen_error: ListenAction,
        stops: Mutex<mpsc::Sender<Option<String>>>,
        service_errors: Mutex<Vec<String>>,
    }

    impl RecordingHooks {
        fn new(stops: mpsc::Sender<Option<String>>) -> Self {
            Self::answering(ListenAction::Stop, stops)
        }

        fn answering(on_listen_error: ListenAction, stops: mpsc::Sender<Option<String>>) -> Self {
            Self {
                on_listen_error,
                stops: Mutex::new(stops),
                service_errors: Mutex::new(Vec::new()),
            }
        }
    }

    impl SkeletonHooks for RecordingHooks {
        fn listen_error(&self, _error: &io::Error) -> ListenAction {
            self.on_listen_error
        }

        fn service_error(&self, error: &RmiError) {
            lock(&self.service_errors).push(error.to_string());
        }

        fn stopped(&self, cause: Option<&RmiError>) {
            let _ = lock(&self.stops).send(cause.map(|c| c.to_string()));
        }
    }

    fn accept_error() -> io::Error {
        io::Error::new(io::ErrorKind::Other, "too many open files")
    }

    #[test]
    fn test_accept_failure_can_resume() {
        let (tx, rx) = mpsc::channel();
        let hooks = RecordingHooks::answering(ListenAction::Resume, tx);

        assert_eq!(
            accept_failed("Calculator", &hooks, accept_error()),
            ListenAction::Resume
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_accept_failure_can_stop_with_cause() {
        let (tx, rx) = mpsc::channel();
        let hooks = RecordingHooks::answering(ListenAction::Stop, tx);

        assert_eq!(
            accept_failed("Calculator", &hooks, accept_error()),
            ListenAction::Stop
        );
        let cause = rx.try_recv().unwrap().unwrap();
        assert!(cause.contains("too many open files"));
    }

    #[test]
    fn test_spawn_failure_reaches_service_error() {
        let (tx, rx) = mpsc::channel();
        let hooks = RecordingHooks::new(tx);

        spawn_failed("Calculator", &hooks, loopback(), accept_error());

        let errors = lock(&hooks.service_errors);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("too many open files"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_start_assigns_address() {
        let skeleton = Skeleton::<CalculatorApi>::new(calculator());
        assert!(skeleton.address().is_none());

        skeleton.start().unwrap();

        let addr = skeleton.address().unwrap();
        assert_ne!(addr.port(), 0);
        assert!(skeleton.is_running());
    }

    #[test]
    fn test_start_twice_fails() {
        let skeleton = Skeleton::<CalculatorApi>::with_address(calculator(), loopback());
        skeleton.start().unwrap();

        assert!(matches!(skeleton.start(), Err(RmiError::AlreadyRunning)));
    }

    #[test]
    fn test_restart_keeps_address() {
        let skeleton = Skeleton::<CalculatorApi>::with_address(calculator(), loopback());
        skeleton.start().unwrap();
        let first = skeleton.address().unwrap();

        skeleton.stop();
        assert!(!skeleton.is_running());

        skeleton.start().unwrap();
        assert_eq!(skeleton.address().unwrap(), first);

        let stub = Stub::<CalculatorApi>::from_skeleton(&skeleton).unwrap();
        assert_eq!(stub.add(2, 3).unwrap(), 5);
    }

    #[test]
    fn test_stop_reports_no_cause() {
        let (tx, rx) = mpsc::channel();
        let hooks = Arc::new(RecordingHooks::new(tx));
        let skeleton =
            Skeleton::<CalculatorApi>::with_address(calculator(), loopback()).with_hooks(hooks);

        skeleton.start().unwrap();
        skeleton.stop();

        assert_eq!(rx.recv().unwrap(), None);
    }

    #[test]
    fn test_stop_when_not_running_is_a_no_op() {
        let (tx, rx) = mpsc::channel();
        let hooks = Arc::new(RecordingHooks::new(tx));
        let skeleton = Skeleton::<CalculatorApi>::new(calculator()).with_hooks(hooks);

        skeleton.stop();

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stop_refuses_new_connections() {
        let skeleton = Skeleton::<CalculatorApi>::with_address(calculator(), loopback());
        skeleton.start().unwrap();
        let stub = Stub::<CalculatorApi>::from_skeleton(&skeleton).unwrap();

        skeleton.stop();

        assert!(matches!(
            stub.add(1, 1),
            Err(crate::testing::CalcError::Rmi(RmiError::Transport(_)))
        ));
    }

    #[test]
    fn test_unknown_method_is_reported_not_fatal() {
        let skeleton = Skeleton::<CalculatorApi>::with_address(calculator(), loopback());
        skeleton.start().unwrap();
        let addr = wake_address(skeleton.address().unwrap());

        let mut stream = TcpStream::connect(addr).unwrap();
        let call = Call {
            method: "multiply".into(),
            signature: vec!["i64".into(), "i64".into()],
            args: vec![2.into(), 3.into()],
        };
        codec::write_frame(&mut stream, &call).unwrap();
        let response: Response = codec::read_frame(&mut stream).unwrap();

        match response.into_result().unwrap() {
            Err(Fault::Dispatch(reason)) => assert!(reason.contains("multiply")),
            other => panic!("expected dispatch fault, got {other:?}"),
        }

        // The server is still serving.
        let stub = Stub::<CalculatorApi>::from_skeleton(&skeleton).unwrap();
        assert_eq!(stub.add(1, 2).unwrap(), 3);
    }

    #[test]
    fn test_wrong_signature_is_a_dispatch_fault() {
        let skeleton = Skeleton::<CalculatorApi>::with_address(calculator(), loopback());
        skeleton.start().unwrap();
        let addr = wake_address(skeleton.address().unwrap());

        let mut stream = TcpStream::connect(addr).unwrap();
        let call = Call {
            method: "add".into(),
            signature: vec!["i64".into()],
            args: vec![2.into()],
        };
        codec::write_frame(&mut stream, &call).unwrap();
        let response: Response = codec::read_frame(&mut stream).unwrap();

        assert!(matches!(
            response.into_result().unwrap(),
            Err(Fault::Dispatch(_))
        ));
    }

    #[test]
    fn test_garbage_request_is_answered() {
        use std::io::Write;

        let skeleton = Skeleton::<CalculatorApi>::with_address(calculator(), loopback());
        skeleton.start().unwrap();
        let addr = wake_address(skeleton.address().unwrap());

        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(&4u32.to_be_bytes()).unwrap();
        stream.write_all(b"nope").unwrap();
        let response: Response = codec::read_frame(&mut stream).unwrap();

        assert!(matches!(
            response.into_result().unwrap(),
            Err(Fault::Dispatch(_))
        ));
    }

    #[test]
    fn test_wake_address_replaces_wildcard() {
        let wildcard: SocketAddr = "0.0.0.0:6000".parse().unwrap();
        assert_eq!(wake_address(wildcard), "127.0.0.1:6000".parse().unwrap());

        let v6: SocketAddr = "[::]:6000".parse().unwrap();
        assert_eq!(wake_address(v6), "[::1]:6000".parse().unwrap());

        let fixed: SocketAddr = "10.1.2.3:6000".parse().unwrap();
        assert_eq!(wake_address(fixed), fixed);
    }
}
