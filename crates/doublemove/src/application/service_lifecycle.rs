//! Service Lifecycle Controller: keeps the native service's running state in
//! line with `doubleMovementEnabled`.
//!
//! # Generations
//!
//! Every `start` attempt gets a fresh generation number, and the
//! [`ServiceErrorSink`] handed to the native service carries it.  Errors are
//! delivered to the host event loop as [`HostEvent::ServiceFailed`] and only
//! acted on if they belong to the instance that is running right now, so a
//! late callback from an instance that was already stopped cannot disable a
//! newer one.
//!
//! # Invariants
//!
//! - at most one native instance is started at a time;
//! - `stop()` is never called unless the service is running;
//! - the error path never calls `stop()` directly: it routes
//!   `doubleMovementEnabled = false` through the Settings Store and the
//!   resulting reconcile does the stopping.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::orchestrator::{HostEvent, HostEventSender};

/// Title of the notification shown when the service fails.
pub const SERVICE_ERROR_TITLE: &str = "Double Movement errored";

const SERVICE_ERROR_PREAMBLE: &str =
    "An unexpected error occurred in the service, it's going to be disabled, please try again.";

/// Error reported by the native service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// `start` failed synchronously.
    #[error("failed to start: {0}")]
    Start(String),
    /// The running service reported a failure.
    #[error("{0}")]
    Runtime(String),
}

/// Builds the notification body for a service failure.
///
/// Start and runtime failures share the same wording.
pub fn failure_message(error: &ServiceError) -> String {
    format!("{SERVICE_ERROR_PREAMBLE}\n\n{error}")
}

/// Blocking, dismissible user notification.
pub trait Notifier: Send {
    fn show_error(&mut self, title: &str, body: &str);
}

// ── Error sink ────────────────────────────────────────────────────────────────

/// Callback handle the native service uses to report runtime failures.
///
/// Cheap to clone; safe to call from any thread.
#[derive(Debug, Clone)]
pub struct ServiceErrorSink {
    generation: u64,
    events: HostEventSender,
}

impl ServiceErrorSink {
    pub fn new(generation: u64, events: HostEventSender) -> Self {
        Self { generation, events }
    }

    /// Generation of the start this sink belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Reports a failure to the host.  Never blocks.
    pub fn report(&self, error: ServiceError) {
        let event = HostEvent::ServiceFailed {
            generation: self.generation,
            error,
        };
        if self.events.send(event).is_err() {
            warn!(generation = self.generation, "host event loop is gone; dropping service error");
        }
    }
}

// ── Native service port ───────────────────────────────────────────────────────

/// The external input-remapping service.
#[cfg_attr(test, mockall::automock)]
pub trait NativeService: Send {
    /// Starts remapping.  Runtime failures are reported through `on_error`.
    fn start(&mut self, on_error: ServiceErrorSink) -> Result<(), ServiceError>;
    /// Stops remapping.
    fn stop(&mut self);
}

/// Whether the native service is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Running,
}

// ── Controller ────────────────────────────────────────────────────────────────

/// Owns the native service and its running state.
pub struct ServiceLifecycle {
    service: Box<dyn NativeService>,
    state: ServiceState,
    generation: u64,
    events: HostEventSender,
}

impl ServiceLifecycle {
    pub fn new(service: Box<dyn NativeService>, events: HostEventSender) -> Self {
        Self {
            service,
            state: ServiceState::Stopped,
            generation: 0,
            events,
        }
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ServiceState::Running
    }

    /// Generation of the most recent start attempt (0 before the first).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts or stops the service so its state matches `enabled`.
    ///
    /// # Errors
    ///
    /// Returns the [`ServiceError`] of a failed start.  The controller stays
    /// [`ServiceState::Stopped`] in that case.
    pub fn reconcile(&mut self, enabled: bool) -> Result<(), ServiceError> {
        match (enabled, self.state) {
            (true, ServiceState::Stopped) => {
                self.generation += 1;
                let sink = ServiceErrorSink::new(self.generation, self.events.clone());
                match self.service.start(sink) {
                    Ok(()) => {
                        self.state = ServiceState::Running;
                        info!(generation = self.generation, "double movement service started");
                        Ok(())
                    }
                    Err(e) => {
                        warn!(generation = self.generation, "double movement service failed to start: {e}");
                        Err(e)
                    }
                }
            }
            (false, ServiceState::Running) => {
                self.service.stop();
                self.state = ServiceState::Stopped;
                info!(generation = self.generation, "double movement service stopped");
                Ok(())
            }
            _ => {
                debug!(enabled, state = ?self.state, "service already in desired state");
                Ok(())
            }
        }
    }

    /// `true` if an error from `generation` concerns the running instance.
    pub fn is_current(&self, generation: u64) -> bool {
        self.is_running() && generation == self.generation
    }

    /// Stops the service if it is running.
    pub fn shutdown(&mut self) {
        if self.is_running() {
            self.service.stop();
            self.state = ServiceState::Stopped;
            info!("double movement service stopped for shutdown");
        }
    }
}

impl Drop for ServiceLifecycle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::orchestrator::host_channel;
    use mockall::predicate::always;

    #[test]
    fn test_reconcile_true_twice_starts_once() {
        // Arrange
        let (tx, _rx) = host_channel();
        let mut service = MockNativeService::new();
        service.expect_start().times(1).returning(|_| Ok(()));
        service.expect_stop().times(1).return_const(());
        let mut lifecycle = ServiceLifecycle::new(Box::new(service), tx);

        // Act
        lifecycle.reconcile(true).unwrap();
        lifecycle.reconcile(true).unwrap();

        // Assert (the drop stop is the single expected stop)
        assert_eq!(lifecycle.state(), ServiceState::Running);
        assert_eq!(lifecycle.generation(), 1);
    }

    #[test]
    fn test_reconcile_false_twice_stops_at_most_once() {
        let (tx, _rx) = host_channel();
        let mut service = MockNativeService::new();
        service.expect_start().times(1).returning(|_| Ok(()));
        service.expect_stop().times(1).return_const(());
        let mut lifecycle = ServiceLifecycle::new(Box::new(service), tx);
        lifecycle.reconcile(true).unwrap();

        lifecycle.reconcile(false).unwrap();
        lifecycle.reconcile(false).unwrap();

        assert_eq!(lifecycle.state(), ServiceState::Stopped);
    }

    #[test]
    fn test_reconcile_false_when_never_started_never_stops() {
        let (tx, _rx) = host_channel();
        let mut service = MockNativeService::new();
        service.expect_start().never();
        service.expect_stop().never();
        let mut lifecycle = ServiceLifecycle::new(Box::new(service), tx);

        lifecycle.reconcile(false).unwrap();

        assert_eq!(lifecycle.state(), ServiceState::Stopped);
    }

    #[test]
    fn test_start_failure_leaves_service_stopped() {
        // Arrange
        let (tx, _rx) = host_channel();
        let mut service = MockNativeService::new();
        service
            .expect_start()
            .with(always())
            .times(1)
            .returning(|_| Err(ServiceError::Start("no device".to_string())));
        service.expect_stop().never();
        let mut lifecycle = ServiceLifecycle::new(Box::new(service), tx);

        // Act
        let result = lifecycle.reconcile(true);

        // Assert
        assert_eq!(result, Err(ServiceError::Start("no device".to_string())));
        assert_eq!(lifecycle.state(), ServiceState::Stopped);
    }

    #[test]
    fn test_sink_reports_with_start_generation() {
        // Arrange
        let (tx, mut rx) = host_channel();
        let captured = std::sync::Arc::new(std::sync::Mutex::new(None));
        let slot = std::sync::Arc::clone(&captured);
        let mut service = MockNativeService::new();
        service.expect_start().returning(move |sink| {
            *slot.lock().unwrap() = Some(sink);
            Ok(())
        });
        service.expect_stop().return_const(());
        let mut lifecycle = ServiceLifecycle::new(Box::new(service), tx);
        lifecycle.reconcile(true).unwrap();

        // Act
        let sink = captured.lock().unwrap().take().unwrap();
        sink.report(ServiceError::Runtime("device unplugged".to_string()));

        // Assert
        match rx.try_recv().unwrap() {
            HostEvent::ServiceFailed { generation, error } => {
                assert_eq!(generation, 1);
                assert!(lifecycle.is_current(generation));
                assert_eq!(error, ServiceError::Runtime("device unplugged".to_string()));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_old_generation_is_not_current_after_restart() {
        let (tx, _rx) = host_channel();
        let mut service = MockNativeService::new();
        service.expect_start().times(2).returning(|_| Ok(()));
        service.expect_stop().times(2).return_const(());
        let mut lifecycle = ServiceLifecycle::new(Box::new(service), tx);

        lifecycle.reconcile(true).unwrap();
        lifecycle.reconcile(false).unwrap();
        lifecycle.reconcile(true).unwrap();

        assert!(!lifecycle.is_current(1));
        assert!(lifecycle.is_current(2));
    }

    #[test]
    fn test_error_while_stopped_is_not_current() {
        let (tx, _rx) = host_channel();
        let mut service = MockNativeService::new();
        service.expect_start().times(1).returning(|_| Ok(()));
        service.expect_stop().times(1).return_const(());
        let mut lifecycle = ServiceLifecycle::new(Box::new(service), tx);

        lifecycle.reconcile(true).unwrap();
        lifecycle.reconcile(false).unwrap();

        assert!(!lifecycle.is_current(1));
    }

    #[test]
    fn test_failure_message_includes_error_text() {
        let body = failure_message(&ServiceError::Runtime("device unplugged".to_string()));
        assert!(body.starts_with("An unexpected error occurred in the service"));
        assert!(body.ends_with("\n\ndevice unplugged"));
    }
}
