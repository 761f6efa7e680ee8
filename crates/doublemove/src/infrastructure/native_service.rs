//! Stand-in for the native input-remapping service.
//!
//! The real service is an external module; the host only needs its
//! `start(on_error)` / `stop()` contract.  [`SimulatedService`] honours that
//! contract and keeps the error sink of the running instance so a
//! [`FailureInjector`] can make it report a runtime failure on demand.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::application::service_lifecycle::{NativeService, ServiceError, ServiceErrorSink};

#[derive(Debug, Default)]
struct Shared {
    sink: Option<ServiceErrorSink>,
    fail_next_start: Option<String>,
}

/// Logging implementation of [`NativeService`].
#[derive(Debug, Clone, Default)]
pub struct SimulatedService {
    shared: Arc<Mutex<Shared>>,
}

impl SimulatedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for injecting failures into this service.
    pub fn injector(&self) -> FailureInjector {
        FailureInjector {
            shared: Arc::clone(&self.shared),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NativeService for SimulatedService {
    fn start(&mut self, on_error: ServiceErrorSink) -> Result<(), ServiceError> {
        let mut shared = self.lock();
        if let Some(reason) = shared.fail_next_start.take() {
            return Err(ServiceError::Start(reason));
        }
        info!(generation = on_error.generation(), "simulated remapping service running");
        shared.sink = Some(on_error);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.lock().sink.take() {
            info!(generation = sink.generation(), "simulated remapping service stopped");
        }
    }
}

/// Makes a [`SimulatedService`] fail.
#[derive(Debug, Clone)]
pub struct FailureInjector {
    shared: Arc<Mutex<Shared>>,
}

impl FailureInjector {
    /// Reports a runtime failure from the running instance.
    ///
    /// Returns `false` if the service is not running.
    pub fn fail_running(&self, message: impl Into<String>) -> bool {
        let shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        match &shared.sink {
            Some(sink) => {
                sink.report(ServiceError::Runtime(message.into()));
                true
            }
            None => {
                warn!("cannot inject failure: service is not running");
                false
            }
        }
    }

    /// Makes the next `start` fail synchronously.
    pub fn fail_next_start(&self, message: impl Into<String>) {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_next_start = Some(message.into());
    }
}
