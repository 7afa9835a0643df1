use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use super::{SessionError, SessionReport};

/// Cooperative cancellation flag, polled once per tick.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Caller-side handle to a running attention loop.
///
/// Dropping the handle cancels the loop without waiting for it.
#[derive(Debug)]
pub struct SessionHandle {
    pub(super) cancel: CancelToken,
    pub(super) join: Option<JoinHandle<()>>,
    pub(super) result: mpsc::Receiver<SessionReport>,
}

impl SessionHandle {
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request the loop to stop after the in-flight tick.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |join| join.is_finished())
    }

    /// Wait for the loop to stop and take its report.
    ///
    /// Does not request a stop; pair with [`SessionHandle::stop`] unless the
    /// loop has a frame cap.
    pub fn join(mut self) -> Result<SessionReport, SessionError> {
        if let Some(join) = self.join.take() {
            join.join().map_err(|_| SessionError::WorkerPanicked)?;
        }
        self.result.recv().map_err(|_| SessionError::ResultMissing)
    }

    pub fn stop_and_join(self) -> Result<SessionReport, SessionError> {
        self.stop();
        self.join()
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.cancel.cancel();
        }
    }
}
