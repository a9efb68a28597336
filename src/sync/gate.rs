//! One-shot broadcast gate.
//!
//! A gate starts open and can be released exactly once. Every `WaitHandle`
//! taken from it, before or after the release, resolves once the gate is
//! released. Resource locks use it so the first task to claim a resource
//! can wake every other task waiting on the same resource.

use tokio::sync::watch;

use crate::error_handling::GateError;

/// Single-use release signal.
#[derive(Debug)]
pub struct BroadcastGate {
    state: watch::Sender<bool>,
}

impl BroadcastGate {
    /// Creates an unreleased gate.
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        BroadcastGate { state }
    }

    /// Returns a handle that resolves when the gate is released.
    pub fn wait_handle(&self) -> WaitHandle {
        WaitHandle {
            state: self.state.subscribe(),
        }
    }

    /// Releases the gate, waking every waiter.
    ///
    /// Returns `true` for the call that performed the transition and `false`
    /// for every later call.
    pub fn release(&self) -> bool {
        self.state.send_if_modified(|released| {
            if *released {
                false
            } else {
                *released = true;
                true
            }
        })
    }

    /// Whether `release` has been called.
    pub fn is_released(&self) -> bool {
        *self.state.borrow()
    }
}

impl Default for BroadcastGate {
    fn default() -> Self {
        Self::new()
    }
}

/// A waiter's view of a `BroadcastGate`.
#[derive(Debug, Clone)]
pub struct WaitHandle {
    state: watch::Receiver<bool>,
}

impl WaitHandle {
    /// Waits until the gate is released.
    ///
    /// Returns immediately if it already was. Fails with
    /// `GateError::Abandoned` if the gate is dropped unreleased.
    pub async fn wait(mut self) -> Result<(), GateError> {
        self.state
            .wait_for(|released| *released)
            .await
            .map(|_| ())
            .map_err(|_| GateError::Abandoned)
    }

    /// Whether the gate has been released, without waiting.
    pub fn is_released(&self) -> bool {
        *self.state.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_waiters_registered_before_release_unblock() {
        let gate = Arc::new(BroadcastGate::new());
        let waiters: Vec<_> = (0..16)
            .map(|_| tokio::spawn(gate.wait_handle().wait()))
            .collect();

        tokio::task::yield_now().await;
        assert!(!gate.is_released());
        assert!(gate.release());

        for waiter in waiters {
            let result = timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter should unblock after release")
                .unwrap();
            assert_eq!(result, Ok(()));
        }
    }

    #[tokio::test]
    async fn test_handle_taken_after_release_resolves_immediately() {
        let gate = BroadcastGate::new();
        gate.release();
        let handle = gate.wait_handle();
        assert!(handle.is_released());
        assert_eq!(
            timeout(Duration::from_millis(50), handle.wait()).await,
            Ok(Ok(()))
        );
    }

    #[tokio::test]
    async fn test_no_signal_before_release() {
        let gate = BroadcastGate::new();
        let handle = gate.wait_handle();
        assert!(!handle.is_released());
        assert!(timeout(Duration::from_millis(50), handle.clone().wait())
            .await
            .is_err());
        drop(gate);
    }

    #[tokio::test]
    async fn test_concurrent_release_transitions_once() {
        let gate = Arc::new(BroadcastGate::new());
        let releasers: Vec<_> = (0..32)
            .map(|_| {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move { gate.release() })
            })
            .collect();

        let mut transitions = 0;
        for releaser in releasers {
            if releaser.await.unwrap() {
                transitions += 1;
            }
        }
        assert_eq!(transitions, 1);
        assert!(gate.is_released());
        assert!(!gate.release());
    }

    #[tokio::test]
    async fn test_dropped_gate_reports_abandoned() {
        let gate = BroadcastGate::new();
        let handle = gate.wait_handle();
        drop(gate);
        assert_eq!(handle.wait().await, Err(GateError::Abandoned));
    }

    #[tokio::test]
    async fn test_released_then_dropped_gate_still_reports_release() {
        let gate = BroadcastGate::new();
        let handle = gate.wait_handle();
        gate.release();
        drop(gate);
        assert_eq!(handle.wait().await, Ok(()));
    }
}
