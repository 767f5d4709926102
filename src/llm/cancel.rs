// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Cooperative cancellation token shared between the controller, the
//! driver handling the in-flight request, and whoever requests a stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Cancellation flag polled at every suspension point of a turn
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Work already issued is not aborted; its result is ignored.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Whether two handles share the same flag
    pub fn same_as(&self, other: &CancellationHandle) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

/// Slot a driver uses to hold the handle of the request in flight
#[derive(Debug, Default)]
pub struct CancellationSlot {
    handle: Mutex<Option<CancellationHandle>>,
}

impl CancellationSlot {
    pub fn set(&self, handle: Option<CancellationHandle>) {
        let mut slot = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        *slot = handle;
    }

    pub fn current(&self) -> Option<CancellationHandle> {
        self.handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// True when a handle is set and has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.current().is_some_and(|h| h.is_cancelled())
    }
}
