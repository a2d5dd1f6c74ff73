//! Toast sinks for the view layer.

use shopdesk_api::{Toast, ToastLevel, ToastSink};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Bounded FIFO the view drains on each render. The oldest toast is dropped
/// once `capacity` is reached.
pub struct ToastQueue {
    queue: Mutex<VecDeque<Toast>>,
    capacity: usize,
}

impl ToastQueue {
    pub const DEFAULT_CAPACITY: usize = 32;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    /// Takes every pending toast, oldest first.
    pub fn drain(&self) -> Vec<Toast> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Toast>> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastSink for ToastQueue {
    fn push(&self, toast: Toast) {
        tracing::debug!("[Toast] {:?}: {}", toast.level, toast.message);
        let mut queue = self.lock();
        if queue.len() == self.capacity {
            queue.pop_front();
        }
        queue.push_back(toast);
    }
}

/// Writes toasts to the log instead of a screen (headless runs).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingToastSink;

impl ToastSink for TracingToastSink {
    fn push(&self, toast: Toast) {
        match toast.level {
            ToastLevel::Success => tracing::info!("[Toast] {}", toast.message),
            ToastLevel::Error => tracing::warn!("[Toast] {}", toast.message),
        }
    }
}
