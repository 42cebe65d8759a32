//! Output aggregator: routes game chat into the ambient or capture buffer.
//!
//! Game chat normally accumulates in the *ambient* buffer, which the runtime
//! flushes on a fixed period. While an output-consuming command is pending its
//! flush, lines go to the *capture* buffer instead. Only one capture can be in
//! progress: [`OutputAggregator::begin_capture`] hands out an exclusive
//! [`CaptureGuard`] or nothing.
//!
//! Both buffers live under one lock so a line is never split between them.

use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Buffers {
    ambient: Vec<String>,
    capture: Vec<String>,
    capturing: bool,
}

/// Which buffer received a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Ambient buffer.
    Ambient,
    /// Capture buffer.
    Capture,
    /// Empty line, dropped.
    Dropped,
}

/// Shared ambient and capture buffers plus the capture flag.
#[derive(Debug, Default)]
pub struct OutputAggregator {
    buffers: Mutex<Buffers>,
}

impl OutputAggregator {
    /// Fresh aggregator in ambient mode.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a game chat line to whichever buffer is active.
    pub fn push_line(&self, line: &str) -> Routed {
        if line.is_empty() {
            return Routed::Dropped;
        }
        let mut buffers = self.buffers.lock();
        if buffers.capturing {
            buffers.capture.push(line.to_string());
            Routed::Capture
        } else {
            buffers.ambient.push(line.to_string());
            Routed::Ambient
        }
    }

    /// Drain the ambient buffer. Never touches the capture buffer.
    pub fn take_ambient(&self) -> Vec<String> {
        std::mem::take(&mut self.buffers.lock().ambient)
    }

    /// Whether a capture is in progress.
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.buffers.lock().capturing
    }

    /// Number of lines waiting in the ambient buffer.
    #[must_use]
    pub fn ambient_len(&self) -> usize {
        self.buffers.lock().ambient.len()
    }

    /// Start capturing, unless a capture is already running.
    ///
    /// The returned guard owns the capture: [`CaptureGuard::finish`] drains it,
    /// dropping the guard discards it. Either way the aggregator returns to
    /// ambient mode.
    #[must_use]
    pub fn begin_capture(self: &Arc<Self>) -> Option<CaptureGuard> {
        let mut buffers = self.buffers.lock();
        if buffers.capturing {
            return None;
        }
        buffers.capturing = true;
        buffers.capture.clear();
        Some(CaptureGuard {
            aggregator: Arc::clone(self),
            finished: false,
        })
    }

    fn end_capture(&self) -> Vec<String> {
        let mut buffers = self.buffers.lock();
        buffers.capturing = false;
        std::mem::take(&mut buffers.capture)
    }
}

/// Exclusive ownership of the capture buffer.
#[derive(Debug)]
pub struct CaptureGuard {
    aggregator: Arc<OutputAggregator>,
    finished: bool,
}

impl CaptureGuard {
    /// Drain the capture buffer and return to ambient mode.
    #[must_use]
    pub fn finish(mut self) -> Vec<String> {
        self.finished = true;
        self.aggregator.end_capture()
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        if !self.finished {
            let discarded = self.aggregator.end_capture();
            if !discarded.is_empty() {
                tracing::debug!(lines = discarded.len(), "Capture abandoned");
            }
        }
    }
}
