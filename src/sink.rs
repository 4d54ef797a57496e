//! Trace sinks: where finished trace windows are handed off.
//!
//! The storage/display collaborator implements [`TraceSink`]. Windows
//! arrive in completion order, which is not position order.

use crate::error::{Result, TransformError};
use crate::types::{PositionKey, TraceWindow};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Receiver of finished trace windows. Called concurrently from workers.
pub trait TraceSink: Send + Sync {
    fn store(&self, window: TraceWindow) -> Result<()>;
}

/// Sink that keeps every window in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    windows: Mutex<Vec<TraceWindow>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.windows.lock().map(|w| w.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored windows, in arrival order.
    pub fn into_windows(self) -> Vec<TraceWindow> {
        self.windows
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stored outputs keyed by position.
    pub fn into_map(self) -> BTreeMap<PositionKey, Vec<f64>> {
        self.into_windows()
            .into_iter()
            .map(|w| (w.position, w.output))
            .collect()
    }
}

impl TraceSink for MemorySink {
    fn store(&self, window: TraceWindow) -> Result<()> {
        let position = window.position;
        self.windows
            .lock()
            .map_err(|e| TransformError::Storage {
                position,
                message: format!("Failed to acquire sink lock: {}", e),
            })?
            .push(window);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SampleInterval;

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        let iv = SampleInterval::new(0, 2).unwrap();
        sink.store(TraceWindow::new(PositionKey::new(2, 0), iv)).unwrap();
        sink.store(TraceWindow::new(PositionKey::new(1, 0), iv)).unwrap();
        assert_eq!(sink.len(), 2);

        let map = sink.into_map();
        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(keys, vec![PositionKey::new(1, 0), PositionKey::new(2, 0)]);
    }
}
