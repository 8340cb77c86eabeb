//! Audit trail for access decisions
//!
//! Append-only in-memory record of evaluated requests with:
//! - Bounded buffer (oldest records dropped on overflow, with a counter)
//! - Optional background drain thread feeding a sink callback
//! - UTC timestamps on every record

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::core::engine::Decision;

/// Single audit record for one evaluated request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// When the request was evaluated
    pub timestamp: DateTime<Utc>,
    /// Action that was requested
    pub action: String,
    /// Outcome of the evaluation
    pub decision: Decision,
    /// Name of the deciding policy, `None` when the default deny fired
    pub matched: Option<String>,
}

impl AuditRecord {
    /// Create a record stamped with the current time
    pub fn new(action: impl Into<String>, decision: Decision, matched: Option<String>) -> Self {
        AuditRecord {
            timestamp: Utc::now(),
            action: action.into(),
            decision,
            matched,
        }
    }
}

struct Buffer {
    records: VecDeque<AuditRecord>,
    dropped: u64,
}

/// Bounded audit log with optional background draining
pub struct AuditLog {
    buffer: Arc<Mutex<Buffer>>,
    capacity: usize,
    flush_thread: Option<JoinHandle<()>>,
    flush_interval: Duration,
    running: Arc<Mutex<bool>>,
}

impl AuditLog {
    /// Create a new audit log
    ///
    /// # Arguments
    /// * `capacity` - Maximum buffered records before the oldest is dropped
    /// * `flush_interval` - How often the drain thread wakes, once started
    pub fn new(capacity: usize, flush_interval: Duration) -> Self {
        AuditLog {
            buffer: Arc::new(Mutex::new(Buffer {
                records: VecDeque::with_capacity(capacity.min(1024)),
                dropped: 0,
            })),
            capacity: capacity.max(1),
            flush_thread: None,
            flush_interval,
            running: Arc::new(Mutex::new(false)),
        }
    }

    /// Append a record, dropping the oldest one if the buffer is full
    pub fn log(&self, record: AuditRecord) {
        let mut buffer = self.buffer.lock();
        if buffer.records.len() == self.capacity {
            buffer.records.pop_front();
            buffer.dropped += 1;
        }
        buffer.records.push_back(record);
    }

    /// Last `limit` records in chronological order
    pub fn recent(&self, limit: usize) -> Vec<AuditRecord> {
        let buffer = self.buffer.lock();
        let skip = buffer.records.len().saturating_sub(limit);
        buffer.records.iter().skip(skip).cloned().collect()
    }

    /// Take all buffered records, oldest first
    pub fn drain(&self) -> Vec<AuditRecord> {
        self.buffer.lock().records.drain(..).collect()
    }

    /// Number of buffered records
    pub fn len(&self) -> usize {
        self.buffer.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().records.is_empty()
    }

    /// Records discarded because the buffer was full
    pub fn dropped(&self) -> u64 {
        self.buffer.lock().dropped
    }

    /// Start the background drain thread
    ///
    /// # Arguments
    /// * `sink` - Function called with each non-empty batch of records
    pub fn start<F>(&mut self, sink: F)
    where
        F: Fn(&[AuditRecord]) + Send + 'static,
    {
        *self.running.lock() = true;

        let buffer = Arc::clone(&self.buffer);
        let flush_interval = self.flush_interval;
        let running = Arc::clone(&self.running);

        let flush_thread = thread::spawn(move || {
            while *running.lock() {
                thread::sleep(flush_interval);

                let batch: Vec<AuditRecord> = buffer.lock().records.drain(..).collect();
                if batch.is_empty() {
                    continue;
                }

                sink(&batch);
            }
        });

        self.flush_thread = Some(flush_thread);
    }

    /// Stop the background drain thread
    ///
    /// Records logged after the final drain stay buffered and remain
    /// reachable through [`AuditLog::drain`].
    pub fn stop(&mut self) {
        *self.running.lock() = false;

        if let Some(thread) = self.flush_thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for AuditLog {
    fn drop(&mut self) {
        self.stop();
    }
}
