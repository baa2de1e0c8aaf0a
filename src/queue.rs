//! # Outbound Queue
//!
//! Bounded FIFO of payloads waiting for the radio, with the retry policy.
//!
//! A payload that fails to transmit goes back to the **tail**, so one bad
//! payload never blocks the others. Retries are unbounded unless
//! `max_retries` is configured.

use serde::Deserialize;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, warn};

use crate::radio::Radio;

/// Default queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 50;

/// What to do when a payload arrives and the queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Refuse the new payload
    #[default]
    DropNewest,

    /// Discard the head to make room for the new payload
    DropOldest,
}

/// Result of [`OutboundQueue::enqueue`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enqueued {
    Accepted,
    /// Queue full, the new payload was not stored
    Rejected,
    /// Queue full, the returned head payload was discarded
    DisplacedOldest(String),
}

/// Result of one [`OutboundQueue::try_transmit_one`] attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    /// Queue was empty, nothing transmitted
    Idle,
    /// Head payload transmitted and discarded
    Success,
    /// Transmission failed, payload moved to the tail
    Retried,
    /// Transmission failed and the payload ran out of retries
    Dropped,
}

#[derive(Debug, Clone)]
struct Entry {
    payload: String,
    failures: u32,
}

/// Bounded outbound payload queue
#[derive(Debug)]
pub struct OutboundQueue {
    entries: VecDeque<Entry>,
    capacity: usize,
    overflow: OverflowPolicy,
    max_retries: Option<u32>,
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY, OverflowPolicy::default(), None)
    }
}

impl OutboundQueue {
    /// Create an empty queue
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of queued payloads (at least 1)
    /// * `overflow` - Policy applied when a payload arrives at a full queue
    /// * `max_retries` - Retries allowed per payload, `None` for unbounded
    pub fn new(capacity: usize, overflow: OverflowPolicy, max_retries: Option<u32>) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            overflow,
            max_retries,
        }
    }

    /// Append a payload at the tail
    pub fn enqueue(&mut self, payload: String) -> Enqueued {
        if self.entries.len() < self.capacity {
            self.entries.push_back(Entry {
                payload,
                failures: 0,
            });
            return Enqueued::Accepted;
        }

        match self.overflow {
            OverflowPolicy::DropNewest => {
                warn!(
                    "Outbound queue full ({} entries), dropping new payload",
                    self.capacity
                );
                Enqueued::Rejected
            }
            OverflowPolicy::DropOldest => {
                let oldest = self.entries.pop_front().map(|e| e.payload).unwrap_or_default();
                warn!(
                    "Outbound queue full ({} entries), dropping oldest payload",
                    self.capacity
                );
                self.entries.push_back(Entry {
                    payload,
                    failures: 0,
                });
                Enqueued::DisplacedOldest(oldest)
            }
        }
    }

    /// Transmit the head payload, if any
    ///
    /// On success the payload is discarded. On failure it is re-enqueued at
    /// the tail, unless its retry budget is spent.
    ///
    /// # Arguments
    ///
    /// * `radio` - Radio to transmit with
    /// * `timeout` - Transmit timeout passed to the radio
    ///
    /// # Returns
    ///
    /// * `TxOutcome` - What happened to the head payload
    pub async fn try_transmit_one<R: Radio + ?Sized>(
        &mut self,
        radio: &mut R,
        timeout: Duration,
    ) -> TxOutcome {
        let Some(mut entry) = self.entries.pop_front() else {
            return TxOutcome::Idle;
        };

        match radio.transmit(&entry.payload, timeout).await {
            Ok(()) => {
                debug!("Transmitted payload ({} bytes)", entry.payload.len());
                TxOutcome::Success
            }
            Err(e) => {
                entry.failures += 1;
                if let Some(max) = self.max_retries {
                    if entry.failures > max {
                        warn!(
                            "Dropping payload after {} failed attempts: {}",
                            entry.failures, e
                        );
                        return TxOutcome::Dropped;
                    }
                }

                debug!("Transmit failed ({}), requeueing at tail", e);
                self.entries.push_back(entry);
                TxOutcome::Retried
            }
        }
    }

    /// Number of queued payloads
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue holds no payloads
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of queued payloads
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Queued payloads from head to tail
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.payload.as_str())
    }
}
