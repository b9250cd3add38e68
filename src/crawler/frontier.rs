//! Shared crawl frontier
//!
//! An unbounded multi-producer, multi-consumer FIFO of work items. Pushing
//! never blocks; popping waits until an item is available.

use crate::storage::{LinkRecord, OutletRecord};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tokio::sync::Semaphore;

/// A unit of work for a crawl worker
#[derive(Debug, Clone, PartialEq)]
pub enum WorkItem {
    /// Fetch an outlet's URL and attach the scrape to the outlet
    Outlet(OutletRecord),
    /// Fetch a link's target URL
    Link(LinkRecord),
    /// End the worker that receives it
    Stop,
}

/// FIFO queue shared by the round coordinator and its workers
///
/// The semaphore counts queued items, so `pop` sleeps instead of spinning.
#[derive(Debug)]
pub struct Frontier {
    items: Mutex<VecDeque<WorkItem>>,
    available: Semaphore,
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Semaphore::new(0),
        }
    }

    /// Appends an item
    pub fn push(&self, item: WorkItem) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(item);
        self.available.add_permits(1);
    }

    /// Removes the oldest item, waiting until one is available
    pub async fn pop(&self) -> Option<WorkItem> {
        let permit = self.available.acquire().await.ok()?;
        permit.forget();
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Removes the oldest item without waiting
    pub fn try_pop(&self) -> Option<WorkItem> {
        let permit = self.available.try_acquire().ok()?;
        permit.forget();
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Removes and returns every queued item
    pub fn drain(&self) -> Vec<WorkItem> {
        let mut drained = Vec::new();
        while let Some(item) = self.try_pop() {
            drained.push(item);
        }
        drained
    }

    /// Number of queued items
    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
