//! Item source feeding the entry buffer.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lineworks_core::{Color, DelayRange, Item, ItemId, StopToken};
use rand::Rng;

use crate::buffer::Buffer;

/// Emits a fixed number of randomly coloured items into one buffer.
///
/// Items are numbered from 1. The inter-arrival delay is sampled
/// between items, not after the last one.
#[derive(Debug)]
pub struct Generator {
    entry: Arc<Buffer>,
    count: usize,
    arrival: DelayRange,
    start_delay: Duration,
    running: AtomicBool,
    produced: AtomicUsize,
}

impl Generator {
    /// A generator for `count` items into `entry`.
    pub fn new(
        entry: Arc<Buffer>,
        count: usize,
        arrival: DelayRange,
        start_delay: Duration,
    ) -> Self {
        Self {
            entry,
            count,
            arrival,
            start_delay,
            running: AtomicBool::new(true),
            produced: AtomicUsize::new(0),
        }
    }

    /// Items put so far.
    pub fn produced(&self) -> usize {
        self.produced.load(Ordering::Acquire)
    }

    /// Stop at the next delay boundary.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Produce items until done or stopped. Returns how many were put.
    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R, stop: &StopToken) -> usize {
        if !self.start_delay.is_zero() && !stop.sleep(self.start_delay) {
            return 0;
        }

        let mut produced = 0;
        for n in 1..=self.count {
            if !self.running.load(Ordering::Acquire) || stop.is_stopped() {
                break;
            }
            let item = Item::new(ItemId(n as u64), Color::random(rng));
            tracing::trace!(
                item = n,
                color = %item.color(),
                buffer = %self.entry.id(),
                "generated"
            );
            self.entry.put(item);
            produced += 1;
            self.produced.store(produced, Ordering::Release);

            if n < self.count && !stop.sleep(self.arrival.sample(rng)) {
                break;
            }
        }

        tracing::debug!(produced, requested = self.count, "generator finished");
        produced
    }
}
