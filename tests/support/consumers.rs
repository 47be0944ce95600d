use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use bus_conventions::bus::{ConsumeContext, Consumer};
use bus_conventions::{ConsumeError, Message};

/// Records every message it consumes.
pub struct Recorder<M> {
    seen: Mutex<Vec<M>>,
}

impl<M> Default for Recorder<M> {
    fn default() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl<M: Clone> Recorder<M> {
    pub fn seen(&self) -> Vec<M> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl<M: Message + Clone> Consumer<M> for Recorder<M> {
    async fn consume(&self, context: ConsumeContext<M>) -> Result<(), ConsumeError> {
        self.seen.lock().unwrap().push(context.into_message());
        Ok(())
    }
}

/// Fails the first `failures` deliveries, recording when each attempt ran.
pub struct Flaky<M> {
    failures: AtomicUsize,
    attempts: Mutex<Vec<(usize, Instant)>>,
    _marker: PhantomData<fn() -> M>,
}

impl<M> Flaky<M> {
    pub fn failing(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            attempts: Mutex::new(Vec::new()),
            _marker: PhantomData,
        }
    }

    pub fn always() -> Self {
        Self::failing(usize::MAX)
    }

    /// `(retry_attempt, when)` per delivery attempt.
    pub fn attempts(&self) -> Vec<(usize, Instant)> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl<M: Message> Consumer<M> for Flaky<M> {
    async fn consume(&self, context: ConsumeContext<M>) -> Result<(), ConsumeError> {
        self.attempts
            .lock()
            .unwrap()
            .push((context.retry_attempt(), Instant::now()));

        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining == 0 {
            return Ok(());
        }
        if remaining != usize::MAX {
            self.failures.fetch_sub(1, Ordering::SeqCst);
        }
        Err(ConsumeError::failed("downstream unavailable"))
    }
}

/// Takes a while per message and tracks how many run at once.
pub struct Slow<M> {
    work: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    handled: AtomicUsize,
    _marker: PhantomData<fn() -> M>,
}

impl<M> Slow<M> {
    pub fn new(work: Duration) -> Self {
        Self {
            work,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            handled: AtomicUsize::new(0),
            _marker: PhantomData,
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn handled(&self) -> usize {
        self.handled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<M: Message> Consumer<M> for Slow<M> {
    async fn consume(&self, _context: ConsumeContext<M>) -> Result<(), ConsumeError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.work).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.handled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Panics on every delivery.
pub struct Panicky<M> {
    attempts: AtomicUsize,
    _marker: PhantomData<fn() -> M>,
}

impl<M> Default for Panicky<M> {
    fn default() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
            _marker: PhantomData,
        }
    }
}

impl<M> Panicky<M> {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<M: Message> Consumer<M> for Panicky<M> {
    async fn consume(&self, _context: ConsumeContext<M>) -> Result<(), ConsumeError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        panic!("boom");
    }
}
