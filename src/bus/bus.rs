//! Bus - the built, startable result of bus configuration.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::consumer::ConsumerPipe;
use super::endpoint::{ReceiveEndpoint, ReceiveEndpointConfigurator};
use super::envelope::{Envelope, FAULT_REASON_HEADER, FAULT_RETRIES_HEADER};
use super::routing::{EndpointAddress, RouteTable};
use super::transport::{Host, Transport};
use crate::error::{BusError, ConsumeError};
use crate::naming::Message;

/// How long an endpoint task waits before polling an empty queue again.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Statistics from one receive endpoint task.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EndpointStats {
    pub queue: String,
    /// Messages taken from the queue.
    pub received: usize,
    /// Messages handled successfully (possibly after retries).
    pub consumed: usize,
    /// Retries performed across all messages.
    pub retried: usize,
    /// Messages moved to the error queue after exhausting retries.
    pub faulted: usize,
    /// Messages no consumer on the endpoint accepts.
    pub skipped: usize,
    /// Messages put back on the queue because the bus stopped mid-retry.
    pub requeued: usize,
}

/// A configured bus.
///
/// Returned by [`build_bus`](super::build_bus) not yet started. The hosting
/// environment calls [`start`](Bus::start) once and [`stop`](Bus::stop) on
/// shutdown; each receive endpoint runs as one task in between.
pub struct Bus {
    application_name: String,
    transport: Arc<dyn Transport>,
    host: Host,
    endpoints: Vec<Arc<ReceiveEndpoint>>,
    routes: Arc<RouteTable>,
    poll_interval: Duration,
    running: Mutex<Option<Running>>,
}

struct Running {
    cancel: CancellationToken,
    workers: Vec<JoinHandle<EndpointStats>>,
}

impl Bus {
    pub(crate) fn new(
        application_name: String,
        transport: Arc<dyn Transport>,
        host: Host,
        endpoints: &[ReceiveEndpointConfigurator],
        routes: RouteTable,
    ) -> Self {
        Self {
            application_name,
            transport,
            host,
            endpoints: endpoints.iter().map(|e| Arc::new(e.build())).collect(),
            routes: Arc::new(routes),
            poll_interval: DEFAULT_POLL_INTERVAL,
            running: Mutex::new(None),
        }
    }

    /// Set how often endpoint tasks poll an empty queue.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Queue names of the receive endpoints, in registration order.
    pub fn endpoint_queues(&self) -> Vec<&str> {
        self.endpoints.iter().map(|e| e.queue.as_str()).collect()
    }

    pub fn is_running(&self) -> bool {
        self.running().is_some()
    }

    /// Spawn one task per receive endpoint.
    pub async fn start(&self) -> Result<(), BusError> {
        let mut running = self.running();
        if running.is_some() {
            return Err(BusError::AlreadyStarted);
        }

        let cancel = CancellationToken::new();
        let workers = self
            .endpoints
            .iter()
            .map(|endpoint| {
                tokio::spawn(run_endpoint(
                    Arc::clone(&self.transport),
                    Arc::clone(endpoint),
                    cancel.clone(),
                    self.poll_interval,
                ))
            })
            .collect();

        info!(
            application = %self.application_name,
            endpoints = self.endpoints.len(),
            routes = self.routes.len(),
            "bus started"
        );
        *running = Some(Running { cancel, workers });
        Ok(())
    }

    /// Stop every endpoint task and wait for in-flight messages to settle.
    pub async fn stop(&self) -> Result<Vec<EndpointStats>, BusError> {
        let Running { cancel, workers } = self.running().take().ok_or(BusError::NotStarted)?;
        cancel.cancel();

        let mut stats = Vec::with_capacity(workers.len());
        for (worker, endpoint) in workers.into_iter().zip(&self.endpoints) {
            match worker.await {
                Ok(s) => stats.push(s),
                Err(err) => {
                    error!(queue = %endpoint.queue, error = %err, "endpoint task panicked");
                    stats.push(EndpointStats {
                        queue: endpoint.queue.clone(),
                        ..Default::default()
                    });
                }
            }
        }

        info!(application = %self.application_name, "bus stopped");
        Ok(stats)
    }

    /// Send `message` to the address registered for its type.
    pub async fn send<M: Message>(&self, message: &M) -> Result<(), BusError> {
        let address = self
            .routes
            .lookup(&M::TYPE)
            .ok_or(BusError::RouteNotFound(M::TYPE))?;
        self.send_to(address, message).await
    }

    /// Send `message` to an explicit address.
    pub async fn send_to<M: Message>(
        &self,
        address: &EndpointAddress,
        message: &M,
    ) -> Result<(), BusError> {
        let envelope = Envelope::encode(message)?;
        debug!(message_id = %envelope.message_id, address = %address, "sending");
        self.transport.send(address, envelope).await?;
        Ok(())
    }

    fn running(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Bus {
    fn drop(&mut self) {
        if let Some(running) = self.running().take() {
            running.cancel.cancel();
        }
    }
}

enum Outcome {
    Consumed { retries: usize },
    Faulted { retries: usize },
    Skipped,
    Requeued { retries: usize },
}

/// Poll one queue until cancelled, handling at most `in_flight_limit`
/// messages at a time.
async fn run_endpoint(
    transport: Arc<dyn Transport>,
    endpoint: Arc<ReceiveEndpoint>,
    cancel: CancellationToken,
    poll_interval: Duration,
) -> EndpointStats {
    let mut stats = EndpointStats {
        queue: endpoint.queue.clone(),
        ..Default::default()
    };
    let permits = Arc::new(Semaphore::new(endpoint.in_flight_limit));
    let mut in_flight = JoinSet::new();

    loop {
        while let Some(done) = in_flight.try_join_next() {
            record(&mut stats, done);
        }

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            permit = Arc::clone(&permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let received = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = transport.receive(&endpoint.queue) => received,
        };

        match received {
            Ok(Some(envelope)) => {
                stats.received += 1;
                let transport = Arc::clone(&transport);
                let endpoint = Arc::clone(&endpoint);
                let cancel = cancel.clone();
                in_flight.spawn(async move {
                    let outcome = deliver(transport, endpoint, envelope, cancel).await;
                    drop(permit);
                    outcome
                });
            }
            Ok(None) => {
                drop(permit);
                if idle(&cancel, poll_interval).await {
                    break;
                }
            }
            Err(err) => {
                drop(permit);
                warn!(queue = %endpoint.queue, error = %err, "receive failed");
                if idle(&cancel, poll_interval).await {
                    break;
                }
            }
        }
    }

    while let Some(done) = in_flight.join_next().await {
        record(&mut stats, done);
    }
    stats
}

/// Sleep for `interval`; true when cancelled first.
async fn idle(cancel: &CancellationToken, interval: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(interval) => false,
    }
}

fn record(stats: &mut EndpointStats, done: Result<Outcome, tokio::task::JoinError>) {
    match done {
        Ok(Outcome::Consumed { retries }) => {
            stats.consumed += 1;
            stats.retried += retries;
        }
        Ok(Outcome::Faulted { retries }) => {
            stats.faulted += 1;
            stats.retried += retries;
        }
        Ok(Outcome::Skipped) => stats.skipped += 1,
        Ok(Outcome::Requeued { retries }) => {
            stats.requeued += 1;
            stats.retried += retries;
        }
        // Consumer panics are caught per attempt; this is a fault in the bus itself.
        Err(err) => error!(queue = %stats.queue, error = %err, "delivery task failed"),
    }
}

/// Hand one envelope to every matching consumer, retrying per the endpoint's
/// policy. All matching consumers must succeed for the message to count as
/// consumed.
async fn deliver(
    transport: Arc<dyn Transport>,
    endpoint: Arc<ReceiveEndpoint>,
    envelope: Envelope,
    cancel: CancellationToken,
) -> Outcome {
    let queue = endpoint.queue.as_str();
    let consumers = endpoint.consumers_for(&envelope.message_type);

    if consumers.is_empty() {
        warn!(queue, message_type = %envelope.message_type, "no consumer for message, skipping");
        settle(&*transport, queue, &endpoint.skipped_queue(), envelope).await;
        return Outcome::Skipped;
    }

    let mut retries = 0;
    loop {
        let result = attempt(&consumers, &envelope, queue, retries).await;

        let err = match result {
            Ok(()) => {
                debug!(queue, message_id = %envelope.message_id, retries, "message consumed");
                if let Err(err) = transport.ack(queue, &envelope.message_id).await {
                    error!(queue, message_id = %envelope.message_id, error = %err, "ack failed");
                }
                return Outcome::Consumed { retries };
            }
            Err(err) => err,
        };

        let Some(delay) = endpoint.retry.delay(retries) else {
            error!(
                queue,
                message_id = %envelope.message_id,
                retries,
                error = %err,
                "retries exhausted, moving message to error queue"
            );
            let faulted = envelope
                .with_header(FAULT_REASON_HEADER, err.to_string())
                .with_header(FAULT_RETRIES_HEADER, retries.to_string());
            settle(&*transport, queue, &endpoint.error_queue(), faulted).await;
            return Outcome::Faulted { retries };
        };

        warn!(
            queue,
            message_id = %envelope.message_id,
            retry = retries + 1,
            delay_secs = delay.as_secs_f64(),
            error = %err,
            "consumer failed, retrying"
        );
        if idle(&cancel, delay).await {
            // Stopped mid-retry; hand the message back for the next run.
            settle(&*transport, queue, queue, envelope).await;
            return Outcome::Requeued { retries };
        }
        retries += 1;
    }
}

/// Run every consumer once on its own task, so a panicking consumer fails
/// the attempt instead of taking the delivery down with it.
async fn attempt(
    consumers: &[Arc<dyn ConsumerPipe>],
    envelope: &Envelope,
    queue: &str,
    retry_attempt: usize,
) -> Result<(), ConsumeError> {
    let consumers = consumers.to_vec();
    let envelope = envelope.clone();
    let queue = queue.to_string();
    let run = tokio::spawn(async move {
        for consumer in &consumers {
            consumer.dispatch(&envelope, &queue, retry_attempt).await?;
        }
        Ok::<(), ConsumeError>(())
    });

    match run.await {
        Ok(result) => result,
        Err(err) if err.is_panic() => Err(ConsumeError::Panicked(panic_message(err.into_panic()))),
        Err(err) => Err(ConsumeError::failed(err.to_string())),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Acknowledge `envelope` on `queue` and put it onto `target`.
async fn settle(transport: &dyn Transport, queue: &str, target: &str, envelope: Envelope) {
    let message_id = envelope.message_id.clone();
    if let Err(err) = transport.move_to_queue(target, envelope).await {
        error!(queue, target, message_id = %message_id, error = %err, "move failed");
        return;
    }
    if let Err(err) = transport.ack(queue, &message_id).await {
        error!(queue, message_id = %message_id, error = %err, "ack failed");
    }
}
