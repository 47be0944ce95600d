//! Typed consumers and the type-erased pipe that feeds them envelopes.

use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use super::envelope::Envelope;
use super::services::ServiceProvider;
use crate::error::ConsumeError;
use crate::naming::{Message, MessageType};

/// Handles messages of type `M` delivered to a receive endpoint.
///
/// Returning an error triggers the endpoint's retry policy.
#[async_trait]
pub trait Consumer<M: Message>: Send + Sync + 'static {
    async fn consume(&self, context: ConsumeContext<M>) -> Result<(), ConsumeError>;
}

/// A decoded message plus its delivery metadata.
#[derive(Debug)]
pub struct ConsumeContext<M> {
    message: M,
    message_id: String,
    headers: Vec<(String, String)>,
    queue: String,
    retry_attempt: usize,
}

impl<M> ConsumeContext<M> {
    pub fn message(&self) -> &M {
        &self.message
    }

    pub fn into_message(self) -> M {
        self.message
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Queue the message was received from.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// 0 on first delivery, 1 on the first retry, and so on.
    pub fn retry_attempt(&self) -> usize {
        self.retry_attempt
    }
}

/// Decodes envelopes and hands them to a consumer resolved per delivery.
#[async_trait]
pub(crate) trait ConsumerPipe: Send + Sync {
    fn message_type(&self) -> MessageType;

    fn consumer_name(&self) -> &'static str;

    async fn dispatch(
        &self,
        envelope: &Envelope,
        queue: &str,
        retry_attempt: usize,
    ) -> Result<(), ConsumeError>;
}

pub(crate) struct TypedConsumerPipe<C, M> {
    services: Arc<ServiceProvider>,
    _marker: PhantomData<fn() -> (C, M)>,
}

impl<C, M> TypedConsumerPipe<C, M> {
    pub(crate) fn new(services: Arc<ServiceProvider>) -> Self {
        Self {
            services,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<C, M> ConsumerPipe for TypedConsumerPipe<C, M>
where
    C: Consumer<M>,
    M: Message,
{
    fn message_type(&self) -> MessageType {
        M::TYPE
    }

    fn consumer_name(&self) -> &'static str {
        type_name::<C>()
    }

    async fn dispatch(
        &self,
        envelope: &Envelope,
        queue: &str,
        retry_attempt: usize,
    ) -> Result<(), ConsumeError> {
        let message = envelope.decode::<M>()?;
        let consumer = self
            .services
            .resolve::<C>()
            .ok_or(ConsumeError::Unresolved(type_name::<C>()))?;

        consumer
            .consume(ConsumeContext {
                message,
                message_id: envelope.message_id.clone(),
                headers: envelope.headers.clone(),
                queue: queue.to_string(),
                retry_attempt,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::sync::Mutex;

    #[derive(Debug, Serialize, Deserialize)]
    struct Ping {
        n: u32,
    }

    impl Message for Ping {
        const TYPE: MessageType = MessageType::new("Test", "Ping");
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(u32, usize, String)>>,
    }

    #[async_trait]
    impl Consumer<Ping> for Recorder {
        async fn consume(&self, context: ConsumeContext<Ping>) -> Result<(), ConsumeError> {
            self.seen.lock().unwrap().push((
                context.message().n,
                context.retry_attempt(),
                context.queue().to_string(),
            ));
            Ok(())
        }
    }

    #[tokio::test]
    async fn pipe_decodes_and_dispatches() {
        let services = Arc::new(ServiceProvider::new().with_singleton(Recorder::default()));
        let pipe = TypedConsumerPipe::<Recorder, Ping>::new(Arc::clone(&services));
        let envelope = Envelope::encode(&Ping { n: 3 }).unwrap();

        pipe.dispatch(&envelope, "app_test_ping", 1).await.unwrap();

        let recorder = services.resolve::<Recorder>().unwrap();
        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![(3, 1, "app_test_ping".to_string())]
        );
        assert_eq!(pipe.message_type(), Ping::TYPE);
    }

    #[tokio::test]
    async fn undecodable_payload_fails() {
        let services = Arc::new(ServiceProvider::new().with_singleton(Recorder::default()));
        let pipe = TypedConsumerPipe::<Recorder, Ping>::new(services);
        let envelope = Envelope::new(Ping::TYPE.urn(), b"not json".to_vec());

        let err = pipe.dispatch(&envelope, "q", 0).await.unwrap_err();
        assert!(matches!(err, ConsumeError::DecodeFailed(_)));
    }

    #[tokio::test]
    async fn missing_consumer_fails() {
        let pipe = TypedConsumerPipe::<Recorder, Ping>::new(Arc::new(ServiceProvider::new()));
        let envelope = Envelope::encode(&Ping { n: 1 }).unwrap();

        let err = pipe.dispatch(&envelope, "q", 0).await.unwrap_err();
        assert!(matches!(err, ConsumeError::Unresolved(_)));
    }
}
