//! RabbitMQ adapters built on `lapin`.
//!
//! Publishers keep one lazily opened channel with publisher confirms
//! enabled. A failed publish drops the channel; the next call reconnects.
//! Every operation declares its queue first, so neither side depends on the
//! other having started.

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::acker::Acker;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicCancelOptions, BasicConsumeOptions, BasicNackOptions,
    BasicPublishOptions, BasicQosOptions, ConfirmSelectOptions, QueueDeclareOptions,
};
use lapin::publisher_confirm::Confirmation;
use lapin::types::{AMQPValue, FieldTable};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use user_events::{
    CONTENT_TYPE_JSON, QueueTopology, USERS_DEAD_LETTER_QUEUE, USERS_QUEUE, UserRegisteredEvent,
};

use crate::domain::ports::{
    AckMode, DeadLetterSink, DeliveryHandle, EventPublishError, EventSource, EventSourceError,
    EventSubscription, InboundMessage, UserEventPublisher,
};

const PERSISTENT_DELIVERY: u8 = 2;
const CONSUMER_TAG: &str = "tasks-onboarding-consumer";
const FAILURE_REASON_HEADER: &str = "x-failure-reason";

async fn open_channel(url: &str, name: &str) -> Result<(Connection, Channel), lapin::Error> {
    let connection = Connection::connect(
        url,
        ConnectionProperties::default().with_connection_name(name.into()),
    )
    .await?;
    let channel = connection.create_channel().await?;
    Ok((connection, channel))
}

async fn declare_queue(channel: &Channel, queue: QueueTopology) -> Result<(), lapin::Error> {
    channel
        .queue_declare(
            queue.name(),
            QueueDeclareOptions {
                durable: queue.durable(),
                exclusive: queue.exclusive(),
                auto_delete: queue.auto_delete(),
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map(|_| ())
}

struct Session {
    // Dropping the connection closes the channel, so it lives alongside it.
    _connection: Connection,
    channel: Channel,
}

/// One confirmed publishing channel, reopened on demand.
struct ConfirmedPublisher {
    url: String,
    connection_name: &'static str,
    session: Mutex<Option<Session>>,
}

impl ConfirmedPublisher {
    fn new(url: impl Into<String>, connection_name: &'static str) -> Self {
        Self {
            url: url.into(),
            connection_name,
            session: Mutex::new(None),
        }
    }

    async fn connect(&self) -> Result<Session, EventPublishError> {
        let (connection, channel) = open_channel(&self.url, self.connection_name)
            .await
            .map_err(|err| EventPublishError::unavailable(err.to_string()))?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|err| EventPublishError::unavailable(err.to_string()))?;
        debug!(connection = self.connection_name, "amqp publisher channel opened");
        Ok(Session {
            _connection: connection,
            channel,
        })
    }

    async fn publish(
        &self,
        queue: QueueTopology,
        body: &[u8],
        properties: BasicProperties,
    ) -> Result<(), EventPublishError> {
        let mut guard = self.session.lock().await;
        if guard
            .as_ref()
            .is_none_or(|session| !session.channel.status().connected())
        {
            *guard = Some(self.connect().await?);
        }
        let Some(session) = guard.as_ref() else {
            return Err(EventPublishError::unavailable("amqp channel missing"));
        };

        let outcome = Self::publish_on(&session.channel, queue, body, properties).await;
        if matches!(outcome, Err(EventPublishError::Unavailable { .. })) {
            *guard = None;
        }
        outcome
    }

    async fn publish_on(
        channel: &Channel,
        queue: QueueTopology,
        body: &[u8],
        properties: BasicProperties,
    ) -> Result<(), EventPublishError> {
        declare_queue(channel, queue)
            .await
            .map_err(|err| EventPublishError::unavailable(err.to_string()))?;
        let confirmation = channel
            .basic_publish(
                "",
                queue.name(),
                BasicPublishOptions::default(),
                body,
                properties,
            )
            .await
            .map_err(|err| EventPublishError::unavailable(err.to_string()))?
            .await
            .map_err(|err| EventPublishError::unavailable(err.to_string()))?;
        match confirmation {
            Confirmation::Nack(_) => Err(EventPublishError::rejected(format!(
                "broker nacked publish to {}",
                queue.name()
            ))),
            Confirmation::Ack(_) | Confirmation::NotRequested => Ok(()),
        }
    }
}

fn json_properties() -> BasicProperties {
    BasicProperties::default()
        .with_delivery_mode(PERSISTENT_DELIVERY)
        .with_content_type(CONTENT_TYPE_JSON.into())
}

/// Publishes registration events to `users_queue`.
pub struct AmqpUserEventPublisher {
    inner: ConfirmedPublisher,
}

impl AmqpUserEventPublisher {
    /// Create a publisher for the broker at `url`. No connection is opened
    /// until the first publish.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            inner: ConfirmedPublisher::new(url, "users-service-publisher"),
        }
    }
}

#[async_trait]
impl UserEventPublisher for AmqpUserEventPublisher {
    async fn publish(&self, event: &UserRegisteredEvent) -> Result<(), EventPublishError> {
        let body = event
            .encode()
            .map_err(|err| EventPublishError::rejected(err.to_string()))?;
        self.inner
            .publish(USERS_QUEUE, &body, json_properties())
            .await
    }
}

/// Parks undeliverable bodies on `users_queue.dead_letter`.
pub struct AmqpDeadLetterSink {
    inner: ConfirmedPublisher,
}

impl AmqpDeadLetterSink {
    /// Create a sink for the broker at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            inner: ConfirmedPublisher::new(url, "tasks-service-dead-letters"),
        }
    }
}

#[async_trait]
impl DeadLetterSink for AmqpDeadLetterSink {
    async fn dead_letter(&self, body: &[u8], reason: &str) -> Result<(), EventPublishError> {
        let mut headers = FieldTable::default();
        headers.insert(
            FAILURE_REASON_HEADER.into(),
            AMQPValue::LongString(reason.into()),
        );
        let properties = json_properties().with_headers(headers);
        self.inner
            .publish(USERS_DEAD_LETTER_QUEUE, body, properties)
            .await?;
        warn!(
            reason,
            queue = USERS_DEAD_LETTER_QUEUE.name(),
            "message dead-lettered"
        );
        Ok(())
    }
}

/// Opens consumer subscriptions on `users_queue`.
pub struct AmqpEventSource {
    url: String,
}

impl AmqpEventSource {
    /// Create a source for the broker at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

fn connect_error(err: lapin::Error) -> EventSourceError {
    EventSourceError::connect(err.to_string())
}

#[async_trait]
impl EventSource for AmqpEventSource {
    async fn subscribe(
        &self,
        ack_mode: AckMode,
    ) -> Result<Box<dyn EventSubscription>, EventSourceError> {
        let (connection, channel) = open_channel(&self.url, "tasks-service-consumer")
            .await
            .map_err(connect_error)?;
        declare_queue(&channel, USERS_QUEUE)
            .await
            .map_err(connect_error)?;
        if ack_mode == AckMode::AfterPersist {
            // One unacknowledged message at a time keeps handling strictly serial.
            channel
                .basic_qos(1, BasicQosOptions::default())
                .await
                .map_err(connect_error)?;
        }
        let consumer = channel
            .basic_consume(
                USERS_QUEUE.name(),
                CONSUMER_TAG,
                BasicConsumeOptions {
                    no_ack: ack_mode == AckMode::Auto,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(connect_error)?;
        info!(queue = USERS_QUEUE.name(), %ack_mode, "subscribed to queue");

        Ok(Box::new(AmqpSubscription {
            connection,
            channel,
            consumer,
            ack_mode,
        }))
    }
}

struct AmqpSubscription {
    connection: Connection,
    channel: Channel,
    consumer: Consumer,
    ack_mode: AckMode,
}

impl AmqpSubscription {
    fn to_message(&self, delivery: Delivery) -> InboundMessage {
        let Delivery {
            data,
            redelivered,
            acker,
            ..
        } = delivery;
        let handle: Box<dyn DeliveryHandle> = match self.ack_mode {
            AckMode::Auto => Box::new(SettledByBroker),
            AckMode::AfterPersist => Box::new(AmqpDeliveryHandle { acker }),
        };
        InboundMessage::new(data, redelivered, handle)
    }
}

#[async_trait]
impl EventSubscription for AmqpSubscription {
    async fn next_message(&mut self) -> Option<Result<InboundMessage, EventSourceError>> {
        match self.consumer.next().await? {
            Ok(delivery) => Some(Ok(self.to_message(delivery))),
            Err(err) => Some(Err(EventSourceError::stream(err.to_string()))),
        }
    }

    async fn close(&mut self) {
        if let Err(err) = self
            .channel
            .basic_cancel(CONSUMER_TAG, BasicCancelOptions::default())
            .await
        {
            debug!(error = %err, "amqp consumer cancel failed");
        }
        if let Err(err) = self.channel.close(200, "OK").await {
            debug!(error = %err, "amqp channel close failed");
        }
        if let Err(err) = self.connection.close(200, "OK").await {
            debug!(error = %err, "amqp connection close failed");
        }
    }
}

struct AmqpDeliveryHandle {
    acker: Acker,
}

#[async_trait]
impl DeliveryHandle for AmqpDeliveryHandle {
    async fn ack(&self) -> Result<(), EventSourceError> {
        self.acker
            .ack(BasicAckOptions::default())
            .await
            .map_err(|err| EventSourceError::acknowledge(err.to_string()))
    }

    async fn requeue(&self) -> Result<(), EventSourceError> {
        self.acker
            .nack(BasicNackOptions {
                requeue: true,
                ..Default::default()
            })
            .await
            .map_err(|err| EventSourceError::acknowledge(err.to_string()))
    }
}

/// Handle for `no_ack` deliveries; the broker already settled them.
struct SettledByBroker;

#[async_trait]
impl DeliveryHandle for SettledByBroker {
    async fn ack(&self) -> Result<(), EventSourceError> {
        Ok(())
    }

    async fn requeue(&self) -> Result<(), EventSourceError> {
        Err(EventSourceError::acknowledge(
            "auto-acknowledged deliveries cannot be requeued",
        ))
    }
}

#[cfg(test)]
mod tests {
    //! Broker-free coverage; the AMQP path is exercised against RabbitMQ in
    //! deployment smoke tests.
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn json_properties_are_persistent() {
        let properties = json_properties();
        assert_eq!(properties.delivery_mode(), &Some(PERSISTENT_DELIVERY));
        assert_eq!(
            properties.content_type().as_ref().map(|value| value.as_str()),
            Some(CONTENT_TYPE_JSON)
        );
        assert!(properties.headers().is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn publish_without_broker_is_unavailable() {
        let publisher = AmqpUserEventPublisher::new("amqp://127.0.0.1:1/%2f");
        let event = UserRegisteredEvent::new(1, "a@b.com", chrono::Utc::now());
        let err = publisher.publish(&event).await.expect_err("no broker");
        assert!(matches!(err, EventPublishError::Unavailable { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn broker_settled_handle_acks_trivially() {
        assert!(SettledByBroker.ack().await.is_ok());
        assert!(SettledByBroker.requeue().await.is_err());
    }
}
