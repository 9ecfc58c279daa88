//! Integration tests for [`RabbitBrokerManager`] with a real RabbitMQ broker.
//!
//! These tests use testcontainers to start RabbitMQ and validate:
//! - Deliveries reach the subscribed handler only after `start`
//! - Failing handlers do not block later messages
//! - Duplicate subscription names are rejected
//! - `delete_all` releases handlers and `teardown` closes the manager
//!
//! # Running These Tests
//!
//! These tests are marked as `#[ignore]` by default because they require
//! Docker to be running. To run explicitly:
//! ```bash
//! cargo test -p convograph-rabbitmq --test integration_tests -- --ignored
//! ```

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use convograph_core::broker::{BrokerError, BrokerManager, HandlerError, MessageHandler, SubscriptionOptions};
use convograph_rabbitmq::RabbitBrokerManager;
use lapin::options::BasicPublishOptions;
use lapin::{BasicProperties, Connection, ConnectionProperties};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use testcontainers::ContainerAsync;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::rabbitmq::RabbitMq;

const AMQP_PORT: u16 = 5672;

/// Handler that records payloads and fails on the literal body `fail`.
#[derive(Default)]
struct RecordingHandler {
    received: Mutex<Vec<Vec<u8>>>,
    released: AtomicUsize,
}

impl RecordingHandler {
    fn received(&self) -> Vec<Vec<u8>> {
        self.received.lock().unwrap().clone()
    }
}

impl MessageHandler for RecordingHandler {
    fn handle<'a>(
        &'a self,
        data: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + 'a>> {
        Box::pin(async move {
            if data == b"fail" {
                return Err(HandlerError::Decode("scripted failure".to_string()));
            }
            self.received.lock().unwrap().push(data.to_vec());
            Ok(())
        })
    }

    fn release(&self) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + '_>> {
        Box::pin(async move {
            self.released.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

async fn start_rabbit() -> (ContainerAsync<RabbitMq>, String) {
    let container = RabbitMq::default()
        .start()
        .await
        .expect("Failed to start RabbitMQ container");
    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(AMQP_PORT)
        .await
        .expect("Failed to get port");
    (container, format!("amqp://guest:guest@{host}:{port}/%2F"))
}

async fn publish(uri: &str, exchange: &str, payload: &[u8]) {
    let connection = Connection::connect(uri, ConnectionProperties::default())
        .await
        .expect("publisher connection");
    let channel = connection.create_channel().await.expect("publisher channel");
    channel
        .basic_publish(
            exchange,
            "",
            BasicPublishOptions::default(),
            payload,
            BasicProperties::default(),
        )
        .await
        .expect("publish")
        .await
        .expect("publisher confirm");
    connection.close(200, "done").await.expect("close publisher");
}

async fn wait_for(handler: &RecordingHandler, count: usize) {
    for _ in 0..50 {
        if handler.received().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("expected {count} deliveries, got {:?}", handler.received());
}

#[tokio::test]
#[ignore]
async fn test_deliveries_flow_after_start() {
    let (_container, uri) = start_rabbit().await;
    let broker = RabbitBrokerManager::connect(&uri).await.expect("connect");
    let handler = Arc::new(RecordingHandler::default());

    broker
        .create_subscription(SubscriptionOptions::new("insight", handler.clone()))
        .await
        .expect("subscribe");

    publish(&uri, "insight", b"before-start").await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(handler.received().is_empty(), "no delivery before start");

    broker.start().await.expect("start");
    publish(&uri, "insight", b"fail").await;
    publish(&uri, "insight", b"after-start").await;

    wait_for(&handler, 2).await;
    assert_eq!(
        handler.received(),
        vec![b"before-start".to_vec(), b"after-start".to_vec()]
    );

    broker.teardown().await.expect("teardown");
}

#[tokio::test]
#[ignore]
async fn test_duplicate_subscription_rejected() {
    let (_container, uri) = start_rabbit().await;
    let broker = RabbitBrokerManager::connect(&uri).await.expect("connect");

    broker
        .create_subscription(SubscriptionOptions::new("topic", Arc::new(RecordingHandler::default())))
        .await
        .expect("first subscription");
    let second = broker
        .create_subscription(SubscriptionOptions::new("topic", Arc::new(RecordingHandler::default())))
        .await;

    assert_eq!(second, Err(BrokerError::SubscriptionExists("topic".to_string())));
    assert_eq!(broker.subscription_names().await, vec!["topic".to_string()]);

    broker.teardown().await.expect("teardown");
}

#[tokio::test]
#[ignore]
async fn test_teardown_releases_handlers_and_closes() {
    let (_container, uri) = start_rabbit().await;
    let broker = RabbitBrokerManager::connect(&uri).await.expect("connect");
    let entity = Arc::new(RecordingHandler::default());
    let tracker = Arc::new(RecordingHandler::default());

    broker
        .create_subscription(SubscriptionOptions::new("entity", entity.clone()))
        .await
        .expect("entity");
    broker
        .create_subscription(SubscriptionOptions::new("tracker", tracker.clone()))
        .await
        .expect("tracker");
    broker.start().await.expect("start");

    broker.teardown().await.expect("teardown");
    broker.teardown().await.expect("second teardown is a no-op");

    assert_eq!(entity.released.load(Ordering::SeqCst), 1);
    assert_eq!(tracker.released.load(Ordering::SeqCst), 1);
    assert_eq!(
        broker
            .create_subscription(SubscriptionOptions::new("entity", entity.clone()))
            .await,
        Err(BrokerError::Closed)
    );
}
