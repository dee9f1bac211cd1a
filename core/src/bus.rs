//! Bus registration model.
//!
//! Plugins describe what the bus consumes; they never touch a transport.
//! Every contribution lands in a [`BusRegistrationConfigurator`], the single
//! mutable builder threaded through the bus-topology fold. Once the fold and
//! the transport factory have run, the builder is consumed into a
//! [`BusTopology`] and handed to the transport runtime.
//!
//! # Example
//!
//! ```rust
//! use transit_platform_core::bus::{
//!     consumer_fn, BusRegistrationConfigurator, HandlerRegistration, RequestClientDefinition,
//! };
//!
//! let mut bus = BusRegistrationConfigurator::new();
//! bus.add_consumer(
//!     HandlerRegistration::consumer("SubmitOrderConsumer", consumer_fn(|_envelope| async { Ok(()) }))
//!         .handles("SubmitOrder"),
//! );
//! bus.add_request_client(RequestClientDefinition::new("CheckOrderStatus"));
//!
//! let context = bus.registration_context();
//! assert_eq!(context.endpoint_name(&context.registrations()[0]), "submit-order");
//! ```

use crate::endpoint_name::EndpointNameFormatter;
use crate::error::BootstrapError;
use crate::options::TransportKind;
use crate::transport::{BusFactoryConfigurator, ReceiveEndpointDefinition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// A message travelling through the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique message id
    pub message_id: Uuid,
    /// Correlation id shared by related messages
    pub correlation_id: Option<Uuid>,
    /// Message type name consumers subscribe to
    pub message_type: String,
    /// Message body
    pub payload: Value,
    /// When the message was sent
    pub sent_at: DateTime<Utc>,
}

impl Envelope {
    /// Create an envelope with a fresh message id.
    #[must_use]
    pub fn new(message_type: impl Into<String>, payload: Value) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            correlation_id: None,
            message_type: message_type.into(),
            payload,
            sent_at: Utc::now(),
        }
    }

    /// Set the correlation id.
    #[must_use]
    pub const fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// Message handler behind a consumer, saga, or activity registration.
///
/// Business logic lives outside the platform, so failures are plain
/// [`anyhow::Error`]s; the runtime decides whether to retry them.
pub trait Consumer: Send + Sync {
    /// Handle one message.
    ///
    /// # Errors
    ///
    /// Any handler failure.
    fn consume<'a>(
        &'a self,
        envelope: &'a Envelope,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;
}

struct FnConsumer<F>(F);

impl<F, Fut> Consumer for FnConsumer<F>
where
    F: Fn(Envelope) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn consume<'a>(
        &'a self,
        envelope: &'a Envelope,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin((self.0)(envelope.clone()))
    }
}

/// Wrap an async closure as a [`Consumer`].
pub fn consumer_fn<F, Fut>(handler: F) -> Arc<dyn Consumer>
where
    F: Fn(Envelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnConsumer(handler))
}

/// Where a saga keeps its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SagaRepository {
    /// Process-local state, lost on restart
    InMemory,
    /// Document store selected by `SagaDbConfigs` descriptor name
    DocumentStore(String),
    /// Relational store selected by `SagaDbConfigs` descriptor name
    Relational(String),
}

/// What a registration represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationKind {
    /// Stateless message consumer
    Consumer,
    /// Persisted state machine
    Saga(SagaRepository),
    /// Routing-slip activity
    Activity,
}

impl RegistrationKind {
    /// Stable label used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Consumer => "consumer",
            Self::Saga(_) => "saga",
            Self::Activity => "activity",
        }
    }
}

/// A consumer, saga, or activity contributed by a plugin.
#[derive(Clone)]
pub struct HandlerRegistration {
    kind: RegistrationKind,
    name: String,
    message_types: Vec<String>,
    endpoint_name: Option<String>,
    concurrent_message_limit: Option<usize>,
    handler: Arc<dyn Consumer>,
}

impl HandlerRegistration {
    fn new(kind: RegistrationKind, name: impl Into<String>, handler: Arc<dyn Consumer>) -> Self {
        Self {
            kind,
            name: name.into(),
            message_types: Vec::new(),
            endpoint_name: None,
            concurrent_message_limit: None,
            handler,
        }
    }

    /// Consumer registration.
    #[must_use]
    pub fn consumer(name: impl Into<String>, handler: Arc<dyn Consumer>) -> Self {
        Self::new(RegistrationKind::Consumer, name, handler)
    }

    /// Saga registration backed by the given repository.
    #[must_use]
    pub fn saga(
        name: impl Into<String>,
        repository: SagaRepository,
        handler: Arc<dyn Consumer>,
    ) -> Self {
        Self::new(RegistrationKind::Saga(repository), name, handler)
    }

    /// Activity registration.
    #[must_use]
    pub fn activity(name: impl Into<String>, handler: Arc<dyn Consumer>) -> Self {
        Self::new(RegistrationKind::Activity, name, handler)
    }

    /// Subscribe to a message type.
    #[must_use]
    pub fn handles(mut self, message_type: impl Into<String>) -> Self {
        self.message_types.push(message_type.into());
        self
    }

    /// Receive on an explicitly named endpoint instead of a formatted one.
    #[must_use]
    pub fn endpoint(mut self, endpoint_name: impl Into<String>) -> Self {
        self.endpoint_name = Some(endpoint_name.into());
        self
    }

    /// Cap concurrent deliveries to this handler.
    #[must_use]
    pub const fn concurrent_message_limit(mut self, limit: usize) -> Self {
        self.concurrent_message_limit = Some(limit);
        self
    }

    /// Registration kind.
    #[must_use]
    pub const fn kind(&self) -> &RegistrationKind {
        &self.kind
    }

    /// Registration name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subscribed message types.
    #[must_use]
    pub fn message_types(&self) -> &[String] {
        &self.message_types
    }

    /// Explicit endpoint name, if one was set.
    #[must_use]
    pub fn explicit_endpoint_name(&self) -> Option<&str> {
        self.endpoint_name.as_deref()
    }

    /// Concurrency cap, if one was set.
    #[must_use]
    pub const fn concurrency_limit(&self) -> Option<usize> {
        self.concurrent_message_limit
    }

    /// Message handler.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn Consumer> {
        &self.handler
    }

    /// Whether this registration subscribes to `message_type`.
    #[must_use]
    pub fn handles_message(&self, message_type: &str) -> bool {
        self.message_types.iter().any(|t| t == message_type)
    }
}

impl fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("message_types", &self.message_types)
            .field("endpoint_name", &self.endpoint_name)
            .field("concurrent_message_limit", &self.concurrent_message_limit)
            .finish_non_exhaustive()
    }
}

/// A request client registered for request/response messaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestClientDefinition {
    /// Request message type
    pub message_type: String,
    /// Destination endpoint; `None` publishes the request
    pub destination: Option<String>,
    /// How long to wait for a response
    pub timeout: Duration,
}

impl RequestClientDefinition {
    /// Default response timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Request client for a message type.
    #[must_use]
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            destination: None,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Send requests to a specific endpoint.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Override the response timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Where scheduled and delayed messages are handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerProvider {
    /// RabbitMQ delayed-exchange plugin
    DelayedExchange,
    /// Service Bus scheduled enqueue
    ScheduledEnqueue,
    /// External scheduler service listening on `address`
    External {
        /// Scheduler endpoint address (e.g. `queue:quartz`)
        address: String,
    },
}

impl SchedulerProvider {
    /// Whether the transport implements scheduling itself.
    #[must_use]
    pub const fn is_native(&self) -> bool {
        matches!(self, Self::DelayedExchange | Self::ScheduledEnqueue)
    }
}

impl fmt::Display for SchedulerProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DelayedExchange => f.write_str("delayed-exchange"),
            Self::ScheduledEnqueue => f.write_str("scheduled-enqueue"),
            Self::External { address } => write!(f, "external({address})"),
        }
    }
}

/// Mutable bus builder threaded through the bus-topology fold.
///
/// Write access ends when the builder is consumed by
/// [`into_topology`](Self::into_topology).
#[derive(Debug, Default)]
pub struct BusRegistrationConfigurator {
    registrations: Vec<HandlerRegistration>,
    request_clients: Vec<RequestClientDefinition>,
    message_scheduler: Option<SchedulerProvider>,
    endpoint_name_formatter: EndpointNameFormatter,
    transport: Option<Box<dyn BusFactoryConfigurator>>,
}

impl BusRegistrationConfigurator {
    /// Empty builder with kebab-case endpoint naming.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the endpoint name formatter.
    pub fn set_endpoint_name_formatter(&mut self, formatter: EndpointNameFormatter) -> &mut Self {
        self.endpoint_name_formatter = formatter;
        self
    }

    /// Register a consumer.
    pub fn add_consumer(&mut self, registration: HandlerRegistration) -> &mut Self {
        self.add(registration)
    }

    /// Register a saga.
    pub fn add_saga(&mut self, registration: HandlerRegistration) -> &mut Self {
        self.add(registration)
    }

    /// Register an activity.
    pub fn add_activity(&mut self, registration: HandlerRegistration) -> &mut Self {
        self.add(registration)
    }

    fn add(&mut self, registration: HandlerRegistration) -> &mut Self {
        tracing::debug!(
            kind = registration.kind().as_str(),
            name = registration.name(),
            message_types = ?registration.message_types(),
            "Handler registered"
        );
        self.registrations.push(registration);
        self
    }

    /// Register a request client.
    pub fn add_request_client(&mut self, client: RequestClientDefinition) -> &mut Self {
        tracing::debug!(message_type = %client.message_type, "Request client registered");
        self.request_clients.push(client);
        self
    }

    /// Register the client-side message scheduler. A later registration
    /// replaces an earlier one.
    pub fn add_message_scheduler(&mut self, provider: SchedulerProvider) -> &mut Self {
        if let Some(existing) = &self.message_scheduler {
            if *existing != provider {
                tracing::warn!(
                    existing = %existing,
                    replacement = %provider,
                    "Message scheduler registered twice; last registration wins"
                );
            }
        }
        self.message_scheduler = Some(provider);
        self
    }

    /// Registered client-side message scheduler.
    #[must_use]
    pub const fn message_scheduler(&self) -> Option<&SchedulerProvider> {
        self.message_scheduler.as_ref()
    }

    /// Attach the transport-native bus configuration built by a factory.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::TransportAlreadyConfigured`] if a transport
    /// was already attached; a bus runs on exactly one transport.
    pub fn using_transport(
        &mut self,
        configurator: Box<dyn BusFactoryConfigurator>,
    ) -> Result<(), BootstrapError> {
        if let Some(existing) = &self.transport {
            return Err(BootstrapError::TransportAlreadyConfigured(existing.transport()));
        }
        tracing::debug!(transport = %configurator.transport(), "Transport attached to bus");
        self.transport = Some(configurator);
        Ok(())
    }

    /// Attached transport configuration.
    #[must_use]
    pub fn transport(&self) -> Option<&dyn BusFactoryConfigurator> {
        self.transport.as_deref()
    }

    /// Read-only view handed to bus configuration hooks.
    #[must_use]
    pub fn registration_context(&self) -> BusRegistrationContext<'_> {
        BusRegistrationContext {
            registrations: &self.registrations,
            request_clients: &self.request_clients,
            message_scheduler: self.message_scheduler.as_ref(),
            formatter: &self.endpoint_name_formatter,
        }
    }

    /// Finish building.
    #[must_use]
    pub fn into_topology(self) -> BusTopology {
        BusTopology {
            registrations: self.registrations,
            request_clients: self.request_clients,
            message_scheduler: self.message_scheduler,
            transport: self.transport,
        }
    }
}

/// Read-only view of the registrations, passed to `ConfigureBus`.
#[derive(Debug, Clone, Copy)]
pub struct BusRegistrationContext<'a> {
    registrations: &'a [HandlerRegistration],
    request_clients: &'a [RequestClientDefinition],
    message_scheduler: Option<&'a SchedulerProvider>,
    formatter: &'a EndpointNameFormatter,
}

impl<'a> BusRegistrationContext<'a> {
    /// Registered consumers, sagas, and activities, in registration order.
    #[must_use]
    pub const fn registrations(&self) -> &'a [HandlerRegistration] {
        self.registrations
    }

    /// Registered request clients, in registration order.
    #[must_use]
    pub const fn request_clients(&self) -> &'a [RequestClientDefinition] {
        self.request_clients
    }

    /// Registered client-side message scheduler.
    #[must_use]
    pub const fn message_scheduler(&self) -> Option<&'a SchedulerProvider> {
        self.message_scheduler
    }

    /// Receive endpoint a registration is served from.
    #[must_use]
    pub fn endpoint_name(&self, registration: &HandlerRegistration) -> String {
        registration
            .explicit_endpoint_name()
            .map_or_else(|| self.formatter.format(registration.name()), str::to_string)
    }
}

/// Finished bus description handed to a [`TransportRuntime`](crate::control::TransportRuntime).
#[derive(Debug, Default)]
pub struct BusTopology {
    /// Consumers, sagas, and activities in registration order
    pub registrations: Vec<HandlerRegistration>,
    /// Request clients in registration order
    pub request_clients: Vec<RequestClientDefinition>,
    /// Client-side message scheduler
    pub message_scheduler: Option<SchedulerProvider>,
    /// Transport-native configuration; `None` in Mediator mode
    pub transport: Option<Box<dyn BusFactoryConfigurator>>,
}

impl BusTopology {
    /// Transport the topology was built for.
    #[must_use]
    pub fn transport_kind(&self) -> TransportKind {
        self.transport
            .as_ref()
            .map_or(TransportKind::Mediator, |t| t.transport())
    }

    /// Handlers subscribed to a message type, in registration order.
    pub fn handlers_for<'a>(
        &'a self,
        message_type: &'a str,
    ) -> impl Iterator<Item = &'a HandlerRegistration> + 'a {
        self.registrations
            .iter()
            .filter(move |r| r.handles_message(message_type))
    }

    /// Receive endpoints configured on the transport.
    #[must_use]
    pub fn receive_endpoints(&self) -> &[ReceiveEndpointDefinition] {
        self.transport
            .as_ref()
            .map_or(&[][..], |t| t.settings().receive_endpoints())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::transport::BusFactorySettings;
    use std::any::Any;

    #[derive(Debug, Default)]
    struct TestTransport {
        settings: BusFactorySettings,
    }

    impl BusFactoryConfigurator for TestTransport {
        fn transport(&self) -> TransportKind {
            TransportKind::RabbitMq
        }

        fn settings(&self) -> &BusFactorySettings {
            &self.settings
        }

        fn settings_mut(&mut self) -> &mut BusFactorySettings {
            &mut self.settings
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn noop() -> Arc<dyn Consumer> {
        consumer_fn(|_| async { Ok(()) })
    }

    #[test]
    fn test_registrations_keep_order() {
        let mut bus = BusRegistrationConfigurator::new();
        bus.add_consumer(HandlerRegistration::consumer("AConsumer", noop()).handles("A"))
            .add_saga(
                HandlerRegistration::saga("OrderStateMachine", SagaRepository::InMemory, noop())
                    .handles("A"),
            )
            .add_activity(HandlerRegistration::activity("ChargeActivity", noop()).handles("B"));

        let topology = bus.into_topology();
        let names: Vec<&str> = topology.handlers_for("A").map(HandlerRegistration::name).collect();
        assert_eq!(names, vec!["AConsumer", "OrderStateMachine"]);
        assert_eq!(topology.transport_kind(), TransportKind::Mediator);
    }

    #[test]
    fn test_explicit_endpoint_name_wins() {
        let mut bus = BusRegistrationConfigurator::new();
        bus.add_consumer(HandlerRegistration::consumer("AConsumer", noop()).endpoint("custom-queue"));
        let context = bus.registration_context();
        assert_eq!(context.endpoint_name(&context.registrations()[0]), "custom-queue");
    }

    #[test]
    fn test_second_transport_is_rejected() {
        let mut bus = BusRegistrationConfigurator::new();
        bus.using_transport(Box::new(TestTransport::default())).unwrap();

        let err = bus
            .using_transport(Box::new(TestTransport::default()))
            .unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::TransportAlreadyConfigured(TransportKind::RabbitMq)
        ));
        assert_eq!(bus.into_topology().transport_kind(), TransportKind::RabbitMq);
    }

    #[test]
    fn test_last_scheduler_registration_wins() {
        let mut bus = BusRegistrationConfigurator::new();
        bus.add_message_scheduler(SchedulerProvider::DelayedExchange)
            .add_message_scheduler(SchedulerProvider::External {
                address: "queue:quartz".to_string(),
            });
        assert!(!bus.message_scheduler().unwrap().is_native());
    }

    #[tokio::test]
    async fn test_consumer_fn_receives_envelope() {
        let handler = consumer_fn(|envelope: Envelope| async move {
            anyhow::ensure!(envelope.message_type == "Ping", "unexpected type");
            Ok(())
        });
        let ping = Envelope::new("Ping", serde_json::json!({}));
        assert!(handler.consume(&ping).await.is_ok());

        let pong = Envelope::new("Pong", serde_json::json!({}));
        assert!(handler.consume(&pong).await.is_err());
    }
}
