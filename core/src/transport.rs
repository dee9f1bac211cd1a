//! Transport-native bus configuration.
//!
//! Each transport crate provides a concrete configurator (host settings,
//! TLS, native scheduler switch) implementing [`BusFactoryConfigurator`].
//! Everything transport-agnostic (scheduler slot, retry, prefetch, receive
//! endpoints) lives in [`BusFactorySettings`], which every configurator
//! embeds, so the generic `ConfigureBus` step can drive any transport
//! through `&mut dyn BusFactoryConfigurator`.

use crate::bus::{BusRegistrationContext, HandlerRegistration, RegistrationKind, SchedulerProvider};
use crate::options::TransportKind;
use crate::retry::RetryPolicy;
use std::any::Any;
use std::fmt;

/// A receive endpoint and the handlers served from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiveEndpointDefinition {
    /// Queue name
    pub name: String,
    /// Consumer registration names
    pub consumers: Vec<String>,
    /// Saga registration names
    pub sagas: Vec<String>,
    /// Activity registration names
    pub activities: Vec<String>,
    /// Message types delivered to this endpoint
    pub message_types: Vec<String>,
    /// Smallest concurrency cap among the endpoint's handlers
    pub concurrent_message_limit: Option<usize>,
    /// Prefetch count inherited from the bus
    pub prefetch_count: Option<u16>,
    /// Retry policy inherited from the bus
    pub retry: Option<RetryPolicy>,
}

impl ReceiveEndpointDefinition {
    /// Empty endpoint with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn absorb(&mut self, registration: &HandlerRegistration) {
        let name = registration.name().to_string();
        match registration.kind() {
            RegistrationKind::Consumer => self.consumers.push(name),
            RegistrationKind::Saga(_) => self.sagas.push(name),
            RegistrationKind::Activity => self.activities.push(name),
        }
        for message_type in registration.message_types() {
            if !self.message_types.contains(message_type) {
                self.message_types.push(message_type.clone());
            }
        }
        if let Some(limit) = registration.concurrency_limit() {
            self.concurrent_message_limit = Some(
                self.concurrent_message_limit
                    .map_or(limit, |current| current.min(limit)),
            );
        }
    }
}

/// Transport-agnostic bus settings shared by every configurator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusFactorySettings {
    scheduler: Option<SchedulerProvider>,
    retry: Option<RetryPolicy>,
    prefetch_count: Option<u16>,
    receive_endpoints: Vec<ReceiveEndpointDefinition>,
}

impl BusFactorySettings {
    /// Active scheduling mechanism. There is exactly one slot, so native and
    /// external scheduling can never both be active.
    #[must_use]
    pub const fn scheduler(&self) -> Option<&SchedulerProvider> {
        self.scheduler.as_ref()
    }

    /// Set the active scheduling mechanism, replacing any previous one.
    pub fn set_scheduler(&mut self, provider: SchedulerProvider) {
        match &self.scheduler {
            Some(existing) if *existing == provider => {
                tracing::debug!(scheduler = %provider, "Scheduler already active");
            }
            Some(existing) => {
                tracing::warn!(
                    existing = %existing,
                    replacement = %provider,
                    "Replacing active bus scheduler"
                );
            }
            None => tracing::info!(scheduler = %provider, "Bus scheduler enabled"),
        }
        self.scheduler = Some(provider);
    }

    /// Bus-level retry policy.
    #[must_use]
    pub const fn retry(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }

    /// Bus-level prefetch count.
    #[must_use]
    pub const fn prefetch_count(&self) -> Option<u16> {
        self.prefetch_count
    }

    /// Configured receive endpoints, in configuration order.
    #[must_use]
    pub fn receive_endpoints(&self) -> &[ReceiveEndpointDefinition] {
        &self.receive_endpoints
    }

    /// Receive endpoint by name.
    #[must_use]
    pub fn receive_endpoint(&self, name: &str) -> Option<&ReceiveEndpointDefinition> {
        self.receive_endpoints.iter().find(|e| e.name == name)
    }

    fn endpoint_entry(&mut self, name: &str) -> &mut ReceiveEndpointDefinition {
        let index = match self.receive_endpoints.iter().position(|e| e.name == name) {
            Some(index) => index,
            None => {
                self.receive_endpoints.push(ReceiveEndpointDefinition {
                    name: name.to_string(),
                    prefetch_count: self.prefetch_count,
                    retry: self.retry.clone(),
                    ..ReceiveEndpointDefinition::default()
                });
                self.receive_endpoints.len() - 1
            }
        };
        &mut self.receive_endpoints[index]
    }
}

/// Transport-native bus configuration.
///
/// Implementors supply the transport identity and access to their embedded
/// [`BusFactorySettings`]; the provided methods cover everything a
/// transport-agnostic caller may configure. `as_any` lets tests and runtimes
/// recover the concrete configurator.
pub trait BusFactoryConfigurator: fmt::Debug + Any + Send + Sync {
    /// Transport this configurator builds.
    fn transport(&self) -> TransportKind;

    /// Shared settings.
    fn settings(&self) -> &BusFactorySettings;

    /// Shared settings, mutably.
    fn settings_mut(&mut self) -> &mut BusFactorySettings;

    /// Concrete configurator, for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Delegate scheduled delivery to an external scheduler at `address`.
    fn use_message_scheduler(&mut self, address: &str) {
        self.settings_mut().set_scheduler(SchedulerProvider::External {
            address: address.to_string(),
        });
    }

    /// Retry policy applied to every receive endpoint configured afterwards.
    fn use_message_retry(&mut self, policy: RetryPolicy) {
        tracing::debug!(max_retries = policy.max_retries, "Bus retry policy set");
        self.settings_mut().retry = Some(policy);
    }

    /// Prefetch count applied to every receive endpoint configured afterwards.
    fn set_prefetch_count(&mut self, count: u16) {
        self.settings_mut().prefetch_count = Some(count);
    }

    /// Declare a receive endpoint explicitly. An endpoint with the same name
    /// is replaced.
    fn receive_endpoint(&mut self, endpoint: ReceiveEndpointDefinition) {
        let endpoints = &mut self.settings_mut().receive_endpoints;
        match endpoints.iter_mut().find(|e| e.name == endpoint.name) {
            Some(existing) => *existing = endpoint,
            None => endpoints.push(endpoint),
        }
    }

    /// Configure a receive endpoint for every registration. Registrations
    /// whose endpoint names collide are served from one endpoint.
    fn configure_endpoints(&mut self, context: &BusRegistrationContext<'_>) {
        let settings = self.settings_mut();
        for registration in context.registrations() {
            let name = context.endpoint_name(registration);
            settings.endpoint_entry(&name).absorb(registration);
        }
        tracing::debug!(
            endpoints = settings.receive_endpoints.len(),
            "Receive endpoints configured"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bus::{BusRegistrationConfigurator, SagaRepository, consumer_fn};

    #[derive(Debug, Default)]
    struct TestConfigurator {
        settings: BusFactorySettings,
    }

    impl BusFactoryConfigurator for TestConfigurator {
        fn transport(&self) -> TransportKind {
            TransportKind::AzureServiceBus
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

    #[test]
    fn test_scheduler_slot_holds_one_mechanism() {
        let mut cfg = TestConfigurator::default();
        cfg.settings_mut().set_scheduler(SchedulerProvider::ScheduledEnqueue);
        cfg.use_message_scheduler("queue:quartz");

        assert_eq!(
            cfg.settings().scheduler(),
            Some(&SchedulerProvider::External {
                address: "queue:quartz".to_string()
            })
        );
    }

    #[test]
    fn test_endpoints_group_by_formatted_name_and_inherit_bus_settings() {
        let noop = consumer_fn(|_| async { Ok(()) });
        let mut bus = BusRegistrationConfigurator::new();
        bus.add_consumer(
            HandlerRegistration::consumer("SubmitOrderConsumer", noop.clone())
                .handles("SubmitOrder")
                .concurrent_message_limit(8),
        )
        .add_saga(
            HandlerRegistration::saga("SubmitOrderSaga", SagaRepository::InMemory, noop.clone())
                .handles("OrderSubmitted")
                .concurrent_message_limit(2),
        )
        .add_activity(HandlerRegistration::activity("ChargeCardActivity", noop).handles("ChargeCard"));

        let mut cfg = TestConfigurator::default();
        cfg.use_message_retry(RetryPolicy::builder().max_retries(2).build());
        cfg.set_prefetch_count(16);
        cfg.configure_endpoints(&bus.registration_context());

        let endpoints = cfg.settings().receive_endpoints();
        assert_eq!(endpoints.len(), 2);

        let submit = cfg.settings().receive_endpoint("submit-order").unwrap();
        assert_eq!(submit.consumers, vec!["SubmitOrderConsumer"]);
        assert_eq!(submit.sagas, vec!["SubmitOrderSaga"]);
        assert_eq!(submit.message_types, vec!["SubmitOrder", "OrderSubmitted"]);
        assert_eq!(submit.concurrent_message_limit, Some(2));
        assert_eq!(submit.prefetch_count, Some(16));
        assert_eq!(submit.retry.as_ref().unwrap().max_retries, 2);

        assert_eq!(endpoints[1].name, "charge-card");
        assert_eq!(endpoints[1].activities, vec!["ChargeCardActivity"]);
    }

    #[test]
    fn test_explicit_receive_endpoint_is_replaced_by_name() {
        let mut cfg = TestConfigurator::default();
        cfg.receive_endpoint(ReceiveEndpointDefinition::new("audit"));
        cfg.receive_endpoint(ReceiveEndpointDefinition {
            prefetch_count: Some(1),
            ..ReceiveEndpointDefinition::new("audit")
        });

        let endpoints = cfg.settings().receive_endpoints();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].prefetch_count, Some(1));
    }
}
