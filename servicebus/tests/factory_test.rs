//! Service Bus bus factory behavior against a mock startup configurator.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use transit_platform_core::bus::{BusRegistrationConfigurator, SchedulerProvider};
use transit_platform_core::config::Configuration;
use transit_platform_core::error::{BootstrapError, ConfigError};
use transit_platform_core::options::TransportKind;
use transit_platform_core::startup::StartupBusFactory;
use transit_platform_core::transport::BusFactoryConfigurator;
use transit_platform_servicebus::{
    ServiceBusBusFactoryConfigurator, ServiceBusOptions, ServiceBusStartupBusFactory,
};
use transit_platform_testing::MockStartupBusConfigurator;

const CONNECTION: &str =
    "Endpoint=sb://orders.servicebus.windows.net/;SharedAccessKeyName=app;SharedAccessKey=k=";

fn service_bus(bus: &BusRegistrationConfigurator) -> &ServiceBusBusFactoryConfigurator {
    bus.transport()
        .expect("transport attached")
        .as_any()
        .downcast_ref::<ServiceBusBusFactoryConfigurator>()
        .expect("Service Bus configurator")
}

fn factory() -> ServiceBusStartupBusFactory {
    ServiceBusStartupBusFactory::new(ServiceBusOptions::with_connection_string(CONNECTION))
}

#[test]
fn native_scheduler_enabled_once_without_external_scheduler() {
    let configurator = MockStartupBusConfigurator::new();
    let mut bus = BusRegistrationConfigurator::new();

    factory().create_bus(&mut bus, &configurator).unwrap();

    assert_eq!(bus.message_scheduler(), Some(&SchedulerProvider::ScheduledEnqueue));
    let cfg = service_bus(&bus);
    assert_eq!(cfg.transport(), TransportKind::AzureServiceBus);
    assert_eq!(cfg.settings().scheduler(), Some(&SchedulerProvider::ScheduledEnqueue));
    assert_eq!(configurator.try_configure_quartz_calls(), 1);
    assert_eq!(configurator.configure_bus_calls(), 1);
}

#[test]
fn external_scheduler_excludes_native_scheduler() {
    let configurator = MockStartupBusConfigurator::new().with_scheduler_endpoint("quartz");
    let mut bus = BusRegistrationConfigurator::new();

    factory().create_bus(&mut bus, &configurator).unwrap();

    assert_eq!(bus.message_scheduler(), None);
    assert_eq!(
        service_bus(&bus).settings().scheduler(),
        Some(&SchedulerProvider::External {
            address: "queue:quartz".to_string()
        })
    );
    assert_eq!(
        configurator.scheduler_at_configure_bus(),
        Some(SchedulerProvider::External {
            address: "queue:quartz".to_string()
        })
    );
}

#[test]
fn namespace_credentials_come_from_configuration() {
    let config = Configuration::new()
        .with_value("ASB:Namespace", "orders-prod")
        .with_value("ASB:SharedAccessKeyName", "app")
        .with_value("ASB:SharedAccessKey", "secret");
    let factory = ServiceBusStartupBusFactory::configure(&config).unwrap();
    let mut bus = BusRegistrationConfigurator::new();

    factory
        .create_bus(&mut bus, &MockStartupBusConfigurator::new())
        .unwrap();

    let host = service_bus(&bus).host_settings().unwrap();
    assert_eq!(host.endpoint(), "sb://orders-prod.servicebus.windows.net/");
    assert_eq!(host.shared_access_key_name(), "app");
}

#[test]
fn missing_credentials_fail_before_bus_is_touched() {
    let factory = ServiceBusStartupBusFactory::configure(&Configuration::new()).unwrap();
    let configurator = MockStartupBusConfigurator::new();
    let mut bus = BusRegistrationConfigurator::new();

    let err = factory.create_bus(&mut bus, &configurator).unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::Config(ConfigError::InvalidTransportOptions {
            transport: TransportKind::AzureServiceBus,
            ..
        })
    ));
    assert!(bus.transport().is_none());
    assert!(bus.message_scheduler().is_none());
    assert_eq!(configurator.try_configure_quartz_calls(), 0);
}

#[test]
fn entity_scoped_connection_string_is_rejected() {
    let factory = ServiceBusStartupBusFactory::new(ServiceBusOptions::with_connection_string(
        format!("{CONNECTION};EntityPath=orders"),
    ));
    let mut bus = BusRegistrationConfigurator::new();

    let err = factory
        .create_bus(&mut bus, &MockStartupBusConfigurator::new())
        .unwrap_err();

    assert!(err.to_string().contains("EntityPath"));
}

#[test]
fn configure_bus_failure_propagates() {
    let configurator = MockStartupBusConfigurator::new().failing_configure_bus("duplicate endpoint");
    let mut bus = BusRegistrationConfigurator::new();

    let err = factory().create_bus(&mut bus, &configurator).unwrap_err();

    assert!(err.to_string().contains("duplicate endpoint"));
    assert!(bus.transport().is_none());
}
