//! End-to-end bootstrap tests against recording factories and runtimes.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use transit_platform_core::bus::SchedulerProvider;
use transit_platform_core::control::{BusControl, BusError, BusHealthStatus};
use transit_platform_core::error::{BootstrapError, ConfigError, ContributionStage};
use transit_platform_core::options::TransportKind;
use transit_platform_host::{Bootstrap, BootstrapPhase, PlatformHost, ServerOptions};
use transit_platform_testing::{
    CallLog, RecordingBusFactory, RecordingPlugin, RecordingTransportRuntime, StaticHealthCheck,
    configuration, get, mediator_configuration,
};

struct Factories {
    rabbitmq: RecordingBusFactory,
    service_bus: RecordingBusFactory,
}

impl Factories {
    fn new() -> Self {
        Self {
            rabbitmq: RecordingBusFactory::new(TransportKind::RabbitMq),
            service_bus: RecordingBusFactory::new(TransportKind::AzureServiceBus),
        }
    }

    fn install(&self, bootstrap: Bootstrap) -> Bootstrap {
        bootstrap
            .with_factory(Arc::new(self.rabbitmq.clone()))
            .with_factory(Arc::new(self.service_bus.clone()))
    }
}

fn rabbitmq_bootstrap(
    pairs: &[(&str, &str)],
    factories: &Factories,
    runtime: &RecordingTransportRuntime,
) -> Bootstrap {
    let mut values = vec![("Platform:Transport", "RabbitMq")];
    values.extend_from_slice(pairs);
    factories
        .install(Bootstrap::new(configuration(&values)))
        .with_transport_runtime(TransportKind::RabbitMq, Arc::new(runtime.clone()))
}

fn flip_case(name: &str, flips: &[bool]) -> String {
    name.chars()
        .zip(flips.iter().cycle())
        .map(|(c, upper)| if *upper { c.to_ascii_uppercase() } else { c })
        .collect()
}

proptest! {
    #[test]
    fn test_transport_spelling_selects_exactly_one_factory(
        name in prop::sample::select(vec!["rabbitmq", "rmq", "azureservicebus", "asb", "mediator"]),
        flips in prop::collection::vec(any::<bool>(), 1..16),
        padding in "[ \t]{0,3}",
    ) {
        let spelling = format!("{padding}{}{padding}", flip_case(name, &flips));
        let factories = Factories::new();

        let selected = factories
            .install(Bootstrap::new(configuration(&[("Platform:Transport", spelling.as_str())])))
            .bind_options()
            .unwrap()
            .configure_bus_contributions()
            .unwrap()
            .select_transport()
            .unwrap();

        let expected = name.parse::<TransportKind>().unwrap();
        prop_assert_eq!(selected.phase(), BootstrapPhase::TransportSelected);
        prop_assert_eq!(selected.topology().unwrap().transport_kind(), expected);

        let (rabbitmq, service_bus) = match expected {
            TransportKind::RabbitMq => (1, 0),
            TransportKind::AzureServiceBus => (0, 1),
            TransportKind::Mediator => (0, 0),
        };
        prop_assert_eq!(factories.rabbitmq.calls(), rabbitmq);
        prop_assert_eq!(factories.service_bus.calls(), service_bus);
    }
}

#[test]
fn test_unknown_transport_fails_before_any_factory() {
    let factories = Factories::new();

    let err = factories
        .install(Bootstrap::new(configuration(&[("Platform:Transport", "Kafka")])))
        .bind_options()
        .unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::Config(ConfigError::UnknownTransport(ref name)) if name == "Kafka"
    ));
    assert!(err.to_string().contains("Kafka"));
    assert_eq!(factories.rabbitmq.calls() + factories.service_bus.calls(), 0);
}

#[test]
fn test_missing_transport_is_an_error() {
    let err = Bootstrap::new(configuration(&[])).bind_options().unwrap_err();

    assert!(matches!(err, BootstrapError::Config(ConfigError::MissingTransport)));
}

#[tokio::test]
async fn test_plugins_run_in_registration_order_per_stage() {
    let log = CallLog::new();
    let factories = Factories::new();
    let runtime = RecordingTransportRuntime::new(TransportKind::RabbitMq);

    let ready = rabbitmq_bootstrap(&[], &factories, &runtime)
        .plugin(RecordingPlugin::new("orders", log.clone()).registers_consumer("SubmitOrderConsumer", "SubmitOrder"))
        .plugin(RecordingPlugin::new("billing", log.clone()).registers_consumer("IssueInvoiceConsumer", "IssueInvoice"))
        .run()
        .await
        .unwrap();

    assert_eq!(
        log.entries(),
        [
            "orders:bus_topology",
            "billing:bus_topology",
            "orders:bus_configuration",
            "billing:bus_configuration",
            "orders:http_pipeline",
            "billing:http_pipeline",
        ]
    );

    let started = runtime.started();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].transport, TransportKind::RabbitMq);
    assert_eq!(started[0].registrations, ["SubmitOrderConsumer", "IssueInvoiceConsumer"]);
    assert_eq!(started[0].endpoints, ["submit-order", "issue-invoice"]);
    assert_eq!(ready.bus().transport(), TransportKind::RabbitMq);
}

#[tokio::test]
async fn test_mediator_skips_bus_configuration_hooks() {
    let log = CallLog::new();
    let factories = Factories::new();

    let ready = factories
        .install(Bootstrap::new(mediator_configuration()))
        .plugin(RecordingPlugin::new("orders", log.clone()))
        .run()
        .await
        .unwrap();

    assert_eq!(log.entries(), ["orders:bus_topology", "orders:http_pipeline"]);
    assert_eq!(factories.rabbitmq.calls() + factories.service_bus.calls(), 0);
    assert_eq!(ready.bus().transport(), TransportKind::Mediator);
}

#[tokio::test]
async fn test_native_scheduler_without_scheduler_endpoint() {
    let factories = Factories::new();
    let runtime = RecordingTransportRuntime::new(TransportKind::RabbitMq);

    rabbitmq_bootstrap(&[], &factories, &runtime).run().await.unwrap();

    let started = &runtime.started()[0];
    assert_eq!(started.registered_scheduler, Some(SchedulerProvider::DelayedExchange));
    assert_eq!(started.bus_scheduler, Some(SchedulerProvider::DelayedExchange));
}

#[tokio::test]
async fn test_scheduler_endpoint_replaces_native_scheduler() {
    let factories = Factories::new();
    let runtime = RecordingTransportRuntime::new(TransportKind::RabbitMq);

    rabbitmq_bootstrap(&[("Platform:Scheduler", "quartz")], &factories, &runtime)
        .run()
        .await
        .unwrap();

    let started = &runtime.started()[0];
    assert_eq!(started.registered_scheduler, None);
    assert_eq!(
        started.bus_scheduler,
        Some(SchedulerProvider::External {
            address: "queue:quartz".to_string()
        })
    );
}

#[tokio::test]
async fn test_builtin_rabbitmq_factory_applies_platform_options() {
    let log = CallLog::new();
    let runtime = RecordingTransportRuntime::new(TransportKind::RabbitMq);

    let ready = Bootstrap::new(configuration(&[
        ("Platform:Transport", "rmq"),
        ("Platform:Scheduler", "quartz"),
        ("Platform:PrefetchCount", "16"),
        ("Platform:Retry:Limit", "2"),
    ]))
    .with_transport_runtime(TransportKind::RabbitMq, Arc::new(runtime.clone()))
    .plugin(RecordingPlugin::new("orders", log.clone()).registers_consumer("SubmitOrderConsumer", "SubmitOrder"))
    .run()
    .await
    .unwrap();

    let started = &runtime.started()[0];
    assert_eq!(started.transport, TransportKind::RabbitMq);
    assert_eq!(started.registered_scheduler, None);
    assert_eq!(
        started.bus_scheduler,
        Some(SchedulerProvider::External {
            address: "queue:quartz".to_string()
        })
    );
    assert_eq!(started.prefetch_count, Some(16));
    assert_eq!(started.retry_limit, Some(2));
    assert_eq!(started.endpoints, ["submit-order"]);
    assert_eq!(
        log.entries(),
        ["orders:bus_topology", "orders:bus_configuration", "orders:http_pipeline"]
    );
    assert_eq!(ready.options().prefetch_count, Some(16));
}

#[tokio::test]
async fn test_builtin_rabbitmq_factory_defaults_to_delayed_exchange() {
    let runtime = RecordingTransportRuntime::new(TransportKind::RabbitMq);

    Bootstrap::new(configuration(&[("Platform:Transport", "RabbitMQ")]))
        .with_transport_runtime(TransportKind::RabbitMq, Arc::new(runtime.clone()))
        .run()
        .await
        .unwrap();

    let started = &runtime.started()[0];
    assert_eq!(started.registered_scheduler, Some(SchedulerProvider::DelayedExchange));
    assert_eq!(started.bus_scheduler, Some(SchedulerProvider::DelayedExchange));
    assert_eq!(started.prefetch_count, None);
    assert_eq!(started.retry_limit, None);
}

#[tokio::test]
async fn test_contribution_failure_aborts_before_the_bus_starts() {
    let log = CallLog::new();
    let factories = Factories::new();
    let runtime = RecordingTransportRuntime::new(TransportKind::RabbitMq);

    let err = rabbitmq_bootstrap(&[], &factories, &runtime)
        .plugin(RecordingPlugin::new("orders", log.clone()))
        .plugin(RecordingPlugin::new("billing", log.clone()).fails_at(ContributionStage::BusTopology))
        .plugin(RecordingPlugin::new("shipping", log.clone()))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::Contribution { ref plugin, stage: ContributionStage::BusTopology, .. }
            if plugin == "billing"
    ));
    assert_eq!(log.entries(), ["orders:bus_topology", "billing:bus_topology"]);
    assert_eq!(factories.rabbitmq.calls(), 0);
    assert!(runtime.started().is_empty());
}

#[tokio::test]
async fn test_bus_configuration_failure_surfaces_from_the_factory() {
    let log = CallLog::new();
    let factories = Factories::new();
    let runtime = RecordingTransportRuntime::new(TransportKind::RabbitMq);

    let err = rabbitmq_bootstrap(&[], &factories, &runtime)
        .plugin(RecordingPlugin::new("orders", log.clone()).fails_at(ContributionStage::BusConfiguration))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::Contribution { stage: ContributionStage::BusConfiguration, .. }
    ));
    assert_eq!(factories.rabbitmq.calls(), 1);
    assert!(runtime.started().is_empty());
}

#[tokio::test]
async fn test_http_failure_stops_the_started_bus() {
    let log = CallLog::new();
    let factories = Factories::new();
    let runtime = RecordingTransportRuntime::new(TransportKind::RabbitMq);

    let err = rabbitmq_bootstrap(&[], &factories, &runtime)
        .plugin(RecordingPlugin::new("orders", log).fails_at(ContributionStage::HttpPipeline))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::Contribution { stage: ContributionStage::HttpPipeline, .. }
    ));
    assert!(runtime.last_bus().unwrap().is_stopped());
}

#[tokio::test]
async fn test_plugin_route_on_a_health_path_is_rejected() {
    let factories = Factories::new();
    let runtime = RecordingTransportRuntime::new(TransportKind::RabbitMq);

    let err = rabbitmq_bootstrap(&[], &factories, &runtime)
        .plugin(RecordingPlugin::new("orders", CallLog::new()).with_route("/health/live", "mine"))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, BootstrapError::Http(ref reason) if reason.contains("/health/live")));
    assert!(runtime.last_bus().unwrap().is_stopped());
}

#[tokio::test]
async fn test_plugin_routes_send_through_the_started_bus() {
    let factories = Factories::new();
    let runtime = RecordingTransportRuntime::new(TransportKind::RabbitMq);

    let ready = rabbitmq_bootstrap(&[], &factories, &runtime)
        .plugin(RecordingPlugin::new("orders", CallLog::new()).with_send_route("/orders/submit", "SubmitOrder"))
        .run()
        .await
        .unwrap();

    let (status, _) = get(ready.router(), "/orders/submit").await.unwrap();
    assert_eq!(status, 202);

    let sent = runtime.last_bus().unwrap().sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message_type, "SubmitOrder");

    ready.bus().stop().await.unwrap();
    let (status, _) = get(ready.router(), "/orders/submit").await.unwrap();
    assert_eq!(status, 503);
}

#[tokio::test]
async fn test_broker_without_runtime_fails_to_start() {
    let factories = Factories::new();

    let err = factories
        .install(Bootstrap::new(configuration(&[("Platform:Transport", "ASB")])))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::NoTransportRuntime(TransportKind::AzureServiceBus)
    ));
    assert_eq!(factories.service_bus.calls(), 1);
}

#[tokio::test]
async fn test_runtime_error_is_returned_unmodified() {
    let factories = Factories::new();
    let runtime = RecordingTransportRuntime::failing(
        TransportKind::RabbitMq,
        BusError::ConnectionFailed("connection refused".to_string()),
    );

    let err = rabbitmq_bootstrap(&[], &factories, &runtime).run().await.unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::BusStart(BusError::ConnectionFailed(ref reason)) if reason == "connection refused"
    ));
}

#[tokio::test]
async fn test_bus_start_is_bounded_by_timeout() {
    let factories = Factories::new();
    let runtime = RecordingTransportRuntime::hanging(TransportKind::RabbitMq);

    let err = rabbitmq_bootstrap(&[("Platform:BusStartTimeoutSeconds", "1")], &factories, &runtime)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::BusStart(BusError::StartTimeout(timeout)) if timeout == Duration::from_secs(1)
    ));
    assert_eq!(runtime.started().len(), 1);
}

#[test]
fn test_saga_configs_bind_with_options() {
    let bootstrap = Bootstrap::new(configuration(&[
        ("Platform:Transport", "Mediator"),
        ("SagaDbConfigs:SagaSqlServerOptions:0:Name", "orders"),
        ("SagaDbConfigs:SagaSqlServerOptions:0:ConnectionString", "Server=sql;Database=orders"),
        ("SagaDbConfigs:SagaSqlServerOptions:1:Name", "billing"),
        ("SagaDbConfigs:SagaSqlServerOptions:1:ConnectionString", "Server=sql;Database=billing"),
    ]))
    .bind_options()
    .unwrap();

    let sagas = bootstrap.services().unwrap().saga_db_configs();
    assert!(sagas.document_store_options.is_empty());
    assert_eq!(sagas.relational_store_options.len(), 2);
    assert_eq!(sagas.relational_store_options[1].name, "billing");
}

#[tokio::test]
async fn test_health_endpoints_report_tagged_and_all_checks() {
    let ready = Bootstrap::new(mediator_configuration())
        .plugin(
            RecordingPlugin::new("orders", CallLog::new())
                .with_ready_check("database", StaticHealthCheck::degraded("replica lag"))
                .with_health_check("cache", StaticHealthCheck::unhealthy("cache offline")),
        )
        .run()
        .await
        .unwrap();

    let (status, body) = get(ready.router(), "/health/ready").await.unwrap();
    let report: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(status, 200);
    assert_eq!(report["status"], "Degraded");
    assert_eq!(report["results"]["bus"]["status"], "Healthy");
    assert_eq!(report["results"]["database"]["description"], "replica lag");
    assert!(report["results"].get("cache").is_none());

    let (status, body) = get(ready.router(), "/health/live").await.unwrap();
    let report: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(status, 503);
    assert_eq!(report["status"], "Unhealthy");
    assert_eq!(report["results"]["cache"]["status"], "Unhealthy");
}

#[tokio::test]
async fn test_readiness_fails_once_the_bus_stops() {
    let ready = Bootstrap::new(mediator_configuration()).run().await.unwrap();

    assert_eq!(get(ready.router(), "/health/ready").await.unwrap().0, 200);

    ready.bus().stop().await.unwrap();

    let (status, body) = get(ready.router(), "/health/ready").await.unwrap();
    assert_eq!(status, 503);
    assert!(body.contains("\"bus\""));
}

#[tokio::test]
async fn test_plugin_routes_are_served_with_request_ids() {
    let ready = Bootstrap::new(mediator_configuration())
        .plugin(RecordingPlugin::new("orders", CallLog::new()).with_route("/orders", "no orders"))
        .run()
        .await
        .unwrap();

    let (status, body) = get(ready.router(), "/orders").await.unwrap();
    assert_eq!(status, 200);
    assert_eq!(body, "no orders");

    let (status, _) = get(ready.router(), "/metrics").await.unwrap();
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_platform_host_serves_until_shutdown_then_stops_bus() {
    let ready = Bootstrap::new(mediator_configuration()).run().await.unwrap();
    let bus: Arc<dyn BusControl> = Arc::clone(ready.bus());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(PlatformHost::new(ready, ServerOptions::default()).serve(
        listener,
        async move {
            let _ = shutdown_rx.await;
        },
    ));

    let mut stream = tokio::net::TcpStream::connect(address).await.unwrap();
    stream
        .write_all(b"GET /health/live HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.to_ascii_lowercase().contains("x-request-id"));

    shutdown_tx.send(()).unwrap();
    server.await.unwrap().unwrap();

    assert_eq!(bus.health().status, BusHealthStatus::Unhealthy);
}
