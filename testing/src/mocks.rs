//! Mock collaborators for bootstrap and transport factory tests.

use async_trait::async_trait;
use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use transit_platform_core::bus::{
    BusRegistrationConfigurator, BusRegistrationContext, BusTopology, Envelope, SchedulerProvider,
};
use transit_platform_core::control::{BusControl, BusError, BusHealth, TransportRuntime};
use transit_platform_core::error::{BootstrapError, ContributionStage};
use transit_platform_core::options::TransportKind;
use transit_platform_core::startup::{StartupBusConfigurator, StartupBusFactory};
use transit_platform_core::transport::{BusFactoryConfigurator, BusFactorySettings};
use transit_platform_runtime::health::{HealthCheck, HealthCheckResult};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// [`StartupBusConfigurator`] that records how factories use it.
///
/// ```ignore
/// let configurator = MockStartupBusConfigurator::new().with_scheduler_endpoint("quartz");
/// factory.create_bus(&mut bus, &configurator)?;
/// assert_eq!(configurator.try_configure_quartz_calls(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockStartupBusConfigurator {
    scheduler: Option<String>,
    configure_bus_error: Option<String>,
    try_configure_quartz_calls: AtomicUsize,
    configure_bus_calls: AtomicUsize,
    scheduler_at_configure_bus: Mutex<Option<SchedulerProvider>>,
}

impl MockStartupBusConfigurator {
    /// No external scheduler; `configure_bus` succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report an external scheduler at `queue:<queue>`.
    #[must_use]
    pub fn with_scheduler_endpoint(mut self, queue: impl Into<String>) -> Self {
        self.scheduler = Some(queue.into());
        self
    }

    /// Make `configure_bus` fail with `message`.
    #[must_use]
    pub fn failing_configure_bus(mut self, message: impl Into<String>) -> Self {
        self.configure_bus_error = Some(message.into());
        self
    }

    /// Times `try_configure_quartz` was called.
    #[must_use]
    pub fn try_configure_quartz_calls(&self) -> usize {
        self.try_configure_quartz_calls.load(Ordering::SeqCst)
    }

    /// Times `configure_bus` was called.
    #[must_use]
    pub fn configure_bus_calls(&self) -> usize {
        self.configure_bus_calls.load(Ordering::SeqCst)
    }

    /// Scheduler active on the transport configurator when `configure_bus`
    /// was last called.
    #[must_use]
    pub fn scheduler_at_configure_bus(&self) -> Option<SchedulerProvider> {
        lock(&self.scheduler_at_configure_bus).clone()
    }
}

impl StartupBusConfigurator for MockStartupBusConfigurator {
    fn has_scheduler_endpoint(&self) -> bool {
        self.scheduler.is_some()
    }

    fn configure_bus(
        &self,
        bus: &mut dyn BusFactoryConfigurator,
        context: &BusRegistrationContext<'_>,
    ) -> Result<(), BootstrapError> {
        self.configure_bus_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.scheduler_at_configure_bus) = bus.settings().scheduler().cloned();

        if let Some(message) = &self.configure_bus_error {
            return Err(BootstrapError::contribution(
                "mock",
                ContributionStage::BusConfiguration,
                anyhow::anyhow!("{message}"),
            ));
        }

        bus.configure_endpoints(context);
        Ok(())
    }

    fn try_configure_quartz(&self, bus: &mut dyn BusFactoryConfigurator) -> bool {
        self.try_configure_quartz_calls.fetch_add(1, Ordering::SeqCst);
        match &self.scheduler {
            Some(queue) => {
                bus.use_message_scheduler(&format!("queue:{queue}"));
                true
            }
            None => false,
        }
    }
}

/// Transport-neutral [`BusFactoryConfigurator`] built by
/// [`RecordingBusFactory`].
#[derive(Debug)]
pub struct TestBusFactoryConfigurator {
    transport: TransportKind,
    settings: BusFactorySettings,
}

impl TestBusFactoryConfigurator {
    /// Empty configurator for `transport`.
    #[must_use]
    pub fn new(transport: TransportKind) -> Self {
        Self {
            transport,
            settings: BusFactorySettings::default(),
        }
    }
}

impl BusFactoryConfigurator for TestBusFactoryConfigurator {
    fn transport(&self) -> TransportKind {
        self.transport
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

/// Native scheduler a broker transport would register.
#[must_use]
pub const fn native_scheduler(transport: TransportKind) -> Option<SchedulerProvider> {
    match transport {
        TransportKind::RabbitMq => Some(SchedulerProvider::DelayedExchange),
        TransportKind::AzureServiceBus => Some(SchedulerProvider::ScheduledEnqueue),
        TransportKind::Mediator => None,
    }
}

/// [`StartupBusFactory`] that follows the factory algorithm without
/// touching any connection options, and counts its invocations.
///
/// Clones share the counter.
#[derive(Debug, Clone)]
pub struct RecordingBusFactory {
    transport: TransportKind,
    calls: Arc<AtomicUsize>,
}

impl RecordingBusFactory {
    /// Factory for `transport`.
    #[must_use]
    pub fn new(transport: TransportKind) -> Self {
        Self {
            transport,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Times `create_bus` was called.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StartupBusFactory for RecordingBusFactory {
    fn transport(&self) -> TransportKind {
        self.transport
    }

    fn create_bus(
        &self,
        bus: &mut BusRegistrationConfigurator,
        configurator: &dyn StartupBusConfigurator,
    ) -> Result<(), BootstrapError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let native = native_scheduler(self.transport);

        if !configurator.has_scheduler_endpoint() {
            if let Some(native) = native.clone() {
                bus.add_message_scheduler(native);
            }
        }

        let mut cfg = TestBusFactoryConfigurator::new(self.transport);
        if !configurator.try_configure_quartz(&mut cfg) {
            if let Some(native) = native {
                cfg.settings_mut().set_scheduler(native);
            }
        }

        configurator.configure_bus(&mut cfg, &bus.registration_context())?;
        bus.using_transport(Box::new(cfg))
    }
}

/// What a [`RecordingTransportRuntime`] was asked to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedTopology {
    /// Transport the topology was built for
    pub transport: TransportKind,
    /// Registration names, in registration order
    pub registrations: Vec<String>,
    /// Receive endpoint names
    pub endpoints: Vec<String>,
    /// Scheduler registered on the bus registration
    pub registered_scheduler: Option<SchedulerProvider>,
    /// Scheduler active on the transport configurator
    pub bus_scheduler: Option<SchedulerProvider>,
    /// Prefetch count set on the transport configurator
    pub prefetch_count: Option<u16>,
    /// Retry limit set on the transport configurator
    pub retry_limit: Option<usize>,
}

impl StartedTopology {
    fn capture(topology: &BusTopology) -> Self {
        Self {
            transport: topology.transport_kind(),
            registrations: topology
                .registrations
                .iter()
                .map(|r| r.name().to_string())
                .collect(),
            endpoints: topology
                .receive_endpoints()
                .iter()
                .map(|e| e.name.clone())
                .collect(),
            registered_scheduler: topology.message_scheduler.clone(),
            bus_scheduler: topology
                .transport
                .as_ref()
                .and_then(|t| t.settings().scheduler().cloned()),
            prefetch_count: topology
                .transport
                .as_ref()
                .and_then(|t| t.settings().prefetch_count()),
            retry_limit: topology
                .transport
                .as_ref()
                .and_then(|t| t.settings().retry())
                .map(|retry| retry.max_retries),
        }
    }
}

#[derive(Debug, Clone)]
enum StartBehavior {
    Succeed,
    Fail(BusError),
    Hang,
}

/// [`TransportRuntime`] that records topologies and hands out
/// [`StaticBusControl`]s.
#[derive(Debug, Clone)]
pub struct RecordingTransportRuntime {
    transport: TransportKind,
    behavior: StartBehavior,
    started: Arc<Mutex<Vec<StartedTopology>>>,
    last_bus: Arc<Mutex<Option<Arc<StaticBusControl>>>>,
}

impl RecordingTransportRuntime {
    /// Runtime whose start always succeeds.
    #[must_use]
    pub fn new(transport: TransportKind) -> Self {
        Self {
            transport,
            behavior: StartBehavior::Succeed,
            started: Arc::default(),
            last_bus: Arc::default(),
        }
    }

    /// Runtime whose start fails with `error`.
    #[must_use]
    pub fn failing(transport: TransportKind, error: BusError) -> Self {
        Self {
            behavior: StartBehavior::Fail(error),
            ..Self::new(transport)
        }
    }

    /// Runtime whose start never completes.
    #[must_use]
    pub fn hanging(transport: TransportKind) -> Self {
        Self {
            behavior: StartBehavior::Hang,
            ..Self::new(transport)
        }
    }

    /// Topologies passed to `start`, in call order.
    #[must_use]
    pub fn started(&self) -> Vec<StartedTopology> {
        lock(&self.started).clone()
    }

    /// Bus returned by the last successful start.
    #[must_use]
    pub fn last_bus(&self) -> Option<Arc<StaticBusControl>> {
        lock(&self.last_bus).clone()
    }
}

impl TransportRuntime for RecordingTransportRuntime {
    fn start(
        &self,
        topology: BusTopology,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn BusControl>, BusError>> + Send + '_>> {
        Box::pin(async move {
            let captured = StartedTopology::capture(&topology);
            let endpoints = captured.endpoints.clone();
            lock(&self.started).push(captured);

            match &self.behavior {
                StartBehavior::Succeed => {
                    let bus = Arc::new(StaticBusControl::new(self.transport, endpoints));
                    *lock(&self.last_bus) = Some(Arc::clone(&bus));
                    Ok(bus as Arc<dyn BusControl>)
                }
                StartBehavior::Fail(error) => Err(error.clone()),
                StartBehavior::Hang => std::future::pending().await,
            }
        })
    }
}

/// [`BusControl`] with settable health that records sent messages.
#[derive(Debug)]
pub struct StaticBusControl {
    transport: TransportKind,
    health: Mutex<BusHealth>,
    sent: Mutex<Vec<Envelope>>,
    stopped: AtomicBool,
}

impl StaticBusControl {
    /// Healthy bus serving `endpoints`.
    #[must_use]
    pub fn new(transport: TransportKind, endpoints: Vec<String>) -> Self {
        Self {
            transport,
            health: Mutex::new(BusHealth::healthy(format!("{transport} bus running"), endpoints)),
            sent: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
        }
    }

    /// Replace the reported health.
    pub fn set_health(&self, health: BusHealth) {
        *lock(&self.health) = health;
    }

    /// Messages sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Envelope> {
        lock(&self.sent).clone()
    }

    /// Whether `stop` was called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl BusControl for StaticBusControl {
    fn transport(&self) -> TransportKind {
        self.transport
    }

    fn health(&self) -> BusHealth {
        lock(&self.health).clone()
    }

    fn send(&self, envelope: Envelope) -> Pin<Box<dyn Future<Output = Result<(), BusError>> + Send + '_>> {
        Box::pin(async move {
            if self.is_stopped() {
                return Err(BusError::NotStarted);
            }
            lock(&self.sent).push(envelope);
            Ok(())
        })
    }

    fn stop(&self) -> Pin<Box<dyn Future<Output = Result<(), BusError>> + Send + '_>> {
        Box::pin(async move {
            self.stopped.store(true, Ordering::SeqCst);
            self.set_health(BusHealth::unhealthy("bus stopped"));
            Ok(())
        })
    }
}

/// Health check with a fixed outcome.
#[derive(Debug, Clone)]
pub struct StaticHealthCheck {
    outcome: Result<HealthCheckResult, String>,
    delay: Option<Duration>,
}

impl StaticHealthCheck {
    /// Always healthy.
    #[must_use]
    pub const fn healthy() -> Self {
        Self {
            outcome: Ok(HealthCheckResult::healthy()),
            delay: None,
        }
    }

    /// Always degraded.
    #[must_use]
    pub fn degraded(description: impl Into<String>) -> Self {
        Self {
            outcome: Ok(HealthCheckResult::degraded(description)),
            delay: None,
        }
    }

    /// Always unhealthy.
    #[must_use]
    pub fn unhealthy(description: impl Into<String>) -> Self {
        Self {
            outcome: Ok(HealthCheckResult::unhealthy(description)),
            delay: None,
        }
    }

    /// Always errors.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            delay: None,
        }
    }

    /// Wait `delay` before reporting.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl HealthCheck for StaticHealthCheck {
    async fn check(&self) -> anyhow::Result<HealthCheckResult> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone().map_err(|message| anyhow::anyhow!(message))
    }
}
