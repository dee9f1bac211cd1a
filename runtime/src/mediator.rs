//! In-process bus for the `Mediator` transport.
//!
//! No broker, no endpoints: a sent message is delivered to every consumer,
//! saga, and activity registered for its type, sequentially and in
//! registration order. The first handler that still fails after retries
//! aborts the delivery and the error is returned to the sender.

use crate::metrics::MediatorMetrics;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use transit_platform_core::bus::{BusTopology, Envelope, HandlerRegistration};
use transit_platform_core::control::{BusControl, BusError, BusHealth, TransportRuntime};
use transit_platform_core::options::TransportKind;
use transit_platform_core::retry::RetryPolicy;

/// Starts an [`InProcessBus`] from a Mediator topology.
#[derive(Debug, Clone, Default)]
pub struct MediatorRuntime {
    retry: Option<RetryPolicy>,
}

impl MediatorRuntime {
    /// Runtime without retries.
    #[must_use]
    pub const fn new() -> Self {
        Self { retry: None }
    }

    /// Retry failed handlers with the given policy.
    #[must_use]
    pub fn with_retry(mut self, policy: Option<RetryPolicy>) -> Self {
        self.retry = policy;
        self
    }
}

impl TransportRuntime for MediatorRuntime {
    fn start(
        &self,
        topology: BusTopology,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn BusControl>, BusError>> + Send + '_>> {
        Box::pin(async move {
            if let Some(transport) = &topology.transport {
                return Err(BusError::Other(format!(
                    "Mediator cannot run a topology configured for {}",
                    transport.transport()
                )));
            }

            let bus = InProcessBus::new(topology.registrations, self.retry.clone());
            tracing::info!(handlers = bus.registrations.len(), "Mediator started");
            Ok(Arc::new(bus) as Arc<dyn BusControl>)
        })
    }
}

/// Running in-process bus.
#[derive(Debug)]
pub struct InProcessBus {
    registrations: Vec<HandlerRegistration>,
    retry: Option<RetryPolicy>,
    running: AtomicBool,
}

impl InProcessBus {
    /// Running bus over the given handlers.
    #[must_use]
    pub fn new(registrations: Vec<HandlerRegistration>, retry: Option<RetryPolicy>) -> Self {
        Self {
            registrations,
            retry,
            running: AtomicBool::new(true),
        }
    }

    /// Deliver an envelope, returning how many handlers received it.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::NotStarted`] after [`stop`](BusControl::stop),
    /// [`BusError::NoConsumer`] if nothing handles the message type, or
    /// [`BusError::Dispatch`] if a handler fails after retries.
    pub async fn dispatch(&self, envelope: &Envelope) -> Result<usize, BusError> {
        if !self.running.load(Ordering::Acquire) {
            return Err(BusError::NotStarted);
        }

        let handlers: Vec<&HandlerRegistration> = self
            .registrations
            .iter()
            .filter(|r| r.handles_message(&envelope.message_type))
            .collect();

        if handlers.is_empty() {
            MediatorMetrics::record_error();
            return Err(BusError::NoConsumer(envelope.message_type.clone()));
        }

        for handler in &handlers {
            self.deliver(handler, envelope).await?;
            MediatorMetrics::record_dispatch();
        }

        Ok(handlers.len())
    }

    async fn deliver(&self, handler: &HandlerRegistration, envelope: &Envelope) -> Result<(), BusError> {
        let max_retries = self.retry.as_ref().map_or(0, |p| p.max_retries);
        let mut attempt = 0;

        loop {
            match handler.handler().consume(envelope).await {
                Ok(()) => return Ok(()),
                Err(error) if attempt < max_retries => {
                    let delay = self
                        .retry
                        .as_ref()
                        .map(|p| p.delay_for_attempt(attempt))
                        .unwrap_or_default();
                    tracing::warn!(
                        handler = handler.name(),
                        message_type = %envelope.message_type,
                        attempt = attempt + 1,
                        max_retries,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "Handler failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    MediatorMetrics::record_error();
                    tracing::error!(
                        handler = handler.name(),
                        message_type = %envelope.message_type,
                        message_id = %envelope.message_id,
                        error = %error,
                        "Handler failed"
                    );
                    return Err(BusError::Dispatch {
                        message_type: envelope.message_type.clone(),
                        reason: format!("{}: {error:#}", handler.name()),
                    });
                }
            }
        }
    }
}

impl BusControl for InProcessBus {
    fn transport(&self) -> TransportKind {
        TransportKind::Mediator
    }

    fn health(&self) -> BusHealth {
        if self.running.load(Ordering::Acquire) {
            let handlers = self
                .registrations
                .iter()
                .map(|r| r.name().to_string())
                .collect();
            BusHealth::healthy("Mediator running", handlers)
        } else {
            BusHealth::unhealthy("Mediator stopped")
        }
    }

    fn send(&self, envelope: Envelope) -> Pin<Box<dyn Future<Output = Result<(), BusError>> + Send + '_>> {
        Box::pin(async move { self.dispatch(&envelope).await.map(|_| ()) })
    }

    fn stop(&self) -> Pin<Box<dyn Future<Output = Result<(), BusError>> + Send + '_>> {
        Box::pin(async move {
            if self.running.swap(false, Ordering::AcqRel) {
                tracing::info!("Mediator stopped");
            }
            Ok(())
        })
    }
}
