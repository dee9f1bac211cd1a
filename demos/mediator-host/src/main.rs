//! Mediator Host
//!
//! Boots the platform on the in-process Mediator transport with a single
//! orders plugin, then serves health, metrics, and the plugin's routes.
//!
//! # Usage
//!
//! ```bash
//! TRANSIT_CONFIG=demos/mediator-host/platform.toml cargo run -p mediator-host
//! curl localhost:8080/health/ready
//! curl -X POST localhost:8080/orders -d '{"sku":"ABC-1","quantity":2}'
//! ```

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde_json::{Value, json};
use std::sync::Arc;
use transit_platform_core::bus::{
    BusRegistrationConfigurator, Envelope, HandlerRegistration, consumer_fn,
};
use transit_platform_core::config::Configuration;
use transit_platform_core::control::BusControl;
use transit_platform_host::{
    Bootstrap, HttpPipelineContext, PlatformHost, PlatformServices, PlatformStartup,
    ServerOptions, telemetry,
};
use transit_platform_web::{AppError, HttpPipeline, WebResult};

struct OrdersStartup;

impl PlatformStartup for OrdersStartup {
    fn name(&self) -> &str {
        "orders"
    }

    fn contribute_bus_topology(
        &self,
        bus: &mut BusRegistrationConfigurator,
        _services: &mut PlatformServices,
    ) -> anyhow::Result<()> {
        bus.add_consumer(
            HandlerRegistration::consumer(
                "SubmitOrderConsumer",
                consumer_fn(|envelope: Envelope| async move {
                    tracing::info!(
                        message_id = %envelope.message_id,
                        payload = %envelope.payload,
                        "Order submitted"
                    );
                    Ok(())
                }),
            )
            .handles("SubmitOrder"),
        );
        Ok(())
    }

    fn contribute_http_pipeline(
        &self,
        pipeline: &mut HttpPipeline,
        context: &HttpPipelineContext<'_>,
    ) -> anyhow::Result<()> {
        let application = context.environment().application_name.clone();
        pipeline
            .route("/", get(move || async move { Json(json!({ "application": application })) }))
            .route("/orders", post(submit_order).with_state(Arc::clone(context.bus())));
        Ok(())
    }
}

async fn submit_order(
    State(bus): State<Arc<dyn BusControl>>,
    Json(order): Json<Value>,
) -> WebResult<(StatusCode, Json<Value>)> {
    let envelope = Envelope::new("SubmitOrder", order);
    let message_id = envelope.message_id;
    bus.send(envelope)
        .await
        .map_err(|e| AppError::internal("Order could not be submitted").with_source(e.into()))?;

    Ok((StatusCode::ACCEPTED, Json(json!({ "messageId": message_id }))))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing("info,transit_platform_host=debug")?;

    let configuration = Configuration::load()?;
    let server = ServerOptions::bind(&configuration)?;

    let ready = Bootstrap::new(configuration)
        .application_name("mediator-host")
        .plugin(OrdersStartup)
        .run()
        .await?;

    tracing::info!(address = %server.address(), "Mediator host is running; press Ctrl+C to stop");

    PlatformHost::new(ready, server).run().await?;
    Ok(())
}
