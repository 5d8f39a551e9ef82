// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Telemetry Context (spec §4.10): wires `tracing` to stdout JSON and, when an
//! OTLP endpoint is configured, bridges spans and named instruments to an
//! OTLP/HTTP collector. Installed once at process start; torn down on shutdown
//! so buffered spans and metrics are flushed rather than dropped.

use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::config::TelemetryConfig;

/// Handles that must stay alive for the lifetime of the process and be
/// explicitly shut down so exporters flush their final batch.
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
    meter_provider: Option<SdkMeterProvider>,
}

impl TelemetryGuard {
    pub fn shutdown(self) {
        if let Some(provider) = self.tracer_provider {
            if let Err(err) = provider.shutdown() {
                eprintln!("otel trace provider shutdown failed: {err}");
            }
        }
        if let Some(provider) = self.meter_provider {
            if let Err(err) = provider.shutdown() {
                eprintln!("otel meter provider shutdown failed: {err}");
            }
        }
    }
}

/// Named instruments the rest of the crate records against. Grouped here so
/// components take `&Instruments` instead of reaching for a global meter.
#[derive(Clone)]
pub struct Instruments {
    pub snapshot_build_duration: Histogram<f64>,
    pub errors_total: Counter<u64>,
    pub agent_events_sent_total: Counter<u64>,
    pub queue_evictions_total: Counter<u64>,
    pub queue_depth: UpDownCounter<i64>,
}

impl Instruments {
    fn new(meter: &Meter) -> Self {
        Self {
            snapshot_build_duration: meter
                .f64_histogram("botrelay.perception.snapshot_build_duration_ms")
                .with_description("Time to assemble one perception snapshot")
                .with_unit("ms")
                .build(),
            errors_total: meter
                .u64_counter("botrelay.errors_total")
                .with_description("Command/bridge errors by kind")
                .build(),
            agent_events_sent_total: meter
                .u64_counter("botrelay.agent_events_sent_total")
                .with_description("Agent events successfully flushed to the planner")
                .build(),
            queue_evictions_total: meter
                .u64_counter("botrelay.queue_evictions_total")
                .with_description("Agent events dropped from the head of a full queue")
                .build(),
            queue_depth: meter
                .i64_up_down_counter("botrelay.queue_depth")
                .with_description("Current depth of the outbound agent-event queue")
                .build(),
        }
    }
}

fn resource(config: &TelemetryConfig) -> Resource {
    Resource::builder()
        .with_attributes([
            KeyValue::new("service.name", config.service_name.clone()),
            KeyValue::new("deployment.environment", config.deployment_environment.clone()),
            KeyValue::new("service.namespace", "mineflayer-agent"),
        ])
        .build()
}

/// Installs the global `tracing` subscriber and, if `config.otlp_endpoint` is
/// set, OTLP trace and metric exporters. Returns the instruments the rest of
/// the crate records against and a guard to shut everything down on exit.
///
/// Safe to call at most once per process; `tracing`/`opentelemetry` globals
/// panic on a second install, so `main` is the only caller.
pub fn install(config: &TelemetryConfig) -> (Instruments, TelemetryGuard) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let no_otlp = || {
        Registry::default().with(env_filter).with(fmt_layer).init();
        let meter = opentelemetry::global::meter("botrelay");
        (Instruments::new(&meter), TelemetryGuard { tracer_provider: None, meter_provider: None })
    };

    let Some(endpoint) = config.otlp_endpoint.clone() else {
        return no_otlp();
    };

    let span_exporter = match opentelemetry_otlp::SpanExporter::builder().with_http().with_endpoint(format!("{endpoint}/v1/traces")).build() {
        Ok(exporter) => exporter,
        Err(err) => {
            eprintln!("otlp span exporter build failed, falling back to stdout-only tracing: {err}");
            return no_otlp();
        }
    };

    let metric_exporter = match opentelemetry_otlp::MetricExporter::builder().with_http().with_endpoint(format!("{endpoint}/v1/metrics")).build() {
        Ok(exporter) => exporter,
        Err(err) => {
            eprintln!("otlp metric exporter build failed, falling back to stdout-only tracing: {err}");
            return no_otlp();
        }
    };

    let sampler = Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(config.sampler_ratio)));

    let tracer_provider = SdkTracerProvider::builder()
        .with_sampler(sampler)
        .with_resource(resource(config))
        .with_batch_exporter(span_exporter)
        .build();
    opentelemetry::global::set_tracer_provider(tracer_provider.clone());
    let tracer = tracer_provider.tracer("botrelay");

    let meter_provider = SdkMeterProvider::builder()
        .with_resource(resource(config))
        .with_periodic_exporter(metric_exporter)
        .build();
    opentelemetry::global::set_meter_provider(meter_provider.clone());

    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    Registry::default().with(env_filter).with(fmt_layer).with(otel_layer).init();

    let meter = opentelemetry::global::meter("botrelay");
    (
        Instruments::new(&meter),
        TelemetryGuard {
            tracer_provider: Some(tracer_provider),
            meter_provider: Some(meter_provider),
        },
    )
}
