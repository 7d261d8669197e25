/// 服务自身的 Prometheus 指标

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub struct Telemetry {
    registry: Registry,
    collections: IntCounterVec,
    samples_stored: IntCounter,
}

impl Telemetry {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("metricly".to_string()), None)?;

        let collections = IntCounterVec::new(
            Opts::new("collections_total", "Collection attempts by source and outcome"),
            &["source", "outcome"],
        )?;
        let samples_stored = IntCounter::new("samples_stored_total", "Samples appended to the store")?;

        registry.register(Box::new(collections.clone()))?;
        registry.register(Box::new(samples_stored.clone()))?;

        Ok(Self {
            registry,
            collections,
            samples_stored,
        })
    }

    /// 记录一次采集结果，source 为 "local" / "remote" / "container"
    pub fn record_collection(&self, source: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.collections.with_label_values(&[source, outcome]).inc();
    }

    pub fn record_sample(&self) {
        self.samples_stored.inc();
    }

    /// 文本格式导出
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("导出 Prometheus 指标失败: {}", e);
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
