use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

pub struct MetricsCollector {
    registry: Registry,

    // Router metrics
    pub requests_total: CounterVec,
    pub request_duration: HistogramVec,
    pub agent_calls_total: CounterVec,

    // Specialist metrics
    pub tool_calls_total: CounterVec,
    pub policy_denials_total: CounterVec,
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("waypoint_requests_total", "Chat requests by classified intent and domain"),
            &["intent", "domain"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "waypoint_request_duration_seconds",
                "Chat request duration in seconds",
            ),
            &["intent"],
        )?;
        registry.register(Box::new(request_duration.clone()))?;

        let agent_calls_total = CounterVec::new(
            Opts::new("waypoint_agent_calls_total", "Specialist delegations"),
            &["domain", "success"],
        )?;
        registry.register(Box::new(agent_calls_total.clone()))?;

        let tool_calls_total = CounterVec::new(
            Opts::new("waypoint_tool_calls_total", "Tool invocations by outcome code"),
            &["agent", "tool", "outcome"],
        )?;
        registry.register(Box::new(tool_calls_total.clone()))?;

        let policy_denials_total = CounterVec::new(
            Opts::new(
                "waypoint_policy_denials_total",
                "Tool calls refused because the tool is outside the agent's catalog",
            ),
            &["agent", "tool"],
        )?;
        registry.register(Box::new(policy_denials_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
            agent_calls_total,
            tool_calls_total,
            policy_denials_total,
        })
    }

    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

pub struct MetricsHandler {
    collector: Arc<MetricsCollector>,
}

impl MetricsHandler {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector }
    }

    pub async fn metrics(&self) -> String {
        self.collector.encode().unwrap_or_else(|e| {
            tracing::error!("Failed to encode metrics: {}", e);
            String::from("# Error encoding metrics\n")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_encoding() {
        let collector = MetricsCollector::new().unwrap();

        collector
            .policy_denials_total
            .with_label_values(&["hotel-agent", "book_flight"])
            .inc();
        collector
            .tool_calls_total
            .with_label_values(&["airline-agent", "list_airports", "ok"])
            .inc();

        let metrics_text = collector.encode().unwrap();
        assert!(metrics_text.contains("waypoint_policy_denials_total"));
        assert!(metrics_text.contains("book_flight"));
        assert!(metrics_text.contains("waypoint_tool_calls_total"));
    }

    #[tokio::test]
    async fn test_metrics_handler() {
        let collector = Arc::new(MetricsCollector::new().unwrap());
        let handler = MetricsHandler::new(collector.clone());

        collector
            .requests_total
            .with_label_values(&["search", "airline"])
            .inc();

        let output = handler.metrics().await;
        assert!(output.contains("waypoint_requests_total"));
        assert!(output.contains("intent=\"search\""));
    }
}
