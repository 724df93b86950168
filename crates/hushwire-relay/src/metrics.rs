//! Relay metrics, exported in Prometheus text format.

use prometheus::{Counter, Encoder, Gauge, Opts, Registry, TextEncoder};

pub struct RelayMetrics {
    pub logins: Counter,
    pub auth_failures: Counter,
    pub active_connections: Gauge,
    pub envelopes_received: Counter,
    pub envelopes_delivered: Counter,
    pub envelopes_dropped: Counter,
    pub envelopes_rejected: Counter,
    pub evictions: Counter,
    registry: Registry,
}

impl RelayMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let logins = counter(&registry, "hushwire_relay_logins_total", "Successful logins")?;
        let auth_failures = counter(
            &registry,
            "hushwire_relay_auth_failures_total",
            "Requests rejected for a missing or invalid bearer token",
        )?;

        let active_connections = Gauge::with_opts(Opts::new(
            "hushwire_relay_active_connections",
            "Registered persistent connections",
        ))?;
        registry.register(Box::new(active_connections.clone()))?;

        let envelopes_received = counter(
            &registry,
            "hushwire_relay_envelopes_received_total",
            "Envelopes accepted into the dispatch queue",
        )?;
        let envelopes_delivered = counter(
            &registry,
            "hushwire_relay_envelopes_delivered_total",
            "Envelopes handed to a recipient connection",
        )?;
        let envelopes_dropped = counter(
            &registry,
            "hushwire_relay_envelopes_dropped_total",
            "Envelopes with no connected recipient",
        )?;
        let envelopes_rejected = counter(
            &registry,
            "hushwire_relay_envelopes_rejected_total",
            "Frames that failed decoding or validation",
        )?;
        let evictions = counter(
            &registry,
            "hushwire_relay_evictions_total",
            "Connections evicted after a failed forward",
        )?;

        Ok(Self {
            logins,
            auth_failures,
            active_connections,
            envelopes_received,
            envelopes_delivered,
            envelopes_dropped,
            envelopes_rejected,
            evictions,
            registry,
        })
    }

    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<Counter, prometheus::Error> {
    let counter = Counter::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_contains_counters() {
        let metrics = RelayMetrics::new().unwrap();
        metrics.logins.inc();
        metrics.active_connections.set(2.0);

        let text = metrics.export().unwrap();
        assert!(text.contains("hushwire_relay_logins_total 1"));
        assert!(text.contains("hushwire_relay_active_connections 2"));
        assert!(text.contains("hushwire_relay_envelopes_dropped_total 0"));
    }

    #[test]
    fn test_instances_are_independent() {
        let a = RelayMetrics::new().unwrap();
        let b = RelayMetrics::new().unwrap();
        a.evictions.inc();
        assert_eq!(a.evictions.get(), 1.0);
        assert_eq!(b.evictions.get(), 0.0);
    }
}
