use prometheus::core::Collector;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Traffic and publication counters of one wrapped part. Every metric
/// carries a constant `part` label so several wrappers can share a scrape.
#[derive(Clone)]
pub struct WrapperMetrics {
    registry: Registry,
    pub rpc_requests: IntCounter,
    pub rpc_unrecognized: IntCounter,
    pub rpc_failed: IntCounter,
    pub stream_messages: IntCounter,
    pub stream_discarded: IntCounter,
    pub publish_ticks: IntCounter,
    pub attached_subdevices: IntGauge,
}

fn registered<C: Collector + Clone + 'static>(registry: &Registry, c: C) -> prometheus::Result<C> {
    registry.register(Box::new(c.clone()))?;
    Ok(c)
}

/// Counter family split by `outcome`.
fn outcomes(part: &str, name: &str, help: &str) -> prometheus::Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help).const_label("part", part), &["outcome"])
}

impl WrapperMetrics {
    pub fn new(part: &str) -> prometheus::Result<Self> {
        let registry = Registry::new();
        let rpc = registered(
            &registry,
            outcomes(part, "cbw_rpc_requests_total", "RPC requests by outcome")?,
        )?;
        let stream = registered(
            &registry,
            outcomes(part, "cbw_stream_messages_total", "Streaming commands by outcome")?,
        )?;
        let publish_ticks = registered(
            &registry,
            IntCounter::with_opts(
                Opts::new("cbw_publish_ticks_total", "Periodic state publications")
                    .const_label("part", part),
            )?,
        )?;
        let attached_subdevices = registered(
            &registry,
            IntGauge::with_opts(
                Opts::new("cbw_attached_subdevices", "Subdevices with a bound backend")
                    .const_label("part", part),
            )?,
        )?;
        Ok(Self {
            rpc_requests: rpc.with_label_values(&["received"]),
            rpc_unrecognized: rpc.with_label_values(&["unrecognized"]),
            rpc_failed: rpc.with_label_values(&["failed"]),
            stream_messages: stream.with_label_values(&["received"]),
            stream_discarded: stream.with_label_values(&["discarded"]),
            publish_ticks,
            attached_subdevices,
            registry,
        })
    }

    /// Text exposition of every metric of this part.
    pub fn encode_text(&self) -> String {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .unwrap_or_else(|e| format!("# metrics unavailable: {e}\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_share_one_family_per_channel() {
        let m = WrapperMetrics::new("/arm").unwrap();
        m.rpc_requests.inc();
        m.rpc_requests.inc();
        m.rpc_failed.inc();
        m.stream_discarded.inc();
        m.attached_subdevices.set(2);
        let text = m.encode_text();
        assert!(text.contains(r#"cbw_rpc_requests_total{outcome="received",part="/arm"} 2"#));
        assert!(text.contains(r#"cbw_rpc_requests_total{outcome="failed",part="/arm"} 1"#));
        assert!(text.contains(r#"cbw_stream_messages_total{outcome="discarded",part="/arm"} 1"#));
        assert!(text.contains(r#"cbw_attached_subdevices{part="/arm"} 2"#));
        assert_eq!(text.matches("# TYPE cbw_rpc_requests_total counter").count(), 1);
    }

    #[test]
    fn untouched_outcomes_are_still_exported() {
        let m = WrapperMetrics::new("/head").unwrap();
        let text = m.encode_text();
        assert!(text.contains(r#"cbw_rpc_requests_total{outcome="unrecognized",part="/head"} 0"#));
        assert!(text.contains(r#"cbw_publish_ticks_total{part="/head"} 0"#));
    }
}
