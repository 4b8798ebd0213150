//! Prometheus counters for the BOM endpoints, kept in a per-state registry.

use prometheus::{IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub struct ApiMetrics {
    registry: Registry,
    pub explosions: IntCounter,
    pub drafts_automated: IntCounter,
    /// Labelled by `outcome`: saved, partial, rejected.
    pub draft_saves: IntCounterVec,
    pub codes_suggested: IntCounterVec,
}

impl ApiMetrics {
    pub fn new(namespace: &str) -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some(namespace.to_string()), None)?;

        let explosions = IntCounter::new("bom_explosions_total", "Completed BOM explosions")?;
        let drafts_automated = IntCounter::new("drafts_automated_total", "Draft trees generated from level patterns")?;
        let draft_saves = IntCounterVec::new(Opts::new("draft_saves_total", "Draft save attempts"), &["outcome"])?;
        let codes_suggested = IntCounterVec::new(Opts::new("codes_suggested_total", "Codes suggested"), &["family"])?;

        registry.register(Box::new(explosions.clone()))?;
        registry.register(Box::new(drafts_automated.clone()))?;
        registry.register(Box::new(draft_saves.clone()))?;
        registry.register(Box::new(codes_suggested.clone()))?;

        Ok(Self {
            registry,
            explosions,
            drafts_automated,
            draft_saves,
            codes_suggested,
        })
    }

    pub fn render(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}
