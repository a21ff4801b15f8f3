use shared::metrics_defs::{MetricDef, MetricType};

pub const EVENTS_RECEIVED: MetricDef = MetricDef {
    name: "webhook.events.received",
    metric_type: MetricType::Counter,
    description: "Webhook events received, before gating",
};

pub const EVENTS_SKIPPED: MetricDef = MetricDef {
    name: "webhook.events.skipped",
    metric_type: MetricType::Counter,
    description: "Events acknowledged but skipped by the stage gate",
};

pub const EVENTS_REJECTED: MetricDef = MetricDef {
    name: "webhook.events.rejected",
    metric_type: MetricType::Counter,
    description: "Events rejected for missing both design and project ids",
};

pub const DESIGNS_SYNCED: MetricDef = MetricDef {
    name: "webhook.designs.synced",
    metric_type: MetricType::Counter,
    description: "Designs transformed and confirmed upserted",
};

pub const FETCH_FAILURES: MetricDef = MetricDef {
    name: "webhook.fetch.failures",
    metric_type: MetricType::Counter,
    description: "Design or project fetches that failed or came back absent",
};

pub const UPSERT_FAILURES: MetricDef = MetricDef {
    name: "webhook.upsert.failures",
    metric_type: MetricType::Counter,
    description: "Upserts rejected by the table service (not retried)",
};

pub const ALL_METRICS: &[MetricDef] = &[
    EVENTS_RECEIVED,
    EVENTS_SKIPPED,
    EVENTS_REJECTED,
    DESIGNS_SYNCED,
    FETCH_FAILURES,
    UPSERT_FAILURES,
];
