//! Event store database schema.

/// SQL to create the stream and event tables.
pub const CREATE_EVENT_STORE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS event_streams (
    stream_id       UUID PRIMARY KEY,
    aggregate_type  VARCHAR(255) NOT NULL,
    aggregate_id    UUID NOT NULL UNIQUE,
    version         BIGINT NOT NULL DEFAULT 0,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS domain_events (
    event_id          UUID PRIMARY KEY,
    stream_id         UUID NOT NULL REFERENCES event_streams (stream_id),
    aggregate_id      UUID NOT NULL,
    global_sequence   BIGINT GENERATED ALWAYS AS IDENTITY,
    event_type        VARCHAR(255) NOT NULL,
    event_version     INT NOT NULL,
    aggregate_version BIGINT NOT NULL,
    payload           JSONB NOT NULL,
    causation_id      UUID,
    correlation_id    UUID,
    actor             TEXT,
    occurred_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (stream_id, aggregate_version)
);

CREATE INDEX IF NOT EXISTS idx_domain_events_aggregate_id
    ON domain_events (aggregate_id, aggregate_version);

CREATE INDEX IF NOT EXISTS idx_domain_events_global_sequence
    ON domain_events (global_sequence);

CREATE INDEX IF NOT EXISTS idx_domain_events_event_type
    ON domain_events (event_type, occurred_at);

CREATE INDEX IF NOT EXISTS idx_domain_events_correlation_id
    ON domain_events (correlation_id);
";
