//! Sync engine configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};

use crate::{seconds_to_nanos, StreamId};

/// Default per-stream queue capacity
pub const DEFAULT_QUEUE_SIZE: usize = 100;

/// Default tolerance window (seconds)
pub const DEFAULT_SLOP_S: f64 = 0.016;

/// One synchronizer input stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSpec {
    pub id: StreamId,
    /// Required streams must contribute to every tuple
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl StreamSpec {
    pub fn required(id: impl Into<StreamId>) -> Self {
        Self {
            id: id.into(),
            required: true,
        }
    }

    pub fn optional(id: impl Into<StreamId>) -> Self {
        Self {
            id: id.into(),
            required: false,
        }
    }
}

/// Handling of records whose timestamp goes backwards within a stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPolicy {
    /// Buffer anyway, count it and log a warning
    #[default]
    BestEffort,
    /// Reject the record with an error
    Reject,
}

/// Sync engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEngineConfig {
    /// Input streams in configuration order; the first required one is the primary
    pub streams: Vec<StreamSpec>,

    /// Maximum records buffered per stream (drop-oldest beyond this)
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Maximum tolerated timestamp spread within a tuple (seconds)
    #[serde(default = "default_slop")]
    pub slop_s: f64,

    /// Out-of-order handling
    #[serde(default)]
    pub order_policy: OrderPolicy,
}

fn default_queue_size() -> usize {
    DEFAULT_QUEUE_SIZE
}

fn default_slop() -> f64 {
    DEFAULT_SLOP_S
}

impl SyncEngineConfig {
    /// Build a config from required and optional stream names
    pub fn new<R, O>(required: R, optional: O) -> Self
    where
        R: IntoIterator,
        R::Item: Into<StreamId>,
        O: IntoIterator,
        O::Item: Into<StreamId>,
    {
        let streams = required
            .into_iter()
            .map(StreamSpec::required)
            .chain(optional.into_iter().map(StreamSpec::optional))
            .collect();

        Self {
            streams,
            queue_size: DEFAULT_QUEUE_SIZE,
            slop_s: DEFAULT_SLOP_S,
            order_policy: OrderPolicy::default(),
        }
    }

    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size;
        self
    }

    pub fn with_slop(mut self, slop_s: f64) -> Self {
        self.slop_s = slop_s;
        self
    }

    pub fn with_order_policy(mut self, policy: OrderPolicy) -> Self {
        self.order_policy = policy;
        self
    }

    /// Primary stream: first required stream in configuration order
    pub fn primary(&self) -> Option<&StreamId> {
        self.streams.iter().find(|s| s.required).map(|s| &s.id)
    }

    /// Required stream ids in configuration order
    pub fn required_streams(&self) -> impl Iterator<Item = &StreamId> {
        self.streams.iter().filter(|s| s.required).map(|s| &s.id)
    }

    /// All stream ids in configuration order
    pub fn stream_ids(&self) -> impl Iterator<Item = &StreamId> {
        self.streams.iter().map(|s| &s.id)
    }

    /// Slop in nanoseconds
    pub fn slop_ns(&self) -> i64 {
        seconds_to_nanos(self.slop_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_is_first_required() {
        let config = SyncEngineConfig {
            streams: vec![
                StreamSpec::optional("/pose"),
                StreamSpec::required("/rgb"),
                StreamSpec::required("/depth"),
            ],
            queue_size: 10,
            slop_s: 0.01,
            order_policy: OrderPolicy::BestEffort,
        };
        assert_eq!(config.primary().map(|s| s.as_str()), Some("/rgb"));
        assert_eq!(config.required_streams().count(), 2);
    }

    #[test]
    fn test_defaults_from_json() {
        let config: SyncEngineConfig =
            serde_json::from_str(r#"{ "streams": [{ "id": "/rgb" }] }"#).unwrap();
        assert_eq!(config.queue_size, DEFAULT_QUEUE_SIZE);
        assert_eq!(config.slop_s, DEFAULT_SLOP_S);
        assert!(config.streams[0].required);
        assert_eq!(config.slop_ns(), 16_000_000);
    }
}
