use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use feed_api::{EventStore, Partition, StoredRecord};

use crate::config::RunnerConfig;
use crate::error::{EventError, ListenError};
use crate::normalize::TimestampNormalizer;
use crate::partition;
use crate::runner::RetryState;

// ═══════════════════════════════════════════════════════════════
//  PartitionStores
// ═══════════════════════════════════════════════════════════════

/// Два живых хранилища, по одному на партицию.
#[derive(Clone)]
pub struct PartitionStores {
    pub even: Arc<dyn EventStore>,
    pub odd: Arc<dyn EventStore>,
}

impl PartitionStores {
    pub fn new(even: Arc<dyn EventStore>, odd: Arc<dyn EventStore>) -> Self {
        Self { even, odd }
    }

    pub fn get(&self, partition: Partition) -> &dyn EventStore {
        match partition {
            Partition::Even => self.even.as_ref(),
            Partition::Odd => self.odd.as_ref(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  StreamListener
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub persisted_even: u64,
    pub persisted_odd: u64,
    pub rejected: u64,
}

/// Обработчик одного события фида: normalize → route → append.
pub struct StreamListener {
    project: String,
    id_field: String,
    normalizer: TimestampNormalizer,
    stores: PartitionStores,
    stats: ListenerStats,
}

impl StreamListener {
    pub fn new(project: impl Into<String>, config: &RunnerConfig, stores: PartitionStores) -> Self {
        Self {
            project: project.into(),
            id_field: config.id_field.clone(),
            normalizer: TimestampNormalizer::new(config.created_at_field.clone()),
            stores,
            stats: ListenerStats::default(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn stats(&self) -> ListenerStats {
        self.stats
    }

    /// Process one raw event.
    ///
    /// On success exactly one row was appended to exactly one partition and
    /// the consecutive-failure counter is reset. On any error nothing was
    /// appended.
    pub fn on_event(&mut self, raw: &Value, retry: &mut RetryState) -> Result<Partition, ListenError> {
        let result = self.persist(raw);
        match &result {
            Ok(Partition::Even) => self.stats.persisted_even += 1,
            Ok(Partition::Odd) => self.stats.persisted_odd += 1,
            Err(ListenError::Malformed(_)) => self.stats.rejected += 1,
            Err(_) => {}
        }
        if result.is_ok() {
            retry.reset();
        }
        result
    }

    fn persist(&self, raw: &Value) -> Result<Partition, ListenError> {
        let instant = self.creation_instant(raw)?;
        let identifier = self.identifier(raw)?;

        let text = serde_json::to_string(raw)?;
        let payload_text = self.normalizer.normalize(raw, &text)?;

        let partition = partition::route(instant);
        let record = StoredRecord {
            project: self.project.clone(),
            creation_date: instant.format("%Y-%m-%d").to_string(),
            identifier,
            payload_text,
        };
        self.stores.get(partition).append(&record)?;

        tracing::debug!(
            id = %record.identifier,
            partition = %partition,
            creation_date = %record.creation_date,
            "event persisted"
        );
        Ok(partition)
    }

    fn top_level_str<'a>(&self, raw: &'a Value, field: &str) -> Result<&'a str, EventError> {
        let obj = raw.as_object().ok_or(EventError::NotAnObject)?;
        let value = obj
            .get(field)
            .ok_or_else(|| EventError::MissingField(field.to_string()))?;
        value.as_str().ok_or_else(|| EventError::NotAString { field: field.to_string() })
    }

    fn creation_instant(&self, raw: &Value) -> Result<DateTime<Utc>, EventError> {
        let created_at = self.top_level_str(raw, self.normalizer.field())?;
        self.normalizer.parse_instant(created_at)
    }

    fn identifier(&self, raw: &Value) -> Result<String, EventError> {
        self.top_level_str(raw, &self.id_field).map(str::to_string)
    }
}
