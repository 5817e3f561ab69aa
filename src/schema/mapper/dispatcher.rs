use super::engine::{MappingReport, RecordMapper};
use crate::schema::{MapperError, MapperResult, SourceEvent};
use crate::store::TargetRecord;
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// Routes events of a record type to the mapper registered for it.
///
/// Mappers are registered while the registry is being built (`&mut self`);
/// afterwards the registry is shared read-only, typically as
/// `Arc<MapperRegistry>`.
#[derive(Default)]
pub struct MapperRegistry {
    mappers: HashMap<String, Arc<RecordMapper>>,
}

/// Per-event outcome of [`MapperRegistry::dispatch_batch`].
#[derive(Debug)]
pub enum DispatchOutcome {
    Mapped(MappingReport),
    /// The event was malformed or had no mapper and has been dropped
    Dropped(MapperError),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub mapped: usize,
    pub changed: usize,
    pub dropped: usize,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, record_type: &str, mapper: RecordMapper) -> MapperResult<()> {
        if mapper.record_type() != record_type {
            return Err(MapperError::Configuration(format!(
                "mapper for '{}' registered under '{}'",
                mapper.record_type(),
                record_type
            )));
        }
        if self.mappers.contains_key(record_type) {
            return Err(MapperError::Configuration(format!(
                "a mapper for '{}' is already registered",
                record_type
            )));
        }
        info!("Registered mapper for record type '{}'", record_type);
        self.mappers
            .insert(record_type.to_string(), Arc::new(mapper));
        Ok(())
    }

    pub fn mapper(&self, record_type: &str) -> MapperResult<&Arc<RecordMapper>> {
        self.mappers
            .get(record_type)
            .ok_or_else(|| MapperError::UnregisteredType {
                record_type: record_type.to_string(),
            })
    }

    pub fn dispatch(&self, record_type: &str, event: &SourceEvent) -> MapperResult<TargetRecord> {
        self.mapper(record_type)?.apply(event)
    }

    pub fn dispatch_detailed(
        &self,
        record_type: &str,
        event: &SourceEvent,
    ) -> MapperResult<MappingReport> {
        self.mapper(record_type)?.apply_detailed(event)
    }

    /// Map events one after the other.
    ///
    /// Event-level failures (missing key, aborted transform, unknown record
    /// type) are logged and dropped without retry. Only store and
    /// configuration errors stop the batch; events before the failing one
    /// have already been applied.
    pub fn dispatch_batch<'e, I>(&self, events: I) -> MapperResult<(Vec<DispatchOutcome>, BatchSummary)>
    where
        I: IntoIterator<Item = (&'e str, &'e SourceEvent)>,
    {
        let mut outcomes = Vec::new();
        let mut summary = BatchSummary::default();

        for (record_type, event) in events {
            match self.dispatch_detailed(record_type, event) {
                Ok(report) => {
                    summary.mapped += 1;
                    if report.changed() {
                        summary.changed += 1;
                    }
                    outcomes.push(DispatchOutcome::Mapped(report));
                }
                Err(error)
                    if error.is_event_error()
                        || matches!(error, MapperError::UnregisteredType { .. }) =>
                {
                    warn!("Dropping {} event: {}", record_type, error);
                    summary.dropped += 1;
                    outcomes.push(DispatchOutcome::Dropped(error));
                }
                Err(error) => return Err(error),
            }
        }

        Ok((outcomes, summary))
    }

    pub fn record_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.mappers.keys().cloned().collect();
        names.sort();
        names
    }
}
