use crate::queue::BoundedQueue;
use crate::record::LogRecord;
use serde::Serialize;
use std::sync::Arc;

/// An ordered, non-empty group of records sent in one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    application_id: Arc<str>,
    records: Vec<LogRecord>,
}

/// JSON body posted to the collector for one batch.
#[derive(Serialize)]
pub struct IngestPayload<'a> {
    pub application_id: &'a str,
    pub logs: &'a [LogRecord],
}

impl Batch {
    /// Returns `None` for an empty record list.
    pub fn new(application_id: Arc<str>, records: Vec<LogRecord>) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        Some(Self {
            application_id,
            records,
        })
    }

    /// Take up to `max` records off the head of `queue` as one batch.
    pub fn drain_from(queue: &BoundedQueue, application_id: &Arc<str>, max: usize) -> Option<Self> {
        Self::new(Arc::clone(application_id), queue.drain(max))
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<LogRecord> {
        self.records
    }

    pub fn payload(&self) -> IngestPayload<'_> {
        IngestPayload {
            application_id: &self.application_id,
            logs: &self.records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Level, LogEntry};

    #[test]
    fn empty_drain_builds_no_batch_and_leaves_queue_alone() {
        let app: Arc<str> = Arc::from("batch-test");
        let queue = BoundedQueue::new(10);
        assert!(Batch::drain_from(&queue, &app, 5).is_none());

        queue.push(LogEntry::new(Level::Info, "x").into_record(&app, None));
        assert!(Batch::drain_from(&queue, &app, 0).is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn payload_carries_application_id_and_logs() {
        let app: Arc<str> = Arc::from("batch-test");
        let records = vec![
            LogEntry::new(Level::Info, "one").into_record(&app, None),
            LogEntry::new(Level::Warn, "two").into_record(&app, None),
        ];
        let batch = Batch::new(Arc::clone(&app), records).unwrap();

        let json = serde_json::to_value(batch.payload()).unwrap();
        assert_eq!(json["application_id"], "batch-test");
        assert_eq!(json["logs"][1]["message"], "two");
        assert_eq!(json["logs"][1]["level"], "WARN");
    }
}
