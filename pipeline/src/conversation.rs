//! Conversation reconstruction.
//!
//! A flat record sequence is grouped into conversations using the
//! segment-start event name as a boundary: every record up to (exclusive)
//! the next marker belongs to the same conversation. Records before the
//! first marker have no conversation to attach to and are discarded.

use crate::record::LogRecord;

pub fn reconstruct(records: Vec<LogRecord>) -> Vec<Vec<LogRecord>> {
    let mut conversations = Vec::new();
    let mut current: Option<Vec<LogRecord>> = None;

    for record in records {
        if record.is_generation() {
            if let Some(open) = current.take() {
                conversations.push(open);
            }
            current = Some(vec![record]);
        } else if let Some(open) = current.as_mut() {
            open.push(record);
        }
    }

    if let Some(open) = current {
        conversations.push(open);
    }

    conversations
}
