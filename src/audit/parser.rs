use super::types::{ActionEvent, CloudTrailDocument, CloudTrailRecord};
use crate::error::ParseError;
use std::io::Read;

/// Iterator over `(raw caller ARN, action)` pairs of one CloudTrail document.
///
/// Single pass: records are decoded as they are pulled and dropped afterwards.
/// Records without a caller ARN, or without an event source/name, are skipped.
pub struct RecordEvents {
    records: std::vec::IntoIter<serde_json::Value>,
    skipped: usize,
}

impl RecordEvents {
    fn new(document: CloudTrailDocument) -> Self {
        Self {
            records: document.records.into_iter(),
            skipped: 0,
        }
    }

    /// Number of records skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for RecordEvents {
    type Item = (String, ActionEvent);

    fn next(&mut self) -> Option<Self::Item> {
        for value in self.records.by_ref() {
            let Ok(record) = serde_json::from_value::<CloudTrailRecord>(value) else {
                self.skipped += 1;
                continue;
            };

            match (record.arn(), record.action()) {
                (Some(arn), Some(action)) => return Some((arn.to_string(), action)),
                _ => self.skipped += 1,
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.records.len()))
    }
}

/// Parse one decompressed CloudTrail document.
///
/// A document without a `Records` key yields nothing. Invalid JSON, or a read
/// failure in the underlying (decompressing) reader, is a [`ParseError`].
pub fn extract_events<R: Read>(reader: R) -> Result<RecordEvents, ParseError> {
    let document: CloudTrailDocument = serde_json::from_reader(reader)?;
    Ok(RecordEvents::new(document))
}
