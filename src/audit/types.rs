//! Data structures representing CloudTrail log documents.
//!
//! CloudTrail delivers one gzip-compressed JSON document per object, with the
//! individual events under a top-level `Records` array. Only the fields needed
//! to attribute an action to an identity are modelled; everything else in a
//! record is ignored during deserialization.

use serde::{Deserialize, Serialize};

/// Top-level CloudTrail log document.
///
/// Records are kept as raw JSON values so that one oddly shaped record does not
/// fail the whole document; each is decoded into [`CloudTrailRecord`] lazily.
#[derive(Debug, Deserialize)]
pub struct CloudTrailDocument {
    #[serde(rename = "Records", default)]
    pub records: Vec<serde_json::Value>,
}

/// A single CloudTrail event record.
///
/// Only the three fields an action is attributed by are modelled. Anything
/// else in the record (`eventTime`, `awsRegion`, `userIdentity.accountId`, ...)
/// is ignored, so its shape can never cause the record to be skipped.
///
/// # Fields
///
/// - `event_source`: Service endpoint, e.g. `s3.amazonaws.com`
/// - `event_name`: API call, e.g. `GetObject`
/// - `user_identity`: Who made the call (absent for some AWS-internal events)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudTrailRecord {
    pub event_source: Option<String>,
    pub event_name: Option<String>,
    pub user_identity: Option<UserIdentity>,
}

/// The `userIdentity` block of a record.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserIdentity {
    pub arn: Option<String>,
}

/// A service/API pair derived from one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionEvent {
    /// Service name, the part of `eventSource` before the first `.`
    pub source_service: String,
    pub event_name: String,
}

impl ActionEvent {
    /// Render as an action label: `"<service> - <eventName>"`.
    pub fn label(&self) -> String {
        format!("{} - {}", self.source_service, self.event_name)
    }
}

impl CloudTrailRecord {
    /// Get the caller ARN, if present and non-empty
    pub fn arn(&self) -> Option<&str> {
        self.user_identity
            .as_ref()?
            .arn
            .as_deref()
            .filter(|arn| !arn.is_empty())
    }

    /// Get the service name (`s3` for `s3.amazonaws.com`)
    pub fn service(&self) -> Option<&str> {
        let source = self.event_source.as_deref()?;
        source.split('.').next().filter(|s| !s.is_empty())
    }

    /// Build the action event for this record.
    ///
    /// Returns `None` when either the service or the event name is missing, so a
    /// label is never built from empty parts.
    pub fn action(&self) -> Option<ActionEvent> {
        let service = self.service()?;
        let event_name = self.event_name.as_deref().filter(|n| !n.is_empty())?;
        Some(ActionEvent {
            source_service: service.to_string(),
            event_name: event_name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assumed_role_record() {
        let json = r#"{
            "eventVersion": "1.08",
            "userIdentity": {
                "type": "AssumedRole",
                "principalId": "AROAEXAMPLE:sess-1",
                "arn": "arn:aws:sts::111122223333:assumed-role/Deploy/sess-1",
                "accountId": "111122223333"
            },
            "eventTime": "2024-03-01T12:00:00Z",
            "eventSource": "ec2.amazonaws.com",
            "eventName": "DescribeInstances",
            "awsRegion": "us-east-1"
        }"#;

        let record: CloudTrailRecord = serde_json::from_str(json).unwrap();
        assert_eq!(
            record.arn(),
            Some("arn:aws:sts::111122223333:assumed-role/Deploy/sess-1")
        );
        assert_eq!(record.service(), Some("ec2"));
    }

    #[test]
    fn test_unmodelled_fields_of_any_type_are_ignored() {
        let json = r#"{
            "userIdentity": {
                "type": 3,
                "arn": "arn:aws:iam::111122223333:user/alice",
                "accountId": 111122223333
            },
            "eventTime": null,
            "eventSource": "s3.amazonaws.com",
            "eventName": "ListBuckets",
            "awsRegion": 7
        }"#;

        let record: CloudTrailRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.arn(), Some("arn:aws:iam::111122223333:user/alice"));
        assert_eq!(record.action().unwrap().label(), "s3 - ListBuckets");
    }

    #[test]
    fn test_action_label() {
        let json = r#"{"eventSource":"s3.amazonaws.com","eventName":"GetObject"}"#;
        let record: CloudTrailRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.action().unwrap().label(), "s3 - GetObject");
    }

    #[test]
    fn test_empty_arn_is_absent() {
        let json = r#"{"eventSource":"s3.amazonaws.com","eventName":"GetObject","userIdentity":{"arn":""}}"#;
        let record: CloudTrailRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.arn(), None);
    }

    #[test]
    fn test_missing_event_name_has_no_action() {
        let json = r#"{"eventSource":"s3.amazonaws.com"}"#;
        let record: CloudTrailRecord = serde_json::from_str(json).unwrap();
        assert!(record.action().is_none());
    }

    #[test]
    fn test_document_without_records() {
        let doc: CloudTrailDocument = serde_json::from_str(r#"{"other": 1}"#).unwrap();
        assert!(doc.records.is_empty());
    }
}
