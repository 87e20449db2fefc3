//! Identity normalization.
//!
//! CloudTrail reports callers that assumed a role as STS session ARNs:
//!
//! ```text
//! arn:aws:sts::111122223333:assumed-role/Deploy/sess-1
//! ```
//!
//! Every session of the same role gets a different ARN, so actions would be
//! scattered across one identity per session. Normalization folds them back
//! onto the long-term role ARN (`arn:aws:iam::111122223333:role/Deploy`).

/// Canonicalize a caller ARN.
///
/// STS assumed-role ARNs in any partition are rewritten to the IAM role ARN
/// they were issued for, dropping the session name. Anything else is returned
/// unchanged.
///
/// # Examples
///
/// ```
/// use cloudtrail_actions::audit::identity::normalize_identity;
///
/// assert_eq!(
///     normalize_identity("arn:aws:sts::111122223333:assumed-role/Deploy/sess-1"),
///     "arn:aws:iam::111122223333:role/Deploy"
/// );
/// assert_eq!(
///     normalize_identity("arn:aws:iam::111122223333:user/alice"),
///     "arn:aws:iam::111122223333:user/alice"
/// );
/// ```
pub fn normalize_identity(arn: &str) -> String {
    let Some(partition) = sts_partition(arn) else {
        return arn.to_string();
    };

    let sts_prefix = format!("arn:{}:sts::", partition);
    let iam_prefix = format!("arn:{}:iam::", partition);
    let rewritten = arn
        .replacen(&sts_prefix, &iam_prefix, 1)
        .replace("assumed-role", "role");

    rewritten.split('/').take(2).collect::<Vec<_>>().join("/")
}

/// Return the partition (`aws`, `aws-cn`, `aws-us-gov`) of an STS ARN.
fn sts_partition(arn: &str) -> Option<&str> {
    let rest = arn.strip_prefix("arn:")?;
    let (partition, rest) = rest.split_once(':')?;
    if partition.is_empty() || !rest.starts_with("sts::") {
        return None;
    }
    Some(partition)
}
