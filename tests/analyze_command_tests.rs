/// Integration tests for the analyze command over a local directory of logs
use cloudtrail_actions::commands::analyze::{analyze, render};
use cloudtrail_actions::config::{AnalyzeConfig, OutputFormat, StoreKind};
use cloudtrail_actions::store::local::LocalStore;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn write_gz(root: &Path, key: &str, doc: &str) {
    let path = root.join(key);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let file = fs::File::create(&path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(doc.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

/// A small trail: two days of logs, a digest, and one corrupt file
fn create_sample_trail() -> TempDir {
    let dir = TempDir::new().unwrap();
    let base = "AWSLogs/111122223333/CloudTrail/us-east-1/2024/03";

    write_gz(
        dir.path(),
        &format!("{}/01/111122223333_CloudTrail_us-east-1_20240301T0000Z_a.json.gz", base),
        r#"{"Records":[
            {"eventSource":"s3.amazonaws.com","eventName":"GetObject","userIdentity":{"type":"IAMUser","arn":"arn:aws:iam::111122223333:user/alice"}},
            {"eventSource":"ec2.amazonaws.com","eventName":"DescribeInstances","userIdentity":{"type":"AssumedRole","arn":"arn:aws:sts::111122223333:assumed-role/Deploy/build-41"}}
        ]}"#,
    );
    write_gz(
        dir.path(),
        &format!("{}/02/111122223333_CloudTrail_us-east-1_20240302T0000Z_b.json.gz", base),
        r#"{"Records":[
            {"eventSource":"s3.amazonaws.com","eventName":"PutObject","userIdentity":{"type":"AssumedRole","arn":"arn:aws:sts::111122223333:assumed-role/Deploy/build-42"}},
            {"eventSource":"kms.amazonaws.com","eventName":"Decrypt","userIdentity":{"type":"AWSService"}}
        ]}"#,
    );
    write_gz(
        dir.path(),
        "AWSLogs/111122223333/CloudTrail-Digest/us-east-1/2024/03/01/digest.json.gz",
        "this would fail to parse if it were ever fetched",
    );
    let corrupt = dir.path().join(format!("{}/02/broken.json.gz", base));
    fs::write(corrupt, b"not gzip").unwrap();

    dir
}

fn config_for(dir: &TempDir) -> AnalyzeConfig {
    let mut config = AnalyzeConfig::new(
        StoreKind::Local,
        dir.path().to_str().unwrap(),
        "AWSLogs/111122223333/",
    );
    config.quiet = true;
    config.threads = 4;
    config
}

#[test]
fn test_analyze_local_trail() {
    let dir = create_sample_trail();
    let config = config_for(&dir);

    let (rows, report) = analyze(LocalStore::new(), &config).unwrap();

    assert_eq!(report.listed, 4);
    assert_eq!(report.eligible, 3);
    assert_eq!(report.processed, 2);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failed_keys()[0].ends_with("broken.json.gz"));

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].identity, "arn:aws:iam::111122223333:role/Deploy");
    assert_eq!(
        rows[0].actions,
        vec!["ec2 - DescribeInstances", "s3 - PutObject"]
    );
    assert_eq!(rows[1].identity, "arn:aws:iam::111122223333:user/alice");
}

#[test]
fn test_analyze_with_filter() {
    let dir = create_sample_trail();
    let mut config = config_for(&dir);
    config.filter_name = Some("alice".to_string());

    let (rows, _) = analyze(LocalStore::new(), &config).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].actions, vec!["s3 - GetObject"]);
}

#[test]
fn test_analyze_tolerance_exceeded() {
    let dir = create_sample_trail();
    let mut config = config_for(&dir);
    config.max_failures = Some(0);

    let result = analyze(LocalStore::new(), &config);

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Aborted"));
}

#[test]
fn test_analyze_missing_namespace_fails() {
    let mut config = AnalyzeConfig::new(StoreKind::Local, "/nonexistent/trail/dir", "");
    config.quiet = true;

    let result = analyze(LocalStore::new(), &config);

    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Failed to list CloudTrail logs"));
}

#[test]
fn test_analyze_empty_prefix_match() {
    let dir = create_sample_trail();
    let mut config = config_for(&dir);
    config.prefix = "nothing-here/".to_string();

    let (rows, report) = analyze(LocalStore::new(), &config).unwrap();

    assert!(rows.is_empty());
    assert_eq!(report.listed, 0);
}

#[test]
fn test_render_report_to_csv() {
    let dir = create_sample_trail();
    let (rows, _) = analyze(LocalStore::new(), &config_for(&dir)).unwrap();

    let mut out = Vec::new();
    render(&rows, OutputFormat::Csv, &mut out).unwrap();
    let csv = String::from_utf8(out).unwrap();

    assert!(csv.starts_with("identity,action\n"));
    assert!(csv.contains("arn:aws:iam::111122223333:user/alice,s3 - GetObject"));
    assert_eq!(csv.lines().count(), 4);
}
