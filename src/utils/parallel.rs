//! Parallel log processing.
//!
//! Listed objects are fanned out over a dedicated Rayon pool of `N` workers.
//! Each worker takes one object at a time and runs it to completion:
//! fetch → decompress → extract → normalize → merge. The aggregation index is
//! the only state the workers share.
//!
//! Every per-object outcome is collected, success or failure. A failing object
//! never stops the others; whether the run as a whole fails is decided from
//! the failure count alone, once in-flight work has been collected.

use crate::analysis::{AggregationIndex, IndexSnapshot};
use crate::audit::identity::normalize_identity;
use crate::audit::parser::extract_events;
use crate::error::{ObjectError, ObjectFailure, PipelineError};
use crate::store::{is_log_object, ObjectRef, ObjectStore};
use crate::utils::format::{format_bytes, format_number};
use crate::utils::progress::ProgressBar;
use crate::utils::reader::open_document;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, info};

/// Default number of workers.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// What one successfully processed object contributed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectStats {
    /// Pairs extracted from the document
    pub events: usize,
    /// Pairs that were new to the index
    pub merged: usize,
    /// Records dropped for lacking an identity or action
    pub skipped_records: usize,
}

/// Result of one pipeline run.
#[derive(Debug)]
pub struct RunReport {
    pub snapshot: IndexSnapshot,
    /// Objects returned by the listing
    pub listed: usize,
    /// Objects that passed the log-file filter
    pub eligible: usize,
    /// Compressed size of the eligible objects, as listed
    pub eligible_bytes: u64,
    /// Objects filtered out before fetching (digests, non-log files)
    pub skipped: Vec<ObjectRef>,
    /// Objects fully processed and merged
    pub processed: usize,
    pub events: usize,
    pub skipped_records: usize,
    pub failures: Vec<ObjectFailure>,
    /// Eligible objects never attempted because the failure tolerance was hit
    pub not_attempted: usize,
}

impl RunReport {
    /// Keys of the objects that failed
    pub fn failed_keys(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.object.key.as_str()).collect()
    }

    /// Print a summary of the run to stderr
    pub fn print_summary(&self, show_failures: bool) {
        eprintln!("\nProcessing Summary:");
        eprintln!("  Objects listed: {}", format_number(self.listed));
        eprintln!(
            "  Log files: {} ({})",
            format_number(self.eligible),
            format_bytes(self.eligible_bytes)
        );
        eprintln!("  Skipped (not log files): {}", format_number(self.skipped.len()));
        eprintln!("  Processed: {}", format_number(self.processed));
        eprintln!("  Events attributed: {}", format_number(self.events));
        eprintln!("  Identities: {}", format_number(self.snapshot.len()));
        if self.skipped_records > 0 {
            eprintln!(
                "  Records without identity: {}",
                format_number(self.skipped_records)
            );
        }
        if !self.failures.is_empty() {
            eprintln!("  Failed: {}", format_number(self.failures.len()));
            if show_failures {
                for failure in &self.failures {
                    eprintln!("    {}: {}", failure.object.key, failure.error);
                }
            }
        }
        if self.not_attempted > 0 {
            eprintln!("  Not attempted: {}", format_number(self.not_attempted));
        }
    }
}

enum Outcome {
    Done(ObjectStats),
    Failed(ObjectFailure),
    NotAttempted,
}

/// Bounded-concurrency driver for one run.
pub struct Pipeline<S> {
    store: S,
    namespace: String,
    concurrency: usize,
    tolerance: Option<usize>,
    quiet: bool,
    completed: AtomicUsize,
}

impl<S: ObjectStore> Pipeline<S> {
    pub fn new(store: S, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            concurrency: DEFAULT_CONCURRENCY,
            tolerance: None,
            quiet: false,
            completed: AtomicUsize::new(0),
        }
    }

    /// Number of workers (at least one)
    #[must_use]
    pub fn concurrency(mut self, workers: usize) -> Self {
        self.concurrency = workers.max(1);
        self
    }

    /// Abort once more than `max_failures` objects have failed.
    ///
    /// `None` (the default) records every failure and never aborts.
    #[must_use]
    pub fn tolerance(mut self, max_failures: Option<usize>) -> Self {
        self.tolerance = max_failures;
        self
    }

    /// Hide progress output
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Objects finished so far in the current run, successful or not
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    /// Process every eligible object in `objects` exactly once.
    pub fn run(&self, objects: &[ObjectRef]) -> Result<RunReport, PipelineError> {
        self.completed.store(0, Ordering::Relaxed);

        // a listing can repeat a key across pages if the bucket changes mid-listing
        let mut seen = HashSet::with_capacity(objects.len());
        let (eligible, skipped): (Vec<&ObjectRef>, Vec<&ObjectRef>) = objects
            .iter()
            .filter(|o| seen.insert(o.key.as_str()))
            .partition(|o| is_log_object(&o.key));

        info!(
            listed = objects.len(),
            eligible = eligible.len(),
            workers = self.concurrency,
            "starting pipeline"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .thread_name(|i| format!("cloudtrail-worker-{}", i))
            .build()?;

        let index = AggregationIndex::new();
        let failed = AtomicUsize::new(0);
        let aborted = AtomicBool::new(false);
        let progress = if self.quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(eligible.len(), "Cloudtrail files")
        };

        let outcomes: Vec<Outcome> = pool.install(|| {
            eligible
                .par_iter()
                .with_max_len(1)
                .map(|object| {
                    if aborted.load(Ordering::Relaxed) {
                        return Outcome::NotAttempted;
                    }

                    let outcome = match self.process_object(object, &index) {
                        Ok(stats) => Outcome::Done(stats),
                        Err(error) => {
                            debug!(key = %object.key, error = %error, "failed to process object");
                            progress.println(format!("Failed: {}: {}", object.key, error));
                            let count = failed.fetch_add(1, Ordering::Relaxed) + 1;
                            if self.tolerance.is_some_and(|t| count > t) {
                                aborted.store(true, Ordering::Relaxed);
                            }
                            Outcome::Failed(ObjectFailure {
                                object: (*object).clone(),
                                error,
                            })
                        }
                    };

                    self.completed.fetch_add(1, Ordering::Relaxed);
                    progress.inc();
                    outcome
                })
                .collect()
        });

        let mut report = RunReport {
            snapshot: IndexSnapshot::default(),
            listed: objects.len(),
            eligible: eligible.len(),
            eligible_bytes: eligible.iter().map(|o| o.size).sum(),
            skipped: skipped.into_iter().cloned().collect(),
            processed: 0,
            events: 0,
            skipped_records: 0,
            failures: Vec::new(),
            not_attempted: 0,
        };

        for outcome in outcomes {
            match outcome {
                Outcome::Done(stats) => {
                    report.processed += 1;
                    report.events += stats.events;
                    report.skipped_records += stats.skipped_records;
                }
                Outcome::Failed(failure) => report.failures.push(failure),
                Outcome::NotAttempted => report.not_attempted += 1,
            }
        }
        report.snapshot = index.into_snapshot();

        progress.finish_with_message(&format!(
            "Processed {} files ({} failed)",
            format_number(report.processed),
            format_number(report.failures.len())
        ));

        if let Some(tolerance) = self.tolerance {
            if report.failures.len() > tolerance {
                return Err(PipelineError::ToleranceExceeded {
                    failed: report.failures.len(),
                    tolerance,
                    report: Box::new(report),
                });
            }
        }

        Ok(report)
    }

    /// Fetch, decode and merge one object.
    ///
    /// Pairs are buffered per document and merged under one lock, so an object
    /// that fails part-way through parsing contributes nothing.
    fn process_object(
        &self,
        object: &ObjectRef,
        index: &AggregationIndex,
    ) -> Result<ObjectStats, ObjectError> {
        let raw = self.store.fetch(&self.namespace, &object.key)?;
        let mut events = extract_events(open_document(&object.key, &raw))?;

        let pairs: Vec<(String, String)> = events
            .by_ref()
            .map(|(arn, action)| (normalize_identity(&arn), action.label()))
            .collect();
        drop(raw);

        let stats = ObjectStats {
            events: pairs.len(),
            merged: index.merge_batch(pairs),
            skipped_records: events.skipped(),
        };
        debug!(
            key = %object.key,
            events = stats.events,
            merged = stats.merged,
            "object processed"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, ListingError};
    use crate::store::ListPage;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapStore {
        objects: HashMap<String, Vec<u8>>,
        fetched: Mutex<Vec<String>>,
    }

    impl ObjectStore for MapStore {
        fn list_page(
            &self,
            _namespace: &str,
            _prefix: &str,
            _continuation: Option<&str>,
            _max_keys: usize,
        ) -> Result<ListPage, ListingError> {
            Ok(ListPage::default())
        }

        fn fetch(&self, _namespace: &str, key: &str) -> Result<Vec<u8>, FetchError> {
            self.fetched.lock().unwrap().push(key.to_string());
            self.objects
                .get(key)
                .cloned()
                .ok_or_else(|| FetchError::NotFound {
                    key: key.to_string(),
                })
        }
    }

    fn gz(doc: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(doc.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    fn record(arn: &str, source: &str, name: &str) -> String {
        format!(
            r#"{{"eventSource":"{}","eventName":"{}","userIdentity":{{"arn":"{}"}}}}"#,
            source, name, arn
        )
    }

    fn doc(records: &[String]) -> String {
        format!(r#"{{"Records":[{}]}}"#, records.join(","))
    }

    #[test]
    fn test_digest_and_non_log_keys_never_fetched() {
        let mut store = MapStore::default();
        store.objects.insert(
            "logs/archive.json.gz".to_string(),
            gz(&doc(&[record("arn:aws:iam::1:user/a", "s3.amazonaws.com", "GetObject")])),
        );
        let objects = vec![
            ObjectRef::new("logs/CloudTrail-Digest-2024.json.gz", 1),
            ObjectRef::new("logs/archive.json.gz", 1),
            ObjectRef::new("logs/data.txt", 1),
        ];

        let pipeline = Pipeline::new(store, "bucket").quiet(true);
        let report = pipeline.run(&objects).unwrap();

        assert_eq!(
            *pipeline.store.fetched.lock().unwrap(),
            vec!["logs/archive.json.gz".to_string()]
        );
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.processed, 1);
        assert_eq!(pipeline.completed(), 1);
    }

    #[test]
    fn test_assumed_role_sessions_merge_onto_role() {
        let mut store = MapStore::default();
        store.objects.insert(
            "a.json.gz".to_string(),
            gz(&doc(&[
                record("arn:aws:sts::1:assumed-role/Deploy/s1", "s3.amazonaws.com", "PutObject"),
                record("arn:aws:sts::1:assumed-role/Deploy/s2", "ec2.amazonaws.com", "RunInstances"),
            ])),
        );

        let report = Pipeline::new(store, "bucket")
            .quiet(true)
            .run(&[ObjectRef::new("a.json.gz", 1)])
            .unwrap();

        let actions = report.snapshot.get("arn:aws:iam::1:role/Deploy").unwrap();
        assert_eq!(actions.len(), 2);
        assert!(actions.contains("ec2 - RunInstances"));
        assert_eq!(report.snapshot.len(), 1);
    }

    #[test]
    fn test_corrupt_object_recorded_as_failure() {
        let mut store = MapStore::default();
        store
            .objects
            .insert("bad.json.gz".to_string(), b"not gzip".to_vec());
        store
            .objects
            .insert("notjson.json.gz".to_string(), gz("this is not json"));

        let report = Pipeline::new(store, "bucket")
            .quiet(true)
            .run(&[
                ObjectRef::new("bad.json.gz", 1),
                ObjectRef::new("notjson.json.gz", 1),
            ])
            .unwrap();

        assert_eq!(report.failures.len(), 2);
        assert!(report.snapshot.is_empty());
        assert!(report.failures.iter().all(|f| matches!(f.error, ObjectError::Parse(_))));
    }

    #[test]
    fn test_tolerance_exceeded_returns_partial_report() {
        let store = MapStore::default();
        let objects: Vec<_> = (0..5)
            .map(|i| ObjectRef::new(format!("missing-{}.json.gz", i), 1))
            .collect();

        let result = Pipeline::new(store, "bucket")
            .concurrency(1)
            .tolerance(Some(1))
            .quiet(true)
            .run(&objects);

        match result {
            Err(PipelineError::ToleranceExceeded {
                failed,
                tolerance,
                report,
            }) => {
                assert_eq!(tolerance, 1);
                assert!(failed >= 2);
                assert_eq!(report.failures.len() + report.not_attempted, 5);
            }
            other => panic!("expected ToleranceExceeded, got {:?}", other.map(|r| r.processed)),
        }
    }

    #[test]
    fn test_failures_within_tolerance_succeed() {
        let mut store = MapStore::default();
        store.objects.insert(
            "ok.json.gz".to_string(),
            gz(&doc(&[record("arn:aws:iam::1:user/a", "s3.amazonaws.com", "GetObject")])),
        );

        let report = Pipeline::new(store, "bucket")
            .tolerance(Some(1))
            .quiet(true)
            .run(&[ObjectRef::new("ok.json.gz", 1), ObjectRef::new("gone.json.gz", 1)])
            .unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(report.failed_keys(), vec!["gone.json.gz"]);
    }

    #[test]
    fn test_duplicate_refs_processed_once() {
        let mut store = MapStore::default();
        store.objects.insert(
            "a.json.gz".to_string(),
            gz(&doc(&[record("arn:aws:iam::1:user/a", "s3.amazonaws.com", "GetObject")])),
        );
        let object = ObjectRef::new("a.json.gz", 1);

        let pipeline = Pipeline::new(store, "bucket").quiet(true);
        let report = pipeline.run(&[object.clone(), object]).unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(pipeline.store.fetched.lock().unwrap().len(), 1);
    }
}
