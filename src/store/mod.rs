//! Object store access.
//!
//! The pipeline only needs two things from a store: enumerate the keys under a
//! prefix, and fetch one object's bytes. [`ObjectStore`] captures that, with
//! two backends:
//!
//! - [`s3::S3Store`] - Amazon S3 (or any S3-compatible endpoint)
//! - [`local::LocalStore`] - a directory tree on disk, handy for logs that were
//!   already synced down with `aws s3 sync`
//!
//! Both are blocking: the coordinator calls them from its worker threads.

pub mod local;
pub mod s3;

use crate::error::{FetchError, ListingError};
use crate::utils::progress::ProgressBar;
use tracing::debug;

/// S3 caps `ListObjectsV2` pages at 1000 keys.
pub const MAX_KEYS_PER_PAGE: usize = 1000;

/// Suffix of CloudTrail log objects.
pub const LOG_SUFFIX: &str = ".json.gz";

/// A listed object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub key: String,
    pub size: u64,
}

impl ObjectRef {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectRef>,
    /// Token for the next page, `None` on the last page
    pub continuation: Option<String>,
}

/// Blocking access to a bucket-like namespace of objects.
pub trait ObjectStore: Send + Sync {
    /// Fetch one page of at most `max_keys` objects under `prefix`.
    fn list_page(
        &self,
        namespace: &str,
        prefix: &str,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage, ListingError>;

    /// Fetch the raw (still compressed) bytes of one object.
    fn fetch(&self, namespace: &str, key: &str) -> Result<Vec<u8>, FetchError>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn list_page(
        &self,
        namespace: &str,
        prefix: &str,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage, ListingError> {
        (**self).list_page(namespace, prefix, continuation, max_keys)
    }

    fn fetch(&self, namespace: &str, key: &str) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(namespace, key)
    }
}

impl<T: ObjectStore + ?Sized> ObjectStore for Box<T> {
    fn list_page(
        &self,
        namespace: &str,
        prefix: &str,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage, ListingError> {
        (**self).list_page(namespace, prefix, continuation, max_keys)
    }

    fn fetch(&self, namespace: &str, key: &str) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(namespace, key)
    }
}

/// List every object under `prefix`, following pagination to the end.
///
/// Listing is all-or-nothing: if any page fails, the pages already fetched
/// are dropped and the error is returned.
pub fn list_objects<S: ObjectStore + ?Sized>(
    store: &S,
    namespace: &str,
    prefix: &str,
    quiet: bool,
) -> Result<Vec<ObjectRef>, ListingError> {
    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner("Listing logs")
    };

    let mut objects = Vec::new();
    let mut continuation: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = store.list_page(
            namespace,
            prefix,
            continuation.as_deref(),
            MAX_KEYS_PER_PAGE,
        )?;
        pages += 1;
        objects.extend(page.objects);
        progress.update(objects.len());

        match page.continuation {
            Some(token) => continuation = Some(token),
            None => break,
        }
    }

    progress.finish_with_message(&format!(
        "Found {} logs",
        crate::utils::format::format_number(objects.len())
    ));
    debug!(namespace, prefix, pages, objects = objects.len(), "listing complete");

    Ok(objects)
}

/// Whether a key names a CloudTrail log file worth fetching.
///
/// CloudTrail also writes digest files next to the logs; those carry hashes,
/// not events, and are skipped along with anything that is not `.json.gz`.
pub fn is_log_object(key: &str) -> bool {
    key.ends_with(LOG_SUFFIX) && !key.to_lowercase().contains("digest")
}
