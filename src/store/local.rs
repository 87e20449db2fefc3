//! Directory-backed object store.
//!
//! The namespace is a root directory and keys are `/`-separated paths relative
//! to it, mirroring the layout `aws s3 sync` produces. Listing is recursive,
//! sorted by key, and paginated by using the last key of a page as the
//! continuation token. The tree is walked once per listing, on the first
//! page; later pages are served from that walk.

use super::{ListPage, ObjectRef, ObjectStore};
use crate::error::{FetchError, ListingError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Result of one directory walk, reused across the pages of a listing.
#[derive(Debug)]
struct Listing {
    namespace: String,
    prefix: String,
    objects: Arc<Vec<ObjectRef>>,
}

#[derive(Debug, Default)]
pub struct LocalStore {
    listing: Mutex<Option<Listing>>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorted objects under `prefix`. A listing starts (`continuation` is
    /// `None`) with a fresh walk; continuation pages reuse it.
    fn objects(
        &self,
        namespace: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<Arc<Vec<ObjectRef>>, ListingError> {
        let mut cached = self
            .listing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if continuation.is_some() {
            if let Some(listing) = cached
                .as_ref()
                .filter(|l| l.namespace == namespace && l.prefix == prefix)
            {
                return Ok(Arc::clone(&listing.objects));
            }
        }

        let root = Path::new(namespace);
        if !root.is_dir() {
            return Err(ListingError::new(
                namespace,
                prefix,
                io::Error::new(io::ErrorKind::NotFound, "namespace is not a directory"),
            ));
        }

        let mut all = Vec::new();
        walk(root, root, &mut all).map_err(|e| ListingError::new(namespace, prefix, e))?;
        all.retain(|o| o.key.starts_with(prefix));
        all.sort_by(|a, b| a.key.cmp(&b.key));

        let objects = Arc::new(all);
        *cached = Some(Listing {
            namespace: namespace.to_string(),
            prefix: prefix.to_string(),
            objects: Arc::clone(&objects),
        });
        Ok(objects)
    }
}

fn key_to_path(root: &Path, key: &str) -> PathBuf {
    key.split('/')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |path, part| path.join(part))
}

/// Collect `(key, size)` for every regular file below `dir`.
fn walk(root: &Path, dir: &Path, out: &mut Vec<ObjectRef>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();

        if file_type.is_dir() {
            walk(root, &path, out)?;
        } else if file_type.is_file() {
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push(ObjectRef::new(key, entry.metadata()?.len()));
        }
    }
    Ok(())
}

impl ObjectStore for LocalStore {
    fn list_page(
        &self,
        namespace: &str,
        prefix: &str,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage, ListingError> {
        let all = self.objects(namespace, prefix, continuation)?;

        let start = continuation.map_or(0, |after| {
            all.partition_point(|o| o.key.as_str() <= after)
        });
        let end = all.len().min(start.saturating_add(max_keys));
        let objects = all[start..end].to_vec();

        let continuation = if end < all.len() {
            objects.last().map(|o| o.key.clone())
        } else {
            None
        };

        Ok(ListPage {
            objects,
            continuation,
        })
    }

    fn fetch(&self, namespace: &str, key: &str) -> Result<Vec<u8>, FetchError> {
        let path = key_to_path(Path::new(namespace), key);
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => FetchError::NotFound {
                key: key.to_string(),
            },
            io::ErrorKind::PermissionDenied => FetchError::AccessDenied {
                key: key.to_string(),
            },
            _ => FetchError::Transport {
                key: key.to_string(),
                message: e.to_string(),
            },
        })
    }
}
