//! Amazon S3 backend.
//!
//! Wraps the async AWS SDK behind the blocking [`ObjectStore`] interface. The
//! store owns a multi-threaded tokio runtime, and each call from a pipeline
//! worker drives its request with `Runtime::block_on`, so several workers can
//! have requests in flight at once.

use super::{ListPage, ObjectRef, ObjectStore};
use crate::error::{FetchError, ListingError};
use anyhow::{Context, Result};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::Client;
use std::future::Future;
use tokio::runtime::Runtime;
use tracing::debug;

/// Connection settings for [`S3Store`].
#[derive(Debug, Clone, Default)]
pub struct S3Options {
    /// Named profile from `~/.aws/config` / `~/.aws/credentials`
    pub profile: Option<String>,
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores; enables path-style addressing
    pub endpoint_url: Option<String>,
}

pub struct S3Store {
    client: Client,
    runtime: Runtime,
}

impl S3Store {
    /// Build a client from the default AWS credential chain and `options`.
    pub fn connect(options: &S3Options) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime for S3 client")?;

        let client = runtime.block_on(async {
            let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
            if let Some(profile) = &options.profile {
                loader = loader.profile_name(profile);
            }
            if let Some(region) = &options.region {
                loader = loader.region(aws_sdk_s3::config::Region::new(region.clone()));
            }
            let shared = loader.load().await;

            let mut builder = aws_sdk_s3::config::Builder::from(&shared);
            if let Some(url) = &options.endpoint_url {
                builder = builder.endpoint_url(url).force_path_style(true);
            }
            Client::from_conf(builder.build())
        });

        debug!(
            profile = options.profile.as_deref().unwrap_or("default"),
            "S3 client ready"
        );
        Ok(Self { client, runtime })
    }

    fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }
}

impl ObjectStore for S3Store {
    fn list_page(
        &self,
        namespace: &str,
        prefix: &str,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage, ListingError> {
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(namespace)
            .max_keys(i32::try_from(max_keys).unwrap_or(i32::MAX));
        if !prefix.is_empty() {
            request = request.prefix(prefix);
        }
        if let Some(token) = continuation {
            request = request.continuation_token(token);
        }

        let response = self.block_on(request.send()).map_err(|e| {
            ListingError::new(namespace, prefix, DisplayErrorContext(&e).to_string())
        })?;

        let objects = response
            .contents()
            .iter()
            .filter_map(|object| {
                let key = object.key()?;
                let size = object.size().unwrap_or(0).max(0) as u64;
                Some(ObjectRef::new(key, size))
            })
            .collect();

        let continuation = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ListPage {
            objects,
            continuation,
        })
    }

    fn fetch(&self, namespace: &str, key: &str) -> Result<Vec<u8>, FetchError> {
        let request = self.client.get_object().bucket(namespace).key(key);

        let bytes = self.block_on(async {
            let output = request.send().await.map_err(|e| {
                let service = e.as_service_error();
                if service.is_some_and(|s| s.is_no_such_key()) {
                    return FetchError::NotFound {
                        key: key.to_string(),
                    };
                }
                match service.and_then(|s| s.code()) {
                    Some("AccessDenied") => FetchError::AccessDenied {
                        key: key.to_string(),
                    },
                    Some("NoSuchKey") | Some("NotFound") => FetchError::NotFound {
                        key: key.to_string(),
                    },
                    _ => FetchError::Transport {
                        key: key.to_string(),
                        message: DisplayErrorContext(&e).to_string(),
                    },
                }
            })?;

            let body = output
                .body
                .collect()
                .await
                .map_err(|e| FetchError::Transport {
                    key: key.to_string(),
                    message: e.to_string(),
                })?;
            Ok::<_, FetchError>(body.into_bytes().to_vec())
        })?;

        Ok(bytes)
    }
}
