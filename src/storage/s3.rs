//! S3-compatible object store (MinIO, AWS S3) via the `object_store` crate.
//!
//! One client is built per bucket up front; a request for any other bucket
//! is a storage error.

use super::{ObjectStore, S3Settings};
use crate::error::{PipelineError, Result};
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore as _, PutOptions, PutPayload};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_REGION: &str = "us-east-1";

pub struct S3Store {
    buckets: HashMap<String, Arc<dyn object_store::ObjectStore>>,
}

impl fmt::Debug for S3Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Store")
            .field("buckets", &self.buckets.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl S3Store {
    /// Build clients for `buckets` against the configured endpoint.
    ///
    /// Endpoints given as `host:port` are treated as plain HTTP, which is how
    /// MinIO is usually addressed inside a compose network.
    pub fn connect(settings: &S3Settings, buckets: &[&str]) -> Result<Self> {
        let missing = |what: &str| PipelineError::Configuration(format!("s3 store needs {what}"));
        let endpoint = settings.endpoint.as_deref().ok_or_else(|| missing("an endpoint"))?;
        let access_key = settings.access_key.as_deref().ok_or_else(|| missing("an access key"))?;
        let secret_key = settings.secret_key.as_deref().ok_or_else(|| missing("a secret key"))?;
        let endpoint = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("http://{endpoint}")
        };
        let region = settings.region.as_deref().unwrap_or(DEFAULT_REGION);

        let mut clients: HashMap<String, Arc<dyn object_store::ObjectStore>> = HashMap::new();
        for bucket in buckets {
            let client = AmazonS3Builder::new()
                .with_endpoint(endpoint.as_str())
                .with_bucket_name(*bucket)
                .with_access_key_id(access_key)
                .with_secret_access_key(secret_key)
                .with_region(region)
                .with_allow_http(true)
                .build()
                .map_err(|e| {
                    PipelineError::Configuration(format!("cannot configure bucket {bucket}: {e}"))
                })?;
            clients.insert(bucket.to_string(), Arc::new(client));
        }

        info!(%endpoint, buckets = clients.len(), "Connected S3 store");
        Ok(Self { buckets: clients })
    }

    fn client(&self, bucket: &str, key: &str) -> Result<&Arc<dyn object_store::ObjectStore>> {
        self.buckets
            .get(bucket)
            .ok_or_else(|| PipelineError::storage(bucket, key, "bucket not configured"))
    }
}

impl ObjectStore for S3Store {
    async fn put(&self, bucket: &str, key: &str, bytes: Bytes, content_type: &str) -> Result<()> {
        let client = self.client(bucket, key)?;
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let opts = PutOptions {
            attributes,
            ..PutOptions::default()
        };

        let len = bytes.len();
        client
            .put_opts(&ObjectPath::from(key), PutPayload::from(bytes), opts)
            .await
            .map_err(|e| PipelineError::storage(bucket, key, e))?;
        debug!(%bucket, %key, len, "Put object");
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let client = self.client(bucket, key)?;
        match client.get(&ObjectPath::from(key)).await {
            Ok(result) => result
                .bytes()
                .await
                .map_err(|e| PipelineError::storage(bucket, key, e)),
            Err(object_store::Error::NotFound { .. }) => Err(PipelineError::not_found(bucket, key)),
            Err(e) => Err(PipelineError::storage(bucket, key, e)),
        }
    }
}
