//! Host resolution behind a trait seam.
//!
//! The worker pool resolves through [`HostResolver`] so tests can substitute
//! a scripted resolver; production uses hickory over a fixed public resolver
//! set.

use std::sync::Arc;

use async_trait::async_trait;
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::TokioAsyncResolver;

use crate::error_handling::InitializationError;
use crate::initialization::init_resolver;

/// A and CNAME records found for a host.
#[derive(Debug, Clone, Default)]
pub struct DnsRecords {
    /// A records
    pub a: Vec<String>,
    /// CNAME records
    pub cname: Vec<String>,
}

/// Multi-record DNS lookup.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Queries A and CNAME records for a host.
    ///
    /// An empty result is not an error: it means the name exists but carries
    /// none of the queried records.
    async fn resolve(&self, host: &str) -> Result<DnsRecords, anyhow::Error>;
}

/// [`HostResolver`] backed by a shared hickory resolver.
pub struct HickoryHostResolver {
    inner: Arc<TokioAsyncResolver>,
}

impl HickoryHostResolver {
    /// Creates the resolver over the fixed upstream set.
    pub fn new() -> Result<Self, InitializationError> {
        Ok(Self {
            inner: init_resolver()?,
        })
    }

    async fn query(&self, host: &str, record_type: RecordType) -> Result<Vec<String>, ResolveError> {
        match self.inner.lookup(host, record_type).await {
            Ok(lookup) => Ok(lookup
                .iter()
                .filter_map(|rdata| match record_type {
                    RecordType::A => rdata.as_a().map(|a| a.to_string()),
                    RecordType::CNAME => rdata
                        .as_cname()
                        .map(|c| c.to_string().trim_end_matches('.').to_string()),
                    _ => None,
                })
                .collect()),
            // The name exists (or not) without records of this type; both are
            // an empty answer, not a transport failure
            Err(e) if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) => Ok(vec![]),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl HostResolver for HickoryHostResolver {
    async fn resolve(&self, host: &str) -> Result<DnsRecords, anyhow::Error> {
        let (a, cname) = tokio::join!(
            self.query(host, RecordType::A),
            self.query(host, RecordType::CNAME),
        );
        Ok(DnsRecords {
            a: a?,
            cname: cname?,
        })
    }
}
