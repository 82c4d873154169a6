// # Record Resolver Trait
//
// Defines the interface for answering a single DNS question.
//
// ## Implementations
//
// - UDP/TCP wire resolver: `dnsmon-resolver` crate
//
// ## Usage
//
// ```rust,ignore
// use dnsmon_core::{RecordKind, RecordResolver};
//
// let answers = resolver.query("_dmarc.example.com", &RecordKind::Txt).await?;
// for answer in answers {
//     println!("{} {} {}", answer.name, answer.ttl, answer.data.render());
// }
// ```

use async_trait::async_trait;

use crate::config::ResolverConfig;
use crate::record::{RecordData, RecordKind};

/// One answer record, decoupled from the wire library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecord {
    /// Owner name from the record header
    pub name: String,
    /// TTL from the record header
    pub ttl: u32,
    /// Record data
    pub data: RecordData,
}

impl ResolvedRecord {
    pub fn new(name: impl Into<String>, ttl: u32, data: RecordData) -> Self {
        Self {
            name: name.into(),
            ttl,
            data,
        }
    }
}

/// Trait for resolver implementations
///
/// A resolver sends exactly one recursive query per call and reports the
/// answer section. An empty answer (NOERROR with no records) is `Ok(vec![])`.
///
/// # Error classification
///
/// - transport failures map to [`crate::Error::Query`]
/// - non-success response codes map to [`crate::Error::ResponseCode`]
/// - names that cannot be encoded map to [`crate::Error::InvalidName`]
///
/// Resolvers do not retry. The fetcher wraps every call in its retry policy
/// and uses [`crate::Error::is_transient`] to decide whether to try again.
#[async_trait]
pub trait RecordResolver: Send + Sync {
    /// Query `name` for records of `kind`
    async fn query(
        &self,
        name: &str,
        kind: &RecordKind,
    ) -> Result<Vec<ResolvedRecord>, crate::Error>;

    /// Resolver name (for logging)
    fn resolver_name(&self) -> &'static str;
}

/// Helper trait for constructing resolvers from configuration
pub trait RecordResolverFactory: Send + Sync {
    fn create(&self, config: &ResolverConfig) -> Result<Box<dyn RecordResolver>, crate::Error>;
}
