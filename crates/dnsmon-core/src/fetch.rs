//! Record fetcher
//!
//! Resolves every `(name, kind)` pair through a [`RecordResolver`], one query
//! at a time, each wrapped in the query retry policy. A pair whose retries are
//! exhausted is logged and skipped; the fetch itself only fails when shutdown
//! interrupts a backoff wait.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::record::{DnsRecord, RecordKind, Snapshot};
use crate::retry::{RetryError, RetryPolicy};
use crate::traits::RecordResolver;

/// Record kinds queried for every name
pub const QUERIED_KINDS: [RecordKind; 4] = [
    RecordKind::Mx,
    RecordKind::Txt,
    RecordKind::Cname,
    RecordKind::A,
];

/// Builds a [`Snapshot`] from a list of names
pub struct RecordFetcher {
    resolver: Arc<dyn RecordResolver>,
    retry: RetryPolicy,
    kinds: Vec<RecordKind>,
}

impl RecordFetcher {
    /// Create a fetcher querying [`QUERIED_KINDS`]
    pub fn new(resolver: Arc<dyn RecordResolver>, retry: RetryPolicy) -> Self {
        Self {
            resolver,
            retry,
            kinds: QUERIED_KINDS.to_vec(),
        }
    }

    /// Replace the queried kinds
    pub fn with_kinds(mut self, kinds: Vec<RecordKind>) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn kinds(&self) -> &[RecordKind] {
        &self.kinds
    }

    /// Resolve every name for every kind
    ///
    /// Answer records are labelled with the queried kind; their value is
    /// rendered from the record data actually returned.
    ///
    /// # Returns
    ///
    /// - `Ok(Snapshot)`: everything that resolved, possibly empty
    /// - `Err(Error::Cancelled)`: `cancel` fired during a backoff wait
    pub async fn fetch(&self, names: &[String], cancel: &CancellationToken) -> Result<Snapshot> {
        let mut snapshot = Snapshot::new();
        let mut failed = 0usize;

        for name in names {
            for kind in &self.kinds {
                let outcome = self
                    .retry
                    .run_if(
                        cancel,
                        || self.resolver.query(name, kind),
                        Error::is_transient,
                    )
                    .await;

                match outcome {
                    Ok(answers) => {
                        debug!(domain = %name, kind = %kind, answers = answers.len(), "Query answered");
                        snapshot.extend(answers.into_iter().map(|answer| {
                            DnsRecord::from_data(kind.clone(), answer.name, answer.ttl, &answer.data)
                        }));
                    }
                    Err(RetryError::Cancelled) => {
                        info!(domain = %name, kind = %kind, "Fetch cancelled");
                        return Err(Error::Cancelled);
                    }
                    Err(e) => {
                        failed += 1;
                        warn!(domain = %name, kind = %kind, error = %e, "Query failed, skipping");
                    }
                }
            }
        }

        debug!(
            names = names.len(),
            records = snapshot.len(),
            failed,
            resolver = self.resolver.resolver_name(),
            "Fetch complete"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordData;
    use crate::traits::ResolvedRecord;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers from a fixed table; unknown pairs answer empty
    #[derive(Default)]
    struct TableResolver {
        answers: HashMap<(String, RecordKind), Vec<ResolvedRecord>>,
        failing: Vec<(String, RecordKind)>,
        calls: Mutex<Vec<(String, RecordKind)>>,
    }

    #[async_trait]
    impl RecordResolver for TableResolver {
        async fn query(&self, name: &str, kind: &RecordKind) -> Result<Vec<ResolvedRecord>> {
            let key = (name.to_string(), kind.clone());
            self.calls.lock().unwrap().push(key.clone());
            if name.contains(' ') {
                return Err(Error::invalid_name(name, "space in label"));
            }
            if self.failing.contains(&key) {
                return Err(Error::query(name, kind.clone(), "timed out"));
            }
            Ok(self.answers.get(&key).cloned().unwrap_or_default())
        }

        fn resolver_name(&self) -> &'static str {
            "table"
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn queries_every_name_for_every_kind_in_order() {
        let resolver = Arc::new(TableResolver::default());
        let fetcher = RecordFetcher::new(resolver.clone(), policy());
        let names = vec!["example.com".to_string(), "www.example.com".to_string()];

        let snapshot = fetcher.fetch(&names, &CancellationToken::new()).await.unwrap();
        assert!(snapshot.is_empty());

        let calls = resolver.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 8);
        assert_eq!(calls[0], ("example.com".to_string(), RecordKind::Mx));
        assert_eq!(calls[3], ("example.com".to_string(), RecordKind::A));
        assert_eq!(calls[4], ("www.example.com".to_string(), RecordKind::Mx));
    }

    #[tokio::test]
    async fn renders_values_and_labels_with_queried_kind() {
        let mut resolver = TableResolver::default();
        resolver.answers.insert(
            ("example.com".to_string(), RecordKind::Mx),
            vec![ResolvedRecord::new(
                "example.com.",
                300,
                RecordData::Mx {
                    preference: 10,
                    exchange: "mail.example.com.".to_string(),
                },
            )],
        );
        resolver.answers.insert(
            ("www.example.com".to_string(), RecordKind::A),
            vec![
                ResolvedRecord::new(
                    "www.example.com.",
                    60,
                    RecordData::Cname("example.com.".to_string()),
                ),
                ResolvedRecord::new("example.com.", 60, RecordData::A([192, 0, 2, 1].into())),
            ],
        );

        let fetcher = RecordFetcher::new(Arc::new(resolver), policy());
        let names = vec!["example.com".to_string(), "www.example.com".to_string()];
        let snapshot = fetcher.fetch(&names, &CancellationToken::new()).await.unwrap();

        let rendered: Vec<(String, String, String, u32)> = snapshot
            .iter()
            .map(|r| {
                (
                    r.kind().to_string(),
                    r.name().to_string(),
                    r.value().to_string(),
                    r.ttl(),
                )
            })
            .collect();

        assert_eq!(
            rendered,
            vec![
                ("MX".into(), "example.com.".into(), "10 mail.example.com.".into(), 300),
                ("A".into(), "www.example.com.".into(), "example.com.".into(), 60),
                ("A".into(), "example.com.".into(), "192.0.2.1".into(), 60),
            ]
        );
    }

    #[tokio::test]
    async fn failed_pairs_are_skipped_after_retries() {
        let mut resolver = TableResolver::default();
        resolver
            .failing
            .push(("example.com".to_string(), RecordKind::Txt));
        resolver.answers.insert(
            ("example.com".to_string(), RecordKind::A),
            vec![ResolvedRecord::new("example.com.", 60, RecordData::A([192, 0, 2, 1].into()))],
        );
        let resolver = Arc::new(resolver);

        let fetcher = RecordFetcher::new(resolver.clone(), policy());
        let snapshot = fetcher
            .fetch(&["example.com".to_string()], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(snapshot.len(), 1);
        let txt_calls = resolver
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, k)| *k == RecordKind::Txt)
            .count();
        assert_eq!(txt_calls, 3);
    }

    #[tokio::test]
    async fn invalid_names_are_not_retried() {
        let resolver = Arc::new(TableResolver::default());
        let fetcher = RecordFetcher::new(resolver.clone(), policy()).with_kinds(vec![RecordKind::Mx]);

        let snapshot = fetcher
            .fetch(&["bad name.example".to_string()], &CancellationToken::new())
            .await
            .unwrap();

        assert!(snapshot.is_empty());
        assert_eq!(resolver.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancellation_during_backoff_fails_the_fetch() {
        let mut resolver = TableResolver::default();
        resolver
            .failing
            .push(("example.com".to_string(), RecordKind::Mx));
        let fetcher = RecordFetcher::new(
            Arc::new(resolver),
            RetryPolicy::new(3, Duration::from_secs(60)),
        );

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fetcher
            .fetch(&["example.com".to_string()], &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
