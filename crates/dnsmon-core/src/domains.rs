//! Query surface for a monitored domain
//!
//! Every monitored domain is checked at its apex, its DMARC policy name, the
//! `_domainkey` node, `www`, one name per DKIM selector, one per custom
//! subdomain label, and any fully custom names.

use std::collections::BTreeSet;

/// Inputs for [`enumerate_domains`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainSet {
    /// Monitored base domain (e.g. `example.com`)
    pub base: String,
    /// DKIM selectors, expanded to `<selector>._domainkey.<base>`
    pub dkim_selectors: Vec<String>,
    /// Subdomain labels, expanded to `<label>.<base>`
    pub subdomains: Vec<String>,
    /// Names used verbatim
    pub custom_domains: Vec<String>,
}

impl DomainSet {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ..Self::default()
        }
    }

    pub fn with_dkim_selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dkim_selectors = selectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_subdomains<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subdomains = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_custom_domains<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_domains = names.into_iter().map(Into::into).collect();
        self
    }

    /// Expand into the deduplicated list of names to query
    pub fn enumerate(&self) -> Vec<String> {
        enumerate_domains(
            &self.base,
            &self.dkim_selectors,
            &self.subdomains,
            &self.custom_domains,
        )
    }
}

/// Build the deduplicated list of names to query for `base`
///
/// The result is sorted so repeated calls produce the same query order.
/// Blank entries in the custom lists are ignored.
pub fn enumerate_domains<S: AsRef<str>>(
    base: &str,
    dkim_selectors: &[S],
    subdomains: &[S],
    custom_domains: &[S],
) -> Vec<String> {
    let mut names = BTreeSet::new();

    names.insert(base.to_string());
    names.insert(format!("_dmarc.{base}"));
    names.insert(format!("_domainkey.{base}"));
    names.insert(format!("www.{base}"));

    for selector in non_blank(dkim_selectors) {
        names.insert(format!("{selector}._domainkey.{base}"));
    }

    for label in non_blank(subdomains) {
        names.insert(format!("{label}.{base}"));
    }

    for name in non_blank(custom_domains) {
        names.insert(name.to_string());
    }

    names.into_iter().collect()
}

fn non_blank<S: AsRef<str>>(items: &[S]) -> impl Iterator<Item = &str> {
    items
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: &[&str] = &[];

    #[test]
    fn empty_lists_yield_base_names() {
        let names = enumerate_domains("example.com", NONE, NONE, NONE);
        assert_eq!(
            names,
            vec![
                "_dmarc.example.com",
                "_domainkey.example.com",
                "example.com",
                "www.example.com",
            ]
        );
    }

    #[test]
    fn expands_selectors_and_subdomains() {
        let names = DomainSet::new("example.com")
            .with_dkim_selectors(["google", "selector1"])
            .with_subdomains(["mail"])
            .with_custom_domains(["other.example.net"])
            .enumerate();

        assert_eq!(names.len(), 8);
        assert!(names.contains(&"google._domainkey.example.com".to_string()));
        assert!(names.contains(&"selector1._domainkey.example.com".to_string()));
        assert!(names.contains(&"mail.example.com".to_string()));
        assert!(names.contains(&"other.example.net".to_string()));
    }

    #[test]
    fn duplicates_collapse_across_categories() {
        let names = DomainSet::new("example.com")
            .with_subdomains(["www", "mail", "mail"])
            .with_custom_domains(["example.com", "mail.example.com", "_dmarc.example.com"])
            .enumerate();

        let unique: BTreeSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn blank_entries_are_ignored() {
        let names = enumerate_domains("example.com", &["", "  "], &[" "], &[""]);
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn always_contains_required_names() {
        for base in ["example.com", "mail.example.org", "a.b.c.d"] {
            let names = DomainSet::new(base)
                .with_dkim_selectors(["s1"])
                .enumerate();
            for required in [
                base.to_string(),
                format!("_dmarc.{base}"),
                format!("_domainkey.{base}"),
                format!("www.{base}"),
            ] {
                assert!(names.contains(&required), "{required} missing for {base}");
            }
        }
    }
}
