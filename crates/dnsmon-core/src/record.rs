//! DNS record data model
//!
//! Records are captured in a resolver-independent form: the record kind, the
//! owner name, a canonical textual value and the TTL. Resolver bindings build
//! them from a [`RecordData`] so that value rendering stays in one place.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// DNS record kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordKind {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
    /// Canonical name record
    Cname,
    /// Mail exchange record
    Mx,
    /// Text record (SPF, DKIM, DMARC)
    Txt,
    /// Any other record type, by its mnemonic
    Other(String),
}

impl RecordKind {
    /// The mnemonic used in change reports and the state document
    pub fn as_str(&self) -> &str {
        match self {
            RecordKind::A => "A",
            RecordKind::Aaaa => "AAAA",
            RecordKind::Cname => "CNAME",
            RecordKind::Mx => "MX",
            RecordKind::Txt => "TXT",
            RecordKind::Other(name) => name,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for RecordKind {
    fn from(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "A" => RecordKind::A,
            "AAAA" => RecordKind::Aaaa,
            "CNAME" => RecordKind::Cname,
            "MX" => RecordKind::Mx,
            "TXT" => RecordKind::Txt,
            other => RecordKind::Other(other.to_string()),
        }
    }
}

impl From<String> for RecordKind {
    fn from(s: String) -> Self {
        RecordKind::from(s.as_str())
    }
}

impl From<RecordKind> for String {
    fn from(kind: RecordKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Resolved record data, one variant per rendering rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    /// Mail exchange: preference and exchange host
    Mx { preference: u16, exchange: String },
    /// Text record segments
    Txt(Vec<String>),
    /// Canonical name target
    Cname(String),
    /// IPv4 address
    A(Ipv4Addr),
    /// IPv6 address
    Aaaa(Ipv6Addr),
    /// Anything else, already rendered by the resolver library
    Other { kind: RecordKind, text: String },
}

impl RecordData {
    /// Kind of the data itself (not necessarily the queried kind)
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordData::Mx { .. } => RecordKind::Mx,
            RecordData::Txt(_) => RecordKind::Txt,
            RecordData::Cname(_) => RecordKind::Cname,
            RecordData::A(_) => RecordKind::A,
            RecordData::Aaaa(_) => RecordKind::Aaaa,
            RecordData::Other { kind, .. } => kind.clone(),
        }
    }

    /// Canonical textual value compared between snapshots
    pub fn render(&self) -> String {
        match self {
            RecordData::Mx {
                preference,
                exchange,
            } => format!("{} {}", preference, exchange),
            RecordData::Txt(segments) => segments.join(" "),
            RecordData::Cname(target) => target.clone(),
            RecordData::A(ip) => ip.to_string(),
            RecordData::Aaaa(ip) => ip.to_string(),
            RecordData::Other { text, .. } => text.clone(),
        }
    }
}

/// A single resolved DNS record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DnsRecord {
    #[serde(rename = "type")]
    kind: RecordKind,
    name: String,
    value: String,
    ttl: u32,
}

impl DnsRecord {
    /// Create a record from an already rendered value
    pub fn new(kind: RecordKind, name: impl Into<String>, value: impl Into<String>, ttl: u32) -> Self {
        Self {
            kind,
            name: name.into(),
            value: value.into(),
            ttl,
        }
    }

    /// Create a record labelled `kind` whose value is rendered from `data`
    pub fn from_data(kind: RecordKind, name: impl Into<String>, ttl: u32, data: &RecordData) -> Self {
        Self::new(kind, name, data.render(), ttl)
    }

    pub fn kind(&self) -> &RecordKind {
        &self.kind
    }

    /// Owner name as reported by the resolver
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Grouping key used by the change detector
    pub fn key(&self) -> RecordKey<'_> {
        RecordKey {
            kind: &self.kind,
            name: &self.name,
        }
    }
}

/// `(kind, owner name)` grouping key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey<'a> {
    pub kind: &'a RecordKind,
    pub name: &'a str,
}

/// The full set of records resolved during one check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    records: Vec<DnsRecord>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: DnsRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[DnsRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DnsRecord> {
        self.records.iter()
    }

    /// Group records by `(kind, owner name)`, keeping input order inside a group
    pub fn grouped(&self) -> HashMap<RecordKey<'_>, Vec<&DnsRecord>> {
        let mut groups: HashMap<RecordKey<'_>, Vec<&DnsRecord>> = HashMap::new();
        for record in &self.records {
            groups.entry(record.key()).or_default().push(record);
        }
        groups
    }

    /// Whether both snapshots hold the same `(kind, name, value)` triples
    ///
    /// Order, TTLs and duplicates are ignored.
    pub fn same_records(&self, other: &Snapshot) -> bool {
        let triples = |s: &Snapshot| -> BTreeSet<(String, String, String)> {
            s.records
                .iter()
                .map(|r| (r.kind.to_string(), r.name.clone(), r.value.clone()))
                .collect()
        };
        triples(self) == triples(other)
    }
}

impl FromIterator<DnsRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = DnsRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl Extend<DnsRecord> for Snapshot {
    fn extend<I: IntoIterator<Item = DnsRecord>>(&mut self, iter: I) {
        self.records.extend(iter);
    }
}

impl IntoIterator for Snapshot {
    type Item = DnsRecord;
    type IntoIter = std::vec::IntoIter<DnsRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a DnsRecord;
    type IntoIter = std::slice::Iter<'a, DnsRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
