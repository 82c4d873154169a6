// # Wire Resolver
//
// This crate provides the UDP/TCP `RecordResolver` for the dnsmon system.
//
// ## Protocol
//
// - One recursive query per call (RD set), sent through a hickory `DnsExchange`
// - UDP first; a truncated answer is re-asked over TCP
// - The transport assigns each request a fresh id and drops answers that do not match it
// - Each exchange is bounded by the configured timeout
//
// Retrying is not done here: the fetcher owns the retry policy.

use dnsmon_core::config::ResolverConfig;
use dnsmon_core::record::{RecordData, RecordKind};
use dnsmon_core::traits::{RecordResolver, RecordResolverFactory, ResolvedRecord};
use dnsmon_core::{ComponentRegistry, Error, Result};

use hickory_proto::ProtoError;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use hickory_proto::runtime::{TokioRuntimeProvider, TokioTime};
use hickory_proto::tcp::TcpClientStream;
use hickory_proto::udp::UdpClientStream;
use hickory_proto::xfer::{
    DnsExchange, DnsHandle, DnsMultiplexer, DnsRequest, DnsRequestOptions, DnsRequestSender,
    DnsResponse, FirstAnswer,
};

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tracing::debug;

/// Registry name of this resolver
pub const RESOLVER_NAME: &str = "udp";

/// UDP resolver with TCP fallback
#[derive(Debug, Clone)]
pub struct UdpRecordResolver {
    /// Resolver address as `host:port`
    address: String,

    /// Bound on each exchange
    timeout: Duration,
}

impl UdpRecordResolver {
    /// Create a resolver for `address` (`host:port`) with a 5 second timeout
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: ResolverConfig::default().timeout(),
        }
    }

    /// Create a resolver from configuration
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        config.validate()?;
        if !has_port(&config.address) {
            return Err(Error::config(format!(
                "Resolver address '{}' must be host:port",
                config.address
            )));
        }
        Ok(Self::new(config.address.clone()).with_timeout(config.timeout()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn server_addr(&self, name: &str, kind: &RecordKind) -> Result<SocketAddr> {
        tokio::net::lookup_host(self.address.as_str())
            .await
            .map_err(|e| {
                Error::query(
                    name,
                    kind.clone(),
                    format!("cannot resolve server {}: {}", self.address, e),
                )
            })?
            .next()
            .ok_or_else(|| {
                Error::query(
                    name,
                    kind.clone(),
                    format!("server {} has no address", self.address),
                )
            })
    }

    /// Ask `message` over UDP
    async fn exchange_udp(
        &self,
        server: SocketAddr,
        message: Message,
    ) -> std::result::Result<DnsResponse, ProtoError> {
        let connect = UdpClientStream::builder(server, TokioRuntimeProvider::new())
            .with_timeout(Some(self.timeout))
            .build();
        exchange(connect, message).await
    }

    /// Ask `message` over TCP
    async fn exchange_tcp(
        &self,
        server: SocketAddr,
        message: Message,
    ) -> std::result::Result<DnsResponse, ProtoError> {
        let (stream, handle) =
            TcpClientStream::new(server, None, Some(self.timeout), TokioRuntimeProvider::new());
        let connect = DnsMultiplexer::with_timeout(stream, handle, self.timeout, None);
        exchange(connect, message).await
    }

    /// Run one exchange under the timeout
    async fn bounded<F>(&self, name: &str, kind: &RecordKind, exchange: F) -> Result<DnsResponse>
    where
        F: Future<Output = std::result::Result<DnsResponse, ProtoError>>,
    {
        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(Error::query(name, kind.clone(), e.to_string())),
            Err(_) => Err(Error::query(
                name,
                kind.clone(),
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }
}

#[async_trait::async_trait]
impl RecordResolver for UdpRecordResolver {
    async fn query(&self, name: &str, kind: &RecordKind) -> Result<Vec<ResolvedRecord>> {
        let message = build_query(name, kind)?;
        let server = self.server_addr(name, kind).await?;

        let mut response = self
            .bounded(name, kind, self.exchange_udp(server, message.clone()))
            .await?;

        if response.truncated() {
            debug!(domain = name, kind = %kind, "UDP answer truncated, retrying over TCP");
            response = self
                .bounded(name, kind, self.exchange_tcp(server, message))
                .await?;
        }

        let rcode = response.response_code();
        if rcode != ResponseCode::NoError {
            return Err(Error::response_code(name, kind.clone(), rcode.to_string()));
        }

        Ok(response.answers().iter().map(resolved).collect())
    }

    fn resolver_name(&self) -> &'static str {
        RESOLVER_NAME
    }
}

/// Factory for [`UdpRecordResolver`]
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpResolverFactory;

impl RecordResolverFactory for UdpResolverFactory {
    fn create(&self, config: &ResolverConfig) -> Result<Box<dyn RecordResolver>> {
        Ok(Box::new(UdpRecordResolver::from_config(config)?))
    }
}

/// Register this resolver with the registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_resolver(RESOLVER_NAME, Box::new(UdpResolverFactory));
}

fn has_port(address: &str) -> bool {
    address
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
}

fn record_type(kind: &RecordKind) -> Result<RecordType> {
    Ok(match kind {
        RecordKind::A => RecordType::A,
        RecordKind::Aaaa => RecordType::AAAA,
        RecordKind::Cname => RecordType::CNAME,
        RecordKind::Mx => RecordType::MX,
        RecordKind::Txt => RecordType::TXT,
        RecordKind::Other(mnemonic) => mnemonic
            .parse::<RecordType>()
            .map_err(|_| Error::Other(format!("Unsupported record type {}", mnemonic)))?,
    })
}

/// Build a recursive query; the id is set by the transport
fn build_query(name: &str, kind: &RecordKind) -> Result<Message> {
    let mut qname = Name::from_ascii(name).map_err(|e| Error::invalid_name(name, e.to_string()))?;
    qname.set_fqdn(true);

    let mut message = Message::new();
    message
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(Query::query(qname, record_type(kind)?));

    Ok(message)
}

/// Connect an exchange, send one request and wait for its first answer
///
/// The exchange's background task ends once the handle is dropped.
async fn exchange<F, S>(connect: F, message: Message) -> std::result::Result<DnsResponse, ProtoError>
where
    F: Future<Output = std::result::Result<S, ProtoError>> + Send + Unpin + 'static,
    S: DnsRequestSender + Send + Unpin + 'static,
{
    let (client, background) = DnsExchange::connect::<F, S, TokioTime>(connect).await?;
    tokio::spawn(background);

    let mut options = DnsRequestOptions::default();
    options.recursion_desired = true;

    client
        .send(DnsRequest::new(message, options))
        .first_answer()
        .await
}

fn resolved(record: &Record) -> ResolvedRecord {
    ResolvedRecord::new(
        record.name().to_string(),
        record.ttl(),
        record_data(record.data()),
    )
}

/// Convert wire record data into the monitor's own representation
pub fn record_data(rdata: &RData) -> RecordData {
    match rdata {
        RData::MX(mx) => RecordData::Mx {
            preference: mx.preference(),
            exchange: mx.exchange().to_string(),
        },
        RData::TXT(txt) => RecordData::Txt(
            txt.txt_data()
                .iter()
                .map(|segment| String::from_utf8_lossy(segment).into_owned())
                .collect(),
        ),
        RData::CNAME(cname) => RecordData::Cname(cname.0.to_string()),
        RData::A(a) => RecordData::A(a.0),
        RData::AAAA(aaaa) => RecordData::Aaaa(aaaa.0),
        other => RecordData::Other {
            kind: RecordKind::from(other.record_type().to_string()),
            text: other.to_string(),
        },
    }
}
