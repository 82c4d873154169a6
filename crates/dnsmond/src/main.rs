// # dnsmond - DNS Mail-Security Record Monitor Daemon
//
// This is a thin integration layer: all monitoring logic lives in dnsmon-core.
//
// The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering the resolver, notifiers and state stores
// 4. Running the monitor until SIGINT/SIGTERM
//
// ## Configuration
//
// ### Monitor
// - `DOMAIN`: Base domain to monitor (required)
// - `DNS_SERVER`: Resolver as host:port (default 1.1.1.1:53)
// - `CHECK_INTERVAL`: Duration between checks, e.g. 30m, 1h, 1h30m (default 1h)
// - `NOTIFY_ON_ERRORS`: Alert on load/fetch/save failures when "true"
// - `CUSTOM_SUBDOMAINS`: Comma-separated labels queried under DOMAIN
// - `CUSTOM_DKIM_SELECTORS`: Comma-separated DKIM selectors
// - `CUSTOM_DOMAINS`: Comma-separated fully qualified names
//
// ### Notifier
// - `NOTIFIER_TYPE`: pushover or telegram (required)
// - `PUSHOVER_APP_TOKEN`, `PUSHOVER_USER_KEY`
// - `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_IDS` (comma-separated)
//
// ### Daemon
// - `DNSMON_STATE_DIR`: Directory for state documents (default data)
// - `DNSMON_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export DOMAIN=example.com
// export CUSTOM_DKIM_SELECTORS=s1,s2
// export NOTIFIER_TYPE=telegram
// export TELEGRAM_BOT_TOKEN=123456:abc
// export TELEGRAM_CHAT_IDS=11111111
//
// dnsmond
// ```

use anyhow::{Result, anyhow};
use dnsmon_core::{
    ComponentRegistry, DnsMonitor, MonitorConfig, MonitorEvent, NotifierConfig, RecordResolver,
    ResolverConfig, StateStoreConfig,
};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Intervals below this produce a warning
const SHORT_INTERVAL: Duration = Duration::from_secs(60);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DnsmonExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<DnsmonExitCode> for ExitCode {
    fn from(code: DnsmonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon settings read from the environment
#[derive(Debug)]
struct Settings {
    monitor: MonitorConfig,
    log_level: String,
}

impl Settings {
    /// Load settings from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through `get`, which returns a variable's value if set
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let domain = var("DOMAIN").ok_or_else(|| {
            anyhow!("DOMAIN environment variable is required (e.g. export DOMAIN=example.com)")
        })?;
        validate_domain_name(&domain)?;

        let notifier = notifier_from_lookup(&var)?;

        let check_interval = match var("CHECK_INTERVAL") {
            Some(raw) => parse_duration(&raw)
                .map_err(|e| anyhow!("invalid CHECK_INTERVAL format: {}", e))?,
            None => Duration::from_secs(3600),
        };
        if check_interval.as_secs() == 0 {
            anyhow::bail!("CHECK_INTERVAL must be at least 1s");
        }

        let mut monitor = MonitorConfig::new(domain, notifier);
        monitor.resolver = ResolverConfig::new(var("DNS_SERVER").unwrap_or_else(|| "1.1.1.1:53".to_string()));
        monitor.check_interval_secs = check_interval.as_secs();
        monitor.notify_on_errors = var("NOTIFY_ON_ERRORS").as_deref() == Some("true");
        monitor.custom_subdomains = split_list(var("CUSTOM_SUBDOMAINS").as_deref());
        monitor.custom_dkim_selectors = split_list(var("CUSTOM_DKIM_SELECTORS").as_deref());
        monitor.custom_domains = split_list(var("CUSTOM_DOMAINS").as_deref());
        monitor.state_store = StateStoreConfig::File {
            dir: var("DNSMON_STATE_DIR").unwrap_or_else(|| "data".to_string()),
        };

        monitor.validate()?;

        let log_level = var("DNSMON_LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        match log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DNSMON_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                log_level
            ),
        }

        Ok(Self { monitor, log_level })
    }
}

fn notifier_from_lookup(var: &impl Fn(&str) -> Option<String>) -> Result<NotifierConfig> {
    let notifier_type = var("NOTIFIER_TYPE")
        .ok_or_else(|| anyhow!("NOTIFIER_TYPE environment variable is required (pushover, telegram)"))?;

    match notifier_type.as_str() {
        "pushover" => {
            let (Some(app_token), Some(user_key)) =
                (var("PUSHOVER_APP_TOKEN"), var("PUSHOVER_USER_KEY"))
            else {
                anyhow::bail!(
                    "PUSHOVER_APP_TOKEN and PUSHOVER_USER_KEY environment variables are required"
                );
            };
            Ok(NotifierConfig::Pushover {
                app_token,
                user_key,
            })
        }
        "telegram" => {
            let bot_token = var("TELEGRAM_BOT_TOKEN");
            let chat_ids = parse_chat_ids(var("TELEGRAM_CHAT_IDS").as_deref());
            match bot_token {
                Some(bot_token) if !chat_ids.is_empty() => Ok(NotifierConfig::Telegram {
                    bot_token,
                    chat_ids,
                }),
                _ => anyhow::bail!(
                    "TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_IDS environment variables are required"
                ),
            }
        }
        other => anyhow::bail!(
            "NOTIFIER_TYPE '{}' is not supported. Supported notifiers: pushover, telegram",
            other
        ),
    }
}

/// Split a comma-separated list, dropping blank entries
fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse comma-separated chat ids, dropping entries that are not integers
fn parse_chat_ids(raw: Option<&str>) -> Vec<i64> {
    split_list(raw)
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect()
}

/// Parse a duration such as `90s`, `30m`, `1h30m` or `1.5h`
///
/// Units: ns, us (or µs), ms, s, m, h. A bare `0` is accepted.
fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    let s = s.strip_prefix('+').unwrap_or(s);
    if s.is_empty() || s.starts_with('-') {
        anyhow::bail!("invalid duration '{}'", input);
    }

    let mut rest = s;
    let mut seconds = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            anyhow::bail!("invalid duration '{}'", input);
        }
        let value: f64 = rest[..number_len]
            .parse()
            .map_err(|_| anyhow!("invalid duration '{}'", input))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" | "μs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            "" => anyhow::bail!("missing unit in duration '{}'", input),
            unit => anyhow::bail!("unknown unit '{}' in duration '{}'", unit, input),
        };
        seconds += value * scale;
        rest = &rest[unit_len..];
    }

    Duration::try_from_secs_f64(seconds).map_err(|_| anyhow!("duration '{}' out of range", input))
}

/// Validate the monitored base domain
///
/// Basic RFC 1035 checks; a trailing dot is allowed.
fn validate_domain_name(domain: &str) -> Result<()> {
    let name = domain.strip_suffix('.').unwrap_or(domain);

    if name.is_empty() {
        anyhow::bail!("Domain name cannot be empty");
    }

    if name.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            name.len(),
            domain
        );
    }

    for label in name.split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DnsmonExitCode::ConfigError.into();
        }
    };

    let log_level = match settings.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DnsmonExitCode::ConfigError.into();
    }

    let config = &settings.monitor;
    info!(domain = %config.domain, "Starting dnsmond");
    info!(notify_on_errors = config.notify_on_errors, "Notify on errors");
    info!(subdomains = ?config.custom_subdomains, "Custom subdomains");
    info!(selectors = ?config.custom_dkim_selectors, "Custom DKIM selectors");
    info!(domains = ?config.custom_domains, "Custom domains");
    if config.check_interval() < SHORT_INTERVAL {
        warn!(
            interval_secs = config.check_interval_secs,
            "CHECK_INTERVAL less than 1 minute may cause excessive DNS queries"
        );
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DnsmonExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let (monitor, events) = match build_monitor(settings.monitor) {
            Ok(built) => built,
            Err(e) => {
                error!("Startup error: {}", e);
                return DnsmonExitCode::ConfigError;
            }
        };

        if let Err(e) = run_daemon(monitor, events).await {
            error!("Daemon error: {}", e);
            DnsmonExitCode::RuntimeError
        } else {
            DnsmonExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Build the registry and create the monitor's collaborators from config
fn build_monitor(config: MonitorConfig) -> Result<(DnsMonitor, mpsc::Receiver<MonitorEvent>)> {
    let registry = ComponentRegistry::with_builtin_state_stores();
    dnsmon_resolver::register(&registry);

    #[cfg(feature = "pushover")]
    {
        debug!("Registering Pushover notifier");
        dnsmon_notify_pushover::register(&registry);
    }

    #[cfg(feature = "telegram")]
    {
        debug!("Registering Telegram notifier");
        dnsmon_notify_telegram::register(&registry);
    }

    let resolver: Arc<dyn RecordResolver> = Arc::from(
        registry.create_resolver(dnsmon_resolver::RESOLVER_NAME, &config.resolver)?,
    );
    let notifier = registry.create_notifier(&config.notifier)?;
    let state_store = registry.create_state_store(&config.state_store)?;

    info!(
        resolver = %config.resolver.address,
        notifier = notifier.notifier_name(),
        state_store = config.state_store.type_name(),
        "Components created"
    );

    Ok(DnsMonitor::new(resolver, notifier, state_store, config)?)
}

/// Run the monitor until a shutdown signal arrives
async fn run_daemon(monitor: DnsMonitor, mut events: mpsc::Receiver<MonitorEvent>) -> Result<()> {
    let cancel = CancellationToken::new();

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(?event, "Monitor event");
        }
    });

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => error!("Signal handling error, shutting down: {}", e),
        }
        signal_cancel.cancel();
    });

    monitor.run(cancel).await?;

    info!("Shutting down daemon");
    Ok(())
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
