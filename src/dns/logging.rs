//! Structured logging for DNS query handling
//!
//! Correlation IDs and structured fields for the query pipeline, trimmed from
//! the teacher's logging module to DNS-query and operational-error events —
//! the teacher's HTTP/web and security-event log shapes have no counterpart
//! here and are dropped.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Log levels for different types of events
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// DNS query logging details
#[derive(Debug, Clone)]
pub struct DnsQueryLog {
    pub domain: String,
    pub query_type: String,
    pub protocol: String,
    pub response_code: String,
    pub answer_count: u16,
}

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub level: LogLevel,
    pub json_format: bool,
    pub console_output: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json_format: true,
            console_output: true,
        }
    }
}

/// Correlation ID context for request tracking
#[derive(Debug, Clone)]
pub struct CorrelationContext {
    pub id: String,
    pub created_at: SystemTime,
    pub component: String,
    pub operation: String,
    pub metadata: HashMap<String, String>,
}

impl CorrelationContext {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: SystemTime::now(),
            component: component.to_string(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn child(&self, component: &str, operation: &str) -> Self {
        let mut child = Self::new(component, operation);
        child.id = self.id.clone();
        child
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn elapsed(&self) -> Duration {
        self.created_at.elapsed().unwrap_or_default()
    }
}

/// Structured logger implementation
pub struct StructuredLogger {
    #[allow(dead_code)]
    config: LoggerConfig,
}

impl StructuredLogger {
    /// Initialize the structured logger with configuration
    ///
    /// Tolerant of a subscriber already being installed (common in tests that
    /// construct multiple contexts).
    pub fn init(config: LoggerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&format!("{:?}", config.level).to_lowercase()))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let init_result = if config.console_output && config.json_format {
            tracing_subscriber::fmt().json().with_env_filter(filter).try_init()
        } else if config.console_output {
            tracing_subscriber::fmt().pretty().with_env_filter(filter).try_init()
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("off"))
                .try_init()
        };

        if let Err(e) = init_result {
            if config.console_output {
                eprintln!("tracing subscriber already initialized: {}", e);
            }
        }

        Ok(Self { config })
    }

    /// Log a DNS query event
    pub fn log_dns_query(&self, ctx: &CorrelationContext, query_log: DnsQueryLog) {
        info!(
            correlation_id = %ctx.id,
            component = %ctx.component,
            domain = %query_log.domain,
            query_type = %query_log.query_type,
            protocol = %query_log.protocol,
            response_code = %query_log.response_code,
            answer_count = %query_log.answer_count,
            duration_ms = %ctx.elapsed().as_millis(),
            "dns query"
        );
    }
}
