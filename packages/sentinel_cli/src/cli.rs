//! Command-line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use heart_rate_sentinel::{ConfigError, SentinelConfig};

#[derive(Parser, Debug)]
#[command(name = "hr-sentinel", version, about = "Remote heart-rate monitoring service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Replay the demo scenario against a running server
    Demo {
        #[arg(long, env = "SENTINEL_SERVER", default_value = "http://127.0.0.1:5000")]
        server: String,
    },
}

/// Flags override the config file, which overrides the defaults.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// JSON config file
    #[arg(long, env = "SENTINEL_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "SENTINEL_BIND")]
    pub bind: Option<String>,

    /// Email relay URL; alerts are only logged when absent
    #[arg(long, env = "SENTINEL_EMAIL_ENDPOINT")]
    pub email_endpoint: Option<String>,

    #[arg(long, env = "SENTINEL_SENDER_EMAIL")]
    pub sender_email: Option<String>,

    #[arg(long, env = "SENTINEL_NOTIFY_TIMEOUT_SECS")]
    pub notify_timeout_secs: Option<u64>,
}

impl ServeArgs {
    pub fn resolve(self) -> Result<SentinelConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => SentinelConfig::load(path)?,
            None => SentinelConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(endpoint) = self.email_endpoint {
            config.email_endpoint = Some(endpoint);
        }
        if let Some(sender) = self.sender_email {
            config.sender_email = sender;
        }
        if let Some(timeout) = self.notify_timeout_secs {
            config.notify_timeout_secs = timeout;
        }
        config.validate()?;
        Ok(config)
    }
}
