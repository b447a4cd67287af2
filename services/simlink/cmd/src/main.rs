//! Simulator link client binary.
//!
//! Connects to a simulation endpoint, performs the HELLO handshake and
//! optionally follows the stream of node trees the simulator pushes.

use clap::Parser;
use simlink_session::{ClientType, Session, SessionConfig};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod logging;

use config::SimlinkConfig;
use logging::SimlinkLogFormatter;

// Component logging macros are defined in logging.rs and available via #[macro_export]

/// Simulator link client
#[derive(Parser, Debug)]
#[command(name = "simlink", version, about = "Connect to a simulator and follow its node trees")]
struct Args {
    /// Simulator address, e.g. 127.0.0.1:1436 (overrides the config file)
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Client name announced in HELLO
    #[arg(long)]
    name: Option<String>,

    /// Client version announced in HELLO
    #[arg(long)]
    client_version: Option<String>,

    /// Announce as a simulator instead of a control desk
    #[arg(long)]
    as_sim: bool,

    /// Connect and handshake timeout, e.g. 10s
    #[arg(long)]
    timeout: Option<humantime::Duration>,

    /// Keep the session open and log every received tree until Ctrl-C
    #[arg(long)]
    follow: bool,

    /// Print received trees as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Configuration file path
    #[arg(long, default_value = "simlink.yaml")]
    config: PathBuf,
}

impl Args {
    /// Command line flags take precedence over the loaded configuration
    fn session_config(&self, file: &SimlinkConfig) -> SessionConfig {
        SessionConfig {
            addr: self.addr.unwrap_or(file.addr),
            client_type: if self.as_sim {
                ClientType::Sim
            } else {
                ClientType::ControlDesk
            },
            client_name: self.name.clone().unwrap_or_else(|| file.client_name.clone()),
            client_version: self
                .client_version
                .clone()
                .unwrap_or_else(|| file.client_version.clone()),
            protocol_version: file.protocol_version,
            timeout: self
                .timeout
                .map(Duration::from)
                .unwrap_or(Duration::from_secs(file.timeout_secs)),
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::new("info")
        .add_directive(format!("simlink={}", args.log_level).parse()?)
        .add_directive(format!("simlink_wire={}", args.log_level).parse()?)
        .add_directive(format!("simlink_session={}", args.log_level).parse()?);

    let formatter = SimlinkLogFormatter::new("simlink".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(true)
        .event_format(formatter)
        .init();

    info!("Starting simlink v{}", env!("CARGO_PKG_VERSION"));

    let file_config = SimlinkConfig::load_from_file(&args.config)?;
    let config = args.session_config(&file_config);

    let mut session = Session::connect(&config).await?;
    let ack = session.ack().clone();
    component_info!(
        "session",
        "Connected to {} (simulator {}, {})",
        config.addr,
        ack.server_version,
        ack.connection_info
    );

    if args.follow {
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    component_info!("session", "Interrupted, closing session");
                    break;
                }
                received = session.recv() => match received {
                    Ok(node) => {
                        if args.json {
                            println!("{}", serde_json::to_string(&node)?);
                        } else {
                            component_info!(
                                "wire",
                                "Received tree id={:?} with {} nodes",
                                node.id,
                                node.subtree_len()
                            );
                        }
                        component_debug!("wire", "{:?}", node);
                    }
                    Err(e) if e.is_truncated() => {
                        component_warn!("session", "Simulator closed the connection: {}", e);
                        break;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    let stats = session.stats().clone();
    session.close().await?;
    info!(
        "Session closed: {} trees sent, {} bytes out, {} trees received",
        stats.messages_sent, stats.bytes_out, stats.messages_received
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_file_config() {
        let file = SimlinkConfig {
            client_name: "from-file".to_string(),
            timeout_secs: 7,
            ..SimlinkConfig::default()
        };

        let args = Args::parse_from(["simlink", "--addr", "10.1.1.1:2000", "--timeout", "250ms"]);
        let config = args.session_config(&file);
        assert_eq!(config.addr, "10.1.1.1:2000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.client_name, "from-file");
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.client_type, ClientType::ControlDesk);

        let args = Args::parse_from(["simlink", "--as-sim", "--name", "Sim2"]);
        let config = args.session_config(&file);
        assert_eq!(config.addr, file.addr);
        assert_eq!(config.client_name, "Sim2");
        assert_eq!(config.timeout, Duration::from_secs(7));
        assert_eq!(config.client_type, ClientType::Sim);
    }
}
