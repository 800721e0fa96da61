//! Command-line surface for launching a broker or core process (§6), grounded on the
//! `extraArgs` descriptor table in `NetworkBrokerData.cpp`'s `extraArgs`/
//! `initializeFromArgs`.

use clap::{Parser, ValueEnum};

/// Which network families a broker will bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NetworkScope {
    Local,
    Ipv4,
    Ipv6,
    External,
}

/// Whether a broker's network connection acts as the listening side or dials out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServerMode {
    Server,
    Client,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "helics-broker", about = "Launch a HELICS-style message broker/core")]
pub struct BrokerArgs {
    /// Local network interface to bind, e.g. `tcp://127.0.0.1`.
    #[arg(long)]
    pub interface: Option<String>,

    /// Alias for `--interface`, matching the original's `local_interface`.
    #[arg(long = "local-interface")]
    pub local_interface: Option<String>,

    /// Address of the parent broker to connect to.
    #[arg(long)]
    pub broker: Option<String>,

    /// Alias for `--broker`.
    #[arg(long = "broker-address")]
    pub broker_address: Option<String>,

    /// Number of times to retry a broker connection before giving up.
    #[arg(long = "network-retries", default_value_t = 5)]
    pub network_retries: u32,

    /// Name of the broker to connect to, used for discovery instead of an address.
    #[arg(long = "brokername")]
    pub broker_name: Option<String>,

    /// Initialization string forwarded to a broker this process spawns itself.
    #[arg(long = "brokerinit")]
    pub broker_init: Option<String>,

    /// Maximum message size/count this broker will buffer before applying backpressure.
    #[arg(long = "max-size")]
    pub max_size: Option<usize>,
    #[arg(long = "max-count")]
    pub max_count: Option<usize>,

    /// Which network scope to bind to, when `--interface` is left unspecified.
    #[arg(long, value_enum)]
    pub network: Option<NetworkScope>,

    /// Server or client role for the broker's own listening socket.
    #[arg(long, value_enum, default_value_t = ServerMode::Server)]
    pub mode: ServerMode,

    /// Request the OS assign an ephemeral port instead of a fixed one.
    #[arg(long = "os-port", default_value_t = false)]
    pub os_port: bool,

    /// Spawn a broker automatically if no reachable broker is found.
    #[arg(long = "autobroker", default_value_t = false)]
    pub autobroker: bool,

    /// Allow binding to a port already in `TIME_WAIT`.
    #[arg(long = "reuse-address", default_value_t = false)]
    pub reuse_address: bool,

    /// Port of the parent broker to connect to.
    #[arg(long = "brokerport")]
    pub broker_port: Option<u16>,

    /// Local port this broker listens on.
    #[arg(long = "localport")]
    pub local_port: Option<u16>,

    /// Port used for both local and broker connections when neither is set explicitly.
    #[arg(long)]
    pub port: Option<u16>,

    /// First port to try when scanning for a free one, counting up from here.
    #[arg(long = "portstart")]
    pub port_start: Option<u16>,
}

impl BrokerArgs {
    /// Resolve the effective local interface string, preferring `--interface` over its
    /// `--local-interface` alias.
    pub fn resolved_interface(&self) -> Option<&str> {
        self.interface.as_deref().or(self.local_interface.as_deref())
    }

    /// Resolve the effective parent broker address, preferring `--broker` over its
    /// `--broker-address` alias.
    pub fn resolved_broker_address(&self) -> Option<&str> {
        self.broker.as_deref().or(self.broker_address.as_deref())
    }

    /// Resolve the local listening port, applying the original's port-ambiguity rule:
    /// a bare `--port` sets both the local and broker port unless a local port was
    /// already given explicitly, in which case `--port` applies to the broker side
    /// only and the local port falls back to `--localport`.
    pub fn resolved_local_port(&self) -> Option<u16> {
        self.local_port.or(self.port)
    }

    pub fn resolved_broker_port(&self) -> Option<u16> {
        if self.local_port.is_some() {
            self.broker_port.or(self.port)
        } else {
            self.broker_port.or(self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parses_minimal_args() {
        let args = BrokerArgs::parse_from(["helics-broker", "--interface", "tcp://127.0.0.1"]);
        assert_eq!(args.resolved_interface(), Some("tcp://127.0.0.1"));
        assert_eq!(args.network_retries, 5);
    }

    #[test]
    fn local_interface_alias_is_used_when_interface_absent() {
        let args = BrokerArgs::parse_from(["helics-broker", "--local-interface", "tcp://*"]);
        assert_eq!(args.resolved_interface(), Some("tcp://*"));
    }

    #[test]
    fn bare_port_resolves_both_local_and_broker_port() {
        let args = BrokerArgs::parse_from(["helics-broker", "--port", "23404"]);
        assert_eq!(args.resolved_local_port(), Some(23404));
        assert_eq!(args.resolved_broker_port(), Some(23404));
    }
}
