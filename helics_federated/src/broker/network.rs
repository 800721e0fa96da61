//! Network address string handling (§4.11), lifted out of `NetworkBrokerData.cpp`'s
//! free functions: splitting an `interface:port` string, stripping/adding a protocol
//! prefix, and telling an IPv6 literal apart from an IPv4 one or hostname.
//!
//! The original's actual socket and DNS resolution helpers
//! (`getLocalExternalAddressV4/V6`) are asio-specific transport plumbing with no
//! counterpart in this subsystem's scope; only the address-string parsing survives here.

/// Split `address` into its interface part and trailing port, if any. Mirrors
/// `extractInterfaceandPort`: a colon not immediately followed by `/` (to avoid
/// splitting a bare `proto://host` with no port) and whose suffix parses as an integer
/// is treated as a port separator.
pub fn extract_interface_and_port(address: &str) -> (String, Option<u16>) {
    let Some(last_colon) = address.rfind(':') else {
        return (address.to_string(), None);
    };
    let suffix = &address[last_colon + 1..];
    if suffix.starts_with('/') {
        return (address.to_string(), None);
    }
    match suffix.parse::<u16>() {
        Ok(port) => (address[..last_colon].to_string(), Some(port)),
        Err(_) => (address.to_string(), None),
    }
}

/// Build `interface:port`, omitting the port when `None` (mirrors `makePortAddress`).
pub fn make_port_address(interface: &str, port: Option<u16>) -> String {
    match port {
        Some(p) => format!("{interface}:{p}"),
        None => interface.to_string(),
    }
}

/// Strip a leading `scheme://` prefix, if present.
pub fn strip_protocol(address: &str) -> &str {
    match address.find("://") {
        Some(idx) => &address[idx + 3..],
        None => address,
    }
}

/// The transport a network interface string is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceType {
    Tcp,
    Udp,
    Ipc,
    Inproc,
}

impl InterfaceType {
    fn scheme(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Ipc => "ipc",
            Self::Inproc => "inproc",
        }
    }
}

/// Prepend the scheme for `interface_type` unless `address` already has one.
pub fn add_protocol(address: &str, interface_type: InterfaceType) -> String {
    if address.contains("://") {
        address.to_string()
    } else {
        format!("{}://{}", interface_type.scheme(), address)
    }
}

/// Whether `address` looks like an IPv6 literal: more than two colons, a `[`, or a
/// leading `::` (mirrors `isipv6`).
pub fn is_ipv6(address: &str) -> bool {
    address.matches(':').count() > 2 || address.contains('[') || address.starts_with("::")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_interface_and_port() {
        assert_eq!(extract_interface_and_port("localhost:8080"), ("localhost".to_string(), Some(8080)));
        assert_eq!(extract_interface_and_port("tcp://*"), ("tcp://*".to_string(), None));
    }

    #[test]
    fn avoids_splitting_a_bare_scheme() {
        assert_eq!(extract_interface_and_port("tcp://host"), ("tcp://host".to_string(), None));
    }

    #[test]
    fn strips_and_adds_protocol() {
        assert_eq!(strip_protocol("tcp://localhost"), "localhost");
        assert_eq!(add_protocol("localhost", InterfaceType::Tcp), "tcp://localhost");
        assert_eq!(add_protocol("tcp://localhost", InterfaceType::Tcp), "tcp://localhost");
    }

    #[test]
    fn classifies_ipv6_literals() {
        assert!(is_ipv6("::1"));
        assert!(is_ipv6("2001:db8::1"));
        assert!(!is_ipv6("192.168.0.1"));
        assert!(!is_ipv6("localhost"));
    }
}
