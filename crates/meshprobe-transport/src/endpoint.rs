use std::fmt;

/// Default proxy host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default ESPHome native API port.
pub const DEFAULT_PORT: u16 = 6053;

/// Remote address of the device-control service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Create a new endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_targets_local_proxy() {
        let endpoint = Endpoint::default();
        assert_eq!(endpoint.host(), "127.0.0.1");
        assert_eq!(endpoint.port(), 6053);
        assert_eq!(endpoint.to_string(), "127.0.0.1:6053");
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        let endpoint = Endpoint::new("::1", 6053);
        assert_eq!(endpoint.to_string(), "[::1]:6053");
    }
}
