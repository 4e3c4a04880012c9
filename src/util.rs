use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const DEFAULT_PORT: u16 = 51243;

const DEFAULT_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

pub fn default_bind_addr() -> SocketAddr {
    SocketAddr::new(DEFAULT_ADDR, DEFAULT_PORT)
}

const MONITOR_BIND_ADDR: &str = "MONITOR_BIND_ADDR";

/// Bind address from `MONITOR_BIND_ADDR`, if set and valid
pub fn get_bind_addr() -> Option<SocketAddr> {
    let addr_from_env = std::env::var(MONITOR_BIND_ADDR);
    addr_from_env.ok().and_then(|addr| addr.parse().ok())
}

const MONITOR_CONFIG: &str = "MONITOR_CONFIG";

pub fn get_config_path() -> Option<String> {
    std::env::var(MONITOR_CONFIG).ok()
}
