use std::net::{IpAddr, Ipv4Addr};

use super::{Config, log_filter};

#[test]
fn default_config_binds_all_interfaces_without_oauth() {
    let config = Config::default();
    assert_eq!(config.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    assert_eq!(config.port, 3000);
    assert!(!config.enable_docs);
    assert!(!config.secure_cookies);
    assert!(config.oauth.is_none());
    assert!(config.upload_dir.ends_with("svcmap/uploads"));
}

#[test]
fn verbosity_raises_log_level() {
    assert_eq!(log_filter(0), "svcmap=info,tower_http=info");
    assert_eq!(log_filter(1), "svcmap=debug,tower_http=debug");
    assert_eq!(log_filter(2), "svcmap=trace,tower_http=trace");
    assert_eq!(log_filter(9), log_filter(2));
}
