use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tideway::config::{CONFIG_ENV, Config, LISTEN_ENV, TriggerMode};

#[test]
fn test_config_defaults() {
    let cfg = Config::default();

    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.server.doc_root, PathBuf::from("./root"));
    assert_eq!(cfg.server.trigger_mode, TriggerMode::Edge);
    assert_eq!(cfg.server.idle_timeout(), Duration::from_secs(15));
    assert_eq!(cfg.server.log_level(), tracing::Level::INFO);
    assert!(cfg.server.access_log);

    assert_eq!(cfg.routes.default_page, "index.html");
    assert_eq!(cfg.routes.login, "/login");
    assert_eq!(cfg.routes.register, "/register");
    assert_eq!(cfg.routes.login_success, "welcome.html");
    assert_eq!(cfg.routes.login_failure, "login_error.html");
    assert_eq!(cfg.routes.register_success, "login.html");
    assert_eq!(cfg.routes.register_failure, "register_error.html");

    assert!(cfg.credentials.database.is_none());
    assert_eq!(cfg.credentials.table, "user");
}

#[test]
fn test_config_from_yaml() {
    let yaml = r#"
server:
  listen_addr: "0.0.0.0:9000"
  doc_root: /srv/www
  trigger_mode: level
  workers: 2
  idle_timeout_secs: 30
  max_connections: 100
  log_level: debug
  access_log: false
routes:
  default_page: home.html
  aliases:
    /signup: register.html
credentials:
  database: /var/lib/tideway/users.db
  table: accounts
"#;
    let cfg = Config::from_yaml(yaml).unwrap();

    assert_eq!(cfg.server.listen_addr, "0.0.0.0:9000");
    assert_eq!(cfg.server.doc_root, PathBuf::from("/srv/www"));
    assert_eq!(cfg.server.trigger_mode, TriggerMode::Level);
    assert_eq!(cfg.server.workers, 2);
    assert_eq!(cfg.server.idle_timeout(), Duration::from_secs(30));
    assert_eq!(cfg.server.max_connections, 100);
    assert_eq!(cfg.server.log_level(), tracing::Level::DEBUG);
    assert!(!cfg.server.access_log);

    assert_eq!(cfg.routes.default_page, "home.html");
    assert_eq!(
        cfg.routes.aliases.get("/signup").map(String::as_str),
        Some("register.html")
    );
    // Unset route fields keep their defaults.
    assert_eq!(cfg.routes.login, "/login");

    assert_eq!(
        cfg.credentials.database,
        Some(PathBuf::from("/var/lib/tideway/users.db"))
    );
    assert_eq!(cfg.credentials.table, "accounts");
}

#[test]
fn test_config_partial_yaml_keeps_defaults() {
    let cfg = Config::from_yaml("server:\n  workers: 1\n").unwrap();

    assert_eq!(cfg.server.workers, 1);
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.routes.default_page, "index.html");
}

#[test]
fn test_config_invalid_trigger_mode() {
    assert!(Config::from_yaml("server:\n  trigger_mode: sideways\n").is_err());
}

#[test]
fn test_config_unknown_log_level_falls_back() {
    let cfg = Config::from_yaml("server:\n  log_level: chatty\n").unwrap();
    assert_eq!(cfg.server.log_level(), tracing::Level::INFO);
}

#[test]
fn test_config_missing_file_is_an_error() {
    assert!(Config::from_file("/nonexistent/tideway.yaml").is_err());
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::default();
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1.server.listen_addr, cfg2.server.listen_addr);
}

// The only test that touches the environment, so no other test races it.
#[test]
fn test_config_load_from_env() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "server:\n  listen_addr: \"127.0.0.1:7000\"\n  workers: 3").unwrap();

    unsafe {
        std::env::set_var(CONFIG_ENV, file.path());
        std::env::remove_var(LISTEN_ENV);
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:7000");
    assert_eq!(cfg.server.workers, 3);

    unsafe {
        std::env::set_var(LISTEN_ENV, "0.0.0.0:3000");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:3000");
    assert_eq!(cfg.server.workers, 3);

    unsafe {
        std::env::set_var(CONFIG_ENV, "/nonexistent/tideway.yaml");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:3000");
    assert_eq!(cfg.server.workers, 8);

    unsafe {
        std::env::remove_var(CONFIG_ENV);
        std::env::remove_var(LISTEN_ENV);
    }
}
