// Configuration module entry point
// Loads layered configuration and builds the shared application state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, RangesConfig, SitesConfig};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional; `SERVER_*` environment variables override it
    /// (e.g. `SERVER_SITES__ROOT_DIR=/srv/sites`).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("SERVER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.show_headers", false)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("performance.listen_backlog", 128)?
            .set_default("http.server_name", "sitelink-gateway/0.1")?
            .set_default("http.enable_cors", false)?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("sites.root_dir", "sites")?
            .set_default("sites.index_files", vec!["index.html", "index.htm"])?
            .set_default("sites.latest_dir", "latest")?
            .set_default("ranges.multipart_boundary", "sitelink-byteranges")?
            .set_default("error_pages.use_status_codes", false)?
            .set_default(
                "error_pages.register_url",
                "safe-browser://my-sites?register=",
            )?
            .set_default("error_pages.preview_enabled", true)?
            .set_default("error_pages.preview_prefix", "/_errors/")?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("does-not-exist/config").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.sites.latest_dir, "latest");
        assert_eq!(cfg.sites.index_files, vec!["index.html", "index.htm"]);
        assert!(!cfg.error_pages.use_status_codes);
        assert_eq!(
            cfg.error_pages.register_url,
            "safe-browser://my-sites?register="
        );
        assert!(cfg.routes.health.enabled);
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 8080);
    }
}
