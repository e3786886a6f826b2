// Application state module
// Immutable per-process state shared by every request

use std::sync::Arc;

use super::types::Config;
use crate::fetch::{ContentFetcher, DirectoryFetcher};

/// Application state
pub struct AppState {
    pub config: Config,
    /// Content source for site-link resolution
    pub fetcher: Arc<dyn ContentFetcher>,
}

impl AppState {
    /// Create `AppState` backed by the local site directory
    pub fn new(config: &Config) -> Self {
        let fetcher = DirectoryFetcher::new(&config.sites, &config.ranges);
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    /// Create `AppState` with an explicit fetch collaborator
    pub fn with_fetcher(config: &Config, fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self {
            config: config.clone(),
            fetcher,
        }
    }
}
