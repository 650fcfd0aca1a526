//! Service configuration and shared state.

use std::sync::Arc;

use crate::lookup::{ExperimentResolver, ResolverConfig};
use crate::stats::StatsAggregator;
use crate::store::DocumentStore;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8002;

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Listen host (default: 0.0.0.0).
    pub host: String,
    /// Listen port (default: 8002).
    pub port: u16,
    /// Refuse pages with more than one running experiment (default: false).
    pub strict_experiments: bool,
    /// Mark the visitor cookie `Secure` (default: true).
    pub visitor_cookie_secure: bool,
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// - `HOST`, `PORT`
    /// - `STRICT_EXPERIMENTS`: reject ambiguous pages instead of using the first experiment
    /// - `VISITOR_COOKIE_SECURE`: set to `false` for plain-http development
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            strict_experiments: env_flag("STRICT_EXPERIMENTS", false),
            visitor_cookie_secure: env_flag("VISITOR_COOKIE_SECURE", true),
        }
    }

    /// Resolver configuration implied by this service configuration.
    pub fn resolver_config(&self) -> ResolverConfig {
        if self.strict_experiments {
            ResolverConfig::strict()
        } else {
            ResolverConfig::default()
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            strict_experiments: false,
            visitor_cookie_secure: true,
        }
    }
}

/// Shared service state.
pub struct ServiceState<S: DocumentStore + 'static> {
    /// The document store.
    pub store: Arc<S>,
    /// Experiment resolver over the store.
    pub resolver: ExperimentResolver<S>,
    /// Service configuration.
    pub config: ServiceConfig,
}

impl<S: DocumentStore + 'static> ServiceState<S> {
    /// Create service state over a store.
    pub fn new(store: S, config: ServiceConfig) -> Self {
        let store = Arc::new(store);
        let resolver = ExperimentResolver::with_config(Arc::clone(&store), config.resolver_config());
        Self {
            store,
            resolver,
            config,
        }
    }

    /// Create service state with configuration from the environment.
    pub fn from_env(store: S) -> Self {
        Self::new(store, ServiceConfig::from_env())
    }

    /// A stats aggregator over the same store.
    pub fn stats(&self) -> StatsAggregator<S> {
        StatsAggregator::new(Arc::clone(&self.store))
    }
}

impl<S: DocumentStore + 'static> Clone for ServiceState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            resolver: self.resolver.clone(),
            config: self.config.clone(),
        }
    }
}
