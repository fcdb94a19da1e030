use std::fmt::Write;

use futures_core::future::BoxFuture;

use indexmap::IndexMap;

use crate::error::Result;

/// The byte-level endpoint a [`Connection`](crate::Connection) wraps.
///
/// Socket setup, TLS and framing all live behind this trait; the pool only
/// needs a liveness probe and teardown. Both methods are called exclusively
/// on the connection's bound executor thread, so implementations may block
/// briefly and need no internal synchronization.
pub trait Transport: Send + 'static {
    /// Whether the underlying endpoint is still usable.
    ///
    /// This is the default health signal: the built-in check returns exactly
    /// this value.
    fn is_active(&self) -> bool;

    /// Tear the endpoint down. Called at most once per transport.
    fn close(&mut self) -> Result<()>;
}

/// Asynchronously opens new transports for the pool.
///
/// This is the pool's connect capability: the pool clones its
/// [`ConnectConfig`] for every fresh connect and hands it here. Returning an
/// error fails the in-flight acquire with that error.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, config: &ConnectConfig) -> BoxFuture<'static, Result<Box<dyn Transport>>>;
}

/// Per-connect configuration, cloned for each connection attempt.
///
/// Carries the remote endpoint plus free-form connect parameters the
/// [`Connector`] may interpret (for example a TLS server name or a protocol
/// setting). Parameters keep their insertion order.
#[derive(Clone, Debug, Default)]
pub struct ConnectConfig {
    pub(crate) endpoint: String,
    pub(crate) params: IndexMap<String, String>,
}

impl ConnectConfig {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: IndexMap::new(),
        }
    }

    /// The remote endpoint, as given to [`ConnectConfig::new`].
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Add a connect parameter.
    #[must_use]
    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Look up a connect parameter.
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Render `endpoint?k=v&...` for logging.
    pub(crate) fn display(&self) -> String {
        let mut out = self.endpoint.clone();
        for (i, (key, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(out, "{sep}{key}={value}").ok();
        }
        out
    }
}
