//! Ambient origin lookup for clients embedded in a host environment.

use std::fmt;

/// Scheme, host and optional port of the page or host the client runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Scheme without the trailing `:` (e.g. "https").
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
}

impl Origin {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

/// Supplies the origin of the surrounding environment, if there is one.
pub trait OriginResolver: Send + Sync {
    fn origin(&self) -> Option<Origin>;
}

impl OriginResolver for Origin {
    fn origin(&self) -> Option<Origin> {
        Some(self.clone())
    }
}

impl<F> OriginResolver for F
where
    F: Fn() -> Option<Origin> + Send + Sync,
{
    fn origin(&self) -> Option<Origin> {
        self()
    }
}
