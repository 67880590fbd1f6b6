//! Chain construction options.

use kvo_core::DEFAULT_SEPARATOR;

/// Options for [`PropertyChain::create_with_config`](crate::PropertyChain::create_with_config).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    /// Character separating path segments.
    pub separator: char,
    /// Prime the chain before installing the callback, so construction does
    /// not notify. When `false`, the callback fires once during construction.
    pub prime_silently: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            prime_silently: true,
        }
    }
}

impl ChainConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    #[must_use]
    pub fn with_prime_silently(mut self, silent: bool) -> Self {
        self.prime_silently = silent;
        self
    }
}
