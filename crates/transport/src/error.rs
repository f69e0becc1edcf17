/// Errors raised while resolving a root string to a provider.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The root names a scheme no provider is available for.
    #[error("unsupported protocol '{scheme}' in root {root}")]
    UnsupportedProtocol {
        /// Scheme part of the root, without `://`.
        scheme: String,
        /// The root as given.
        root: String,
    },

    /// The root names a known scheme but does not parse.
    #[error("invalid root {root}, expected {expected}")]
    InvalidRoot {
        /// The root as given.
        root: String,
        /// Shape the provider accepts.
        expected: &'static str,
    },
}
