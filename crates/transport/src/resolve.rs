use std::sync::Arc;

use engine::Provider;

use crate::TransportError;
use crate::local::FsProvider;
use crate::options::ProviderOptions;

/// Protocol tag of [`FsProvider`].
pub const FILE_PROTOCOL: &str = "file";

/// Splits `root` into its scheme and the remainder after `://`.
///
/// Returns `None` for plain paths, including Windows drive paths.
///
/// ```
/// use transport::split_scheme;
///
/// assert_eq!(split_scheme("s3://bucket/prefix"), Some(("s3", "bucket/prefix")));
/// assert_eq!(split_scheme("file:///srv/www"), Some(("file", "/srv/www")));
/// assert_eq!(split_scheme("./site"), None);
/// assert_eq!(split_scheme(r"C:\site"), None);
/// ```
#[must_use]
pub fn split_scheme(root: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = root.split_once("://")?;
    let valid = scheme
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some((scheme, rest))
}

/// Resolves a root string to the provider serving it.
///
/// `file://` roots and plain paths become an [`FsProvider`]. With the `s3`
/// feature, `s3://bucket/prefix` roots become an
/// [`S3Provider`](crate::s3::S3Provider) talking to AWS. Any other scheme is
/// rejected.
///
/// # Errors
///
/// [`TransportError::UnsupportedProtocol`] for unknown schemes and
/// [`TransportError::InvalidRoot`] for bucket roots without a bucket.
pub fn provider_for_root(
    root: &str,
    options: ProviderOptions,
) -> Result<Arc<dyn Provider>, TransportError> {
    let path = match split_scheme(root) {
        None => root,
        Some((scheme, path)) if scheme.eq_ignore_ascii_case(FILE_PROTOCOL) => path,
        #[cfg(feature = "s3")]
        Some((scheme, _)) if scheme.eq_ignore_ascii_case(crate::s3::S3_PROTOCOL) => {
            let bridge = Arc::new(crate::s3::AwsBridge::new());
            let provider: Arc<dyn Provider> = crate::s3::S3Provider::new(root, bridge, options)?;
            return Ok(provider);
        }
        Some((scheme, _)) => {
            return Err(TransportError::UnsupportedProtocol {
                scheme: scheme.to_owned(),
                root: root.to_owned(),
            });
        }
    };
    let provider: Arc<dyn Provider> = FsProvider::new(path, options);
    Ok(provider)
}
