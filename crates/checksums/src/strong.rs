//! Strong digests used for content comparison.

mod md5;

pub use md5::Md5;
