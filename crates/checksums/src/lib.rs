#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod hex;
mod stream;
pub mod strong;

pub use hex::to_hex;
pub use stream::md5_hex_async;
pub use strong::Md5;
