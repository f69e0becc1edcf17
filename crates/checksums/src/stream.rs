//! Hashing whole streams.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::strong::Md5;

const CHUNK_SIZE: usize = 64 * 1024;

/// Drains `reader` and returns the lowercase hex MD5 of everything read.
pub async fn md5_hex_async<R>(mut reader: R) -> io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut hasher = Md5::new();
    let mut buffer = vec![0_u8; CHUNK_SIZE];
    loop {
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize_hex())
}
