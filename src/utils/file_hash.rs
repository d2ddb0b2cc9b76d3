use digest::Digest;
use sha2::Sha256;
use std::io::{self, Read};

/// Hex SHA-256 of everything `reader` yields, read in 64 KiB blocks.
pub fn sha256(reader: impl Read) -> io::Result<String> {
    let digest = stream_hash(reader, Sha256::new())?;
    Ok(hex::encode(digest))
}

fn stream_hash<D: Digest>(mut reader: impl Read, mut hasher: D) -> io::Result<Vec<u8>> {
    let mut buffer = vec![0; 65536];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hasher.finalize().to_vec())
}
