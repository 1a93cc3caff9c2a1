//! Double-SHA256, the hash used to derive transaction ids.

use sha2::{Digest, Sha256};
use std::io;

/// A `std::io::Write` sink that accumulates bytes and hashes them with
/// SHA256d (`SHA256(SHA256(data))`) when `finish` is called.
#[derive(Default)]
pub struct Writer(Sha256);

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Writer {
    pub fn finish(self) -> [u8; 32] {
        let first = self.0.finalize();
        let second = Sha256::digest(first);
        let mut out = [0u8; 32];
        out.copy_from_slice(&second);
        out
    }
}

/// Hash `bytes` with SHA256d in one shot.
pub fn hash(bytes: &[u8]) -> [u8; 32] {
    use io::Write;
    let mut writer = Writer::default();
    writer
        .write_all(bytes)
        .expect("writing to an in-memory hasher is infallible");
    writer.finish()
}
