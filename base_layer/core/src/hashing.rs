// Copyright 2022. The Helios Project
//
// Redistribution and use in source and binary forms, with or without modification, are permitted provided that the
// following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this list of conditions and the following
// disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice, this list of conditions and the
// following disclaimer in the documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its contributors may be used to endorse or promote
// products derived from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES,
// INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY,
// WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE
// USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! The two hashing primitives every consensus rule in this crate is built from: double SHA-256
//! and the little-endian byte-stream writer that assembles its inputs.

use digest::Digest;
use helios_common_types::types::FixedHash;
use sha2::Sha256;

/// Double SHA-256 of an arbitrary byte buffer.
pub fn sha256d(bytes: &[u8]) -> FixedHash {
    let first = Sha256::digest(bytes);
    let second = Sha256::digest(first);
    let digest: [u8; 32] = second.into();
    FixedHash::from(digest)
}

/// Assembles hash inputs byte for byte: integers little-endian at their declared width, hashes as
/// raw digest bytes, variable-length data behind a compact-size count. No padding, no length
/// prefixes beyond the explicit compact sizes. Changing any of this forks the chain.
#[derive(Debug, Clone, Default)]
pub struct HashWriter {
    buf: Vec<u8>,
}

impl HashWriter {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn u8(mut self, v: u8) -> Self {
        self.buf.push(v);
        self
    }

    pub fn u32_le(mut self, v: u32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i32_le(mut self, v: i32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u64_le(mut self, v: u64) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i64_le(mut self, v: i64) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn hash(mut self, v: &FixedHash) -> Self {
        self.buf.extend_from_slice(v.as_bytes());
        self
    }

    pub fn bytes(mut self, v: &[u8]) -> Self {
        self.buf.extend_from_slice(v);
        self
    }

    /// The Satoshi variable-length integer used for all serialized counts.
    pub fn compact_size(mut self, v: u64) -> Self {
        match v {
            0..=0xfc => self.buf.push(v as u8),
            0xfd..=0xffff => {
                self.buf.push(0xfd);
                self.buf.extend_from_slice(&(v as u16).to_le_bytes());
            },
            0x10000..=0xffff_ffff => {
                self.buf.push(0xfe);
                self.buf.extend_from_slice(&(v as u32).to_le_bytes());
            },
            _ => {
                self.buf.push(0xff);
                self.buf.extend_from_slice(&v.to_le_bytes());
            },
        }
        self
    }

    /// Variable-length data: compact-size count followed by the raw bytes.
    pub fn var_bytes(self, v: &[u8]) -> Self {
        self.compact_size(v.len() as u64).bytes(v)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn finalize(self) -> FixedHash {
        sha256d(&self.buf)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sha256d_empty_input() {
        // SHA256(SHA256("")), the canonical double-hash test vector.
        assert_eq!(
            sha256d(b"").to_hex(),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }

    #[test]
    fn writer_layout_is_little_endian_and_unpadded() {
        let buf = HashWriter::new()
            .u64_le(0x1122_3344_5566_7788)
            .u32_le(0xaabb_ccdd)
            .into_bytes();
        assert_eq!(buf, vec![
            0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11, 0xdd, 0xcc, 0xbb, 0xaa
        ]);
    }

    #[test]
    fn compact_size_thresholds() {
        assert_eq!(HashWriter::new().compact_size(0xfc).into_bytes(), vec![0xfc]);
        assert_eq!(HashWriter::new().compact_size(0xfd).into_bytes(), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(HashWriter::new().compact_size(0x10000).into_bytes(), vec![
            0xfe, 0x00, 0x00, 0x01, 0x00
        ]);
    }

    #[test]
    fn writer_hash_appends_raw_digest_bytes() {
        let h = sha256d(b"abc");
        let buf = HashWriter::new().hash(&h).into_bytes();
        assert_eq!(&buf, h.as_bytes());
    }
}
