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

use helios_common_types::types::{BlockHash, FixedHash};
use serde::{Deserialize, Serialize};

use crate::hashing::HashWriter;

/// Serialized size of a block header. Transaction byte offsets recorded by the transaction index
/// are relative to the end of the header; kernel hashing adds this back in.
pub const BLOCK_HEADER_SIZE: u32 = 80;

/// The 80-byte block header. Hashed over its little-endian serialization with double SHA-256.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_hash: BlockHash,
    pub merkle_root: FixedHash,
    pub time: u32,
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    pub fn new(version: i32) -> Self {
        Self {
            version,
            prev_hash: BlockHash::zero(),
            merkle_root: FixedHash::zero(),
            time: 0,
            bits: 0,
            nonce: 0,
        }
    }

    fn serialize_into(&self, writer: HashWriter) -> HashWriter {
        writer
            .i32_le(self.version)
            .hash(&self.prev_hash)
            .hash(&self.merkle_root)
            .u32_le(self.time)
            .u32_le(self.bits)
            .u32_le(self.nonce)
    }

    pub fn hash(&self) -> BlockHash {
        self.serialize_into(HashWriter::new()).finalize()
    }

    /// The single bit this block contributes to a stake modifier, fixed at assembly time as the
    /// lowest bit of the header hash.
    pub fn stake_entropy_bit(&self) -> u8 {
        (self.hash().to_u256().low_u64() & 1) as u8
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn header_serializes_to_eighty_bytes() {
        let header = BlockHeader::new(1);
        let buf = header.serialize_into(HashWriter::new()).into_bytes();
        assert_eq!(buf.len() as u32, BLOCK_HEADER_SIZE);
    }

    #[test]
    fn hash_commits_to_every_field() {
        let header = BlockHeader::new(1);
        let base = header.hash();
        for change in 0..4 {
            let mut other = header.clone();
            match change {
                0 => other.version = 2,
                1 => other.time = 1,
                2 => other.bits = 1,
                _ => other.nonce = 1,
            }
            assert_ne!(other.hash(), base);
        }
    }

    #[test]
    fn entropy_bit_is_lowest_hash_bit() {
        let header = BlockHeader::new(1);
        let expected = header.hash().as_bytes()[31] & 1;
        assert_eq!(header.stake_entropy_bit(), expected);
    }
}
