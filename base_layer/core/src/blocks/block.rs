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

use crate::{
    blocks::BlockHeader,
    hashing::{sha256d, HashWriter},
    transactions::Transaction,
};

/// A full block: the 80-byte header followed by a compact-size transaction count and the
/// serialized transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn hash(&self) -> BlockHash {
        self.header.hash()
    }

    pub fn time(&self) -> i64 {
        i64::from(self.header.time)
    }

    /// Byte offset of every transaction within the serialized transaction area of this block
    /// (everything after the header, starting with the transaction count).
    pub fn transaction_offsets(&self) -> Vec<u32> {
        let count_prefix = HashWriter::new().compact_size(self.transactions.len() as u64).len();
        let mut offsets = Vec::with_capacity(self.transactions.len());
        let mut offset = count_prefix as u32;
        for tx in &self.transactions {
            offsets.push(offset);
            offset += tx.serialized_size() as u32;
        }
        offsets
    }
}

/// Pairwise double-SHA-256 merkle root over the transaction hashes, duplicating the last entry of
/// odd-length levels.
pub fn calculate_merkle_root<'a, I: IntoIterator<Item = &'a Transaction>>(transactions: I) -> FixedHash {
    let mut level: Vec<FixedHash> = transactions.into_iter().map(Transaction::hash).collect();
    if level.is_empty() {
        return FixedHash::zero();
    }
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let tail = level[level.len() - 1];
            level.push(tail);
        }
        level = level
            .chunks(2)
            .map(|pair| {
                let mut buf = [0u8; 64];
                buf[..32].copy_from_slice(pair[0].as_bytes());
                buf[32..].copy_from_slice(pair[1].as_bytes());
                sha256d(&buf)
            })
            .collect();
    }
    level[0]
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transactions::{OutPoint, TxIn, TxOut};

    fn tx(value: i64) -> Transaction {
        Transaction {
            version: 1,
            time: 1_400_000_000,
            inputs: vec![TxIn::new(OutPoint::null())],
            outputs: vec![TxOut::new(value, vec![0x51])],
            lock_time: 0,
        }
    }

    #[test]
    fn offsets_start_after_count_prefix_and_accumulate() {
        let block = Block {
            header: BlockHeader::new(1),
            transactions: vec![tx(1), tx(2), tx(3)],
        };
        let offsets = block.transaction_offsets();
        assert_eq!(offsets[0], 1);
        assert_eq!(offsets[1], 1 + block.transactions[0].serialized_size() as u32);
        assert_eq!(offsets[2], offsets[1] + block.transactions[1].serialized_size() as u32);
    }

    #[test]
    fn merkle_root_of_single_transaction_is_its_hash() {
        let t = tx(1);
        assert_eq!(calculate_merkle_root([&t]), t.hash());
    }

    #[test]
    fn merkle_root_duplicates_odd_tail() {
        let (a, b, c) = (tx(1), tx(2), tx(3));
        let three = calculate_merkle_root([&a, &b, &c]);
        let four = calculate_merkle_root([&a, &b, &c, &c]);
        assert_eq!(three, four);
        assert_ne!(three, calculate_merkle_root([&a, &b]));
    }
}
