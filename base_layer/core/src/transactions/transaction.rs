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

use helios_common_types::types::TxHash;
use serde::{Deserialize, Serialize};

use crate::hashing::HashWriter;

/// One whole coin, in base units.
pub const COIN: i64 = 100_000_000;
pub const CENT: i64 = 1_000_000;

/// Reference to a specific output of a previous transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: TxHash,
    pub n: u32,
}

impl OutPoint {
    pub fn new(hash: TxHash, n: u32) -> Self {
        Self { hash, n }
    }

    pub fn null() -> Self {
        Self {
            hash: TxHash::zero(),
            n: u32::MAX,
        }
    }

    pub fn is_null(&self) -> bool {
        self.hash.is_zero() && self.n == u32::MAX
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

impl TxIn {
    pub fn new(prevout: OutPoint) -> Self {
        Self {
            prevout,
            script_sig: Vec::new(),
            sequence: u32::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: i64,
    pub script_pubkey: Vec<u8>,
}

impl TxOut {
    pub fn new(value: i64, script_pubkey: Vec<u8>) -> Self {
        Self { value, script_pubkey }
    }

    /// An empty output carries no value and no script; the first output of a coinstake must be
    /// empty, marking the transaction type on the wire.
    pub fn is_empty(&self) -> bool {
        self.value == 0 && self.script_pubkey.is_empty()
    }
}

/// A timestamped UTXO transaction. The `time` field takes part in kernel hashing, which is why it
/// sits in the serialized layout directly after the version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: i32,
    pub time: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].prevout.is_null()
    }

    /// A coinstake spends a real previous output and mints through its later outputs, with the
    /// first output left empty as a marker.
    pub fn is_coinstake(&self) -> bool {
        !self.inputs.is_empty() &&
            !self.inputs[0].prevout.is_null() &&
            self.outputs.len() >= 2 &&
            self.outputs[0].is_empty()
    }

    pub fn serialize_into(&self, mut writer: HashWriter) -> HashWriter {
        writer = writer
            .i32_le(self.version)
            .u32_le(self.time)
            .compact_size(self.inputs.len() as u64);
        for input in &self.inputs {
            writer = writer
                .hash(&input.prevout.hash)
                .u32_le(input.prevout.n)
                .var_bytes(&input.script_sig)
                .u32_le(input.sequence);
        }
        writer = writer.compact_size(self.outputs.len() as u64);
        for output in &self.outputs {
            writer = writer.i64_le(output.value).var_bytes(&output.script_pubkey);
        }
        writer.u32_le(self.lock_time)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.serialize_into(HashWriter::new()).into_bytes()
    }

    pub fn serialized_size(&self) -> usize {
        self.serialize_into(HashWriter::new()).len()
    }

    pub fn hash(&self) -> TxHash {
        self.serialize_into(HashWriter::new()).finalize()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn spend(prevout: OutPoint, outputs: Vec<TxOut>) -> Transaction {
        Transaction {
            version: 1,
            time: 1_500_000_000,
            inputs: vec![TxIn::new(prevout)],
            outputs,
            lock_time: 0,
        }
    }

    fn some_outpoint() -> OutPoint {
        OutPoint::new(crate::hashing::sha256d(b"prev"), 0)
    }

    #[test]
    fn coinstake_requires_marker_output() {
        let tx = spend(some_outpoint(), vec![
            TxOut::new(0, Vec::new()),
            TxOut::new(50 * COIN, vec![0x51]),
        ]);
        assert!(tx.is_coinstake());
        assert!(!tx.is_coinbase());

        let not_empty_marker = spend(some_outpoint(), vec![
            TxOut::new(1, Vec::new()),
            TxOut::new(50 * COIN, vec![0x51]),
        ]);
        assert!(!not_empty_marker.is_coinstake());

        let single_output = spend(some_outpoint(), vec![TxOut::new(0, Vec::new())]);
        assert!(!single_output.is_coinstake());
    }

    #[test]
    fn coinbase_is_not_coinstake() {
        let tx = spend(OutPoint::null(), vec![
            TxOut::new(0, Vec::new()),
            TxOut::new(50 * COIN, vec![0x51]),
        ]);
        assert!(tx.is_coinbase());
        assert!(!tx.is_coinstake());
    }

    #[test]
    fn serialization_starts_with_version_then_time() {
        let tx = spend(some_outpoint(), vec![TxOut::new(0, Vec::new()), TxOut::new(1, vec![0x51])]);
        let bytes = tx.to_bytes();
        assert_eq!(&bytes[0..4], &1i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &1_500_000_000u32.to_le_bytes());
        assert_eq!(bytes.len(), tx.serialized_size());
    }

    #[test]
    fn hash_commits_to_time() {
        let tx = spend(some_outpoint(), vec![TxOut::new(0, Vec::new()), TxOut::new(1, vec![0x51])]);
        let mut later = tx.clone();
        later.time += 1;
        assert_ne!(tx.hash(), later.hash());
    }
}
