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

use std::collections::HashMap;

use helios_common_types::types::{BlockHash, FixedHash, TxHash};
use log::*;

use crate::{
    blocks::Block,
    chain_storage::{BlockIndex, BlockIndexFlags, BlockchainBackend, ChainStorageError},
    consensus::ConsensusConstants,
    proof_of_stake::{
        check_stake_modifier_checkpoints,
        compact::difficulty_from_bits,
        compute_next_stake_modifier,
        stake_modifier_checksum_parts,
    },
    transactions::Transaction,
};

const LOG_TARGET: &str = "c::cs::memory_db";

/// An in-memory chain store: the reference [`BlockchainBackend`] and the block-acceptance driver
/// used by tests and tools. Index records live in an arena keyed by block hash; the active chain
/// is the append-only vector of hashes by height.
#[derive(Debug, Clone)]
pub struct MemoryDatabase {
    constants: ConsensusConstants,
    indexes: HashMap<BlockHash, BlockIndex>,
    blocks: HashMap<BlockHash, Block>,
    transactions: HashMap<TxHash, (BlockHash, u32)>,
    chain: Vec<BlockHash>,
    adjusted_time: i64,
}

impl MemoryDatabase {
    pub fn new(constants: ConsensusConstants) -> Self {
        Self {
            constants,
            indexes: HashMap::new(),
            blocks: HashMap::new(),
            transactions: HashMap::new(),
            chain: Vec::new(),
            adjusted_time: 0,
        }
    }

    pub fn constants(&self) -> &ConsensusConstants {
        &self.constants
    }

    pub fn set_adjusted_time(&mut self, unix_seconds: i64) {
        self.adjusted_time = unix_seconds;
    }

    pub fn tip_hash(&self) -> Option<BlockHash> {
        self.chain.last().copied()
    }

    pub fn tip_height(&self) -> Option<u64> {
        self.chain.len().checked_sub(1).map(|h| h as u64)
    }

    pub fn block_hash_at_height(&self, height: u64) -> Option<BlockHash> {
        self.chain.get(height as usize).copied()
    }

    /// Accept a block onto the tip of the active chain without a kernel proof (proof-of-work era
    /// blocks, or tests that do not exercise the kernel hash).
    pub fn add_block(&mut self, block: Block) -> Result<BlockIndex, ChainStorageError> {
        self.add_block_with_stake_proof(block, FixedHash::zero())
    }

    /// Accept a block onto the tip of the active chain, recording the given kernel hash as its
    /// proof of stake.
    ///
    /// This performs the once-per-block index transition: derive the entropy bit from the header,
    /// run the stake-modifier computation exactly once, chain the modifier checksum from the
    /// predecessor and verify it against the hard-coded checkpoints.
    pub fn add_block_with_stake_proof(
        &mut self,
        block: Block,
        hash_proof_of_stake: FixedHash,
    ) -> Result<BlockIndex, ChainStorageError> {
        let hash = block.hash();
        let prev_index = match self.tip_hash() {
            Some(tip) => {
                if block.header.prev_hash != tip {
                    return Err(ChainStorageError::OrphanBlock { hash });
                }
                Some(self.indexes[&tip].clone())
            },
            None => None,
        };

        let height = prev_index.as_ref().map(|prev| prev.height + 1).unwrap_or(0);
        let mut index = BlockIndex {
            height,
            hash,
            prev: prev_index.as_ref().map(|prev| prev.hash),
            time: block.time(),
            bits: block.header.bits,
            flags: BlockIndexFlags::empty(),
            stake_modifier: 0,
            hash_proof_of_stake,
            stake_modifier_checksum: 0,
        };
        index.set_stake_entropy_bit(block.header.stake_entropy_bit());

        let (modifier, generated) =
            compute_next_stake_modifier(&*self, prev_index.as_ref(), &self.constants).map_err(|e| {
                ChainStorageError::StakeModifierFailed {
                    hash,
                    message: e.to_string(),
                }
            })?;
        index.set_stake_modifier(modifier, generated);

        index.stake_modifier_checksum = stake_modifier_checksum_parts(
            prev_index.as_ref().map(|prev| prev.stake_modifier_checksum),
            index.flags.bits(),
            &index.hash_proof_of_stake,
            index.stake_modifier,
        );
        if !check_stake_modifier_checkpoints(self.constants.network(), height, index.stake_modifier_checksum) {
            error!(
                target: LOG_TARGET,
                "Rejected block {} at height {}: stake modifier checksum 0x{:08x} fails checkpoint",
                hash,
                height,
                index.stake_modifier_checksum
            );
            return Err(ChainStorageError::CheckpointMismatch { height });
        }

        for (tx, offset) in block.transactions.iter().zip(block.transaction_offsets()) {
            self.transactions.insert(tx.hash(), (hash, offset));
        }
        self.blocks.insert(hash, block);
        self.indexes.insert(hash, index.clone());
        self.chain.push(hash);
        trace!(
            target: LOG_TARGET,
            "Accepted block {} at height {} (modifier 0x{:016x}, generated: {})",
            hash,
            height,
            modifier,
            generated
        );
        Ok(index)
    }
}

impl BlockchainBackend for MemoryDatabase {
    fn fetch_block_index(&self, hash: &BlockHash) -> Result<Option<BlockIndex>, ChainStorageError> {
        Ok(self.indexes.get(hash).cloned())
    }

    fn fetch_next_block_index(&self, hash: &BlockHash) -> Result<Option<BlockIndex>, ChainStorageError> {
        let index = match self.indexes.get(hash) {
            Some(index) => index,
            None => return Ok(None),
        };
        // Only blocks on the active chain have a successor.
        if self.block_hash_at_height(index.height) != Some(*hash) {
            return Ok(None);
        }
        Ok(self
            .block_hash_at_height(index.height + 1)
            .and_then(|next| self.indexes.get(&next).cloned()))
    }

    fn fetch_tip_index(&self) -> Result<Option<BlockIndex>, ChainStorageError> {
        Ok(self.tip_hash().and_then(|hash| self.indexes.get(&hash).cloned()))
    }

    fn fetch_block(&self, hash: &BlockHash) -> Result<Option<Block>, ChainStorageError> {
        Ok(self.blocks.get(hash).cloned())
    }

    fn fetch_transaction(
        &self,
        hash: &TxHash,
    ) -> Result<Option<(Transaction, BlockHash, u32)>, ChainStorageError> {
        let (block_hash, offset) = match self.transactions.get(hash) {
            Some(entry) => *entry,
            None => return Ok(None),
        };
        let block = self
            .blocks
            .get(&block_hash)
            .ok_or(ChainStorageError::BlockNotFound(block_hash))?;
        let tx = block
            .transactions
            .iter()
            .find(|tx| tx.hash() == *hash)
            .cloned()
            .ok_or_else(|| ChainStorageError::AccessError(format!("transaction index desync for {hash}")))?;
        Ok(Some((tx, block_hash, offset)))
    }

    fn fetch_difficulty(&self, index: &BlockIndex) -> Result<f64, ChainStorageError> {
        Ok(difficulty_from_bits(index.bits))
    }

    fn adjusted_time(&self) -> i64 {
        self.adjusted_time
    }
}
