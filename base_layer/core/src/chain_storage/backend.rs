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

use helios_common_types::types::{BlockHash, TxHash};

use crate::{
    blocks::Block,
    chain_storage::{BlockIndex, ChainStorageError},
    transactions::Transaction,
};

/// The lookups the stake-time kernel requires from whatever stores the chain.
///
/// Callers of the kernel hold a chain lock for the duration of each call: every method must
/// observe a single consistent chain view, and the active-chain successor in particular must not
/// move under a running kernel operation.
pub trait BlockchainBackend {
    /// The index record of the block with the given hash, on any chain.
    fn fetch_block_index(&self, hash: &BlockHash) -> Result<Option<BlockIndex>, ChainStorageError>;

    /// The successor of the given block on the active chain, or `None` at the tip.
    fn fetch_next_block_index(&self, hash: &BlockHash) -> Result<Option<BlockIndex>, ChainStorageError>;

    /// The index record of the active chain tip, or `None` on an empty chain.
    fn fetch_tip_index(&self) -> Result<Option<BlockIndex>, ChainStorageError>;

    /// The full block body for the given block hash.
    fn fetch_block(&self, hash: &BlockHash) -> Result<Option<Block>, ChainStorageError>;

    /// A transaction along with the hash of its containing block and its byte offset within that
    /// block's transaction area.
    fn fetch_transaction(
        &self,
        hash: &TxHash,
    ) -> Result<Option<(Transaction, BlockHash, u32)>, ChainStorageError>;

    /// The conventional floating-point difficulty of the given block.
    fn fetch_difficulty(&self, index: &BlockIndex) -> Result<f64, ChainStorageError>;

    /// Network-adjusted unix time in seconds.
    fn adjusted_time(&self) -> i64;
}
