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
use primitive_types::U256;
use thiserror::Error;

use crate::chain_storage::ChainStorageError;

/// Everything the kernel can reject. Missing-data variants commonly mean "not yet synced" and the
/// caller retries later; the consensus-violation variants are final for the block in question.
#[derive(Debug, Error)]
pub enum ProofOfStakeError {
    #[error("Chain storage error: {0}")]
    ChainStorageError(#[from] ChainStorageError),
    #[error("Block {0} is not in the block index")]
    BlockNotIndexed(BlockHash),
    #[error("Full block {0} could not be read")]
    BlockNotReadable(BlockHash),
    #[error("Transaction {0} could not be found")]
    TransactionNotFound(TxHash),
    #[error("The ancestry of block {0} contains no generated stake modifier")]
    MissingLastModifier(BlockHash),
    #[error("No candidate block could be selected for the stake modifier")]
    NoCandidateSelected,
    #[error("The active chain does not yet reach a stake modifier for block {0}")]
    ModifierNotAvailable(BlockHash),
    #[error("Transaction is not a coinstake")]
    NotCoinstake,
    #[error("Output index {index} is out of range for transaction {tx}")]
    OutputIndexOutOfRange { tx: TxHash, index: u32 },
    #[error("Coinstake timestamp {tx_time} is earlier than the staked output's timestamp {prev_time}")]
    TimestampViolation { tx_time: u32, prev_time: u32 },
    #[error("Staked output confirmed at {block_time} does not meet the minimum age at {tx_time}")]
    MinAgeViolation { block_time: i64, tx_time: u32 },
    #[error("Kernel hash {hash:064x} exceeds the stake target {target:064x}")]
    TargetNotMet { hash: U256, target: U256 },
}
