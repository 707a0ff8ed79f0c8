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

//! The coinstake kernel check. A kernel hash commits to the governing stake modifier, the staked
//! output's on-chain position (block time, byte offset, transaction time, output index) and the
//! coinstake timestamp, so neither transaction reshuffling nor timestamp shopping yields a fresh
//! lottery ticket for the same output.

use helios_common_types::types::FixedHash;
use log::*;
use primitive_types::{U256, U512};

use crate::{
    blocks::{Block, BLOCK_HEADER_SIZE},
    chain_storage::{BlockIndex, BlockchainBackend},
    consensus::ConsensusConstants,
    hashing::HashWriter,
    proof_of_stake::{
        compact::expand_compact,
        kernel_stake_modifier,
        stake_time_factored_weight,
        ProofOfStakeError,
        StakeWeightCache,
    },
    transactions::{OutPoint, Transaction, CENT, COIN},
};

const LOG_TARGET: &str = "c::pos::kernel";

/// Longest span an output accrues stake time for in the reward path.
const MAX_STAKE_TIME_SPAN: i64 = 30 * 24 * 60 * 60;

/// The outcome of a kernel check: the kernel hash (stored as the block's proof of stake) and the
/// target it was measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelProof {
    pub hash: FixedHash,
    pub target: U256,
}

/// Verify a coinstake kernel against its stake-time-scaled target.
///
/// `block_from` is the block that confirmed the staked output, `tx_offset` the byte offset of
/// `tx_prev` within that block including the 80-byte header, and `prev_index` the predecessor of
/// the current tip (the anchor for the network weight average). The kernel hash and target are
/// returned on success and carried inside [`ProofOfStakeError::TargetNotMet`] on rejection.
#[allow(clippy::too_many_arguments)]
pub fn check_stake_time_kernel_hash<B: BlockchainBackend>(
    db: &B,
    cache: &StakeWeightCache,
    bits: u32,
    block_from: &Block,
    tx_offset: u32,
    tx_prev: &Transaction,
    prevout: &OutPoint,
    tx_time: u32,
    prev_index: Option<&BlockIndex>,
    constants: &ConsensusConstants,
) -> Result<KernelProof, ProofOfStakeError> {
    if tx_time < tx_prev.time {
        return Err(ProofOfStakeError::TimestampViolation {
            tx_time,
            prev_time: tx_prev.time,
        });
    }
    let block_from_time = block_from.time();
    if block_from_time + constants.stake_min_age() > i64::from(tx_time) {
        return Err(ProofOfStakeError::MinAgeViolation {
            block_time: block_from_time,
            tx_time,
        });
    }

    let (target_per_coin_day, target_negative) = expand_compact(bits);
    let value_in = tx_prev
        .outputs
        .get(prevout.n as usize)
        .ok_or(ProofOfStakeError::OutputIndexOutOfRange {
            tx: prevout.hash,
            index: prevout.n,
        })?
        .value;

    // Weight accrues from the moment the minimum age is met. Never clamped: a pathological
    // negative span must stay negative so the kernel cannot pass.
    let time_weight = i64::from(tx_time) - i64::from(tx_prev.time) - constants.stake_min_age();
    let coin_day_weight =
        i128::from(value_in) * i128::from(time_weight) / i128::from(COIN) / (24 * 60 * 60);
    let factored_time_weight =
        stake_time_factored_weight(db, cache, time_weight, coin_day_weight, prev_index, constants)?;
    let stake_time_weight =
        i128::from(value_in) * i128::from(factored_time_weight) / i128::from(COIN) / (24 * 60 * 60);

    let block_from_hash = block_from.hash();
    let modifier = kernel_stake_modifier(db, &block_from_hash, constants)?;

    let hash = HashWriter::new()
        .u64_le(modifier.modifier)
        .u32_le(block_from.header.time)
        .u32_le(tx_offset)
        .u32_le(tx_prev.time)
        .u32_le(prevout.n)
        .u32_le(tx_time)
        .finalize();

    // The weight/target product is compared at full width; only the reported target truncates to
    // 256 bits.
    let target_is_negative = target_negative ^ (stake_time_weight < 0);
    let full_target = target_per_coin_day.full_mul(U256::from(stake_time_weight.unsigned_abs()));
    let target = low_256(full_target);

    let block_from_index = db
        .fetch_block_index(&block_from_hash)?
        .ok_or(ProofOfStakeError::BlockNotIndexed(block_from_hash))?;
    if constants.is_proof_of_stake_height(block_from_index.height) &&
        (target_is_negative || U512::from(hash.to_u256()) > full_target)
    {
        debug!(
            target: LOG_TARGET,
            "kernel hash for {}:{} misses target (modifier 0x{:016x} from height {})",
            prevout.hash,
            prevout.n,
            modifier.modifier,
            modifier.height
        );
        return Err(ProofOfStakeError::TargetNotMet {
            hash: hash.to_u256(),
            target,
        });
    }

    debug!(
        target: LOG_TARGET,
        "kernel accepted for {}:{} using modifier 0x{:016x} generated at height {} ({})",
        prevout.hash,
        prevout.n,
        modifier.modifier,
        modifier.height,
        modifier.time
    );
    Ok(KernelProof { hash, target })
}

/// Validate the coinstake of an incoming block: resolve the staked output, read its confirming
/// block and run the kernel check anchored at the current tip's predecessor.
pub fn check_proof_of_stake<B: BlockchainBackend>(
    db: &B,
    cache: &StakeWeightCache,
    tx: &Transaction,
    bits: u32,
    constants: &ConsensusConstants,
) -> Result<KernelProof, ProofOfStakeError> {
    if !tx.is_coinstake() {
        return Err(ProofOfStakeError::NotCoinstake);
    }
    let txin = &tx.inputs[0];
    let (tx_prev, block_hash, offset) = db
        .fetch_transaction(&txin.prevout.hash)?
        .ok_or(ProofOfStakeError::TransactionNotFound(txin.prevout.hash))?;
    // The stored offset is relative to the transaction area; the kernel serializes the
    // header-inclusive position.
    let tx_offset = offset + BLOCK_HEADER_SIZE;
    let block_from = db
        .fetch_block(&block_hash)?
        .ok_or(ProofOfStakeError::BlockNotReadable(block_hash))?;
    let prev_index = match db.fetch_tip_index()? {
        Some(tip) => match tip.prev {
            Some(prev_hash) => db.fetch_block_index(&prev_hash)?,
            None => None,
        },
        None => None,
    };
    check_stake_time_kernel_hash(
        db,
        cache,
        bits,
        &block_from,
        tx_offset,
        &tx_prev,
        &txin.prevout,
        tx.time,
        prev_index.as_ref(),
        constants,
    )
}

/// Total stake time of a transaction in coin·days, for reward accounting: each input's value
/// scaled by its factored time weight. Inputs whose confirming block is younger than the minimum
/// stake age contribute nothing; an input timestamped after the spending transaction aborts.
pub fn get_stake_time<B: BlockchainBackend>(
    db: &B,
    cache: &StakeWeightCache,
    tx: &Transaction,
    prev_index: Option<&BlockIndex>,
    constants: &ConsensusConstants,
) -> Result<u64, ProofOfStakeError> {
    if tx.is_coinbase() {
        return Ok(0);
    }
    let mut stake_time: i128 = 0;
    for input in &tx.inputs {
        let (tx_prev, block_hash, _) = match db.fetch_transaction(&input.prevout.hash)? {
            Some(found) => found,
            // Unconfirmed previous transaction; contributes nothing.
            None => continue,
        };
        if tx.time < tx_prev.time {
            return Err(ProofOfStakeError::TimestampViolation {
                tx_time: tx.time,
                prev_time: tx_prev.time,
            });
        }
        let block_from = db
            .fetch_block(&block_hash)?
            .ok_or(ProofOfStakeError::BlockNotReadable(block_hash))?;
        if block_from.time() + constants.stake_min_age() > i64::from(tx.time) {
            continue;
        }
        let value_in = tx_prev
            .outputs
            .get(input.prevout.n as usize)
            .ok_or(ProofOfStakeError::OutputIndexOutOfRange {
                tx: input.prevout.hash,
                index: input.prevout.n,
            })?
            .value;
        let time_weight = (i64::from(tx.time) - i64::from(tx_prev.time)).min(MAX_STAKE_TIME_SPAN) -
            constants.stake_min_age();
        let coin_day_weight =
            i128::from(value_in) * i128::from(time_weight) / i128::from(COIN) / (24 * 60 * 60);
        let factored_time_weight =
            stake_time_factored_weight(db, cache, time_weight, coin_day_weight, prev_index, constants)?;
        stake_time +=
            i128::from(value_in) * i128::from(factored_time_weight) / i128::from(COIN) / (24 * 60 * 60);
    }
    Ok(clamp_to_u64(stake_time))
}

/// Plain coin-age of a transaction in coin·days, accumulated in cent-seconds. Not consulted by
/// the kernel; reward accounting uses it.
pub fn get_coin_age<B: BlockchainBackend>(
    db: &B,
    tx: &Transaction,
    constants: &ConsensusConstants,
) -> Result<u64, ProofOfStakeError> {
    if tx.is_coinbase() {
        return Ok(0);
    }
    let mut cent_seconds: i128 = 0;
    for input in &tx.inputs {
        let (tx_prev, block_hash, _) = match db.fetch_transaction(&input.prevout.hash)? {
            Some(found) => found,
            None => continue,
        };
        if tx.time < tx_prev.time {
            return Err(ProofOfStakeError::TimestampViolation {
                tx_time: tx.time,
                prev_time: tx_prev.time,
            });
        }
        let block_from = db
            .fetch_block(&block_hash)?
            .ok_or(ProofOfStakeError::BlockNotReadable(block_hash))?;
        if block_from.time() + constants.stake_min_age() > i64::from(tx.time) {
            continue;
        }
        let value_in = tx_prev
            .outputs
            .get(input.prevout.n as usize)
            .ok_or(ProofOfStakeError::OutputIndexOutOfRange {
                tx: input.prevout.hash,
                index: input.prevout.n,
            })?
            .value;
        cent_seconds += i128::from(value_in) * i128::from(i64::from(tx.time) - i64::from(tx_prev.time)) /
            i128::from(CENT);
    }
    let coin_days = cent_seconds * i128::from(CENT) / i128::from(COIN) / (24 * 60 * 60);
    Ok(clamp_to_u64(coin_days))
}

fn low_256(value: U512) -> U256 {
    let mut bytes = [0u8; 64];
    value.to_big_endian(&mut bytes);
    U256::from_big_endian(&bytes[32..])
}

fn clamp_to_u64(value: i128) -> u64 {
    value.clamp(0, i128::from(u64::MAX)) as u64
}
