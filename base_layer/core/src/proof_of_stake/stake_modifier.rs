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

//! The per-interval stake modifier: 64 bits of entropy, each contributed by a block selected
//! pseudo-randomly from a distinct, progressively widening window of recent history. A staker
//! cannot know at output-confirmation time which modifier will govern their kernel, which is what
//! makes precomputing future kernels infeasible.

use std::collections::HashSet;

use helios_common_types::types::{BlockHash, FixedHash};
use log::*;
use primitive_types::U256;

use crate::{
    chain_storage::{BlockIndex, BlockchainBackend},
    consensus::ConsensusConstants,
    hashing::HashWriter,
    proof_of_stake::ProofOfStakeError,
};

const LOG_TARGET: &str = "c::pos::stake_modifier";

/// Number of selection rounds, and of bits in a stake modifier.
const SELECTION_SECTIONS: usize = 64;

/// Length in seconds of one section of the selection interval. Sections grow with the round
/// number, so early rounds pick from tighter windows.
pub fn selection_interval_section(constants: &ConsensusConstants, section: usize) -> i64 {
    debug_assert!(section < SELECTION_SECTIONS);
    constants.modifier_interval() * 63 /
        (63 + (63 - section as i64) * (constants.modifier_interval_ratio() - 1))
}

/// The full selection window: the sum of all 64 sections.
pub fn stake_modifier_selection_interval(constants: &ConsensusConstants) -> i64 {
    (0..SELECTION_SECTIONS)
        .map(|section| selection_interval_section(constants, section))
        .sum()
}

/// A candidate's rank for one selection round: the double-SHA-256 of its proof hash and the
/// previous modifier, taken as a 256-bit integer. Proof-of-stake blocks are shifted right 32 bits
/// so they always outrank proof-of-work blocks.
fn selection_rank(proof_hash: &FixedHash, prev_modifier: u64, is_proof_of_stake: bool) -> U256 {
    let digest = HashWriter::new().hash(proof_hash).u64_le(prev_modifier).finalize();
    let mut rank = digest.to_u256();
    if is_proof_of_stake {
        rank >>= 32;
    }
    rank
}

/// Pick the lowest-ranked not-yet-selected block from the sorted candidate vector. Once a block
/// has been selected, iteration stops at the first candidate past the round's cutoff timestamp;
/// the earliest acceptable pick may itself lie past the cutoff.
fn select_block_from_candidates<B: BlockchainBackend>(
    db: &B,
    sorted_by_timestamp: &[(i64, BlockHash)],
    selected: &HashSet<BlockHash>,
    selection_interval_stop: i64,
    prev_modifier: u64,
    constants: &ConsensusConstants,
) -> Result<BlockIndex, ProofOfStakeError> {
    let mut best: Option<(U256, BlockIndex)> = None;
    for (_, hash) in sorted_by_timestamp {
        let index = db
            .fetch_block_index(hash)?
            .ok_or(ProofOfStakeError::BlockNotIndexed(*hash))?;
        if best.is_some() && index.time > selection_interval_stop {
            break;
        }
        if selected.contains(hash) {
            continue;
        }
        let is_proof_of_stake = constants.is_proof_of_stake_height(index.height);
        let proof = if is_proof_of_stake {
            index.hash_proof_of_stake
        } else {
            index.hash
        };
        let rank = selection_rank(&proof, prev_modifier, is_proof_of_stake);
        match &best {
            Some((best_rank, _)) if rank >= *best_rank => {},
            _ => best = Some((rank, index)),
        }
    }
    best.map(|(_, index)| index)
        .ok_or(ProofOfStakeError::NoCandidateSelected)
}

/// The most recent generated modifier at or before `index`, with its generation time.
fn last_stake_modifier<B: BlockchainBackend>(
    db: &B,
    index: &BlockIndex,
) -> Result<(u64, i64), ProofOfStakeError> {
    let mut cursor = index.clone();
    while !cursor.generated_stake_modifier() {
        match cursor.prev {
            Some(prev_hash) => {
                cursor = db
                    .fetch_block_index(&prev_hash)?
                    .ok_or(ProofOfStakeError::BlockNotIndexed(prev_hash))?;
            },
            None => return Err(ProofOfStakeError::MissingLastModifier(index.hash)),
        }
    }
    Ok((cursor.stake_modifier, cursor.time))
}

/// Compute the stake modifier for the block about to be appended after `prev_index`.
///
/// Returns `(modifier, generated)`: when no interval boundary has been crossed since the last
/// generated modifier, the previous modifier is inherited and `generated` is false. The result is
/// written once into the new block's index entry and never recomputed.
pub fn compute_next_stake_modifier<B: BlockchainBackend>(
    db: &B,
    prev_index: Option<&BlockIndex>,
    constants: &ConsensusConstants,
) -> Result<(u64, bool), ProofOfStakeError> {
    let prev_index = match prev_index {
        Some(index) => index,
        // Genesis gets the zero modifier, marked generated.
        None => return Ok((0, true)),
    };

    let (prev_modifier, modifier_time) = last_stake_modifier(db, prev_index)?;
    if modifier_time / constants.modifier_interval() >= prev_index.time / constants.modifier_interval() {
        return Ok((prev_modifier, false));
    }

    // Collect every block whose time falls inside the selection window ending at the interval
    // boundary before prev_index.
    let selection_interval = stake_modifier_selection_interval(constants);
    let selection_start =
        (prev_index.time / constants.modifier_interval()) * constants.modifier_interval() - selection_interval;
    let mut candidates: Vec<(i64, BlockHash)> =
        Vec::with_capacity((selection_interval / constants.target_spacing().max(1)) as usize + 1);
    let mut cursor = prev_index.clone();
    let first_candidate_height;
    loop {
        if cursor.time < selection_start {
            first_candidate_height = cursor.height + 1;
            break;
        }
        candidates.push((cursor.time, cursor.hash));
        match cursor.prev {
            Some(prev_hash) => {
                cursor = db
                    .fetch_block_index(&prev_hash)?
                    .ok_or(ProofOfStakeError::BlockNotIndexed(prev_hash))?;
            },
            None => {
                first_candidate_height = 0;
                break;
            },
        }
    }
    candidates.reverse();
    // Ties on time break on the hash taken as a big-endian integer. Legacy history contains
    // equal-timestamp runs whose settled order is exactly this.
    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let mut new_modifier: u64 = 0;
    let mut selection_interval_stop = selection_start;
    let mut selected: HashSet<BlockHash> = HashSet::new();
    let rounds = candidates.len().min(SELECTION_SECTIONS);
    for round in 0..rounds {
        selection_interval_stop += selection_interval_section(constants, round);
        let index = select_block_from_candidates(
            db,
            &candidates,
            &selected,
            selection_interval_stop,
            prev_modifier,
            constants,
        )?;
        new_modifier |= index.stake_entropy_bit() << round;
        selected.insert(index.hash);
        trace!(
            target: LOG_TARGET,
            "selected block at height {} for modifier round {} (stop {}, entropy bit {})",
            index.height,
            round,
            selection_interval_stop,
            index.stake_entropy_bit()
        );
    }

    debug!(
        target: LOG_TARGET,
        "new stake modifier 0x{:016x} after block at height {} ({} candidates from height {})",
        new_modifier,
        prev_index.height,
        candidates.len(),
        first_candidate_height
    );
    Ok((new_modifier, true))
}

/// The stake modifier that governs a kernel whose staked output was confirmed in `block_from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelStakeModifier {
    pub modifier: u64,
    /// Height of the block whose modifier generation is being used.
    pub height: u64,
    /// Time of that block.
    pub time: i64,
}

/// Walk the active chain forward from the staked output's block until one selection interval has
/// elapsed, and return the modifier in effect there. Until the chain extends that far the kernel
/// is simply not yet verifiable.
pub fn kernel_stake_modifier<B: BlockchainBackend>(
    db: &B,
    block_from_hash: &BlockHash,
    constants: &ConsensusConstants,
) -> Result<KernelStakeModifier, ProofOfStakeError> {
    let source = db
        .fetch_block_index(block_from_hash)?
        .ok_or(ProofOfStakeError::BlockNotIndexed(*block_from_hash))?;
    let selection_interval = stake_modifier_selection_interval(constants);
    let target_time = source.time + selection_interval;
    let mut modifier_height = source.height;
    let mut modifier_time = source.time;
    let mut cursor = source;
    while cursor.time < target_time {
        match db.fetch_next_block_index(&cursor.hash)? {
            Some(next) => {
                cursor = next;
                if cursor.generated_stake_modifier() {
                    modifier_height = cursor.height;
                    modifier_time = cursor.time;
                }
            },
            None => {
                if cursor.time + constants.stake_min_age() - selection_interval > db.adjusted_time() {
                    error!(
                        target: LOG_TARGET,
                        "reached best block {} at height {} before a stake modifier for block {} was available",
                        cursor.hash,
                        cursor.height,
                        block_from_hash
                    );
                } else {
                    debug!(
                        target: LOG_TARGET,
                        "chain does not yet extend a selection interval past block {}", block_from_hash
                    );
                }
                return Err(ProofOfStakeError::ModifierNotAvailable(*block_from_hash));
            },
        }
    }
    Ok(KernelStakeModifier {
        modifier: cursor.stake_modifier,
        height: modifier_height,
        time: modifier_time,
    })
}
