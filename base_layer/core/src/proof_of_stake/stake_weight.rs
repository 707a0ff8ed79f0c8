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

//! Network-wide stake-time weighting. The kernel target scales with how much of the network's
//! recent stake weight one output represents: small stakes keep nearly their full coin-day
//! weight, and anything above the fraction ceiling collapses to no advantage at all.
//!
//! This is the one corner of consensus computed in IEEE-754 doubles (`cos`, squaring, division),
//! and it must come out bit-identical on every node. Builds must not enable fast-math or FMA
//! contraction; the branch tests below pin the behaviour at the 0.45 boundary.

use std::sync::Mutex;

use crate::{
    chain_storage::{BlockIndex, BlockchainBackend},
    consensus::ConsensusConstants,
    proof_of_stake::ProofOfStakeError,
};

/// Number of trailing proof-of-stake blocks sampled for the kernels-per-second estimate.
const STAKE_RATE_WINDOW: usize = 72;

/// Number of trailing blocks averaged into the network stake weight.
const AVERAGE_WEIGHT_WINDOW: usize = 60;

/// Consensus offset added to the rolling average.
const AVERAGE_WEIGHT_OFFSET: f64 = 21.0;

/// Fraction of the network average above which a stake is floored to no advantage.
const WEIGHT_FRACTION_CEILING: f64 = 0.45;

/// π at double precision, a consensus constant.
const STAKE_TIME_PI: f64 = std::f64::consts::PI;

/// Moving estimate of the network stake rate: accumulated difficulty of the last 72
/// proof-of-stake blocks ending at `index`, divided by the stake time they span.
///
/// From the configured fix height, negative per-block deltas (out-of-order timestamps) clamp to
/// zero; before it the historic signed accumulation is preserved bit for bit.
pub fn pos_kernels_per_second<B: BlockchainBackend>(
    db: &B,
    index: &BlockIndex,
    constants: &ConsensusConstants,
) -> Result<f64, ProofOfStakeError> {
    let mut kernels_tried = 0.0f64;
    let mut stakes_time: i64 = 0;
    let mut handled = 0usize;
    let mut prev_stake: Option<BlockIndex> = None;
    let mut cursor = Some(index.clone());
    while let Some(current) = cursor {
        if handled >= STAKE_RATE_WINDOW {
            break;
        }
        if constants.is_proof_of_stake_height(current.height) {
            kernels_tried += db.fetch_difficulty(&current)? * 4_294_967_296.0;
            if let Some(prev) = &prev_stake {
                let delta = prev.time - current.time;
                stakes_time += if current.height >= constants.negative_stake_time_fix_height() {
                    delta.max(0)
                } else {
                    delta
                };
            }
            prev_stake = Some(current.clone());
            handled += 1;
        }
        cursor = match current.prev {
            Some(prev_hash) => Some(
                db.fetch_block_index(&prev_hash)?
                    .ok_or(ProofOfStakeError::BlockNotIndexed(prev_hash))?,
            ),
            None => None,
        };
    }
    if stakes_time == 0 {
        return Ok(0.0);
    }
    Ok(kernels_tried / stakes_time as f64)
}

/// Single-slot cache for the rolling network stake weight, keyed by the height it was computed
/// at. One instance serves a process; validation is serialized by the surrounding chain lock, so
/// the mutex is effectively uncontended.
#[derive(Debug, Default)]
pub struct StakeWeightCache {
    slot: Mutex<Option<(u64, f64)>>,
}

impl StakeWeightCache {
    pub fn new() -> Self {
        Default::default()
    }

    /// Rolling mean of [`pos_kernels_per_second`] over the last 60 blocks ending at `prev` (the
    /// tip's predecessor), plus the consensus offset. A chain too short to have a predecessor
    /// weighs zero.
    pub fn average_stake_weight<B: BlockchainBackend>(
        &self,
        db: &B,
        prev: Option<&BlockIndex>,
        constants: &ConsensusConstants,
    ) -> Result<f64, ProofOfStakeError> {
        let prev = match prev {
            Some(index) => index,
            None => return Ok(0.0),
        };
        if let Some((cached_height, cached_value)) = *self.slot.lock().expect("stake weight cache poisoned") {
            if cached_height == prev.height {
                return Ok(cached_value);
            }
        }

        let mut weight_sum = 0.0f64;
        let mut sampled = 0usize;
        let mut cursor = Some(prev.clone());
        while let Some(current) = cursor {
            if sampled >= AVERAGE_WEIGHT_WINDOW {
                break;
            }
            weight_sum += pos_kernels_per_second(db, &current, constants)?;
            sampled += 1;
            cursor = match current.prev {
                Some(prev_hash) => Some(
                    db.fetch_block_index(&prev_hash)?
                        .ok_or(ProofOfStakeError::BlockNotIndexed(prev_hash))?,
                ),
                None => None,
            };
        }
        let average = weight_sum / sampled as f64 + AVERAGE_WEIGHT_OFFSET;
        *self.slot.lock().expect("stake weight cache poisoned") = Some((prev.height, average));
        Ok(average)
    }

    /// Drop the cached slot. A reorg that rolls back past the cached height must call this.
    pub fn clear(&self) {
        *self.slot.lock().expect("stake weight cache poisoned") = None;
    }
}

/// Damp a kernel's time weight by how much of the network average its coin-day weight claims.
///
/// Stakes above the fraction ceiling collapse to `stake_min_age + 1` seconds of effective weight;
/// everything else is scaled by cos²(π · fraction) and truncated to whole seconds.
pub fn stake_time_factored_weight<B: BlockchainBackend>(
    db: &B,
    cache: &StakeWeightCache,
    time_weight: i64,
    coin_day_weight: i128,
    prev: Option<&BlockIndex>,
    constants: &ConsensusConstants,
) -> Result<i64, ProofOfStakeError> {
    let average = cache.average_stake_weight(db, prev, constants)?;
    Ok(apply_stake_time_factor(average, time_weight, coin_day_weight, constants))
}

/// The damping itself, separated from the average lookup. The ceiling comparison is strict: a
/// fraction of exactly 0.45 still takes the cosine branch.
fn apply_stake_time_factor(
    average: f64,
    time_weight: i64,
    coin_day_weight: i128,
    constants: &ConsensusConstants,
) -> i64 {
    let fraction = (coin_day_weight + 1) as f64 / average;
    if fraction > WEIGHT_FRACTION_CEILING {
        return constants.stake_min_age() + 1;
    }
    let factor = (STAKE_TIME_PI * fraction).cos();
    (factor * factor * time_weight as f64) as i64
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::consensus::ConsensusConstants;

    #[test]
    fn fraction_above_ceiling_floors_to_min_age() {
        let constants = ConsensusConstants::localnet();
        let floored = apply_stake_time_factor(10_000.0, 86_400, 4_500, &constants);
        assert_eq!(floored, constants.stake_min_age() + 1);
    }

    #[test]
    fn fraction_at_exactly_the_ceiling_takes_the_cosine_branch() {
        let constants = ConsensusConstants::localnet();
        // (44 + 1) / 100.0 evaluates to the same double as the 0.45 ceiling itself.
        let at_ceiling = apply_stake_time_factor(100.0, 86_400, 44, &constants);
        let expected = {
            let factor = (STAKE_TIME_PI * 0.45).cos();
            (factor * factor * 86_400f64) as i64
        };
        assert_eq!(at_ceiling, expected);
        assert_ne!(at_ceiling, constants.stake_min_age() + 1);
        // One step past the ceiling floors.
        let past_ceiling = apply_stake_time_factor(10_000.0, 86_400, 4_501, &constants);
        assert_eq!(past_ceiling, constants.stake_min_age() + 1);
    }

    #[test]
    fn tiny_fractions_keep_nearly_the_full_time_weight() {
        let constants = ConsensusConstants::localnet();
        let damped = apply_stake_time_factor(1_000_000.0, 86_400, 0, &constants);
        assert!(damped > 86_000 && damped <= 86_400);
    }

    #[test]
    fn zero_average_collapses_to_the_floor() {
        let constants = ConsensusConstants::localnet();
        assert_eq!(
            apply_stake_time_factor(0.0, 86_400, 10, &constants),
            constants.stake_min_age() + 1
        );
    }

    #[test]
    fn negative_time_weight_stays_negative() {
        let constants = ConsensusConstants::localnet();
        let damped = apply_stake_time_factor(1_000_000.0, -600, 0, &constants);
        assert!(damped <= 0);
    }
}
