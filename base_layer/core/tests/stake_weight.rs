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

use helios_core::{
    chain_storage::{BlockIndex, BlockchainBackend, MemoryDatabase},
    consensus::{ConsensusConstants, ConsensusConstantsBuilder, Network},
    proof_of_stake::{pos_kernels_per_second, StakeWeightCache},
    test_helpers::{append_blocks, chain_block, genesis_block, synthetic_stake_proof, tip_block},
};

const GENESIS_TIME: u32 = 1_000_200;

fn chain_with_bits(constants: ConsensusConstants, length: u64, bits: u32) -> MemoryDatabase {
    let mut db = MemoryDatabase::new(constants);
    db.add_block(genesis_block(GENESIS_TIME, bits)).unwrap();
    append_blocks(&mut db, length - 1, 60).unwrap();
    db
}

fn tip_predecessor(db: &MemoryDatabase) -> BlockIndex {
    let tip = db.fetch_tip_index().unwrap().unwrap();
    db.fetch_block_index(&tip.prev.unwrap()).unwrap().unwrap()
}

#[test]
fn kernels_per_second_is_zero_without_a_stake_time_span() {
    // Height 3 is the only proof-of-stake block, so there is no inter-stake gap to divide by.
    let db = chain_with_bits(ConsensusConstants::localnet(), 4, 0x1e0f_ffff);
    let tip = db.fetch_tip_index().unwrap().unwrap();
    assert_eq!(pos_kernels_per_second(&db, &tip, db.constants()).unwrap(), 0.0);
}

#[test]
fn kernels_per_second_scales_with_difficulty() {
    let easy = chain_with_bits(ConsensusConstants::localnet(), 120, 0x1e0f_ffff);
    let hard = chain_with_bits(ConsensusConstants::localnet(), 120, 0x1d00_ffff);
    let easy_rate = {
        let tip = easy.fetch_tip_index().unwrap().unwrap();
        pos_kernels_per_second(&easy, &tip, easy.constants()).unwrap()
    };
    let hard_rate = {
        let tip = hard.fetch_tip_index().unwrap().unwrap();
        pos_kernels_per_second(&hard, &tip, hard.constants()).unwrap()
    };
    assert!(easy_rate > 0.0);
    // 0x1d00ffff encodes difficulty 1.0, orders of magnitude above the test chain's target.
    assert!(hard_rate > easy_rate * 1_000.0);
}

#[test]
fn average_weight_is_the_rolling_mean_plus_the_offset() {
    // Deep into a uniform chain every sampled block sees an identical 72-stake window, so the
    // rolling mean collapses to the per-block rate.
    let db = chain_with_bits(ConsensusConstants::localnet(), 140, 0x1e0f_ffff);
    let prev = tip_predecessor(&db);
    let rate = pos_kernels_per_second(&db, &prev, db.constants()).unwrap();
    let cache = StakeWeightCache::new();
    let average = cache.average_stake_weight(&db, Some(&prev), db.constants()).unwrap();
    assert!((average - rate - 21.0).abs() < 1e-3);
}

#[test]
fn average_weight_of_an_empty_ancestry_is_zero() {
    let db = chain_with_bits(ConsensusConstants::localnet(), 4, 0x1e0f_ffff);
    let cache = StakeWeightCache::new();
    assert_eq!(cache.average_stake_weight(&db, None, db.constants()).unwrap(), 0.0);
}

#[test]
fn the_cache_is_a_single_slot_keyed_by_height() {
    let easy = chain_with_bits(ConsensusConstants::localnet(), 100, 0x1e0f_ffff);
    let hard = chain_with_bits(ConsensusConstants::localnet(), 100, 0x1d00_ffff);
    let cache = StakeWeightCache::new();

    let easy_average = cache
        .average_stake_weight(&easy, Some(&tip_predecessor(&easy)), easy.constants())
        .unwrap();
    // Same height, different chain: the slot answers without looking at the backend.
    let cached = cache
        .average_stake_weight(&hard, Some(&tip_predecessor(&hard)), hard.constants())
        .unwrap();
    assert_eq!(cached, easy_average);

    cache.clear();
    let hard_average = cache
        .average_stake_weight(&hard, Some(&tip_predecessor(&hard)), hard.constants())
        .unwrap();
    assert!(hard_average > easy_average);
}

#[test]
fn negative_stake_gaps_clamp_only_after_the_fix_height() {
    let pre_fork = ConsensusConstantsBuilder::new(Network::LocalNet)
        .with_negative_stake_time_fix_height(u64::MAX)
        .build();
    let post_fork = ConsensusConstants::localnet();

    for (constants, expect_negative) in [(pre_fork, true), (post_fork, false)] {
        let mut db = MemoryDatabase::new(constants);
        db.add_block(genesis_block(GENESIS_TIME, 0x1e0f_ffff)).unwrap();
        append_blocks(&mut db, 2, 60).unwrap();
        // Height 3 stakes at t, height 4 stakes two minutes *earlier*.
        let prev = tip_block(&db);
        let out_of_order_time = prev.header.time + 600;
        let block3 = chain_block(&prev, 3, out_of_order_time, Vec::new());
        let proof3 = synthetic_stake_proof(&block3);
        db.add_block_with_stake_proof(block3.clone(), proof3).unwrap();
        let block4 = chain_block(&block3, 4, out_of_order_time - 120, Vec::new());
        let proof4 = synthetic_stake_proof(&block4);
        db.add_block_with_stake_proof(block4, proof4).unwrap();

        let tip = db.fetch_tip_index().unwrap().unwrap();
        let rate = pos_kernels_per_second(&db, &tip, db.constants()).unwrap();
        if expect_negative {
            assert!(rate < 0.0, "signed accumulation must survive below the fix height");
        } else {
            assert_eq!(rate, 0.0, "clamped accumulation leaves no stake time");
        }
    }
}
