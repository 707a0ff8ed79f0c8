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

use helios_common_types::types::BlockHash;
use serde::{Deserialize, Serialize};

use crate::consensus::Network;

/// The immutable consensus parameters of a network. All of these are consensus-visible inputs to
/// the stake-time kernel; changing any of them on a running network is a hard fork.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusConstants {
    network: Network,
    /// Minimum age in seconds before an output may stake or contribute to a modifier.
    stake_min_age: i64,
    /// Alignment period in seconds between successive stake modifiers.
    modifier_interval: i64,
    /// Expected seconds between blocks.
    target_spacing: i64,
    /// Shapes the geometric progression of the 64 selection-interval sections.
    modifier_interval_ratio: i64,
    /// Blocks at or below this height are treated as proof-of-work.
    last_pow_block: u64,
    /// Height from which negative per-block stake times are clamped to zero when estimating the
    /// network stake rate. Below it the historic signed-arithmetic behaviour is preserved.
    negative_stake_time_fix_height: u64,
    /// Hash of the block at height 0.
    genesis_hash: BlockHash,
}

impl ConsensusConstants {
    pub fn mainnet() -> Self {
        Self {
            network: Network::MainNet,
            stake_min_age: 4 * 60 * 60,
            modifier_interval: 10_240,
            target_spacing: 60,
            modifier_interval_ratio: 3,
            last_pow_block: 835_213,
            negative_stake_time_fix_height: 1_177_000,
            genesis_hash: BlockHash::from_hex(
                "000000007bc154a0fa91b9c9ab7151d8eb0b763b8e5eb50b1772f2d3adcf6be4",
            )
            .expect("hard-coded genesis hash is valid"),
        }
    }

    pub fn testnet() -> Self {
        Self {
            network: Network::TestNet,
            stake_min_age: 10 * 60,
            modifier_interval: 1_024,
            target_spacing: 60,
            modifier_interval_ratio: 3,
            last_pow_block: 500,
            negative_stake_time_fix_height: 0,
            genesis_hash: BlockHash::from_hex(
                "0000724595fb3b9609d441cbfb9577615c292abf07d996d3edabc48de843642d",
            )
            .expect("hard-coded genesis hash is valid"),
        }
    }

    pub fn localnet() -> Self {
        Self {
            network: Network::LocalNet,
            stake_min_age: 60 * 60,
            modifier_interval: 600,
            target_spacing: 60,
            modifier_interval_ratio: 3,
            last_pow_block: 2,
            negative_stake_time_fix_height: 0,
            genesis_hash: BlockHash::zero(),
        }
    }

    pub fn for_network(network: Network) -> Self {
        match network {
            Network::MainNet => Self::mainnet(),
            Network::TestNet => Self::testnet(),
            Network::LocalNet => Self::localnet(),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn stake_min_age(&self) -> i64 {
        self.stake_min_age
    }

    pub fn modifier_interval(&self) -> i64 {
        self.modifier_interval
    }

    pub fn target_spacing(&self) -> i64 {
        self.target_spacing
    }

    pub fn modifier_interval_ratio(&self) -> i64 {
        self.modifier_interval_ratio
    }

    pub fn last_pow_block(&self) -> u64 {
        self.last_pow_block
    }

    pub fn negative_stake_time_fix_height(&self) -> u64 {
        self.negative_stake_time_fix_height
    }

    pub fn genesis_hash(&self) -> BlockHash {
        self.genesis_hash
    }

    /// Whether a block at the given height is proof-of-stake rather than proof-of-work.
    pub fn is_proof_of_stake_height(&self, height: u64) -> bool {
        height > self.last_pow_block
    }
}

/// Builder for test networks that need constants other than the shipped presets.
pub struct ConsensusConstantsBuilder {
    constants: ConsensusConstants,
}

impl ConsensusConstantsBuilder {
    pub fn new(network: Network) -> Self {
        Self {
            constants: ConsensusConstants::for_network(network),
        }
    }

    pub fn with_stake_min_age(mut self, seconds: i64) -> Self {
        self.constants.stake_min_age = seconds;
        self
    }

    pub fn with_modifier_interval(mut self, seconds: i64) -> Self {
        self.constants.modifier_interval = seconds;
        self
    }

    pub fn with_target_spacing(mut self, seconds: i64) -> Self {
        self.constants.target_spacing = seconds;
        self
    }

    pub fn with_last_pow_block(mut self, height: u64) -> Self {
        self.constants.last_pow_block = height;
        self
    }

    pub fn with_negative_stake_time_fix_height(mut self, height: u64) -> Self {
        self.constants.negative_stake_time_fix_height = height;
        self
    }

    pub fn with_genesis_hash(mut self, hash: BlockHash) -> Self {
        self.constants.genesis_hash = hash;
        self
    }

    pub fn build(self) -> ConsensusConstants {
        self.constants
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn presets_discriminate_pow_and_pos_heights() {
        let constants = ConsensusConstants::mainnet();
        assert!(!constants.is_proof_of_stake_height(constants.last_pow_block()));
        assert!(constants.is_proof_of_stake_height(constants.last_pow_block() + 1));
    }

    #[test]
    fn builder_overrides_single_fields() {
        let constants = ConsensusConstantsBuilder::new(Network::LocalNet)
            .with_modifier_interval(1_024)
            .build();
        assert_eq!(constants.modifier_interval(), 1_024);
        assert_eq!(constants.network(), Network::LocalNet);
        assert_eq!(
            constants.target_spacing(),
            ConsensusConstants::localnet().target_spacing()
        );
    }
}
