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

use bitflags::bitflags;
use helios_common_types::types::{BlockHash, FixedHash};
use serde::{Deserialize, Serialize};

bitflags! {
    /// Per-block flag word. The raw bits feed the stake-modifier checksum, so the positions are
    /// consensus-visible and fixed forever.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct BlockIndexFlags: u32 {
        /// The entropy bit this block contributes to stake modifiers.
        const STAKE_ENTROPY = 1 << 1;
        /// A new stake modifier was generated on this block.
        const GENERATED_STAKE_MODIFIER = 1 << 2;
    }
}

/// The consensus record block acceptance writes for every block. Records form an arena keyed by
/// block hash; `prev` refers back into that arena rather than owning the predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockIndex {
    pub height: u64,
    pub hash: BlockHash,
    pub prev: Option<BlockHash>,
    /// Block time in unix seconds.
    pub time: i64,
    /// Compact difficulty target.
    pub bits: u32,
    pub flags: BlockIndexFlags,
    /// The stake modifier in effect at this block. Holds the newly generated value when
    /// [`BlockIndexFlags::GENERATED_STAKE_MODIFIER`] is set and the inherited one otherwise.
    pub stake_modifier: u64,
    /// Kernel hash for proof-of-stake blocks; zero and never consulted for proof-of-work heights.
    pub hash_proof_of_stake: FixedHash,
    /// 32-bit digest chained from the predecessor's checksum.
    pub stake_modifier_checksum: u32,
}

impl BlockIndex {
    pub fn generated_stake_modifier(&self) -> bool {
        self.flags.contains(BlockIndexFlags::GENERATED_STAKE_MODIFIER)
    }

    pub fn stake_entropy_bit(&self) -> u64 {
        u64::from(self.flags.contains(BlockIndexFlags::STAKE_ENTROPY))
    }

    /// Records the outcome of the once-per-block modifier computation. The transition is terminal;
    /// modifiers are never recomputed for an accepted block.
    pub fn set_stake_modifier(&mut self, modifier: u64, generated: bool) {
        self.stake_modifier = modifier;
        self.flags.set(BlockIndexFlags::GENERATED_STAKE_MODIFIER, generated);
    }

    pub fn set_stake_entropy_bit(&mut self, bit: u8) {
        self.flags.set(BlockIndexFlags::STAKE_ENTROPY, bit != 0);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn index() -> BlockIndex {
        BlockIndex {
            height: 0,
            hash: BlockHash::zero(),
            prev: None,
            time: 0,
            bits: 0,
            flags: BlockIndexFlags::empty(),
            stake_modifier: 0,
            hash_proof_of_stake: FixedHash::zero(),
            stake_modifier_checksum: 0,
        }
    }

    #[test]
    fn flag_bits_are_fixed() {
        assert_eq!(BlockIndexFlags::STAKE_ENTROPY.bits(), 0b010);
        assert_eq!(BlockIndexFlags::GENERATED_STAKE_MODIFIER.bits(), 0b100);
    }

    #[test]
    fn entropy_bit_reads_back_as_integer() {
        let mut index = index();
        assert_eq!(index.stake_entropy_bit(), 0);
        index.set_stake_entropy_bit(1);
        assert_eq!(index.stake_entropy_bit(), 1);
    }

    #[test]
    fn modifier_state_transition() {
        let mut index = index();
        index.set_stake_modifier(7, false);
        assert_eq!(index.stake_modifier, 7);
        assert!(!index.generated_stake_modifier());
        index.set_stake_modifier(9, true);
        assert!(index.generated_stake_modifier());
    }
}
