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

use helios_common_types::types::FixedHash;

use crate::{
    chain_storage::{BlockIndex, BlockchainBackend},
    consensus::Network,
    hashing::HashWriter,
    proof_of_stake::ProofOfStakeError,
};

/// Heights at which a node's computed modifier checksum must equal the hard-coded value. A
/// mismatch means the local index disagrees with settled history; the node must halt or re-sync.
const MAINNET_CHECKPOINTS: &[(u64, u32)] = &[(0, 0xfd11_f4e7)];
const TESTNET_CHECKPOINTS: &[(u64, u32)] = &[(0, 0x0)];
const LOCALNET_CHECKPOINTS: &[(u64, u32)] = &[];

/// The chained 32-bit digest over a block's modifier-relevant fields. Genesis has no predecessor
/// prefix; every other block chains from its predecessor's checksum.
pub fn stake_modifier_checksum_parts(
    prev_checksum: Option<u32>,
    flags: u32,
    hash_proof_of_stake: &FixedHash,
    stake_modifier: u64,
) -> u32 {
    let mut writer = HashWriter::new();
    if let Some(prev) = prev_checksum {
        writer = writer.u32_le(prev);
    }
    let digest = writer
        .u32_le(flags)
        .hash(hash_proof_of_stake)
        .u64_le(stake_modifier)
        .finalize();
    // Upper 32 bits of the digest.
    (digest.to_u256() >> 224).low_u32()
}

/// Recompute the checksum of an indexed block from its stored fields and its predecessor's
/// stored checksum.
pub fn stake_modifier_checksum<B: BlockchainBackend>(
    db: &B,
    index: &BlockIndex,
) -> Result<u32, ProofOfStakeError> {
    let prev_checksum = match index.prev {
        Some(prev_hash) => Some(
            db.fetch_block_index(&prev_hash)?
                .ok_or(ProofOfStakeError::BlockNotIndexed(prev_hash))?
                .stake_modifier_checksum,
        ),
        None => None,
    };
    Ok(stake_modifier_checksum_parts(
        prev_checksum,
        index.flags.bits(),
        &index.hash_proof_of_stake,
        index.stake_modifier,
    ))
}

/// True unless the network pins a checksum at this height and it differs.
pub fn check_stake_modifier_checkpoints(network: Network, height: u64, checksum: u32) -> bool {
    let table = match network {
        Network::MainNet => MAINNET_CHECKPOINTS,
        Network::TestNet => TESTNET_CHECKPOINTS,
        Network::LocalNet => LOCALNET_CHECKPOINTS,
    };
    match table.iter().find(|(checkpoint_height, _)| *checkpoint_height == height) {
        Some((_, expected)) => *expected == checksum,
        None => true,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn genesis_checksum_has_no_predecessor_prefix() {
        let with_prefix = stake_modifier_checksum_parts(Some(0), 0b100, &FixedHash::zero(), 0);
        let without_prefix = stake_modifier_checksum_parts(None, 0b100, &FixedHash::zero(), 0);
        assert_ne!(with_prefix, without_prefix);
    }

    #[test]
    fn checksum_commits_to_every_field() {
        let base = stake_modifier_checksum_parts(Some(1), 0b100, &FixedHash::zero(), 7);
        assert_ne!(base, stake_modifier_checksum_parts(Some(2), 0b100, &FixedHash::zero(), 7));
        assert_ne!(base, stake_modifier_checksum_parts(Some(1), 0b110, &FixedHash::zero(), 7));
        assert_ne!(base, stake_modifier_checksum_parts(Some(1), 0b100, &FixedHash::zero(), 8));
    }

    #[test]
    fn checksum_is_upper_digest_bits() {
        let flags = 0b100u32;
        let modifier = 0xdead_beefu64;
        let digest = HashWriter::new()
            .u32_le(flags)
            .hash(&FixedHash::zero())
            .u64_le(modifier)
            .finalize();
        let expected = u32::from_be_bytes(digest.as_bytes()[..4].try_into().unwrap());
        assert_eq!(stake_modifier_checksum_parts(None, flags, &FixedHash::zero(), modifier), expected);
    }

    #[test]
    fn mainnet_pins_genesis() {
        assert!(check_stake_modifier_checkpoints(Network::MainNet, 0, 0xfd11_f4e7));
        assert!(!check_stake_modifier_checkpoints(Network::MainNet, 0, 0xfd11_f4e8));
        assert!(check_stake_modifier_checkpoints(Network::MainNet, 1, 0x1234_5678));
    }

    #[test]
    fn testnet_pins_genesis_at_zero() {
        assert!(check_stake_modifier_checkpoints(Network::TestNet, 0, 0));
        assert!(!check_stake_modifier_checkpoints(Network::TestNet, 0, 1));
    }

    #[test]
    fn localnet_has_no_checkpoints() {
        assert!(check_stake_modifier_checkpoints(Network::LocalNet, 0, 0xffff_ffff));
    }
}
