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

//! The proof-of-stake-time kernel.
//!
//! Every bit here is consensus: the per-interval stake modifier assembled from 64 pseudo-randomly
//! selected past blocks, the coinstake kernel hash checked against a target scaled by network
//! stake-time weight, and the checksum chain that pins modifier history to hard-coded
//! checkpoints.

pub mod compact;

mod checksum;
mod error;
mod kernel;
mod stake_modifier;
mod stake_weight;

pub use checksum::{check_stake_modifier_checkpoints, stake_modifier_checksum, stake_modifier_checksum_parts};
pub use error::ProofOfStakeError;
pub use kernel::{check_proof_of_stake, check_stake_time_kernel_hash, get_coin_age, get_stake_time, KernelProof};
pub use stake_modifier::{
    compute_next_stake_modifier,
    kernel_stake_modifier,
    selection_interval_section,
    stake_modifier_selection_interval,
    KernelStakeModifier,
};
pub use stake_weight::{pos_kernels_per_second, stake_time_factored_weight, StakeWeightCache};
