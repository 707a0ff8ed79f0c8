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

//! Small chain-building helpers shared between the unit suites and the integration tests.

use helios_common_types::types::FixedHash;
use rand::RngCore;

use crate::{
    blocks::{calculate_merkle_root, Block, BlockHeader},
    chain_storage::{BlockchainBackend, ChainStorageError, MemoryDatabase},
    consensus::ConsensusConstants,
    hashing::HashWriter,
    transactions::{OutPoint, Transaction, TxIn, TxOut, COIN},
};

pub fn random_hash() -> FixedHash {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    FixedHash::from(bytes)
}

/// A coinbase carrying the height in its input script so every block's transactions are unique.
pub fn coinbase(height: u64, time: u32) -> Transaction {
    let mut input = TxIn::new(OutPoint::null());
    input.script_sig = height.to_le_bytes().to_vec();
    Transaction {
        version: 1,
        time,
        inputs: vec![input],
        outputs: vec![TxOut::new(50 * COIN, vec![0x51])],
        lock_time: 0,
    }
}

/// A plain spend of an arbitrary (never validated) outpoint, used to place stakeable outputs.
pub fn funding_transaction(time: u32, value: i64) -> Transaction {
    Transaction {
        version: 1,
        time,
        inputs: vec![TxIn::new(OutPoint::new(random_hash(), 0))],
        outputs: vec![TxOut::new(value, vec![0x51])],
        lock_time: 0,
    }
}

/// A minimal well-formed coinstake spending the given outpoint.
pub fn coinstake_transaction(prevout: OutPoint, time: u32, reward: i64) -> Transaction {
    Transaction {
        version: 1,
        time,
        inputs: vec![TxIn::new(prevout)],
        outputs: vec![TxOut::new(0, Vec::new()), TxOut::new(reward, vec![0x51])],
        lock_time: 0,
    }
}

pub fn genesis_block(time: u32, bits: u32) -> Block {
    let transactions = vec![coinbase(0, time)];
    let mut header = BlockHeader::new(1);
    header.time = time;
    header.bits = bits;
    header.merkle_root = calculate_merkle_root(&transactions);
    Block { header, transactions }
}

/// The next block on top of `prev`, carrying a coinbase plus the given transactions.
pub fn chain_block(prev: &Block, height: u64, time: u32, extra: Vec<Transaction>) -> Block {
    let mut transactions = vec![coinbase(height, time)];
    transactions.extend(extra);
    let mut header = BlockHeader::new(1);
    header.prev_hash = prev.hash();
    header.time = time;
    header.bits = prev.header.bits;
    header.nonce = height as u32;
    header.merkle_root = calculate_merkle_root(&transactions);
    Block { header, transactions }
}

/// A deterministic stand-in kernel hash for synthetic proof-of-stake blocks.
pub fn synthetic_stake_proof(block: &Block) -> FixedHash {
    HashWriter::new().hash(&block.hash()).bytes(b"stake proof").finalize()
}

pub fn tip_block(db: &MemoryDatabase) -> Block {
    let tip = db.tip_hash().expect("chain is not empty");
    db.fetch_block(&tip)
        .expect("memory backend cannot fail")
        .expect("tip block exists")
}

/// Append `count` empty blocks to the tip, `spacing` seconds apart. Blocks above the
/// proof-of-work boundary are accepted with a synthetic stake proof.
pub fn append_blocks(db: &mut MemoryDatabase, count: u64, spacing: u32) -> Result<(), ChainStorageError> {
    for _ in 0..count {
        append_block_with(db, spacing, Vec::new())?;
    }
    Ok(())
}

/// Append one block `spacing` seconds after the tip, carrying the given transactions.
pub fn append_block_with(
    db: &mut MemoryDatabase,
    spacing: u32,
    extra: Vec<Transaction>,
) -> Result<(), ChainStorageError> {
    let prev = tip_block(db);
    let height = db.tip_height().expect("chain is not empty") + 1;
    let block = chain_block(&prev, height, prev.header.time + spacing, extra);
    if db.constants().is_proof_of_stake_height(height) {
        let proof = synthetic_stake_proof(&block);
        db.add_block_with_stake_proof(block, proof)?;
    } else {
        db.add_block(block)?;
    }
    Ok(())
}

/// A fresh chain of `length` blocks on the given constants, one block every `spacing` seconds
/// starting at `genesis_time`.
pub fn create_chain(
    constants: ConsensusConstants,
    length: u64,
    genesis_time: u32,
    spacing: u32,
) -> MemoryDatabase {
    let mut db = MemoryDatabase::new(constants);
    db.add_block(genesis_block(genesis_time, 0x1e0f_ffff))
        .expect("genesis always connects");
    if length > 1 {
        append_blocks(&mut db, length - 1, spacing).expect("appending to a fresh chain succeeds");
    }
    db
}
