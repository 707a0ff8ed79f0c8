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

use std::fmt::{Debug, Display, Error, Formatter};

use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error as ThisError;

use crate::serializers;

pub const BLOCK_HASH_LENGTH: usize = 32;

/// A 32-byte hash digest.
///
/// Wherever consensus ranks, sorts or shifts a hash, the digest bytes are interpreted as a
/// big-endian 256-bit integer; the derived `Ord` on the inner array gives exactly that order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FixedHash([u8; BLOCK_HASH_LENGTH]);

/// The hash of a block in the blockchain.
pub type BlockHash = FixedHash;

/// The hash identifying a transaction.
pub type TxHash = FixedHash;

#[derive(Debug, ThisError)]
#[error("Invalid size for a fixed hash")]
pub struct FixedHashSizeError;

impl FixedHash {
    pub const fn zero() -> Self {
        Self([0u8; BLOCK_HASH_LENGTH])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; BLOCK_HASH_LENGTH]
    }

    pub fn as_bytes(&self) -> &[u8; BLOCK_HASH_LENGTH] {
        &self.0
    }

    /// The digest interpreted as a big-endian 256-bit integer.
    pub fn to_u256(&self) -> U256 {
        U256::from_big_endian(&self.0)
    }

    pub fn from_u256(v: U256) -> Self {
        let mut bytes = [0u8; BLOCK_HASH_LENGTH];
        v.to_big_endian(&mut bytes);
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, FixedHashSizeError> {
        let bytes = hex::decode(s).map_err(|_| FixedHashSizeError)?;
        Self::try_from(bytes.as_slice())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; BLOCK_HASH_LENGTH]> for FixedHash {
    fn from(bytes: [u8; BLOCK_HASH_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for FixedHash {
    type Error = FixedHashSizeError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; BLOCK_HASH_LENGTH] = bytes.try_into().map_err(|_| FixedHashSizeError)?;
        Ok(Self(bytes))
    }
}

impl TryFrom<Vec<u8>> for FixedHash {
    type Error = FixedHashSizeError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::try_from(bytes.as_slice())
    }
}

impl AsRef<[u8]> for FixedHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for FixedHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self.to_hex())
    }
}

impl Debug for FixedHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for FixedHash {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        serializers::hex::serialize(self, s)
    }
}

impl<'de> Deserialize<'de> for FixedHash {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        serializers::hex::deserialize(d)
    }
}
