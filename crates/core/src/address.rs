// Solana account addresses and associated token account derivation

use crate::error::WalletError;
use curve25519_dalek::edwards::CompressedEdwardsY;
use sha2::{Digest, Sha256};
use std::str::FromStr;

pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const ASSOCIATED_TOKEN_PROGRAM_ID: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// 32-byte account address, displayed as base58.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 32]);

impl Address {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether the address is a valid ed25519 point (i.e. could hold a key).
    pub fn is_on_curve(&self) -> bool {
        CompressedEdwardsY(self.0).decompress().is_some()
    }

    /// Derive a program address from seeds, searching bumps from 255 down.
    pub fn find_program_address(seeds: &[&[u8]], program_id: &Address) -> Option<(Address, u8)> {
        (0..=u8::MAX).rev().find_map(|bump| {
            let mut hasher = Sha256::new();
            for seed in seeds {
                hasher.update(seed);
            }
            hasher.update([bump]);
            hasher.update(program_id.as_bytes());
            hasher.update(PDA_MARKER);

            let candidate = Address(hasher.finalize().into());
            (!candidate.is_on_curve()).then_some((candidate, bump))
        })
    }
}

impl FromStr for Address {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s).into_vec()?;
        let array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| WalletError::InvalidAddress(s.to_string()))?;
        Ok(Self(array))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

/// Token account that holds `mint` tokens for `wallet` by convention.
pub fn associated_token_address(wallet: &Address, mint: &Address) -> Result<Address, WalletError> {
    let token_program = Address::from_str(TOKEN_PROGRAM_ID)?;
    let ata_program = Address::from_str(ASSOCIATED_TOKEN_PROGRAM_ID)?;

    Address::find_program_address(
        &[wallet.as_bytes(), token_program.as_bytes(), mint.as_bytes()],
        &ata_program,
    )
    .map(|(address, _)| address)
    .ok_or_else(|| WalletError::InvalidAddress("no off-curve program address".to_string()))
}
