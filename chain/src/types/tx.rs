//! Transaction types.
//!
//! Two variants are in scope: `Genesis` (unsigned balance allocation,
//! valid only inside the genesis block) and `Payment` (a signed value
//! transfer). Both are tagged by a leading `typeId` byte so `parse`
//! can dispatch without external context.

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::codec::be;
use crate::types::error::BlockError;
use crate::types::{PublicKey, RecipientAddress, SignatureBytes};

/// Maximum fee-free bytes per unit of fee; `feePerByte` must be at least
/// `1 / MAX_BYTES_PER_TOKEN`.
pub const MAX_BYTES_PER_TOKEN: u64 = 512;

const TYPE_GENESIS: u8 = 1;
const TYPE_PAYMENT: u8 = 2;

/// A transaction's deadline: `timestamp + 24h`. Transactions whose
/// deadline has passed relative to a block's timestamp are ineligible
/// for inclusion in that block.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Deadline(pub u64);

const DEADLINE_OFFSET_MS: u64 = Duration::from_secs(24 * 60 * 60).as_millis() as u64;

/// Genesis balance allocation. Only valid as a transaction of the
/// (unsigned) genesis block; carries no fee and no signature.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxGenesis {
    pub recipient: RecipientAddress,
    pub amount: u64,
    pub timestamp: u64,
}

/// A signed value transfer from `sender` to `recipient`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxPayment {
    pub sender: PublicKey,
    pub recipient: RecipientAddress,
    pub amount: u64,
    pub fee: u64,
    pub timestamp: u64,
    pub signature: SignatureBytes,
}

/// Tagged transaction union.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Transaction {
    Genesis(TxGenesis),
    Payment(TxPayment),
}

impl PartialEq for Transaction {
    /// Equality is by signature, per spec. `Genesis` transactions carry
    /// no signature, so they fall back to comparing their (unsigned)
    /// content.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Transaction::Payment(a), Transaction::Payment(b)) => {
                a.signature.0 == b.signature.0
            }
            (Transaction::Genesis(a), Transaction::Genesis(b)) => {
                a.recipient == b.recipient && a.amount == b.amount && a.timestamp == b.timestamp
            }
            _ => false,
        }
    }
}

impl Eq for Transaction {}

impl Transaction {
    pub fn timestamp(&self) -> u64 {
        match self {
            Transaction::Genesis(tx) => tx.timestamp,
            Transaction::Payment(tx) => tx.timestamp,
        }
    }

    pub fn fee(&self) -> u64 {
        match self {
            Transaction::Genesis(_) => 0,
            Transaction::Payment(tx) => tx.fee,
        }
    }

    pub fn amount(&self) -> u64 {
        match self {
            Transaction::Genesis(tx) => tx.amount,
            Transaction::Payment(tx) => tx.amount,
        }
    }

    /// `deadline = timestamp + 24h`.
    pub fn deadline(&self) -> Deadline {
        Deadline(self.timestamp().saturating_add(DEADLINE_OFFSET_MS))
    }

    /// Whether this transaction's deadline has passed at `now` (ms).
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.deadline().0
    }

    /// Bytes of the canonical encoding, used for both `feePerByte` and
    /// as the payload that `Payment::signature` is computed over (minus
    /// the signature field itself, for signing).
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Transaction::Genesis(tx) => {
                out.push(TYPE_GENESIS);
                out.extend_from_slice(&tx.recipient.0);
                be::write_u64(&mut out, tx.amount);
                be::write_u64(&mut out, tx.timestamp);
            }
            Transaction::Payment(tx) => {
                out.push(TYPE_PAYMENT);
                out.extend_from_slice(&tx.sender.0);
                out.extend_from_slice(&tx.recipient.0);
                be::write_u64(&mut out, tx.amount);
                be::write_u64(&mut out, tx.fee);
                be::write_u64(&mut out, tx.timestamp);
                out.extend_from_slice(&tx.signature.0);
            }
        }
        out
    }

    fn payment_signing_bytes(tx: &TxPayment) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(TYPE_PAYMENT);
        out.extend_from_slice(&tx.sender.0);
        out.extend_from_slice(&tx.recipient.0);
        be::write_u64(&mut out, tx.amount);
        be::write_u64(&mut out, tx.fee);
        be::write_u64(&mut out, tx.timestamp);
        out
    }

    /// Parses a transaction from its canonical encoding, dispatching on
    /// the leading `typeId` byte. An unrecognized `typeId` is reported as
    /// `BlockError::UnknownTransactionType`, distinct from a truncated or
    /// otherwise malformed buffer.
    pub fn parse(buf: &[u8]) -> Result<Self, BlockError> {
        let mut pos = 0usize;
        let type_id = *buf.first().ok_or(BlockError::InvalidEncoding)?;
        pos += 1;

        match type_id {
            TYPE_GENESIS => {
                let recipient = be::read_bytes(buf, &mut pos, 25).ok_or(BlockError::InvalidEncoding)?;
                let amount = be::read_u64(buf, &mut pos).ok_or(BlockError::InvalidEncoding)?;
                let timestamp = be::read_u64(buf, &mut pos).ok_or(BlockError::InvalidEncoding)?;
                if pos != buf.len() {
                    return Err(BlockError::InvalidEncoding);
                }
                let mut r = [0u8; 25];
                r.copy_from_slice(recipient);
                Ok(Transaction::Genesis(TxGenesis {
                    recipient: RecipientAddress(r),
                    amount,
                    timestamp,
                }))
            }
            TYPE_PAYMENT => {
                let sender = be::read_bytes(buf, &mut pos, 32).ok_or(BlockError::InvalidEncoding)?;
                let recipient = be::read_bytes(buf, &mut pos, 25).ok_or(BlockError::InvalidEncoding)?;
                let amount = be::read_u64(buf, &mut pos).ok_or(BlockError::InvalidEncoding)?;
                let fee = be::read_u64(buf, &mut pos).ok_or(BlockError::InvalidEncoding)?;
                let timestamp = be::read_u64(buf, &mut pos).ok_or(BlockError::InvalidEncoding)?;
                let signature = be::read_bytes(buf, &mut pos, 64).ok_or(BlockError::InvalidEncoding)?;
                if pos != buf.len() {
                    return Err(BlockError::InvalidEncoding);
                }

                let mut s = [0u8; 32];
                s.copy_from_slice(sender);
                let mut r = [0u8; 25];
                r.copy_from_slice(recipient);
                let mut sig = [0u8; 64];
                sig.copy_from_slice(signature);

                Ok(Transaction::Payment(TxPayment {
                    sender: PublicKey(s),
                    recipient: RecipientAddress(r),
                    amount,
                    fee,
                    timestamp,
                    signature: SignatureBytes(sig),
                }))
            }
            other => Err(BlockError::UnknownTransactionType(other)),
        }
    }

    /// `feePerByte = fee / serializedLength`, checked against the
    /// `1 / MAX_BYTES_PER_TOKEN` floor. Genesis transactions (fee-free by
    /// construction) are exempt.
    pub fn meets_min_fee_per_byte(&self) -> bool {
        match self {
            Transaction::Genesis(_) => true,
            Transaction::Payment(tx) => {
                let len = self.serialize().len() as u128;
                // fee/len >= 1/MAX_BYTES_PER_TOKEN  <=>  fee * MAX_BYTES_PER_TOKEN >= len
                (tx.fee as u128) * (MAX_BYTES_PER_TOKEN as u128) >= len
            }
        }
    }

    /// Structural validity: positive amount/fee bounds and, for
    /// `Payment`, a signature that verifies against `sender`.
    pub fn is_structurally_valid(&self) -> bool {
        match self {
            Transaction::Genesis(_) => true,
            Transaction::Payment(tx) => {
                if tx.fee == 0 {
                    return false;
                }
                let Ok(vk) = tx.sender.to_verifying_key() else {
                    return false;
                };
                let sig = ed25519_dalek::Signature::from_bytes(&tx.signature.0);
                let msg = Self::payment_signing_bytes(tx);
                vk.verify(&msg, &sig).is_ok()
            }
        }
    }
}

/// Signs a `TxPayment` in place, given the matching signing key.
pub fn sign_payment(tx: &mut TxPayment, signing_key: &ed25519_dalek::SigningKey) {
    let msg = Transaction::payment_signing_bytes(tx);
    let sig = signing_key.sign(&msg);
    tx.signature = SignatureBytes(sig.to_bytes());
}
