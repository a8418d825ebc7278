//! Signer boundary
//!
//! Key management lives outside this crate. A [`Signer`] turns a fully
//! populated [`TransactionRequest`] into the raw bytes accepted by
//! `eth_sendRawTransaction`.

use async_trait::async_trait;
use bytes::Bytes;
use rivet_primitives::Address;

use crate::types::TransactionRequest;
use crate::SdkError;

/// Transaction signer (local key, remote service or hardware wallet)
#[async_trait]
pub trait Signer: Send + Sync {
    /// Account the signer signs for
    fn address(&self) -> Address;

    /// Sign and encode a transaction
    ///
    /// Every field the binding fills (nonce, gas, gas price, chain ID) is
    /// set by the time this is called. Failures surface as
    /// [`SdkError::Signer`].
    async fn sign_transaction(&self, tx: &TransactionRequest) -> Result<Bytes, SdkError>;
}
