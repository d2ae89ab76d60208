//! The chain session: client handle, contract account and signer set.
//!
//! One session is built at startup and shared read-only by every request.
//! Co-signed flows derive a separate session with [`ChainSession::with_cosigner`].

use std::sync::Arc;

use crate::chain::action::Action;
use crate::chain::client::SharedChainRpc;
use crate::chain::keys::{PrivateKey, SignerSet};
use crate::chain::transaction::{parse_chain_id, TransactOptions, Transaction, TransactionHeader};
use crate::chain::types::{ChainError, ChainResult, Name, SubmittedTransaction};

#[derive(Clone)]
pub struct ChainSession {
    client: SharedChainRpc,
    contract: Name,
    signer: Arc<SignerSet>,
}

impl ChainSession {
    pub fn new(client: SharedChainRpc, contract: Name, signer: SignerSet) -> Self {
        Self {
            client,
            contract,
            signer: Arc::new(signer),
        }
    }

    pub fn client(&self) -> &SharedChainRpc {
        &self.client
    }

    /// The certification contract account, also the operator account.
    pub fn contract(&self) -> Name {
        self.contract
    }

    pub fn signer(&self) -> &SignerSet {
        &self.signer
    }

    /// A new session that additionally signs with `key`.
    pub fn with_cosigner(&self, key: PrivateKey) -> Self {
        Self {
            client: self.client.clone(),
            contract: self.contract,
            signer: Arc::new(self.signer.with_key(key)),
        }
    }

    /// Current head block number.
    pub async fn head_block_num(&self) -> ChainResult<u32> {
        Ok(self.client.get_info().await?.head_block_num)
    }

    /// Pack, sign and push `actions` as one transaction, in the given order.
    pub async fn transact(
        &self,
        actions: Vec<Action>,
        options: TransactOptions,
    ) -> ChainResult<SubmittedTransaction> {
        if actions.is_empty() {
            return Err(ChainError::EmptyTransaction);
        }

        let info = self.client.get_info().await?;
        let chain_id = parse_chain_id(&info.chain_id)?;
        let reference_num = info.head_block_num.saturating_sub(options.blocks_behind).max(1);
        let reference = self.client.get_block(reference_num).await?;

        let header = TransactionHeader::from_reference(&reference, options.expire_seconds)?;
        let trx = Transaction::new(header, actions)?;
        let local_id = trx.id();
        let packed = trx.sign(&chain_id, &self.signer);

        let submitted = self.client.push_transaction(&packed).await?;
        if submitted.transaction_id != local_id {
            tracing::warn!(
                local_id = %local_id,
                node_id = %submitted.transaction_id,
                "Node reported a different transaction id"
            );
        }

        tracing::info!(
            transaction_id = %submitted.transaction_id,
            action_count = trx.actions.len(),
            signatures = packed.signatures.len(),
            reference_block = reference.block_num,
            "Transaction submitted"
        );
        Ok(submitted)
    }
}

impl std::fmt::Debug for ChainSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainSession")
            .field("contract", &self.contract.to_string())
            .field("signers", &self.signer.len())
            .finish()
    }
}
