//! Outbound token-pool operations.
//!
//! Thin layer over the chain-invocation client: each operation packs pool
//! identity through the identifier codec and submits the corresponding
//! contract method. Identifier problems surface as
//! [`ConnectorError::InvalidIdentifier`] and are not retried.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::abi;
use crate::error::{ConnectorError, Result};
use crate::ids::{pack_token_id, unpack_pool_locator, PoolId};
use crate::transport::{ChainClient, TransactionRef};

/// Token-pool operations bound to a default contract address.
pub struct TokenOps {
    chain: Arc<dyn ChainClient>,
    contract_address: String,
}

impl TokenOps {
    pub fn new(chain: Arc<dyn ChainClient>, contract_address: impl Into<String>) -> Self {
        Self {
            chain,
            contract_address: contract_address.into(),
        }
    }

    /// Submit a pool-creation transaction on the default contract.
    pub async fn create_pool(
        &self,
        signer: &str,
        request_id: &str,
        is_fungible: bool,
        data: &str,
    ) -> Result<TransactionRef> {
        let params = [json!(is_fungible), hex_bytes(data)];
        let tx = self
            .chain
            .send_transaction(
                signer,
                &self.contract_address,
                request_id,
                &abi::create_method(),
                &params,
            )
            .await?;
        tracing::info!(
            target: "tessera::ops",
            request_id,
            is_fungible,
            tx_id = %tx.id,
            "Pool creation submitted"
        );
        Ok(tx)
    }

    /// Mint into a pool. Fungible pools mint `amount` units; non-fungible
    /// pools mint `amount` fresh serials to the recipient, with the serial
    /// numbers assigned by the contract.
    pub async fn mint(
        &self,
        signer: &str,
        request_id: &str,
        pool_locator: &str,
        to: &str,
        amount: &str,
        data: &str,
    ) -> Result<TransactionRef> {
        let locator = unpack_pool_locator(pool_locator);
        let pool = PoolId::parse(&locator.pool_id)?;
        let type_id = pack_token_id(&locator.pool_id, "0")?;
        let contract = locator
            .address
            .unwrap_or_else(|| self.contract_address.clone());

        let (method, params) = if pool.is_fungible {
            (
                abi::mint_fungible_method(),
                vec![
                    json!(type_id),
                    json!([to]),
                    json!([amount]),
                    hex_bytes(data),
                ],
            )
        } else {
            let count: usize = amount.parse().map_err(|_| {
                ConnectorError::InvalidRequest(format!(
                    "non-fungible mint amount '{amount}' is not a valid count"
                ))
            })?;
            (
                abi::mint_non_fungible_method(),
                vec![json!(type_id), json!(vec![to; count]), hex_bytes(data)],
            )
        };
        Ok(self
            .chain
            .send_transaction(signer, &contract, request_id, &method, &params)
            .await?)
    }

    /// Transfer a token between accounts.
    pub async fn transfer(
        &self,
        signer: &str,
        request_id: &str,
        pool_locator: &str,
        from: &str,
        to: &str,
        token_index: Option<&str>,
        amount: &str,
        data: &str,
    ) -> Result<TransactionRef> {
        let locator = unpack_pool_locator(pool_locator);
        let id = pack_token_id(&locator.pool_id, token_index.unwrap_or("0"))?;
        let contract = locator
            .address
            .unwrap_or_else(|| self.contract_address.clone());
        let params = [
            json!(from),
            json!(to),
            json!(id),
            json!(amount),
            hex_bytes(data),
        ];
        Ok(self
            .chain
            .send_transaction(
                signer,
                &contract,
                request_id,
                &abi::safe_transfer_from_method(),
                &params,
            )
            .await?)
    }

    /// Burn tokens out of a pool.
    pub async fn burn(
        &self,
        signer: &str,
        request_id: &str,
        pool_locator: &str,
        from: &str,
        token_index: Option<&str>,
        amount: &str,
        data: &str,
    ) -> Result<TransactionRef> {
        let locator = unpack_pool_locator(pool_locator);
        let id = pack_token_id(&locator.pool_id, token_index.unwrap_or("0"))?;
        let contract = locator
            .address
            .unwrap_or_else(|| self.contract_address.clone());
        let params = [json!(from), json!(id), json!(amount), hex_bytes(data)];
        Ok(self
            .chain
            .send_transaction(signer, &contract, request_id, &abi::burn_method(), &params)
            .await?)
    }

    /// Grant or revoke operator approval for the signer's tokens on the
    /// pool's contract.
    pub async fn approval(
        &self,
        signer: &str,
        request_id: &str,
        pool_locator: &str,
        operator: &str,
        approved: bool,
        data: &str,
    ) -> Result<TransactionRef> {
        let locator = unpack_pool_locator(pool_locator);
        // Validates the locator even though approval itself is pool-agnostic
        // on chain.
        PoolId::parse(&locator.pool_id)?;
        let contract = locator
            .address
            .unwrap_or_else(|| self.contract_address.clone());
        let params = [json!(operator), json!(approved), hex_bytes(data)];
        Ok(self
            .chain
            .send_transaction(
                signer,
                &contract,
                request_id,
                &abi::set_approval_for_all_method(),
                &params,
            )
            .await?)
    }

    /// Read an account's balance for one token of the pool.
    pub async fn balance_of(
        &self,
        pool_locator: &str,
        account: &str,
        token_index: Option<&str>,
    ) -> Result<String> {
        let locator = unpack_pool_locator(pool_locator);
        let id = pack_token_id(&locator.pool_id, token_index.unwrap_or("0"))?;
        let contract = locator
            .address
            .unwrap_or_else(|| self.contract_address.clone());
        let params = [json!(account), json!(id)];
        let output = self
            .chain
            .query(&contract, &abi::balance_of_method(), &params)
            .await?;
        Ok(balance_string(&output))
    }
}

/// Encode a correlation payload as 0x-prefixed hex bytes.
fn hex_bytes(data: &str) -> Value {
    json!(format!("0x{}", hex::encode(data.as_bytes())))
}

/// The gateway returns uint256 outputs as decimal strings, but tolerate a
/// bare JSON number too.
fn balance_string(output: &Value) -> String {
    match output {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
