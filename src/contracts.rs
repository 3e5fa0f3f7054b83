use crate::rpc::RpcClient;
use alloy::sol;
use alloy_primitives::{Address, Bytes, FixedBytes, TxHash, fixed_bytes};
use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

sol! {
    interface IERC721 {
        function isApprovedForAll(address owner, address operator) external view returns (bool);
        function setApprovalForAll(address operator, bool approved) external;
    }

    interface IERC165 {
        function supportsInterface(bytes4 interfaceId) external view returns (bool);
    }
}

pub const ERC721_INTERFACE_ID: FixedBytes<4> = fixed_bytes!("80ac58cd");
pub const ERC1155_INTERFACE_ID: FixedBytes<4> = fixed_bytes!("d9b67a26");

#[derive(Debug, Error)]
pub enum BindError {
    #[error("{0} has no contract code")]
    NoCode(Address),
    #[error("{0} implements neither ERC-721 nor ERC-1155")]
    Unsupported(Address),
    #[error("failed to probe {address}: {source}")]
    Probe {
        address: Address,
        #[source]
        source: anyhow::Error,
    },
}

/// A contract that exposes operator approvals for all of an owner's tokens.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ApprovalContract: Send + Sync {
    fn address(&self) -> Address;

    async fn is_approved_for_all(&self, owner: Address, operator: Address) -> Result<bool>;

    /// Submits the transaction and resolves once it is mined.
    async fn set_approval_for_all(&self, operator: Address, approved: bool) -> Result<TxHash>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContractBinder: Send + Sync {
    /// Binds `address`, failing when the contract cannot answer approval
    /// queries.
    async fn bind(&self, address: Address) -> Result<Arc<dyn ApprovalContract>, BindError>;
}

/// Read-only chain queries needed to decide whether an address can be bound.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContractReader: Send + Sync {
    async fn code(&self, address: Address) -> Result<Bytes>;

    async fn supports_interface(
        &self,
        address: Address,
        interface_id: FixedBytes<4>,
    ) -> Result<bool>;

    async fn is_approved_for_all(
        &self,
        contract: Address,
        owner: Address,
        operator: Address,
    ) -> Result<bool>;
}

#[async_trait]
impl ContractReader for RpcClient {
    async fn code(&self, address: Address) -> Result<Bytes> {
        self.get_code(address).await
    }

    async fn supports_interface(
        &self,
        address: Address,
        interface_id: FixedBytes<4>,
    ) -> Result<bool> {
        self.call_contract(
            address,
            IERC165::supportsInterfaceCall {
                interfaceId: interface_id,
            },
        )
        .await
    }

    async fn is_approved_for_all(
        &self,
        contract: Address,
        owner: Address,
        operator: Address,
    ) -> Result<bool> {
        self.call_contract(contract, IERC721::isApprovedForAllCall { owner, operator })
            .await
    }
}

/// Accepts `address` when it has code and either advertises ERC-721/ERC-1155
/// through ERC-165 or answers `isApprovedForAll(0x0, 0x0)` with a bool.
/// Collections that predate ERC-165 only pass the second check.
pub async fn check_approval_interface(
    reader: &dyn ContractReader,
    address: Address,
) -> Result<(), BindError> {
    let code = reader
        .code(address)
        .await
        .map_err(|source| BindError::Probe { address, source })?;
    if code.is_empty() {
        return Err(BindError::NoCode(address));
    }

    let mut erc165_answered = true;
    for interface_id in [ERC721_INTERFACE_ID, ERC1155_INTERFACE_ID] {
        match reader.supports_interface(address, interface_id).await {
            Ok(true) => {
                debug!("{} supports interface {}", address, interface_id);
                return Ok(());
            }
            Ok(false) => {}
            Err(e) => {
                debug!("{} does not answer ERC-165: {:#}", address, e);
                erc165_answered = false;
                break;
            }
        }
    }

    match reader
        .is_approved_for_all(address, Address::ZERO, Address::ZERO)
        .await
    {
        Ok(_) => {
            debug!("{} answers isApprovedForAll without ERC-165", address);
            Ok(())
        }
        // Neither query answered.
        Err(source) if !erc165_answered => Err(BindError::Probe { address, source }),
        Err(e) => {
            debug!("{} rejected isApprovedForAll: {:#}", address, e);
            Err(BindError::Unsupported(address))
        }
    }
}

pub struct RpcApprovalContract {
    client: RpcClient,
    address: Address,
}

#[async_trait]
impl ApprovalContract for RpcApprovalContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn is_approved_for_all(&self, owner: Address, operator: Address) -> Result<bool> {
        ContractReader::is_approved_for_all(&self.client, self.address, owner, operator).await
    }

    async fn set_approval_for_all(&self, operator: Address, approved: bool) -> Result<TxHash> {
        self.client
            .send_contract_call(
                self.address,
                IERC721::setApprovalForAllCall { operator, approved },
            )
            .await
    }
}

pub struct RpcContractBinder {
    client: RpcClient,
}

impl RpcContractBinder {
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ContractBinder for RpcContractBinder {
    async fn bind(&self, address: Address) -> Result<Arc<dyn ApprovalContract>, BindError> {
        check_approval_interface(&self.client, address).await?;

        Ok(Arc::new(RpcApprovalContract {
            client: self.client.clone(),
            address,
        }))
    }
}
