pub mod candidates;
pub mod models;

pub use candidates::CandidateSet;
pub use models::{
    ApprovalRow, ApprovalState, BranchFailure, ContractCheck, DiscoveryError, DiscoveryOutcome,
    FailurePolicy, FailureReport, OperatorView, RevokeAction, SkipReason, TokenView,
};

use crate::contracts::ContractBinder;
use crate::indexer::{NftIndexer, TokenDetails};
use crate::operators::OperatorRegistry;
use crate::transactor::Transactor;
use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::{Address, TxHash};
use anyhow::Result;
use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub const MAINNET_CHAIN_ID: u64 = 1;

/// Owns the approval table for one wallet session and the single-run guard
/// around refreshing it.
pub struct ApprovalSession {
    indexer: Arc<dyn NftIndexer>,
    binder: Arc<dyn ContractBinder>,
    transactor: Arc<dyn Transactor>,
    operators: OperatorRegistry,
    policy: FailurePolicy,
    in_flight: AtomicBool,
    state: watch::Sender<ApprovalState>,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ApprovalSession {
    pub fn new(
        indexer: Arc<dyn NftIndexer>,
        binder: Arc<dyn ContractBinder>,
        transactor: Arc<dyn Transactor>,
        operators: OperatorRegistry,
        policy: FailurePolicy,
    ) -> Self {
        ApprovalSession {
            indexer,
            binder,
            transactor,
            operators,
            policy,
            in_flight: AtomicBool::new(false),
            state: watch::Sender::new(ApprovalState::default()),
        }
    }

    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    pub fn subscribe(&self) -> watch::Receiver<ApprovalState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ApprovalState {
        self.state.borrow().clone()
    }

    pub fn is_discovering(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Rebuilds the approval table for the signer's wallet. Calls without a
    /// signer, off mainnet, or while another run is in flight return
    /// `Skipped` and touch nothing.
    pub async fn discover(
        &self,
        signer: Option<&PrivateKeySigner>,
        chain_id: u64,
    ) -> Result<DiscoveryOutcome, DiscoveryError> {
        let Some(signer) = signer else {
            debug!("Skipping approval discovery: no signer");
            return Ok(DiscoveryOutcome::Skipped(SkipReason::NoSigner));
        };

        if chain_id != MAINNET_CHAIN_ID {
            debug!("Skipping approval discovery on chain {}", chain_id);
            return Ok(DiscoveryOutcome::Skipped(SkipReason::UnsupportedChain(
                chain_id,
            )));
        }

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!("Skipping approval discovery: run already in flight");
            return Ok(DiscoveryOutcome::Skipped(SkipReason::InFlight));
        };

        let wallet = signer.address();
        info!("Discovering operator approvals for {}", wallet);
        self.state.send_modify(|state| state.loading = true);

        match self.collect_rows(wallet).await {
            Ok((rows, failures)) => {
                info!("Found {} operator approval(s) for {}", rows.len(), wallet);
                self.state.send_modify(|state| {
                    state.rows = rows.clone();
                    state.failures = failures.clone();
                    state.loading = false;
                });
                Ok(DiscoveryOutcome::Completed { rows, failures })
            }
            Err(e) => {
                error!("Approval discovery for {} failed: {}", wallet, e);
                self.state.send_modify(|state| state.loading = false);
                Err(e)
            }
        }
    }

    async fn collect_rows(
        &self,
        wallet: Address,
    ) -> Result<(Vec<ApprovalRow>, Vec<FailureReport>), DiscoveryError> {
        let transfers = match self.indexer.transfers(wallet).await {
            Ok(transfers) => transfers,
            Err(e) => {
                error!("Failed fetching NFT transfers for {}: {:#}", wallet, e);
                Vec::new()
            }
        };

        let candidates = CandidateSet::from_transfers(&transfers);
        info!(
            "{} transfers touch {} NFT contract(s)",
            transfers.len(),
            candidates.len()
        );

        let outcomes = join_all(
            candidates
                .iter()
                .map(|(contract, token_id)| self.check_contract(wallet, contract, token_id)),
        )
        .await;

        let mut rows = Vec::new();
        let mut failures = Vec::new();
        for check in outcomes {
            rows.extend(check.rows);
            for failure in check.failures {
                match self.policy {
                    FailurePolicy::Abort => return Err(DiscoveryError::Aborted(failure)),
                    FailurePolicy::Skip => {
                        warn!("Skipping {}: {}", failure.contract(), failure);
                    }
                    FailurePolicy::Report => {
                        warn!("Could not check {}: {}", failure.contract(), failure);
                        failures.push(FailureReport::from(&failure));
                    }
                }
            }
        }

        rows.sort_by(|a, b| a.key.cmp(&b.key));
        failures.sort_by_key(|report| report.contract);

        Ok((rows, failures))
    }

    async fn check_contract(
        &self,
        wallet: Address,
        contract: Address,
        token_id: &str,
    ) -> ContractCheck {
        let binding = match self.binder.bind(contract).await {
            Ok(binding) => binding,
            Err(e) => return BranchFailure::from(e).into(),
        };

        let mut details: Option<TokenDetails> = None;
        let mut check = ContractCheck::default();

        for operator in self.operators.iter() {
            let approved = match binding.is_approved_for_all(wallet, operator.address).await {
                Ok(approved) => approved,
                Err(source) => {
                    check.failures.push(BranchFailure::ApprovalCheck {
                        contract,
                        operator: operator.name,
                        source,
                    });
                    continue;
                }
            };

            if !approved {
                continue;
            }
            debug!("{} has approved {} on {}", wallet, operator.name, contract);

            let token = match details.take() {
                Some(token) => token,
                None => match self.indexer.token_metadata(contract, token_id).await {
                    Ok(token) => token,
                    Err(e) => {
                        error!(
                            "Failed fetching token metadata for {}/{}: {:#}",
                            contract, token_id, e
                        );
                        return check;
                    }
                },
            };

            match token.image() {
                Ok(thumbnail) => check.rows.push(ApprovalRow {
                    key: ApprovalRow::key_for(contract, operator),
                    token: TokenView {
                        thumbnail,
                        collection_name: token.name.clone(),
                        symbol: token.symbol.clone(),
                        address: contract,
                    },
                    operator: OperatorView {
                        name: operator.name.to_string(),
                        address: operator.address,
                    },
                    action: RevokeAction {
                        contract: binding.clone(),
                        operator: *operator,
                    },
                }),
                Err(e) => warn!(
                    "Malformed metadata for {}/{}, skipping {} row: {}",
                    contract, token_id, operator.name, e
                ),
            }

            details = Some(token);
        }

        check
    }

    /// Clears `action`'s approval through the transactor, then refreshes the
    /// table once the transaction is confirmed.
    pub async fn revoke(
        &self,
        action: &RevokeAction,
        signer: Option<&PrivateKeySigner>,
        chain_id: u64,
    ) -> Result<TxHash> {
        let contract = action.contract.clone();
        let operator = action.operator.address;
        let description = format!(
            "Revoke {} approval on {}",
            action.operator.name,
            contract.address()
        );

        let tx_hash = self
            .transactor
            .transact(
                &description,
                Box::pin(async move { contract.set_approval_for_all(operator, false).await }),
            )
            .await?;

        if let Err(e) = self.discover(signer, chain_id).await {
            warn!("Refreshing approvals after {} failed: {}", tx_hash, e);
        }

        Ok(tx_hash)
    }
}
