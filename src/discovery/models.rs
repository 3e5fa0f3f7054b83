use crate::contracts::{ApprovalContract, BindError};
use crate::operators::KnownOperator;
use alloy_primitives::Address;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenView {
    pub thumbnail: Option<String>,
    pub collection_name: Option<String>,
    pub symbol: Option<String>,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorView {
    pub name: String,
    pub address: Address,
}

/// Everything needed to clear one approval: the bound contract and the
/// operator to remove.
#[derive(Clone)]
pub struct RevokeAction {
    pub contract: Arc<dyn ApprovalContract>,
    pub operator: KnownOperator,
}

impl fmt::Debug for RevokeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevokeAction")
            .field("contract", &self.contract.address())
            .field("operator", &self.operator.name)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ApprovalRow {
    /// `{contract}-{operator name}`
    pub key: String,
    pub token: TokenView,
    pub operator: OperatorView,
    pub action: RevokeAction,
}

impl ApprovalRow {
    pub fn key_for(contract: Address, operator: &KnownOperator) -> String {
        format!("{}-{}", contract, operator.name)
    }
}

/// Why a single candidate contract could not be checked.
#[derive(Debug, Error)]
pub enum BranchFailure {
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error("isApprovedForAll for {operator} on {contract} failed: {source}")]
    ApprovalCheck {
        contract: Address,
        operator: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl BranchFailure {
    pub fn contract(&self) -> Address {
        match self {
            BranchFailure::Bind(BindError::NoCode(address))
            | BranchFailure::Bind(BindError::Unsupported(address))
            | BranchFailure::Bind(BindError::Probe { address, .. }) => *address,
            BranchFailure::ApprovalCheck { contract, .. } => *contract,
        }
    }
}

/// Result of checking one candidate contract: rows for every confirmed
/// approval, plus the checks that could not be answered.
#[derive(Debug, Default)]
pub struct ContractCheck {
    pub rows: Vec<ApprovalRow>,
    pub failures: Vec<BranchFailure>,
}

impl From<BranchFailure> for ContractCheck {
    fn from(failure: BranchFailure) -> Self {
        Self {
            rows: Vec::new(),
            failures: vec![failure],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub contract: Address,
    pub reason: String,
}

impl From<&BranchFailure> for FailureReport {
    fn from(failure: &BranchFailure) -> Self {
        Self {
            contract: failure.contract(),
            reason: failure.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("approval discovery aborted: {0}")]
    Aborted(#[source] BranchFailure),
}

/// What to do with contracts whose approval state could not be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log and leave them out of the table.
    #[default]
    Skip,
    /// Leave them out of the table and list them alongside it.
    Report,
    /// Fail the whole run and keep the previous table.
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(FailurePolicy::Skip),
            "report" => Ok(FailurePolicy::Report),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(anyhow::anyhow!(
                "Unknown approval failure policy '{}', expected skip, report or abort",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoSigner,
    UnsupportedChain(u64),
    InFlight,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoSigner => write!(f, "no wallet signer configured"),
            SkipReason::UnsupportedChain(id) => write!(f, "chain {id} is not Ethereum mainnet"),
            SkipReason::InFlight => write!(f, "a discovery run is already in progress"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DiscoveryOutcome {
    Skipped(SkipReason),
    Completed {
        rows: Vec<ApprovalRow>,
        failures: Vec<FailureReport>,
    },
}

/// Published view of the session, observed by renderers.
#[derive(Debug, Clone, Default)]
pub struct ApprovalState {
    pub rows: Vec<ApprovalRow>,
    pub failures: Vec<FailureReport>,
    pub loading: bool,
}
