use crate::indexer::TransferRecord;
use alloy_primitives::Address;
use std::collections::HashMap;

/// Distinct NFT contracts a wallet has interacted with, each paired with one
/// token id seen for it. Later transfers overwrite earlier ones.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    tokens: HashMap<Address, String>,
}

impl CandidateSet {
    pub fn from_transfers<'a>(transfers: impl IntoIterator<Item = &'a TransferRecord>) -> Self {
        let mut tokens = HashMap::new();
        for transfer in transfers.into_iter().filter(|t| t.is_nft()) {
            tokens.insert(transfer.token_address, transfer.token_id.clone());
        }
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token_id(&self, contract: &Address) -> Option<&str> {
        self.tokens.get(contract).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Address, &str)> {
        self.tokens.iter().map(|(address, id)| (*address, id.as_str()))
    }
}
