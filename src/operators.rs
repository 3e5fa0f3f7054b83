use alloy_primitives::{Address, address};

/// A named counterparty whose approval-for-all status is checked on every
/// candidate contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownOperator {
    pub name: &'static str,
    pub address: Address,
}

pub const KNOWN_OPERATORS: &[KnownOperator] = &[KnownOperator {
    name: "OpenSea",
    address: address!("0x597120a6fc0fa817df3F463bF0A5e2Abe7a26A8C"),
}];

#[derive(Debug, Clone)]
pub struct OperatorRegistry {
    operators: Vec<KnownOperator>,
}

impl OperatorRegistry {
    pub fn new(operators: Vec<KnownOperator>) -> Self {
        Self { operators }
    }

    pub fn iter(&self) -> impl Iterator<Item = &KnownOperator> {
        self.operators.iter()
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&KnownOperator> {
        self.operators
            .iter()
            .find(|op| op.name.eq_ignore_ascii_case(name))
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::new(KNOWN_OPERATORS.to_vec())
    }
}
