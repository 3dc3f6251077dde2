// Pool record, lifecycle state, and the insertion-ordered funder set.
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::address::Address;
use crate::core::amount::Amount;

pub type PoolId = u64;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolState {
    Inactive,
    Active,
    Completed,
}

impl PoolState {
    /// Numeric code used by external tooling (0 inactive, 1 active, 2 completed).
    pub fn code(self) -> u8 {
        match self {
            PoolState::Inactive => 0,
            PoolState::Active => 1,
            PoolState::Completed => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PoolState::Inactive => "INACTIVE",
            PoolState::Active => "ACTIVE",
            PoolState::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Depositor addresses in first-deposit order, each at most once.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Address>", into = "Vec<Address>")]
pub struct Funders {
    order: Vec<Address>,
    members: HashSet<Address>,
}

impl Funders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `addr` unless it is already present; returns whether it was new.
    pub fn insert(&mut self, addr: Address) -> bool {
        if !self.members.insert(addr) {
            return false;
        }
        self.order.push(addr);
        true
    }

    pub fn contains(&self, addr: &Address) -> bool {
        self.members.contains(addr)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.order.iter()
    }

    pub fn to_vec(&self) -> Vec<Address> {
        self.order.clone()
    }

    // Only reachable through deserialization of a tampered snapshot.
    pub(crate) fn has_duplicates(&self) -> bool {
        self.order.len() != self.members.len()
    }
}

impl PartialEq for Funders {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl Eq for Funders {}

impl From<Vec<Address>> for Funders {
    fn from(order: Vec<Address>) -> Self {
        let members = order.iter().copied().collect();
        Self { order, members }
    }
}

impl From<Funders> for Vec<Address> {
    fn from(funders: Funders) -> Self {
        funders.order
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub(crate) id: PoolId,
    pub(crate) state: PoolState,
    pub(crate) owner: Address,
    pub(crate) funders: Funders,
    pub(crate) balance: Amount,
}

impl Pool {
    pub(crate) fn new(id: PoolId, owner: Address) -> Self {
        Self {
            id,
            state: PoolState::Inactive,
            owner,
            funders: Funders::new(),
            balance: Amount::ZERO,
        }
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn funders(&self) -> &Funders {
        &self.funders
    }

    pub fn info(&self) -> PoolInfo {
        PoolInfo {
            id: self.id,
            state: self.state,
            funders: self.funders.to_vec(),
            owner: self.owner,
            balance: self.balance,
        }
    }
}

/// Owned snapshot of a pool; never aliases ledger storage.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolInfo {
    pub id: PoolId,
    pub state: PoolState,
    pub funders: Vec<Address>,
    pub owner: Address,
    pub balance: Amount,
}

#[cfg(test)]
mod tests {
    use super::{Funders, Pool, PoolState};
    use crate::core::address::Address;
    use crate::core::amount::Amount;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    #[test]
    fn funders_keep_first_deposit_order_without_duplicates() {
        let mut funders = Funders::new();
        assert!(funders.insert(addr(2)));
        assert!(funders.insert(addr(1)));
        assert!(!funders.insert(addr(2)));
        assert!(!funders.insert(addr(1)));
        assert_eq!(funders.to_vec(), vec![addr(2), addr(1)]);
        assert_eq!(funders.len(), 2);
        assert!(funders.contains(&addr(1)));
        assert!(!funders.contains(&addr(3)));
    }

    #[test]
    fn funders_from_tampered_list_reports_duplicates() {
        let funders = Funders::from(vec![addr(1), addr(1)]);
        assert!(funders.has_duplicates());
        assert!(!Funders::from(vec![addr(1), addr(2)]).has_duplicates());
    }

    #[test]
    fn new_pool_is_inactive_and_empty() {
        let pool = Pool::new(3, addr(9));
        assert_eq!(pool.id(), 3);
        assert_eq!(pool.state(), PoolState::Inactive);
        assert_eq!(pool.balance(), Amount::ZERO);
        assert!(pool.funders().is_empty());
    }

    #[test]
    fn info_is_a_detached_copy() {
        let mut pool = Pool::new(0, addr(1));
        pool.funders.insert(addr(5));
        let mut info = pool.info();
        info.funders.push(addr(6));
        assert_eq!(pool.funders().len(), 1);
    }

    #[test]
    fn state_codes_and_labels_are_stable() {
        assert_eq!(PoolState::Inactive.code(), 0);
        assert_eq!(PoolState::Active.code(), 1);
        assert_eq!(PoolState::Completed.code(), 2);
        assert_eq!(PoolState::Completed.to_string(), "COMPLETED");
        let json = serde_json::to_string(&PoolState::Active).expect("encode");
        assert_eq!(json, "\"ACTIVE\"");
    }
}
