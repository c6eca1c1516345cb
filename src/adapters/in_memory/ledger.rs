use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{Amount, DomainError, UserId};
use crate::ports::BalanceLedger;

#[derive(Default)]
pub struct InMemoryBalanceLedger {
    balances: RwLock<HashMap<UserId, Amount>>,
}

impl InMemoryBalanceLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BalanceLedger for InMemoryBalanceLedger {
    async fn credit(&self, tutor_id: &UserId, amount: Amount) -> Result<(), DomainError> {
        let mut balances = self.balances.write().await;
        let balance = balances.entry(tutor_id.clone()).or_insert_with(Amount::zero);
        *balance = *balance + amount;
        Ok(())
    }

    async fn balance(&self, tutor_id: &UserId) -> Result<Amount, DomainError> {
        Ok(self
            .balances
            .read()
            .await
            .get(tutor_id)
            .copied()
            .unwrap_or_else(Amount::zero))
    }
}
