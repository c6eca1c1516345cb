use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::contract::Contract;
use crate::domain::foundation::{ContractId, DomainError, ErrorCode, OfferId, Timestamp};
use crate::ports::ContractRepository;

#[derive(Default)]
pub struct InMemoryContractRepository {
    contracts: RwLock<HashMap<ContractId, Contract>>,
}

impl InMemoryContractRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContractRepository for InMemoryContractRepository {
    async fn save(&self, contract: &Contract) -> Result<(), DomainError> {
        let mut contracts = self.contracts.write().await;
        let live_exists = contracts
            .values()
            .any(|c| c.offer_id == contract.offer_id && c.status.is_live());
        if live_exists {
            return Err(DomainError::new(
                ErrorCode::ContractAlreadyExists,
                format!("Offer already has a live contract: {}", contract.offer_id),
            ));
        }
        contracts.insert(contract.id, contract.clone());
        Ok(())
    }

    async fn update(&self, contract: &Contract) -> Result<(), DomainError> {
        let mut contracts = self.contracts.write().await;
        if !contracts.contains_key(&contract.id) {
            return Err(DomainError::contract_not_found(contract.id));
        }
        contracts.insert(contract.id, contract.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &ContractId) -> Result<Option<Contract>, DomainError> {
        Ok(self.contracts.read().await.get(id).cloned())
    }

    async fn find_live_by_offer(
        &self,
        offer_id: &OfferId,
    ) -> Result<Option<Contract>, DomainError> {
        Ok(self
            .contracts
            .read()
            .await
            .values()
            .find(|c| &c.offer_id == offer_id && c.status.is_live())
            .cloned())
    }

    async fn find_due_for_billing(&self, now: &Timestamp) -> Result<Vec<Contract>, DomainError> {
        let mut due: Vec<Contract> = self
            .contracts
            .read()
            .await
            .values()
            .filter(|c| {
                c.status == crate::domain::contract::ContractStatus::Active
                    && c.next_billing_date
                        .map(|d| !d.is_after(now))
                        .unwrap_or(false)
            })
            .cloned()
            .collect();
        due.sort_by_key(|c| c.next_billing_date);
        Ok(due)
    }
}
