//! Explicit contract cancellation.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::application::locks::ContractLocks;
use crate::domain::foundation::{ContractId, DomainError, UserId};
use crate::ports::{ContractRepository, Notification, Notifier, SessionRepository};

/// Request by either party to end the subscription.
#[derive(Debug, Clone)]
pub struct CancelContractCommand {
    pub contract_id: ContractId,
    pub actor: UserId,
}

/// Cancels a live contract, deactivates its session schedules, and tells
/// the other party.
pub struct CancelContractHandler {
    contracts: Arc<dyn ContractRepository>,
    sessions: Arc<dyn SessionRepository>,
    notifier: Arc<dyn Notifier>,
    locks: Arc<ContractLocks>,
}

impl CancelContractHandler {
    pub fn new(
        contracts: Arc<dyn ContractRepository>,
        sessions: Arc<dyn SessionRepository>,
        notifier: Arc<dyn Notifier>,
        locks: Arc<ContractLocks>,
    ) -> Self {
        Self {
            contracts,
            sessions,
            notifier,
            locks,
        }
    }

    pub async fn handle(&self, command: CancelContractCommand) -> Result<(), DomainError> {
        let _guard = self.locks.acquire(&command.contract_id).await;

        let mut contract = self
            .contracts
            .find_by_id(&command.contract_id)
            .await?
            .ok_or_else(|| DomainError::contract_not_found(command.contract_id))?;

        let counterparty = contract.counterparty(&command.actor)?;
        contract.cancel()?;
        self.contracts.update(&contract).await?;

        for mut schedule in self
            .sessions
            .find_active_schedules_for_offer(&contract.offer_id)
            .await?
        {
            if let Err(err) = schedule.deactivate() {
                warn!(schedule_id = %schedule.id, error = %err, "Could not deactivate schedule");
                continue;
            }
            self.sessions.update_schedule(&schedule).await?;
        }

        info!(
            contract_id = %contract.id,
            actor = %command.actor,
            "Contract cancelled"
        );
        self.notifier
            .notify(
                Notification::new(
                    counterparty,
                    "Contract cancelled",
                    "The other party has cancelled your tutoring contract",
                )
                .with_data(json!({ "contract_id": contract.id })),
            )
            .await;

        Ok(())
    }
}
