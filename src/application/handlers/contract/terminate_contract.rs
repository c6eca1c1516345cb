//! Dispute and completion-request transitions.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::application::locks::ContractLocks;
use crate::domain::contract::ContractStatus;
use crate::domain::foundation::{ContractId, DomainError, UserId};
use crate::ports::{ContractRepository, Notification, Notifier};

/// How the acting party wants the contract to end.
#[derive(Debug, Clone)]
pub enum TerminationIntent {
    /// Freeze the contract for external resolution. The reason is mandatory.
    Dispute { reason: String },

    /// Declare the work finished, opening the dual-rating window.
    CompletionRequested,
}

#[derive(Debug, Clone)]
pub struct TerminateContractCommand {
    pub contract_id: ContractId,
    pub actor: UserId,
    pub intent: TerminationIntent,
}

/// Moves a contract into `Dispute` or `PendingCompletion` on behalf of one
/// of its parties.
pub struct TerminateContractHandler {
    contracts: Arc<dyn ContractRepository>,
    notifier: Arc<dyn Notifier>,
    locks: Arc<ContractLocks>,
}

impl TerminateContractHandler {
    pub fn new(
        contracts: Arc<dyn ContractRepository>,
        notifier: Arc<dyn Notifier>,
        locks: Arc<ContractLocks>,
    ) -> Self {
        Self {
            contracts,
            notifier,
            locks,
        }
    }

    pub async fn handle(
        &self,
        command: TerminateContractCommand,
    ) -> Result<ContractStatus, DomainError> {
        let _guard = self.locks.acquire(&command.contract_id).await;

        let mut contract = self
            .contracts
            .find_by_id(&command.contract_id)
            .await?
            .ok_or_else(|| DomainError::contract_not_found(command.contract_id))?;

        let counterparty = contract.counterparty(&command.actor)?;
        let (title, body) = match &command.intent {
            TerminationIntent::Dispute { reason } => {
                contract.dispute(&command.actor, reason)?;
                (
                    "Contract disputed",
                    "The other party has raised a dispute on your tutoring contract",
                )
            }
            TerminationIntent::CompletionRequested => {
                contract.request_completion(&command.actor)?;
                (
                    "Contract completion requested",
                    "The other party marked your tutoring contract as finished. \
                     Please rate your experience to close it.",
                )
            }
        };
        self.contracts.update(&contract).await?;

        info!(
            contract_id = %contract.id,
            actor = %command.actor,
            status = ?contract.status,
            "Contract termination recorded"
        );
        self.notifier
            .notify(
                Notification::new(counterparty, title, body)
                    .with_data(json!({ "contract_id": contract.id })),
            )
            .await;

        Ok(contract.status)
    }
}
