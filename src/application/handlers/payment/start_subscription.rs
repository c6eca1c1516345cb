//! First charge for an accepted offer.

use std::sync::Arc;

use tracing::info;

use crate::domain::contract::Contract;
use crate::domain::foundation::{ContractId, DomainError, ErrorCode, OfferId, UserId};
use crate::domain::payment::{BasketId, BasketPrefixes, ChargeKind, Transaction};
use crate::ports::{
    ContractRepository, CustomerContact, HostedCheckout, InitiateChargeRequest, OfferRepository,
    PaymentGateway, TransactionRepository,
};

/// Request to create the contract and first charge for an accepted offer.
#[derive(Debug, Clone)]
pub struct StartSubscriptionCommand {
    pub offer_id: OfferId,
    pub parent_id: UserId,
    pub tutor_id: UserId,
    pub customer: CustomerContact,
}

/// A created contract and the checkout the payer is redirected to.
#[derive(Debug, Clone)]
pub struct StartSubscriptionResult {
    pub contract_id: ContractId,
    pub checkout: HostedCheckout,
}

/// Creates the `Created` contract for an accepted offer and issues the
/// initial, recurring-enabled charge.
///
/// The contract and its transaction are persisted before the gateway call:
/// if the call then times out, the rows sit pending and reconciliation
/// resolves them once the gateway answers status queries.
pub struct StartSubscriptionHandler {
    offers: Arc<dyn OfferRepository>,
    contracts: Arc<dyn ContractRepository>,
    transactions: Arc<dyn TransactionRepository>,
    gateway: Arc<dyn PaymentGateway>,
    prefixes: BasketPrefixes,
}

impl StartSubscriptionHandler {
    pub fn new(
        offers: Arc<dyn OfferRepository>,
        contracts: Arc<dyn ContractRepository>,
        transactions: Arc<dyn TransactionRepository>,
        gateway: Arc<dyn PaymentGateway>,
        prefixes: BasketPrefixes,
    ) -> Self {
        Self {
            offers,
            contracts,
            transactions,
            gateway,
            prefixes,
        }
    }

    pub async fn handle(
        &self,
        command: StartSubscriptionCommand,
    ) -> Result<StartSubscriptionResult, DomainError> {
        let offer = self
            .offers
            .find_by_id(&command.offer_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::OfferNotFound,
                    format!("Offer not found: {}", command.offer_id),
                )
            })?;

        if !offer.is_accepted() {
            return Err(DomainError::validation(
                "offer_id",
                "Only an accepted offer can be billed",
            ));
        }
        let parties_match = (command.parent_id == offer.sender_id
            && command.tutor_id == offer.receiver_id)
            || (command.parent_id == offer.receiver_id && command.tutor_id == offer.sender_id);
        if !parties_match {
            return Err(DomainError::new(
                ErrorCode::Forbidden,
                "Parent and tutor must be the two parties of the offer",
            ));
        }

        if let Some(existing) = self.contracts.find_live_by_offer(&offer.id).await? {
            return Err(DomainError::new(
                ErrorCode::ContractAlreadyExists,
                format!("Offer already has a live contract: {}", existing.id),
            ));
        }

        let basket_id = BasketId::generate(ChargeKind::Initial, &self.prefixes);
        let contract = Contract::new(
            ContractId::new(),
            offer.id,
            command.parent_id.clone(),
            command.tutor_id.clone(),
            basket_id.as_str(),
            offer.amount_monthly,
        );
        let transaction = Transaction::new(
            contract.id,
            basket_id.clone(),
            ChargeKind::Initial,
            offer.amount_monthly,
            offer.child_name.clone(),
        );

        self.contracts.save(&contract).await?;
        self.transactions.save(&transaction).await?;

        let checkout = self
            .gateway
            .initiate_charge(InitiateChargeRequest {
                contract_id: contract.id,
                basket_id,
                amount: offer.amount_monthly,
                description: format!("{} tuition for {}", offer.subject, offer.child_name),
                customer: command.customer,
            })
            .await?;

        info!(
            contract_id = %contract.id,
            offer_id = %offer.id,
            basket_id = %checkout.basket_id,
            amount = %offer.amount_monthly,
            "Subscription started; payer redirected to checkout"
        );

        Ok(StartSubscriptionResult {
            contract_id: contract.id,
            checkout,
        })
    }
}
