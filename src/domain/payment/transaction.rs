//! Transaction - one payment attempt against a contract.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    Amount, ContractId, DomainError, StateMachine, Timestamp, TransactionId,
};

use super::{BasketId, ChargeKind};

/// Local lifecycle of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Charge issued; outcome unknown. Reconciliation picks these up.
    Created,

    /// Gateway confirmed settlement.
    Paid,

    /// Gateway reported failure.
    Failed,
}

impl StateMachine for TransactionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use TransactionStatus::*;
        matches!((self, target), (Created, Paid) | (Created, Failed))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TransactionStatus::*;
        match self {
            Created => vec![Paid, Failed],
            Paid | Failed => vec![],
        }
    }
}

/// Gateway-side order status mirrored onto the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Success,
    Failed,
}

/// One payment attempt. Append-only except for status transitions on the
/// same row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier.
    pub id: TransactionId,

    /// Contract this attempt bills.
    pub contract_id: ContractId,

    /// Gateway correlation key, unique per attempt.
    pub basket_id: BasketId,

    /// Charge class, decided when the basket id was generated.
    pub charge_kind: ChargeKind,

    /// Gateway transaction id, populated from the response/notification.
    pub invoice_id: Option<String>,

    /// Local attempt status.
    pub status: TransactionStatus,

    /// Gateway-side order status.
    pub order_status: OrderStatus,

    /// Amount charged.
    pub amount: Amount,

    /// Child the tutoring is for (gateway order description).
    pub child_name: String,

    /// When the attempt was created.
    pub created_at: Timestamp,

    /// When the attempt was last updated.
    pub updated_at: Timestamp,
}

impl Transaction {
    /// Creates a new pending attempt.
    pub fn new(
        contract_id: ContractId,
        basket_id: BasketId,
        charge_kind: ChargeKind,
        amount: Amount,
        child_name: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: TransactionId::new(),
            contract_id,
            basket_id,
            charge_kind,
            invoice_id: None,
            status: TransactionStatus::Created,
            order_status: OrderStatus::Pending,
            amount,
            child_name: child_name.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the attempt settled. Idempotent entry points rely on the fact
    /// that an already-`Paid` row cannot be paid again.
    pub fn mark_paid(&mut self, invoice_id: impl Into<String>) -> Result<(), DomainError> {
        self.status = self.status.transition_to(TransactionStatus::Paid)?;
        self.order_status = OrderStatus::Success;
        self.invoice_id = Some(invoice_id.into());
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Marks the attempt failed.
    pub fn mark_failed(&mut self, invoice_id: Option<String>) -> Result<(), DomainError> {
        self.status = self.status.transition_to(TransactionStatus::Failed)?;
        self.order_status = OrderStatus::Failed;
        if invoice_id.is_some() {
            self.invoice_id = invoice_id;
        }
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// True while the outcome is unknown.
    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::BasketPrefixes;

    fn txn() -> Transaction {
        Transaction::new(
            ContractId::new(),
            BasketId::generate(ChargeKind::Initial, &BasketPrefixes::default()),
            ChargeKind::Initial,
            Amount::from_minor_units(500000).unwrap(),
            "Amir",
        )
    }

    #[test]
    fn starts_pending() {
        let t = txn();
        assert!(t.is_pending());
        assert_eq!(t.order_status, OrderStatus::Pending);
        assert!(t.invoice_id.is_none());
    }

    #[test]
    fn mark_paid_sets_invoice_and_order_status() {
        let mut t = txn();
        t.mark_paid("INV-42").unwrap();
        assert_eq!(t.status, TransactionStatus::Paid);
        assert_eq!(t.order_status, OrderStatus::Success);
        assert_eq!(t.invoice_id.as_deref(), Some("INV-42"));
    }

    #[test]
    fn paid_row_cannot_be_paid_again() {
        let mut t = txn();
        t.mark_paid("INV-42").unwrap();
        assert!(t.mark_paid("INV-43").is_err());
        assert_eq!(t.invoice_id.as_deref(), Some("INV-42"));
    }

    #[test]
    fn failed_row_is_terminal() {
        let mut t = txn();
        t.mark_failed(Some("INV-42".to_string())).unwrap();
        assert!(t.mark_paid("INV-43").is_err());
        assert_eq!(t.order_status, OrderStatus::Failed);
    }

    #[test]
    fn failure_without_invoice_keeps_none() {
        let mut t = txn();
        t.mark_failed(None).unwrap();
        assert!(t.invoice_id.is_none());
    }
}
