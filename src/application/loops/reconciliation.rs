//! Payment reconciliation loop.
//!
//! Notifications get lost; synchronous responses time out. This loop sweeps
//! transactions still in their pending state, asks the gateway for the
//! authoritative status of each, and routes the answer through the same
//! confirm/fail entry point the notification path uses. Running it twice
//! over the same batch is harmless: the second pass observes settled rows
//! and does nothing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::application::handlers::payment::{ConfirmPaymentCommand, ConfirmPaymentHandler};
use crate::domain::foundation::{Amount, DomainError};
use crate::ports::{PaymentGateway, RemoteChargeStatus, TransactionRepository};

/// Counters from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub scanned: usize,
    pub confirmed: usize,
    pub failed: usize,
    pub still_pending: usize,
    pub errors: usize,
}

pub struct ReconciliationLoop {
    transactions: Arc<dyn TransactionRepository>,
    gateway: Arc<dyn PaymentGateway>,
    confirm: Arc<ConfirmPaymentHandler>,
    interval: Duration,
    batch_size: u32,
}

impl ReconciliationLoop {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        gateway: Arc<dyn PaymentGateway>,
        confirm: Arc<ConfirmPaymentHandler>,
        interval: Duration,
        batch_size: u32,
    ) -> Self {
        Self {
            transactions,
            gateway,
            confirm,
            interval,
            batch_size,
        }
    }

    /// Runs until shutdown is signalled.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "Reconciliation loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_once().await {
                        Ok(report) => debug!(?report, "Reconciliation pass finished"),
                        Err(err) => error!(error = %err, "Reconciliation pass failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Reconciliation loop shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One pass over the pending batch. Per-item errors are logged and
    /// counted, never fatal to the pass.
    pub async fn run_once(&self) -> Result<ReconciliationReport, DomainError> {
        let pending = self.transactions.find_pending(self.batch_size).await?;
        let mut report = ReconciliationReport::default();

        for transaction in pending {
            report.scanned += 1;
            let status = match self
                .gateway
                .fetch_charge_status(&transaction.basket_id, transaction.amount)
                .await
            {
                Ok(status) => status,
                Err(err) => {
                    warn!(
                        basket_id = %transaction.basket_id,
                        error = %err,
                        "Status query failed; will retry next pass"
                    );
                    report.errors += 1;
                    continue;
                }
            };

            let applied = match status {
                RemoteChargeStatus::Paid {
                    invoice_id,
                    amount_minor_units,
                    instrument_token,
                } => match Amount::from_minor_units(amount_minor_units) {
                    Ok(amount) => {
                        let command = ConfirmPaymentCommand {
                            basket_id: transaction.basket_id.clone(),
                            invoice_id,
                            amount,
                            instrument_token,
                        };
                        match self.confirm.handle(command).await {
                            Ok(_) => {
                                report.confirmed += 1;
                                Ok(())
                            }
                            Err(err) => Err(err),
                        }
                    }
                    Err(err) => Err(err.into()),
                },
                RemoteChargeStatus::Failed { err_code, err_msg } => match self
                    .confirm
                    .record_failure(&transaction.basket_id, &err_code, &err_msg, None)
                    .await
                {
                    Ok(_) => {
                        report.failed += 1;
                        Ok(())
                    }
                    Err(err) => Err(err),
                },
                RemoteChargeStatus::Pending => {
                    report.still_pending += 1;
                    Ok(())
                }
            };

            if let Err(err) = applied {
                warn!(
                    basket_id = %transaction.basket_id,
                    error = %err,
                    "Could not apply reconciled status"
                );
                report.errors += 1;
            }
        }

        Ok(report)
    }
}
