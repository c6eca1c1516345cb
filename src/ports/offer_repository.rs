//! Offer repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OfferId};
use crate::domain::offer::Offer;

/// Repository port for Offer persistence.
#[async_trait]
pub trait OfferRepository: Send + Sync {
    /// Save a new offer.
    async fn save(&self, offer: &Offer) -> Result<(), DomainError>;

    /// Update an existing offer.
    async fn update(&self, offer: &Offer) -> Result<(), DomainError>;

    /// Find an offer by id. Returns `None` if not found.
    async fn find_by_id(&self, id: &OfferId) -> Result<Option<Offer>, DomainError>;
}
