use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, OfferId};
use crate::domain::offer::Offer;
use crate::ports::OfferRepository;

#[derive(Default)]
pub struct InMemoryOfferRepository {
    offers: RwLock<HashMap<OfferId, Offer>>,
}

impl InMemoryOfferRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OfferRepository for InMemoryOfferRepository {
    async fn save(&self, offer: &Offer) -> Result<(), DomainError> {
        self.offers.write().await.insert(offer.id, offer.clone());
        Ok(())
    }

    async fn update(&self, offer: &Offer) -> Result<(), DomainError> {
        let mut offers = self.offers.write().await;
        if !offers.contains_key(&offer.id) {
            return Err(DomainError::new(
                ErrorCode::OfferNotFound,
                format!("Offer not found: {}", offer.id),
            ));
        }
        offers.insert(offer.id, offer.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &OfferId) -> Result<Option<Offer>, DomainError> {
        Ok(self.offers.read().await.get(id).cloned())
    }
}
