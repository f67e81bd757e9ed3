//! Wishlists keyed by user id or, for anonymous shoppers, a session id.

use serde::Deserialize;

use crate::domain::aggregates::{Identity, WishlistEntry};
use crate::store::WishlistStore;
use crate::{Result, StorefrontError};

/// Identity fields as they arrive on a query string or request body.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Owner {
    pub user_id: Option<i64>,
    pub session_id: Option<String>,
}

impl Owner {
    fn identity(self) -> Result<Identity> {
        Identity::from_parts(self.user_id, self.session_id)
            .ok_or_else(|| StorefrontError::validation("user_id or session_id is required"))
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AddToWishlist {
    #[serde(flatten)]
    pub owner: Owner,
    pub product_id: Option<i64>,
}

#[derive(Clone)]
pub struct WishlistService {
    store: WishlistStore,
}

impl WishlistService {
    pub fn new(store: WishlistStore) -> Self {
        Self { store }
    }

    pub async fn list(&self, owner: Owner) -> Result<Vec<WishlistEntry>> {
        self.store.list(&owner.identity()?).await
    }

    pub async fn add(&self, request: AddToWishlist) -> Result<i64> {
        let product_id = request
            .product_id
            .ok_or_else(|| StorefrontError::validation("product_id is required"))?;
        let identity = request.owner.identity()?;
        self.store.add(&identity, product_id).await
    }

    pub async fn remove(&self, id: i64) -> Result<()> {
        if self.store.remove(id).await? {
            Ok(())
        } else {
            Err(StorefrontError::not_found("Wishlist item not found"))
        }
    }

    /// Removing a product that is not on the list is not an error.
    pub async fn remove_product(&self, owner: Owner, product_id: i64) -> Result<()> {
        let removed = self.store.remove_product(&owner.identity()?, product_id).await?;
        tracing::debug!(product_id, removed, "Wishlist product removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{connect_in_memory, seed_catalog};

    #[tokio::test]
    async fn test_identity_required() {
        let pool = connect_in_memory().await.unwrap();
        let wishlist = WishlistService::new(WishlistStore::new(pool));

        let err = wishlist.list(Owner::default()).await.unwrap_err();
        assert!(matches!(err, StorefrontError::Validation(_)));
        let err = wishlist
            .add(AddToWishlist { owner: Owner { user_id: None, session_id: Some("s".into()) }, product_id: None })
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontError::Validation(msg) if msg == "product_id is required"));
    }

    #[tokio::test]
    async fn test_remove_by_id() {
        let pool = connect_in_memory().await.unwrap();
        seed_catalog(&pool).await.unwrap();
        let wishlist = WishlistService::new(WishlistStore::new(pool));
        let owner = Owner { user_id: None, session_id: Some("s1".into()) };

        let id = wishlist.add(AddToWishlist { owner: owner.clone(), product_id: Some(4) }).await.unwrap();
        wishlist.remove(id).await.unwrap();
        assert!(matches!(wishlist.remove(id).await, Err(StorefrontError::NotFound(_))));
        wishlist.remove_product(owner, 4).await.unwrap();
    }
}
