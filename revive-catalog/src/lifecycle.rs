use std::sync::Arc;
use uuid::Uuid;
use tracing::info;

use revive_core::repository::{BundleRepository, UserRepository};
use revive_core::{CoreError, CoreResult};
use revive_shared::models::{Bundle, BundlePatch, BundleStatus, Role};

/// Owns bundle status transitions and the remaining-item counter.
/// Ownership is checked here on every mutating call.
pub struct BundleLifecycleManager {
    bundles: Arc<dyn BundleRepository>,
    users: Arc<dyn UserRepository>,
}

impl BundleLifecycleManager {
    pub fn new(bundles: Arc<dyn BundleRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { bundles, users }
    }

    pub async fn create_bundle(&self, supplier_id: Uuid, bundle: Bundle) -> CoreResult<Bundle> {
        if bundle.supplier_id != supplier_id {
            return Err(CoreError::Unauthorized(
                "bundle supplier does not match the caller".to_string(),
            ));
        }
        validate_new_bundle(&bundle)?;

        let supplier = self
            .users
            .get_user(supplier_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("supplier {}", supplier_id)))?;
        if supplier.role != Role::Supplier {
            return Err(CoreError::Forbidden("only suppliers can list bundles".to_string()));
        }
        if supplier.trust.is_blacklisted {
            return Err(CoreError::Forbidden("supplier is blacklisted".to_string()));
        }

        self.bundles.create_bundle(&bundle).await?;
        info!("Supplier {} listed bundle {} at {} cents", supplier_id, bundle.id, bundle.price_cents);
        Ok(bundle)
    }

    pub async fn list_bundles(&self, supplier_id: Uuid) -> CoreResult<Vec<Bundle>> {
        self.bundles.list_by_supplier(supplier_id).await
    }

    pub async fn list_available(&self) -> CoreResult<Vec<Bundle>> {
        self.bundles.list_available().await
    }

    /// Owner view of a bundle.
    pub async fn get_bundle(&self, supplier_id: Uuid, bundle_id: Uuid) -> CoreResult<Bundle> {
        let bundle = self.load(bundle_id).await?;
        ensure_owner(&bundle, supplier_id)?;
        Ok(bundle)
    }

    pub async fn get_bundle_public(&self, bundle_id: Uuid) -> CoreResult<Bundle> {
        self.load(bundle_id).await
    }

    /// Deactivates an available bundle. Bundles are never physically removed.
    pub async fn delete_bundle(&self, supplier_id: Uuid, bundle_id: Uuid) -> CoreResult<()> {
        let bundle = self.load(bundle_id).await?;
        ensure_owner(&bundle, supplier_id)?;

        let moved = self
            .bundles
            .update_status(bundle_id, BundleStatus::Available, BundleStatus::Deactivated)
            .await?;
        if !moved {
            return Err(CoreError::Conflict("bundle is not available".to_string()));
        }
        info!("Bundle {} deactivated by supplier {}", bundle_id, supplier_id);
        Ok(())
    }

    pub async fn update_bundle(
        &self,
        supplier_id: Uuid,
        bundle_id: Uuid,
        patch: &BundlePatch,
    ) -> CoreResult<Bundle> {
        if patch.is_empty() {
            return Err(CoreError::Validation("no fields to update".to_string()));
        }
        validate_patch(patch)?;

        let bundle = self.load(bundle_id).await?;
        ensure_owner(&bundle, supplier_id)?;
        if !bundle.is_available() {
            return Err(CoreError::Conflict("only available bundles can be edited".to_string()));
        }

        // The guard is re-checked by the store in case a purchase landed meanwhile.
        if !self.bundles.update_fields(bundle_id, patch).await? {
            return Err(CoreError::Conflict("only available bundles can be edited".to_string()));
        }
        self.load(bundle_id).await
    }

    /// Takes one item out of the bundle. Returns the new remaining count.
    pub async fn decrease_remaining_item_count(&self, bundle_id: Uuid) -> CoreResult<i32> {
        match self.bundles.decrement_remaining(bundle_id).await? {
            Some(remaining) => Ok(remaining),
            None => {
                self.load(bundle_id).await?;
                Err(CoreError::Conflict("bundle is fully unpacked".to_string()))
            }
        }
    }

    async fn load(&self, bundle_id: Uuid) -> CoreResult<Bundle> {
        self.bundles
            .get_bundle(bundle_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("bundle {}", bundle_id)))
    }
}

fn ensure_owner(bundle: &Bundle, supplier_id: Uuid) -> CoreResult<()> {
    if !bundle.is_owned_by(supplier_id) {
        return Err(CoreError::Unauthorized("bundle belongs to another supplier".to_string()));
    }
    Ok(())
}

fn validate_new_bundle(bundle: &Bundle) -> CoreResult<()> {
    if bundle.title.trim().is_empty() {
        return Err(CoreError::Validation("title is required".to_string()));
    }
    validate_rating(bundle.declared_rating)?;
    validate_price(bundle.price_cents)?;
    if bundle.quantity <= 0 {
        return Err(CoreError::Validation("quantity must be positive".to_string()));
    }
    if !(0..=bundle.quantity).contains(&bundle.remaining_item_count) {
        return Err(CoreError::Validation(
            "remaining item count must be within the bundle quantity".to_string(),
        ));
    }
    if bundle.status != BundleStatus::Available || bundle.reseller_id.is_some() {
        return Err(CoreError::Validation("new bundles must be available and unowned".to_string()));
    }
    Ok(())
}

fn validate_patch(patch: &BundlePatch) -> CoreResult<()> {
    if let Some(title) = &patch.title {
        if title.trim().is_empty() {
            return Err(CoreError::Validation("title is required".to_string()));
        }
    }
    if let Some(rating) = patch.declared_rating {
        validate_rating(rating)?;
    }
    if let Some(price) = patch.price_cents {
        validate_price(price)?;
    }
    Ok(())
}

fn validate_rating(rating: i32) -> CoreResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(CoreError::Validation("declared rating must be between 1 and 5".to_string()));
    }
    Ok(())
}

fn validate_price(price_cents: i64) -> CoreResult<()> {
    if price_cents <= 0 {
        return Err(CoreError::Validation("price must be positive".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use revive_shared::models::{BundleDraft, SortingLevel, TrustState, User};
    use revive_store::MemoryStore;

    fn draft(quantity: i32) -> BundleDraft {
        BundleDraft {
            title: "Winter coats".to_string(),
            description: "Mixed sizes".to_string(),
            sample_image: String::new(),
            grade: "A".to_string(),
            sorting_level: SortingLevel::Sorted,
            declared_rating: 4,
            price_cents: 20_000,
            quantity,
        }
    }

    async fn setup() -> (BundleLifecycleManager, MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let supplier = User::new("Lily", "lily", "lily@example.com", Role::Supplier);
        store.create_user(&supplier).await.unwrap();
        let manager = BundleLifecycleManager::new(Arc::new(store.clone()), Arc::new(store.clone()));
        (manager, store, supplier.id)
    }

    #[tokio::test]
    async fn test_create_rejects_mismatched_supplier() {
        let (manager, _store, supplier_id) = setup().await;
        let bundle = Bundle::new(Uuid::new_v4(), draft(10));
        let err = manager.create_bundle(supplier_id, bundle).await.unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_blacklisted_supplier_cannot_list() {
        let (manager, store, supplier_id) = setup().await;
        let blacklisted = TrustState { score: 30.0, rated_count: 1, total_error: 70.0, is_blacklisted: true };
        store.update_trust(supplier_id, &TrustState::initial(), &blacklisted).await.unwrap();

        let err = manager
            .create_bundle(supplier_id, Bundle::new(supplier_id, draft(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
        assert!(manager.list_bundles(supplier_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_only_from_available() {
        let (manager, store, supplier_id) = setup().await;
        let bundle = manager.create_bundle(supplier_id, Bundle::new(supplier_id, draft(10))).await.unwrap();

        let other = Uuid::new_v4();
        assert!(matches!(
            manager.delete_bundle(other, bundle.id).await.unwrap_err(),
            CoreError::Unauthorized(_)
        ));

        store.update_status(bundle.id, BundleStatus::Available, BundleStatus::Purchased).await.unwrap();
        assert!(manager.delete_bundle(supplier_id, bundle.id).await.unwrap_err().is_conflict());

        assert!(manager.delete_bundle(supplier_id, Uuid::new_v4()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_deactivates() {
        let (manager, _store, supplier_id) = setup().await;
        let bundle = manager.create_bundle(supplier_id, Bundle::new(supplier_id, draft(10))).await.unwrap();

        manager.delete_bundle(supplier_id, bundle.id).await.unwrap();

        let stored = manager.get_bundle(supplier_id, bundle.id).await.unwrap();
        assert_eq!(stored.status, BundleStatus::Deactivated);
        assert!(manager.list_available().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purchased_bundle_is_immutable() {
        let (manager, store, supplier_id) = setup().await;
        let bundle = manager.create_bundle(supplier_id, Bundle::new(supplier_id, draft(10))).await.unwrap();
        let patch = BundlePatch { price_cents: Some(15_000), ..Default::default() };

        let updated = manager.update_bundle(supplier_id, bundle.id, &patch).await.unwrap();
        assert_eq!(updated.price_cents, 15_000);

        store.update_status(bundle.id, BundleStatus::Available, BundleStatus::Purchased).await.unwrap();
        let err = manager.update_bundle(supplier_id, bundle.id, &patch).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_update_validates_patch() {
        let (manager, _store, supplier_id) = setup().await;
        let bundle = manager.create_bundle(supplier_id, Bundle::new(supplier_id, draft(10))).await.unwrap();

        let empty = BundlePatch::default();
        assert!(matches!(
            manager.update_bundle(supplier_id, bundle.id, &empty).await.unwrap_err(),
            CoreError::Validation(_)
        ));
        let bad_rating = BundlePatch { declared_rating: Some(9), ..Default::default() };
        assert!(matches!(
            manager.update_bundle(supplier_id, bundle.id, &bad_rating).await.unwrap_err(),
            CoreError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_remaining_count_never_goes_negative() {
        let (manager, _store, supplier_id) = setup().await;
        let bundle = manager.create_bundle(supplier_id, Bundle::new(supplier_id, draft(2))).await.unwrap();

        assert_eq!(manager.decrease_remaining_item_count(bundle.id).await.unwrap(), 1);
        assert_eq!(manager.decrease_remaining_item_count(bundle.id).await.unwrap(), 0);

        let err = manager.decrease_remaining_item_count(bundle.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(ref msg) if msg == "bundle is fully unpacked"));
        assert_eq!(manager.get_bundle_public(bundle.id).await.unwrap().remaining_item_count, 0);

        let missing = manager.decrease_remaining_item_count(Uuid::new_v4()).await.unwrap_err();
        assert!(missing.is_not_found());
    }

    #[tokio::test]
    async fn test_concurrent_decrements_respect_quantity() {
        let (manager, _store, supplier_id) = setup().await;
        let bundle = manager.create_bundle(supplier_id, Bundle::new(supplier_id, draft(3))).await.unwrap();
        let manager = Arc::new(manager);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move { manager.decrease_remaining_item_count(bundle.id).await }));
        }
        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 3);
        assert_eq!(manager.get_bundle_public(bundle.id).await.unwrap().remaining_item_count, 0);
    }
}
