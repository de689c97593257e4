use std::sync::Arc;
use uuid::Uuid;
use tracing::{info, warn};

use revive_core::repository::{BundleRepository, TrustOutboxRepository, UnpackUnitOfWork, WarehouseRepository};
use revive_core::{CoreError, CoreResult};
use revive_shared::models::{Listing, ListingDraft, RatingOutboxEntry};

use crate::trust::QualityRating;

/// Turns one unit of a received bundle into a priced consumer listing and
/// queues the reseller's quality rating against the supplier.
pub struct UnpackService {
    bundles: Arc<dyn BundleRepository>,
    warehouse: Arc<dyn WarehouseRepository>,
    outbox: Arc<dyn TrustOutboxRepository>,
    unpacks: Arc<dyn UnpackUnitOfWork>,
}

impl UnpackService {
    pub fn new(
        bundles: Arc<dyn BundleRepository>,
        warehouse: Arc<dyn WarehouseRepository>,
        outbox: Arc<dyn TrustOutboxRepository>,
        unpacks: Arc<dyn UnpackUnitOfWork>,
    ) -> Self {
        Self { bundles, warehouse, outbox, unpacks }
    }

    pub async fn unpack_product(&self, reseller_id: Uuid, draft: ListingDraft) -> CoreResult<Listing> {
        if draft.title.trim().is_empty() {
            return Err(CoreError::Validation("title is required".to_string()));
        }
        if draft.price_cents <= 0 {
            return Err(CoreError::Validation("price must be positive".to_string()));
        }
        let actual = QualityRating::new(draft.rating)?;

        let bundle_id = draft.bundle_id;
        if !self.warehouse.has_reseller_received_bundle(reseller_id, bundle_id).await? {
            return Err(CoreError::Forbidden(
                "bundle has not arrived in the reseller's warehouse".to_string(),
            ));
        }

        let bundle = self
            .bundles
            .get_bundle(bundle_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("bundle {}", bundle_id)))?;
        if bundle.reseller_id != Some(reseller_id) {
            return Err(CoreError::Forbidden("bundle was bought by another reseller".to_string()));
        }
        if bundle.is_fully_unpacked() {
            return Err(CoreError::Conflict("bundle is fully unpacked".to_string()));
        }

        // The guarded decrement and the listing insert commit together, so
        // concurrent unpacks are decided there and a failed insert frees the slot.
        let listing = Listing::unpacked(reseller_id, bundle.supplier_id, draft);
        let remaining = self
            .unpacks
            .commit_unpack(&listing)
            .await?
            .ok_or_else(|| CoreError::Conflict("bundle is fully unpacked".to_string()))?;
        info!(
            "Reseller {} unpacked listing {} from bundle {} ({} left)",
            reseller_id, listing.id, bundle_id, remaining
        );

        // Trust bookkeeping is best-effort relative to the listing.
        match QualityRating::from_grade(bundle.declared_rating) {
            Ok(declared) => {
                let entry = RatingOutboxEntry::new(bundle.supplier_id, listing.id, declared.value(), actual.value());
                if let Err(e) = self.outbox.enqueue(&entry).await {
                    warn!("Failed to queue trust rating for supplier {}: {}", bundle.supplier_id, e);
                }
            }
            Err(e) => warn!("Bundle {} has no usable declared rating: {}", bundle_id, e),
        }

        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revive_core::repository::{ListingRepository, UserRepository};
    use revive_shared::models::{
        Bundle, BundleDraft, BundleStatus, ListingStatus, Role, SortingLevel, User, WarehouseItem,
        WarehouseStatus,
    };
    use revive_store::MemoryStore;

    struct Fixture {
        service: UnpackService,
        store: MemoryStore,
        reseller_id: Uuid,
        supplier_id: Uuid,
        bundle_id: Uuid,
    }

    async fn fixture(quantity: i32, arrived: bool) -> Fixture {
        let store = MemoryStore::new();
        let supplier = User::new("Tigist", "tigist", "tigist@example.com", Role::Supplier);
        let reseller = User::new("Noah", "noah", "noah@example.com", Role::Reseller);
        store.create_user(&supplier).await.unwrap();
        store.create_user(&reseller).await.unwrap();

        let mut bundle = Bundle::new(
            supplier.id,
            BundleDraft {
                title: "Denim jackets".to_string(),
                description: String::new(),
                sample_image: String::new(),
                grade: "A".to_string(),
                sorting_level: SortingLevel::Sorted,
                declared_rating: 4,
                price_cents: 30_000,
                quantity,
            },
        );
        bundle.status = BundleStatus::Purchased;
        bundle.reseller_id = Some(reseller.id);
        store.create_bundle(&bundle).await.unwrap();

        let mut item = WarehouseItem::pending(bundle.id, reseller.id);
        if arrived {
            item.status = WarehouseStatus::Listed;
        }
        store.add_item(&item).await.unwrap();

        let repo = Arc::new(store.clone());
        let service = UnpackService::new(repo.clone(), repo.clone(), repo.clone(), repo);
        Fixture { service, store, reseller_id: reseller.id, supplier_id: supplier.id, bundle_id: bundle.id }
    }

    fn draft(bundle_id: Uuid, rating: f64) -> ListingDraft {
        ListingDraft {
            bundle_id,
            title: "Levi's trucker jacket".to_string(),
            description: String::new(),
            size: "M".to_string(),
            kind: "jacket".to_string(),
            grade: "A".to_string(),
            price_cents: 4_500,
            image_url: String::new(),
            rating,
        }
    }

    #[tokio::test]
    async fn test_unpack_creates_listing_and_queues_rating() {
        let f = fixture(2, true).await;

        let listing = f.service.unpack_product(f.reseller_id, draft(f.bundle_id, 60.0)).await.unwrap();

        assert_eq!(listing.status, ListingStatus::Available);
        assert_eq!(listing.supplier_id, f.supplier_id);
        assert_eq!(f.store.get_bundle(f.bundle_id).await.unwrap().unwrap().remaining_item_count, 1);

        let queued = f.store.outbox_entries().await;
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].supplier_id, f.supplier_id);
        assert_eq!(queued[0].declared_quality, 80.0);
        assert_eq!(queued[0].actual_quality, 60.0);
    }

    #[tokio::test]
    async fn test_unpack_waits_for_arrival() {
        let f = fixture(2, false).await;

        let err = f.service.unpack_product(f.reseller_id, draft(f.bundle_id, 60.0)).await.unwrap_err();

        assert!(matches!(err, CoreError::Forbidden(_)));
        assert_eq!(f.store.get_bundle(f.bundle_id).await.unwrap().unwrap().remaining_item_count, 2);
    }

    #[tokio::test]
    async fn test_unpack_stops_when_bundle_is_empty() {
        let f = fixture(1, true).await;
        f.service.unpack_product(f.reseller_id, draft(f.bundle_id, 80.0)).await.unwrap();

        let err = f.service.unpack_product(f.reseller_id, draft(f.bundle_id, 80.0)).await.unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(f.store.outbox_entries().await.len(), 1);
        assert_eq!(ListingRepository::list_by_reseller(&f.store, f.reseller_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_listing_write_keeps_capacity() {
        let f = fixture(2, true).await;
        f.store.inject_listing_write_failures(1);

        let err = f.service.unpack_product(f.reseller_id, draft(f.bundle_id, 60.0)).await.unwrap_err();

        assert!(matches!(err, CoreError::Persistence(_)));
        assert_eq!(f.store.get_bundle(f.bundle_id).await.unwrap().unwrap().remaining_item_count, 2);
        assert!(ListingRepository::list_by_reseller(&f.store, f.reseller_id).await.unwrap().is_empty());
        assert!(f.store.outbox_entries().await.is_empty());

        f.service.unpack_product(f.reseller_id, draft(f.bundle_id, 60.0)).await.unwrap();
        assert_eq!(f.store.get_bundle(f.bundle_id).await.unwrap().unwrap().remaining_item_count, 1);
    }

    #[tokio::test]
    async fn test_unpack_rejects_out_of_scale_rating() {
        let f = fixture(1, true).await;
        let err = f.service.unpack_product(f.reseller_id, draft(f.bundle_id, 400.0)).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
