use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Bundle lifecycle: available → purchased, or available → deactivated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BundleStatus {
    Available,
    Purchased,
    Deactivated,
}

string_enum!(BundleStatus, "bundle status", {
    Available => "available",
    Purchased => "purchased",
    Deactivated => "deactivated",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortingLevel {
    Sorted,
    SemiSorted,
    Unsorted,
}

string_enum!(SortingLevel, "sorting level", {
    Sorted => "sorted",
    SemiSorted => "semi_sorted",
    Unsorted => "unsorted",
});

/// A supplier's lot of clothing, sold wholesale to a single reseller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    pub id: Uuid,
    pub supplier_id: Uuid,
    /// Set once the bundle is purchased; never changes afterwards.
    pub reseller_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub sample_image: String,
    pub grade: String,
    pub sorting_level: SortingLevel,
    /// Supplier's own quality claim on the 1–5 grade scale.
    pub declared_rating: i32,
    pub price_cents: i64,
    pub quantity: i32,
    /// Items not yet unpacked into listings. Always within `0..=quantity`.
    pub remaining_item_count: i32,
    pub status: BundleStatus,
    pub date_listed: DateTime<Utc>,
}

impl Bundle {
    pub fn new(supplier_id: Uuid, draft: BundleDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            supplier_id,
            reseller_id: None,
            title: draft.title,
            description: draft.description,
            sample_image: draft.sample_image,
            grade: draft.grade,
            sorting_level: draft.sorting_level,
            declared_rating: draft.declared_rating,
            price_cents: draft.price_cents,
            quantity: draft.quantity,
            remaining_item_count: draft.quantity,
            status: BundleStatus::Available,
            date_listed: Utc::now(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == BundleStatus::Available
    }

    pub fn is_owned_by(&self, supplier_id: Uuid) -> bool {
        self.supplier_id == supplier_id
    }

    pub fn is_fully_unpacked(&self) -> bool {
        self.remaining_item_count <= 0
    }
}

/// Fields a supplier provides when listing a bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sample_image: String,
    pub grade: String,
    pub sorting_level: SortingLevel,
    pub declared_rating: i32,
    pub price_cents: i64,
    pub quantity: i32,
}

/// Editable bundle fields. Anything not listed here (status, ownership,
/// counts) cannot be changed through an update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundlePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub sample_image: Option<String>,
    pub grade: Option<String>,
    pub sorting_level: Option<SortingLevel>,
    pub declared_rating: Option<i32>,
    pub price_cents: Option<i64>,
}

impl BundlePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.sample_image.is_none()
            && self.grade.is_none()
            && self.sorting_level.is_none()
            && self.declared_rating.is_none()
            && self.price_cents.is_none()
    }

    pub fn apply(&self, bundle: &mut Bundle) {
        if let Some(title) = &self.title {
            bundle.title = title.clone();
        }
        if let Some(description) = &self.description {
            bundle.description = description.clone();
        }
        if let Some(sample_image) = &self.sample_image {
            bundle.sample_image = sample_image.clone();
        }
        if let Some(grade) = &self.grade {
            bundle.grade = grade.clone();
        }
        if let Some(level) = self.sorting_level {
            bundle.sorting_level = level;
        }
        if let Some(rating) = self.declared_rating {
            bundle.declared_rating = rating;
        }
        if let Some(price) = self.price_cents {
            bundle.price_cents = price;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> BundleDraft {
        BundleDraft {
            title: "90s denim".to_string(),
            description: String::new(),
            sample_image: String::new(),
            grade: "A".to_string(),
            sorting_level: SortingLevel::SemiSorted,
            declared_rating: 4,
            price_cents: 10_000,
            quantity: 50,
        }
    }

    #[test]
    fn test_new_bundle_starts_available_and_full() {
        let bundle = Bundle::new(Uuid::new_v4(), draft());
        assert_eq!(bundle.status, BundleStatus::Available);
        assert_eq!(bundle.remaining_item_count, 50);
        assert!(bundle.reseller_id.is_none());
    }

    #[test]
    fn test_patch_touches_only_given_fields() {
        let mut bundle = Bundle::new(Uuid::new_v4(), draft());
        let patch = BundlePatch {
            price_cents: Some(12_500),
            ..Default::default()
        };
        patch.apply(&mut bundle);
        assert_eq!(bundle.price_cents, 12_500);
        assert_eq!(bundle.title, "90s denim");
    }

    #[test]
    fn test_patch_rejects_unknown_fields() {
        let result: Result<BundlePatch, _> =
            serde_json::from_str(r#"{"status": "purchased"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_status_text_codec() {
        assert_eq!("semi_sorted".parse::<SortingLevel>().unwrap(), SortingLevel::SemiSorted);
        assert_eq!(BundleStatus::Deactivated.as_str(), "deactivated");
        assert!("sold".parse::<BundleStatus>().is_err());
    }
}
