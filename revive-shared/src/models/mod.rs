/// Status and kind enums are persisted as lowercase text columns; this keeps
/// the text codec next to each enum instead of scattering `match` blocks
/// through the store.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $code:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $code,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($code => Ok(Self::$variant),)+
                    other => Err(crate::models::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub mod bundle;
pub mod listing;
pub mod order;
pub mod payment;
pub mod warehouse;
pub mod user;
pub mod cart;
pub mod outbox;
pub mod reports;
pub mod events;

pub use bundle::{Bundle, BundleDraft, BundlePatch, BundleStatus, SortingLevel};
pub use listing::{Listing, ListingDraft, ListingStatus};
pub use order::{Order, OrderStatus};
pub use payment::{Payment, PaymentStatus, PaymentType};
pub use warehouse::{WarehouseItem, WarehouseStatus};
pub use user::{Role, TrustState, User};
pub use cart::{CartItem, CheckoutLine, CheckoutReceipt, UnavailableItem};
pub use outbox::{OutboxStatus, RatingOutboxEntry};
pub use reports::{AdminMetrics, DashboardMetrics, PerformanceMetrics, ResellerMetrics};
pub use events::MarketEvent;

/// A stored text value that does not map onto any variant of the target enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
