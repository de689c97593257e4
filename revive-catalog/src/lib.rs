pub mod lifecycle;
pub mod trust;
pub mod outbox;
pub mod unpack;

pub use lifecycle::BundleLifecycleManager;
pub use trust::{QualityRating, TrustScoreEngine, BLACKLIST_THRESHOLD};
pub use outbox::{DrainReport, TrustOutboxRelay};
pub use unpack::UnpackService;
