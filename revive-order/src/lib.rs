pub mod settlement;
pub mod scheduler;
pub mod warehouse;
pub mod orchestrator;
pub mod reports;
pub mod checkout;

pub use settlement::{platform_fee, PaymentSettlement, Settlement, SimulatedGateway, PLATFORM_FEE_PERCENT};
pub use scheduler::DelayedTaskScheduler;
pub use warehouse::WarehouseAllocator;
pub use orchestrator::{OrderOrchestrator, PurchaseReceipt};
pub use reports::ReportService;
pub use checkout::CartCheckout;
