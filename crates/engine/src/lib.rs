pub mod limiter;
pub mod scheduler;
pub mod shutdown;
pub mod skinport;
pub mod store;

pub use limiter::{RateLimitPolicy, RateLimitedClient};
pub use scheduler::{CycleReport, ItemSource, ScanFilter, Scheduler};
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use skinport::SkinportClient;
pub use store::SignalStore;
