mod event;
mod handler;
mod store;

pub use event::RegistryHelper;
pub use handler::RegistryHandle;
#[cfg(test)]
pub use store::RegisterOutcome;
pub use store::{
    GlobalStats, PointsAward, RegistryOptions, SubmitEntry, SubmitReport, SystemStatus, UserStats,
};
