use super::store::{CleanupReport, GlobalStats, SubmitReport, SystemStatus, UserStats};
use crate::phone::PhoneAnalysis;
use crate::types::UserProfile;

kstool_helper_generator::oneshot_helper! {
#[derive(Debug)]
pub enum RegistryEvent {
    #[ret(SubmitReport)]
    Submit {
        user: UserProfile,
        numbers: Vec<PhoneAnalysis>,
    },

    Touch {
        user: UserProfile,
    },

    #[ret(bool)]
    CheckRate {
        user: i64,
    },

    #[ret(CleanupReport)]
    Cleanup,

    #[ret(usize)]
    Clear,

    #[ret(u64)]
    Heartbeat,

    Restarted,

    #[ret(Option<UserStats>)]
    QueryUser {
        user: i64,
    },

    #[ret(GlobalStats)]
    QueryGlobal,

    #[ret(SystemStatus)]
    QueryStatus,

    Terminate,
}
}
