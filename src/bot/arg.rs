use chrono_tz::Tz;

use crate::{phone::Ruleset, registry::RegistryHelper};

#[derive(Clone, Debug)]
pub(super) struct NecessaryArg {
    registry: RegistryHelper,
    admin: Vec<i64>,
    ruleset: Ruleset,
    redact: bool,
    timezone: Tz,
}

impl NecessaryArg {
    pub(super) fn new(
        registry: RegistryHelper,
        admin: Vec<i64>,
        ruleset: Ruleset,
        redact: bool,
        timezone: Tz,
    ) -> Self {
        Self {
            registry,
            admin,
            ruleset,
            redact,
            timezone,
        }
    }

    pub fn registry(&self) -> &RegistryHelper {
        &self.registry
    }

    pub fn check_admin(&self, id: i64) -> bool {
        self.admin.iter().any(|x| &id == x)
    }

    pub fn ruleset(&self) -> Ruleset {
        self.ruleset
    }

    pub fn redact(&self) -> bool {
        self.redact
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }
}
