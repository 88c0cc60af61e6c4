use std::time::Duration;

use kstool_helper_generator::Helper;
use tokio::{task::JoinHandle, time::interval};

use crate::registry::RegistryHelper;

#[derive(Clone, Debug, Helper)]
pub enum MaintenanceEvent {
    CleanupNow,
    Exit,
}

/// Background timers: heartbeat and periodic cleanup. A period of zero
/// disables the timer.
pub struct Maintainer {
    handle: JoinHandle<anyhow::Result<()>>,
}

impl Maintainer {
    pub fn create(
        registry: RegistryHelper,
        heartbeat_period: u64,
        cleanup_period: u64,
    ) -> (Self, MaintenanceHelper) {
        let (s, r) = MaintenanceHelper::new(4);
        (
            Self {
                handle: tokio::spawn(Self::run(registry, r, heartbeat_period, cleanup_period)),
            },
            s,
        )
    }

    async fn heartbeat(registry: &RegistryHelper) {
        match registry.heartbeat().await {
            Some(count) => log::info!("Heartbeat #{count}"),
            None => log::error!("Heartbeat failed: registry is gone"),
        }
    }

    async fn cleanup(registry: &RegistryHelper) {
        match registry.cleanup().await {
            Some(report) => log::debug!(
                "Scheduled cleanup done, {} phone records and {} users left",
                report.phones_left,
                report.users_left
            ),
            None => log::error!("Cleanup failed: registry is gone"),
        }
    }

    async fn run(
        registry: RegistryHelper,
        mut helper: MaintenanceEventReceiver,
        heartbeat_period: u64,
        cleanup_period: u64,
    ) -> anyhow::Result<()> {
        let mut heartbeat_timer = interval(Duration::from_secs(heartbeat_period.max(1)));
        let mut cleanup_timer = interval(Duration::from_secs(cleanup_period.max(1)));
        heartbeat_timer.reset();
        cleanup_timer.reset();

        loop {
            tokio::select! {
                Some(event) = helper.recv() => {
                    match event {
                        MaintenanceEvent::CleanupNow => {
                            Self::cleanup(&registry).await;
                            cleanup_timer.reset();
                        }
                        MaintenanceEvent::Exit => break,
                    }
                }

                _ = heartbeat_timer.tick(), if heartbeat_period > 0 => {
                    Self::heartbeat(&registry).await;
                }

                _ = cleanup_timer.tick(), if cleanup_period > 0 => {
                    Self::cleanup(&registry).await;
                }

                else => break,
            }
        }
        Ok(())
    }

    pub async fn join(self) -> anyhow::Result<()> {
        self.handle.await?
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::registry::{RegistryHandle, RegistryOptions};

    #[tokio::test(start_paused = true)]
    async fn test_timers_fire() {
        let (registry_handle, registry) = RegistryHandle::start(RegistryOptions::default(), None)
            .await
            .unwrap();
        let (maintainer, helper) = Maintainer::create(registry.clone(), 10, 0);

        tokio::time::sleep(Duration::from_secs(35)).await;
        helper.cleanup_now().await;
        helper.exit().await;
        maintainer.join().await.unwrap();

        let status = registry.query_status().await.unwrap();
        assert_eq!(status.heartbeat_count, 3);
        assert_eq!(status.cleanup_count, 1);

        registry.terminate().await;
        registry_handle.wait().await.unwrap();
    }
}
