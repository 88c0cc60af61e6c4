use log::error;

use super::{
    event::{RegistryEvent, RegistryEventReceiver, RegistryHelper},
    store::{Registry, RegistryOptions},
};
use crate::database::Database;

fn now() -> i64 {
    kstool::time::get_current_second() as i64
}

pub struct RegistryHandle {
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl RegistryHandle {
    /// Spawn the registry owner. With a database file the stored phone
    /// records are loaded first and every change is written through.
    pub async fn start(
        options: RegistryOptions,
        database: Option<&str>,
    ) -> anyhow::Result<(Self, RegistryHelper)> {
        let mut registry = Registry::new(options, now());
        let database = match database {
            Some(file) => {
                let mut database = Database::connect(file).await?;
                database.init().await?;
                registry.load(database.query_all_phones().await?);
                log::info!("Loaded {} phone records from {file}", registry.len());
                Some(database)
            }
            None => None,
        };

        let (sender, receiver) = RegistryHelper::new(32);
        Ok((
            Self {
                handle: tokio::spawn(Self::run(registry, database, receiver)),
            },
            sender,
        ))
    }

    async fn persist(
        registry: &Registry,
        database: &mut Database,
        changed: impl Iterator<Item = &str>,
        removed: &[String],
    ) -> sqlx::Result<()> {
        for number in changed {
            if let Some(record) = registry.record(number) {
                database.upsert_phone(record).await?;
            }
        }
        database.delete_phones(removed).await
    }

    /// Memory is the source of truth. A failed write is logged and the
    /// caller still gets its answer.
    async fn handle_event(
        registry: &mut Registry,
        database: &mut Option<Database>,
        event: RegistryEvent,
    ) {
        match event {
            RegistryEvent::Submit {
                user,
                numbers,
                __private_sender,
            } => {
                let report = registry.submit(&user, numbers, now());
                if let Some(database) = database {
                    Self::persist(
                        registry,
                        database,
                        report.entries.iter().map(|e| e.analysis.normalized()),
                        &report.evicted,
                    )
                    .await
                    .inspect_err(|e| error!("Persist submitted numbers error: {e:?}"))
                    .ok();
                }
                __private_sender.send(report).ok();
            }
            RegistryEvent::Touch { user } => {
                registry.touch(&user, now());
            }
            RegistryEvent::CheckRate {
                user,
                __private_sender,
            } => {
                __private_sender.send(registry.check_rate(user, now())).ok();
            }
            RegistryEvent::Cleanup(sender) => {
                let report = registry.cleanup(now());
                log::info!(
                    "Cleanup removed {} phone records and {} users",
                    report.phones_removed,
                    report.users_removed
                );
                if let Some(database) = database {
                    database
                        .delete_phones(&report.removed)
                        .await
                        .inspect_err(|e| error!("Delete expired numbers error: {e:?}"))
                        .ok();
                }
                sender.send(report).ok();
            }
            RegistryEvent::Clear(sender) => {
                let removed = registry.clear();
                if let Some(database) = database {
                    database
                        .clear_phones()
                        .await
                        .inspect_err(|e| error!("Clear stored numbers error: {e:?}"))
                        .ok();
                }
                log::warn!("Registry cleared, {removed} phone records dropped");
                sender.send(removed).ok();
            }
            RegistryEvent::Heartbeat(sender) => {
                sender.send(registry.heartbeat(now())).ok();
            }
            RegistryEvent::Restarted => {
                registry.restarted();
            }
            RegistryEvent::QueryUser {
                user,
                __private_sender,
            } => {
                __private_sender.send(registry.user_stats(user)).ok();
            }
            RegistryEvent::QueryGlobal(sender) => {
                sender.send(registry.global_stats(now())).ok();
            }
            RegistryEvent::QueryStatus(sender) => {
                sender.send(registry.system_status(now())).ok();
            }
            RegistryEvent::Terminate => {
                unreachable!()
            }
        }
    }

    async fn run(
        mut registry: Registry,
        mut database: Option<Database>,
        mut receiver: RegistryEventReceiver,
    ) -> anyhow::Result<()> {
        while let Some(event) = receiver.recv().await {
            if let RegistryEvent::Terminate = event {
                break;
            }
            Self::handle_event(&mut registry, &mut database, event).await;
        }
        if let Some(database) = database {
            database.close().await?;
        }
        Ok(())
    }

    pub async fn wait(self) -> anyhow::Result<()> {
        self.handle.await?
    }
}
