mod bot;
mod config;
mod database;
mod maintenance;
mod phone;
mod registry;
mod status;
mod types;

use std::time::{Duration, Instant};

use bot::{bot, bot_run};
use clap::{ArgMatches, arg};
use config::Config;
use maintenance::Maintainer;
use phone::Ruleset;
use registry::{RegistryHandle, RegistryHelper};

/// A run longer than this is considered healthy and resets the failure streak.
const STABLE_RUN: Duration = Duration::from_secs(300);

#[derive(Clone, Copy, Debug)]
struct RestartPolicy {
    max_restarts: u32,
    max_consecutive_failures: u32,
    base_delay: u64,
    max_delay: u64,
}

impl RestartPolicy {
    fn new(config: &config::Supervisor) -> Self {
        Self {
            max_restarts: config.max_restarts(),
            max_consecutive_failures: config.max_consecutive_failures(),
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
        }
    }

    fn delay(&self, consecutive: u32) -> Duration {
        if consecutive <= 2 {
            return Duration::from_secs(self.base_delay);
        }
        let factor = 1u64.checked_shl(consecutive - 1).unwrap_or(u64::MAX);
        Duration::from_secs(self.base_delay.saturating_mul(factor).min(self.max_delay))
    }

    /// Delay before the next attempt, `None` once the budget is spent.
    fn next(&self, restarts: u32, consecutive: u32) -> Option<Duration> {
        if restarts >= self.max_restarts || consecutive >= self.max_consecutive_failures {
            return None;
        }
        Some(self.delay(consecutive))
    }
}

/// Failure accounting across bot runs.
#[derive(Debug)]
struct Restarts {
    policy: RestartPolicy,
    total: u32,
    consecutive: u32,
}

impl Restarts {
    fn new(policy: RestartPolicy) -> Self {
        Self {
            policy,
            total: 0,
            consecutive: 0,
        }
    }

    /// Record a failed run that lasted `uptime`, returns the delay before
    /// the next run or `None` when the budget is spent.
    fn failed(&mut self, uptime: Duration) -> Option<Duration> {
        if uptime > STABLE_RUN {
            self.consecutive = 0;
        }
        self.consecutive += 1;
        let delay = self.policy.next(self.total, self.consecutive)?;
        self.total += 1;
        Some(delay)
    }
}

async fn supervise(config: &Config, registry: RegistryHelper) -> anyhow::Result<()> {
    let mut restarts = Restarts::new(RestartPolicy::new(config.supervisor()));

    loop {
        let started = Instant::now();
        let run = tokio::spawn(bot_run(bot(config)?, config.clone(), registry.clone())).await;
        match run {
            Ok(Ok(())) => {
                log::info!("Bot stopped");
                return Ok(());
            }
            Ok(Err(e)) => log::error!("Bot exited with error: {e:?}"),
            Err(e) => log::error!("Bot task failed: {e:?}"),
        }

        let Some(delay) = restarts.failed(started.elapsed()) else {
            return Err(anyhow::anyhow!(
                "Giving up after {} restarts ({} consecutive failures)",
                restarts.total,
                restarts.consecutive
            ));
        };
        registry.restarted().await;
        log::warn!(
            "Restarting bot in {}s (restart {}/{}, consecutive failures {})",
            delay.as_secs(),
            restarts.total,
            restarts.policy.max_restarts,
            restarts.consecutive
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted while waiting for restart");
                return Ok(());
            }
        }
    }
}

async fn async_main(config_file: &str) -> anyhow::Result<()> {
    let config = Config::read(config_file).await?;
    let ruleset = config.registry().ruleset();
    log::info!(
        "Ruleset: {}, privacy redaction: {}",
        ruleset.name(),
        config.privacy().redact()
    );

    let (registry_handle, registry) =
        RegistryHandle::start(config.registry().options()?, config.registry().database()).await?;
    let (maintainer, maintenance) = Maintainer::create(
        registry.clone(),
        config.maintenance().heartbeat(),
        config.maintenance().cleanup(),
    );

    if config.registry().database().is_some() {
        maintenance.cleanup_now().await;
    }

    let status_server = config.http().listen().map(|listen| {
        let listen = listen.clone();
        let registry = registry.clone();
        tokio::spawn(async move {
            status::serve(listen, registry, ruleset)
                .await
                .inspect_err(|e| log::error!("Status server error: {e:?}"))
                .ok();
        })
    });

    let ret = supervise(&config, registry.clone()).await;

    if let Some(server) = status_server {
        server.abort();
    }
    maintenance.exit().await;
    registry.terminate().await;

    maintainer.join().await?;
    registry_handle.wait().await?;

    ret
}

fn enable_log(verbose: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose < 3 {
        builder
            .filter_module("hyper", log::LevelFilter::Warn)
            .filter_module("reqwest", log::LevelFilter::Warn)
            .filter_module("axum", log::LevelFilter::Warn);
    }

    if verbose < 2 {
        builder.filter_module("teloxide", log::LevelFilter::Info);
    }
    if verbose < 1 {
        builder.filter_module("sqlx", log::LevelFilter::Warn);
    }
    builder.init();
}

fn analyze_text(ruleset: &str, text: &str) -> anyhow::Result<()> {
    let ruleset = Ruleset::try_from(ruleset).map_err(|e| anyhow::anyhow!("{e}: {ruleset}"))?;
    let scan = phone::scan(ruleset, text);
    if scan.is_empty() {
        println!("No valid phone number found");
    }
    for analysis in scan.valid() {
        println!(
            "{} -> {} [{}] {} | {} | {}",
            analysis.original(),
            analysis.e164(),
            analysis.kind(),
            analysis.location(),
            analysis.carrier().unwrap_or("-"),
            analysis.national_format()
        );
    }
    for rejected in scan.rejected() {
        println!(
            "{rejected} -> rejected (digits {})",
            phone::normalize(ruleset, rejected).unwrap_or_else(|| "-".to_string())
        );
    }
    Ok(())
}

async fn async_router(matches: ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("analyze", matches)) => analyze_text(
            matches.get_one::<String>("ruleset").unwrap(),
            matches.get_one::<String>("TEXT").unwrap(),
        ),
        _ => async_main(matches.get_one::<String>("CONFIG").unwrap()).await,
    }
}

fn main() -> anyhow::Result<()> {
    let matches = clap::command!()
        .args(&[
            arg!([CONFIG] "Configure file to read").default_value("config.toml"),
            arg!(-v --verbose ... "More verbose log output"),
        ])
        .subcommand(
            clap::Command::new("analyze")
                .about("Classify phone numbers in a text and exit")
                .args(&[
                    arg!(<TEXT> "Text to scan"),
                    arg!(-r --ruleset <RULESET> "Numbering rules")
                        .value_parser(["international", "malaysia"])
                        .default_value("international"),
                ]),
        )
        .get_matches();

    enable_log(matches.get_count("verbose"));

    log::info!("Version: {}", env!("CARGO_PKG_VERSION"));

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_router(matches))
}
