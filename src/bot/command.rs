use std::sync::Arc;

use anyhow::anyhow;
use teloxide::{
    Bot,
    dispatching::{HandlerExt as _, UpdateFilterExt as _},
    dptree,
    error_handlers::LoggingErrorHandler,
    prelude::{Dispatcher, Requester as _, RequesterExt as _},
    types::{ChatId, Message, ParseMode, Update},
    update_listeners::webhooks,
    utils::command::BotCommands,
};

use super::{
    BotType,
    admin::{AdminCommand, handle_admin_command},
    arg::NecessaryArg,
    functions::send_long,
    reply,
};
use crate::{config::Config, phone, registry::RegistryHelper, types::UserProfile};

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    #[command(description = "Welcome message")]
    Start,
    #[command(description = "Show usage")]
    Help,
    #[command(description = "Your statistics and level")]
    Stats,
    #[command(description = "Global statistics")]
    Global,
    #[command(description = "Top countries")]
    Countries,
    #[command(description = "Top carriers")]
    Carriers,
    #[command(description = "System status")]
    Status,
    #[command(description = "Remove expired records (admin)")]
    Cleanup,
    #[command(description = "Remove all records (admin)")]
    Clear,
    #[command(description = "Check the bot is alive")]
    Ping,
}

pub fn bot(config: &Config) -> anyhow::Result<BotType> {
    let bot = Bot::new(config.telegram().api_key());
    Ok(match config.telegram().api_server() {
        Some(url) => bot.set_api_url(url.parse()?),
        None => bot,
    }
    .parse_mode(ParseMode::MarkdownV2))
}

fn profile_of(msg: &Message) -> Option<UserProfile> {
    msg.from
        .as_ref()
        .map(|user| UserProfile::new(user.id.0 as i64, user.username.clone(), user.full_name()))
}

/// Log a failed handler and tell the user to retry.
async fn report_error(
    bot: &BotType,
    chat: ChatId,
    result: anyhow::Result<()>,
) -> anyhow::Result<()> {
    if let Err(e) = result {
        log::error!("Handle update in {chat} error: {e:?}");
        bot.send_message(chat, reply::retry_later()).await?;
    }
    Ok(())
}

pub async fn bot_run(bot: BotType, config: Config, registry: RegistryHelper) -> anyhow::Result<()> {
    let me = bot.get_me().await?;
    log::info!("Logged in as @{}", me.username());

    bot.set_my_commands(Command::bot_commands())
        .await
        .inspect_err(|e| log::warn!("Set bot commands error: {e:?}"))
        .ok();

    let arg = Arc::new(NecessaryArg::new(
        registry,
        config.admin().to_vec(),
        config.registry().ruleset(),
        config.privacy().redact(),
        config.registry().timezone()?,
    ));

    let handle_command_message = Update::filter_message().branch(
        dptree::entry().filter_command::<Command>().endpoint(
            |msg: Message, bot: BotType, arg: Arc<NecessaryArg>, cmd: Command| async move {
                let result = handle_command(&bot, &arg, &msg, cmd).await;
                report_error(&bot, msg.chat.id, result).await
            },
        ),
    );

    let handle_message = Update::filter_message()
        .filter(|msg: Message| msg.text().is_some())
        .endpoint(|msg: Message, bot: BotType, arg: Arc<NecessaryArg>| async move {
            let result = handle_phone_message(&bot, &arg, &msg).await;
            report_error(&bot, msg.chat.id, result).await
        });

    let mut dispatcher = Dispatcher::builder(
        bot.clone(),
        dptree::entry()
            .branch(handle_command_message)
            .branch(handle_message),
    )
    .dependencies(dptree::deps![arg])
    .default_handler(|_| async {})
    .enable_ctrlc_handler()
    .build();

    match config.telegram().webhook() {
        Some(webhook) => {
            let options = webhooks::Options::new(webhook.listen().parse()?, webhook.url().parse()?);
            log::info!(
                "Receiving updates through webhook {} on {}",
                webhook.url(),
                webhook.listen()
            );
            let listener = webhooks::axum(bot, options).await?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the webhook listener"),
                )
                .await;
        }
        None => {
            log::info!("Receiving updates through long polling");
            dispatcher.dispatch().await;
        }
    }
    Ok(())
}

async fn handle_command(
    bot: &BotType,
    arg: &Arc<NecessaryArg>,
    msg: &Message,
    cmd: Command,
) -> anyhow::Result<()> {
    let registry = arg.registry();
    let profile = profile_of(msg);

    // Stats are read before this command is counted, so first-time users
    // get the empty-stats reply.
    let text = match cmd {
        Command::Start => reply::welcome(
            &profile
                .as_ref()
                .map(UserProfile::display_name)
                .unwrap_or_default(),
            arg.ruleset(),
        ),
        Command::Help => reply::help(arg.ruleset()),
        Command::Stats => {
            let Some(profile) = profile.as_ref() else {
                return Ok(());
            };
            match registry.query_user(profile.id()).await.flatten() {
                Some(stats) => reply::user_stats(&stats, arg.redact(), arg.timezone()),
                None => reply::no_user_stats().to_string(),
            }
        }
        Command::Global | Command::Countries | Command::Carriers => {
            let stats = registry
                .query_global()
                .await
                .ok_or_else(|| anyhow!("Registry unavailable"))?;
            match cmd {
                Command::Global => reply::global(&stats),
                Command::Countries => reply::countries(&stats),
                _ => reply::carriers(&stats),
            }
        }
        Command::Status => {
            let status = registry
                .query_status()
                .await
                .ok_or_else(|| anyhow!("Registry unavailable"))?;
            reply::status(&status, arg.ruleset(), arg.redact(), arg.timezone())
        }
        Command::Cleanup => {
            return handle_admin_command(
                bot.clone(),
                arg.clone(),
                msg.clone(),
                AdminCommand::Cleanup,
            )
            .await;
        }
        Command::Clear => {
            return handle_admin_command(
                bot.clone(),
                arg.clone(),
                msg.clone(),
                AdminCommand::Clear,
            )
            .await;
        }
        Command::Ping => format!(
            "🏓 Pong\\!\nChat id: `{id}`\nIs admin: {is_admin}\nVersion: `{version}`",
            id = msg.chat.id.0,
            is_admin = profile.as_ref().is_some_and(|p| arg.check_admin(p.id())),
            version = env!("CARGO_PKG_VERSION"),
        ),
    };
    if let Some(profile) = profile {
        registry.touch(profile).await;
    }
    send_long(bot, msg.chat.id, None, &text).await
}

/// Rejected candidates as they may appear in the log.
fn loggable_candidates(rejected: &[String], redact: bool) -> Vec<String> {
    rejected
        .iter()
        .map(|candidate| {
            if redact {
                phone::mask(candidate)
            } else {
                candidate.clone()
            }
        })
        .collect()
}

async fn handle_phone_message(
    bot: &BotType,
    arg: &Arc<NecessaryArg>,
    msg: &Message,
) -> anyhow::Result<()> {
    let (Some(text), Some(profile)) = (msg.text(), profile_of(msg)) else {
        return Ok(());
    };
    let registry = arg.registry();

    if !registry.check_rate(profile.id()).await.unwrap_or(true) {
        log::debug!("Rate limited user {}", profile.id());
        if msg.chat.is_private() {
            bot.send_message(msg.chat.id, reply::rate_limited()).await?;
        }
        return Ok(());
    }

    let scan = phone::scan(arg.ruleset(), text);
    if !scan.rejected().is_empty() {
        log::debug!(
            "Rejected candidates: {:?}",
            loggable_candidates(scan.rejected(), arg.redact())
        );
    }
    if scan.is_empty() {
        registry.touch(profile).await;
        if msg.chat.is_private() {
            bot.send_message(msg.chat.id, reply::no_number(arg.ruleset())).await?;
        }
        return Ok(());
    }

    let user = profile.id();
    let report = registry
        .submit(profile, scan.into_valid())
        .await
        .ok_or_else(|| anyhow!("Registry unavailable"))?;
    let text = match report.entries.as_slice() {
        [entry] => reply::single(
            entry,
            report.award.as_ref(),
            user,
            arg.redact(),
            arg.timezone(),
        ),
        _ => reply::multiple(&report, arg.redact()),
    };
    send_long(bot, msg.chat.id, Some(msg.id), &text).await
}
