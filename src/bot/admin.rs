use std::sync::Arc;

use anyhow::anyhow;
use teloxide::{prelude::Requester as _, types::Message};

use super::{BotType, arg::NecessaryArg, replace_all};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum AdminCommand {
    Cleanup,
    Clear,
}

/// Configured admins everywhere, chat administrators inside groups.
async fn is_admin(bot: &BotType, arg: &NecessaryArg, msg: &Message) -> anyhow::Result<bool> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(false);
    };
    if arg.check_admin(user.id.0 as i64) {
        return Ok(true);
    }
    if msg.chat.is_private() {
        return Ok(false);
    }
    Ok(bot
        .get_chat_member(msg.chat.id, user.id)
        .await?
        .is_privileged())
}

pub(super) async fn handle_admin_command(
    bot: BotType,
    arg: Arc<NecessaryArg>,
    msg: Message,
    command: AdminCommand,
) -> anyhow::Result<()> {
    if !is_admin(&bot, &arg, &msg).await? {
        bot.send_message(msg.chat.id, "⛔ This command is for administrators only\\.")
            .await?;
        return Ok(());
    }

    log::info!(
        "Admin command {command:?} from {:?} in {}",
        msg.from.as_ref().map(|u| u.id),
        msg.chat.id
    );

    let text = match command {
        AdminCommand::Cleanup => {
            let report = arg
                .registry()
                .cleanup()
                .await
                .ok_or_else(|| anyhow!("Registry unavailable"))?;
            format!(
                "🧹 *Cleanup finished*\nRemoved {} numbers and {} users\\.\n\
                Remaining: {} numbers, {} users\\.",
                report.phones_removed,
                report.users_removed,
                report.phones_left,
                report.users_left
            )
        }
        AdminCommand::Clear => {
            let removed = arg
                .registry()
                .clear()
                .await
                .ok_or_else(|| anyhow!("Registry unavailable"))?;
            format!(
                "🗑️ *All records cleared*\n{} numbers removed\\. {}",
                removed,
                replace_all("Uptime and heartbeat counters are kept.")
            )
        }
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
