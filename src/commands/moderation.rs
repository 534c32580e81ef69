//! Moderation commands: clear, kick, ban, unban, addrole, removerole
//!
//! Permission guards run in the dispatcher; these functions assume the caller
//! and the bot were already checked.

use log::{info, warn};
use serenity::model::id::{ChannelId, MessageId, UserId};
use serenity::model::mention::Mentionable;
use serenity::model::permissions::Permissions;
use std::time::Duration;

use super::error::{CommandError, CommandResult};
use super::{MemberRef, RoleRef};
use crate::command_handler::CommandContext;

pub const DEFAULT_CLEAR_AMOUNT: i64 = 10;
pub const MAX_CLEAR_AMOUNT: i64 = 200;
pub const DEFAULT_REASON: &str = "No reason provided";

/// Discord refuses bulk deletes of messages older than two weeks.
const BULK_DELETE_MAX_AGE_SECS: i64 = 14 * 24 * 60 * 60;
const BULK_DELETE_CHUNK: usize = 100;
const HISTORY_PAGE: u64 = 100;
const NOTICE_LIFETIME: Duration = Duration::from_secs(5);

/// Number of messages a clear targets, counting the command itself, or
/// `None` when `amount` is out of range.
pub fn clear_target(amount: i64) -> Option<usize> {
    if (1..=MAX_CLEAR_AMOUNT).contains(&amount) {
        Some(amount as usize + 1)
    } else {
        None
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DeletionPlan {
    /// Chunks of 2..=100 ids for the bulk endpoint.
    pub bulk: Vec<Vec<MessageId>>,
    /// Ids deleted one at a time.
    pub single: Vec<MessageId>,
}

impl DeletionPlan {
    pub fn len(&self) -> usize {
        self.bulk.iter().map(Vec::len).sum::<usize>() + self.single.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Splits messages (id, creation time) into bulk chunks and single deletes.
pub fn plan_deletion(messages: &[(MessageId, i64)], now: i64) -> DeletionPlan {
    let (recent, old): (Vec<&(MessageId, i64)>, Vec<&(MessageId, i64)>) = messages
        .iter()
        .partition(|(_, created)| now - created < BULK_DELETE_MAX_AGE_SECS);

    let mut plan = DeletionPlan {
        bulk: Vec::new(),
        single: old.into_iter().map(|(id, _)| *id).collect(),
    };

    let recent: Vec<MessageId> = recent.into_iter().map(|(id, _)| *id).collect();
    for chunk in recent.chunks(BULK_DELETE_CHUNK) {
        if chunk.len() == 1 {
            plan.single.push(chunk[0]);
        } else {
            plan.bulk.push(chunk.to_vec());
        }
    }

    plan
}

pub fn cleared_notice(deleted_including_command: usize) -> String {
    format!(
        "Deleted {} messages.",
        deleted_including_command.saturating_sub(1)
    )
}

pub async fn clear(cmd: &CommandContext<'_>, amount: i64) -> CommandResult {
    let target = match clear_target(amount) {
        Some(target) => target,
        None => {
            cmd.reply("Please provide a number between 1 and 200.").await?;
            return Ok(());
        }
    };

    let channel_id = cmd.msg.channel_id;
    let mut messages = vec![(cmd.msg.id, cmd.msg.id.created_at().unix_timestamp())];
    let mut cursor = cmd.msg.id;

    while messages.len() < target {
        let wanted = (target - messages.len()) as u64;
        let page = channel_id
            .messages(&cmd.ctx.http, |retriever| {
                retriever.before(cursor).limit(wanted.min(HISTORY_PAGE))
            })
            .await?;

        let fetched = page.len() as u64;
        for message in &page {
            messages.push((message.id, message.id.created_at().unix_timestamp()));
        }
        match page.last() {
            Some(oldest) if fetched == wanted.min(HISTORY_PAGE) => cursor = oldest.id,
            _ => break,
        }
    }

    let plan = plan_deletion(&messages, chrono::Utc::now().timestamp());
    for chunk in &plan.bulk {
        channel_id.delete_messages(&cmd.ctx.http, chunk.iter()).await?;
    }
    for id in &plan.single {
        channel_id.delete_message(&cmd.ctx.http, *id).await?;
    }

    info!(
        "Cleared {} messages in channel {} for {}",
        plan.len().saturating_sub(1),
        channel_id,
        cmd.msg.author.tag()
    );

    let notice = channel_id
        .say(&cmd.ctx.http, cleared_notice(plan.len()))
        .await?;
    remove_after(cmd, channel_id, notice.id);
    Ok(())
}

fn remove_after(cmd: &CommandContext<'_>, channel_id: ChannelId, message_id: MessageId) {
    let http = cmd.ctx.http.clone();
    tokio::spawn(async move {
        tokio::time::sleep(NOTICE_LIFETIME).await;
        if let Err(e) = channel_id.delete_message(&http, message_id).await {
            warn!("Failed to remove clear notice {}: {}", message_id, e);
        }
    });
}

pub async fn kick(cmd: &CommandContext<'_>, member: &MemberRef, reason: &str) -> CommandResult {
    let guild = cmd.guild()?;
    let member = cmd.resolve_member(member).await?;

    guild
        .id
        .kick_with_reason(&cmd.ctx.http, member.user.id, reason)
        .await?;
    info!("{} kicked {} ({})", cmd.msg.author.tag(), member.user.tag(), reason);

    cmd.reply(format!("Kicked {} - {}", member.user.tag(), reason))
        .await?;
    Ok(())
}

pub async fn ban(cmd: &CommandContext<'_>, member: &MemberRef, reason: &str) -> CommandResult {
    let guild = cmd.guild()?;
    let member = cmd.resolve_member(member).await?;

    guild
        .id
        .ban_with_reason(&cmd.ctx.http, member.user.id, 0, reason)
        .await?;
    info!("{} banned {} ({})", cmd.msg.author.tag(), member.user.tag(), reason);

    cmd.reply(format!("Banned {} - {}", member.user.tag(), reason))
        .await?;
    Ok(())
}

pub async fn unban(cmd: &CommandContext<'_>, user_id: UserId) -> CommandResult {
    let guild = cmd.guild()?;
    let user = user_id.to_user(cmd.ctx).await?;

    guild.id.unban(&cmd.ctx.http, user.id).await?;
    info!("{} unbanned {}", cmd.msg.author.tag(), user.tag());

    cmd.reply(format!("Unbanned {}.", user.tag())).await?;
    Ok(())
}

pub async fn add_role(cmd: &CommandContext<'_>, member: &MemberRef, role: &RoleRef) -> CommandResult {
    let mut member = cmd.resolve_member(member).await?;
    let role = cmd.resolve_role(role)?;
    ensure_assignable(role.position, cmd.bot_top_role_position().await?)?;

    member.add_role(&cmd.ctx.http, role.id).await?;

    cmd.reply(format!(
        "Added role {} to {}.",
        role.name,
        member.user.id.mention()
    ))
    .await?;
    Ok(())
}

pub async fn remove_role(
    cmd: &CommandContext<'_>,
    member: &MemberRef,
    role: &RoleRef,
) -> CommandResult {
    let mut member = cmd.resolve_member(member).await?;
    let role = cmd.resolve_role(role)?;
    ensure_assignable(role.position, cmd.bot_top_role_position().await?)?;

    member.remove_role(&cmd.ctx.http, role.id).await?;

    cmd.reply(format!(
        "Removed role {} from {}.",
        role.name,
        member.user.id.mention()
    ))
    .await?;
    Ok(())
}

/// Rejects a role mutation the bot cannot perform because of role hierarchy.
pub fn ensure_assignable(role_position: i64, bot_top_position: i64) -> CommandResult {
    if role_position < bot_top_position {
        Ok(())
    } else {
        Err(CommandError::BotMissingPermissions(Permissions::MANAGE_ROLES))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;
    const DAY: i64 = 24 * 60 * 60;

    #[test]
    fn test_clear_target_counts_command() {
        assert_eq!(clear_target(1), Some(2));
        assert_eq!(clear_target(10), Some(11));
        assert_eq!(clear_target(200), Some(201));
    }

    #[test]
    fn test_clear_target_rejects_out_of_range() {
        for amount in [i64::MIN, -1, 0, 201, 5000] {
            assert_eq!(clear_target(amount), None);
        }
    }

    #[test]
    fn test_plan_chunks_recent_messages() {
        let messages: Vec<(MessageId, i64)> =
            (1..=201).map(|i| (MessageId(i), NOW - 60)).collect();
        let plan = plan_deletion(&messages, NOW);

        assert_eq!(plan.len(), 201);
        assert_eq!(plan.bulk.len(), 2);
        assert!(plan.bulk.iter().all(|chunk| chunk.len() == 100));
        assert_eq!(plan.single, vec![MessageId(201)]);
    }

    #[test]
    fn test_plan_singles_out_old_messages() {
        let messages = vec![
            (MessageId(1), NOW - DAY),
            (MessageId(2), NOW - 15 * DAY),
            (MessageId(3), NOW - 2 * DAY),
            (MessageId(4), NOW - 30 * DAY),
        ];
        let plan = plan_deletion(&messages, NOW);

        assert_eq!(plan.bulk, vec![vec![MessageId(1), MessageId(3)]]);
        assert_eq!(plan.single, vec![MessageId(2), MessageId(4)]);
    }

    #[test]
    fn test_plan_single_recent_message() {
        let plan = plan_deletion(&[(MessageId(9), NOW)], NOW);
        assert!(plan.bulk.is_empty());
        assert_eq!(plan.single, vec![MessageId(9)]);
        assert!(plan_deletion(&[], NOW).is_empty());
    }

    #[test]
    fn test_cleared_notice_excludes_command() {
        assert_eq!(cleared_notice(11), "Deleted 10 messages.");
        assert_eq!(cleared_notice(1), "Deleted 0 messages.");
        assert_eq!(cleared_notice(0), "Deleted 0 messages.");
    }

    #[test]
    fn test_role_hierarchy() {
        assert!(ensure_assignable(3, 5).is_ok());
        assert!(matches!(
            ensure_assignable(5, 5),
            Err(CommandError::BotMissingPermissions(_))
        ));
    }
}
