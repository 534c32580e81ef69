//! Utility commands: ping, say, avatar, serverinfo, userinfo

use chrono::{TimeZone, Utc};
use log::debug;
use serenity::client::bridge::gateway::ShardId;
use serenity::model::channel::{Channel, ChannelType};
use serenity::model::id::{GuildId, RoleId, UserId};
use serenity::model::mention::Mentionable;
use serenity::model::Timestamp;
use std::time::Duration;

use super::error::CommandResult;
use super::MemberRef;
use crate::command_handler::{CommandContext, ShardManagerContainer};

/// Formats a unix timestamp as `YYYY-MM-DD HH:MM:SS UTC`.
pub fn format_timestamp(unix_seconds: i64) -> String {
    Utc.timestamp_opt(unix_seconds, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

pub fn ping_response(latency: Option<Duration>) -> String {
    match latency {
        Some(latency) => format!("Pong! WebSocket latency: {}ms", latency.as_millis()),
        None => "Pong! WebSocket latency: unavailable".to_string(),
    }
}

/// Counts (text, voice) channels.
pub fn count_channels(kinds: impl IntoIterator<Item = ChannelType>) -> (usize, usize) {
    kinds.into_iter().fold((0, 0), |(text, voice), kind| match kind {
        ChannelType::Text => (text + 1, voice),
        ChannelType::Voice => (text, voice + 1),
        _ => (text, voice),
    })
}

/// Highest role by position; `@everyone` is never part of the candidates.
pub fn top_role(candidates: impl IntoIterator<Item = (RoleId, i64)>) -> Option<RoleId> {
    candidates
        .into_iter()
        .max_by(|(a_id, a_pos), (b_id, b_pos)| a_pos.cmp(b_pos).then(b_id.0.cmp(&a_id.0)))
        .map(|(id, _)| id)
}

#[derive(Debug, Clone)]
pub struct ServerSummary {
    pub id: GuildId,
    pub owner: String,
    pub members: u64,
    pub text_channels: usize,
    pub voice_channels: usize,
    pub roles: usize,
    pub created_at: i64,
}

impl ServerSummary {
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Server ID", self.id.0.to_string()),
            ("Owner", self.owner.clone()),
            ("Members", self.members.to_string()),
            ("Text Channels", self.text_channels.to_string()),
            ("Voice Channels", self.voice_channels.to_string()),
            ("Roles", self.roles.to_string()),
            ("Created at", format_timestamp(self.created_at)),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct UserSummary {
    pub id: UserId,
    pub bot: bool,
    pub top_role: Option<RoleId>,
    pub joined_at: Option<i64>,
    pub created_at: i64,
}

impl UserSummary {
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("ID", self.id.0.to_string()),
            ("Bot", self.bot.to_string()),
            (
                "Top role",
                self.top_role
                    .map(|role| role.mention().to_string())
                    .unwrap_or_else(|| "None".to_string()),
            ),
            (
                "Joined",
                self.joined_at
                    .map(format_timestamp)
                    .unwrap_or_else(|| "Unknown".to_string()),
            ),
            ("Created", format_timestamp(self.created_at)),
        ]
    }
}

pub async fn ping(cmd: &CommandContext<'_>) -> CommandResult {
    let latency = {
        let data = cmd.ctx.data.read().await;
        match data.get::<ShardManagerContainer>() {
            Some(manager) => {
                let manager = manager.lock().await;
                let runners = manager.runners.lock().await;
                runners
                    .get(&ShardId(cmd.ctx.shard_id))
                    .and_then(|runner| runner.latency)
            }
            None => None,
        }
    };

    cmd.reply(ping_response(latency)).await?;
    Ok(())
}

pub async fn say(cmd: &CommandContext<'_>, message: &str) -> CommandResult {
    if let Err(e) = cmd.msg.delete(cmd.ctx).await {
        debug!("Could not delete say invocation {}: {}", cmd.msg.id, e);
    }
    cmd.msg.channel_id.say(&cmd.ctx.http, message).await?;
    Ok(())
}

pub async fn avatar(cmd: &CommandContext<'_>, member: Option<&MemberRef>) -> CommandResult {
    let member = cmd.member_or_author(member).await?;
    let title = format!("{}'s avatar", member.user.tag());
    let url = member.face();

    cmd.reply_embed(|e| e.title(title).image(url)).await?;
    Ok(())
}

pub async fn serverinfo(cmd: &CommandContext<'_>) -> CommandResult {
    let guild = cmd.guild()?;

    let owner = match guild.members.get(&guild.owner_id) {
        Some(member) => member.user.tag(),
        None => match guild.owner_id.to_user(cmd.ctx).await {
            Ok(user) => user.tag(),
            Err(_) => guild.owner_id.mention().to_string(),
        },
    };

    let (text_channels, voice_channels) =
        count_channels(guild.channels.values().filter_map(|channel| match channel {
            Channel::Guild(channel) => Some(channel.kind),
            _ => None,
        }));

    let summary = ServerSummary {
        id: guild.id,
        owner,
        members: guild.member_count,
        text_channels,
        voice_channels,
        roles: guild.roles.len(),
        created_at: guild.id.created_at().unix_timestamp(),
    };

    let name = guild.name.clone();
    let description = guild.description.clone().unwrap_or_default();
    let icon = guild.icon_url();
    let fields = summary.fields();

    cmd.reply_embed(|e| {
        e.title(name)
            .description(description)
            .timestamp(Timestamp::now());
        if let Some(icon) = icon {
            e.thumbnail(icon);
        }
        for (name, value) in fields {
            e.field(name, value, true);
        }
        e
    })
    .await?;
    Ok(())
}

pub async fn userinfo(cmd: &CommandContext<'_>, member: Option<&MemberRef>) -> CommandResult {
    let guild = cmd.guild()?;
    let member = cmd.member_or_author(member).await?;

    let top = top_role(member.roles.iter().filter_map(|role_id| {
        guild
            .roles
            .get(role_id)
            .map(|role| (*role_id, role.position))
    }));

    let summary = UserSummary {
        id: member.user.id,
        bot: member.user.bot,
        top_role: top,
        joined_at: member.joined_at.map(|joined| joined.unix_timestamp()),
        created_at: member.user.created_at().unix_timestamp(),
    };

    let title = member.user.tag();
    let thumbnail = member.face();
    let fields = summary.fields();

    cmd.reply_embed(|e| {
        e.title(title)
            .thumbnail(thumbnail)
            .timestamp(Timestamp::now());
        for (name, value) in fields {
            e.field(name, value, true);
        }
        e
    })
    .await?;
    Ok(())
}
