//! Lifecycle events: ready and member join.

use log::{debug, error, info};
use serenity::model::channel::{Channel, ChannelType, GuildChannel};
use serenity::model::gateway::{Activity, Ready};
use serenity::model::guild::{Guild, Member};
use serenity::model::mention::Mentionable;
use serenity::model::permissions::Permissions;
use serenity::prelude::Context;

use crate::config::Config;

pub fn presence_text(prefix: &str, guild_count: usize) -> String {
    format!("{}help | {} servers", prefix, guild_count)
}

pub fn welcome_message(member_mention: &str, guild_name: &str) -> String {
    format!("Welcome {} to **{}**! Say hi 👋", member_mention, guild_name)
}

/// Names are compared exactly, so `General` does not match `general`.
pub fn is_welcome_channel(kind: ChannelType, channel_name: &str, wanted: &str) -> bool {
    kind == ChannelType::Text && channel_name == wanted
}

pub fn find_text_channel<'a>(
    channels: impl IntoIterator<Item = &'a GuildChannel>,
    name: &str,
) -> Option<&'a GuildChannel> {
    channels
        .into_iter()
        .find(|channel| is_welcome_channel(channel.kind, &channel.name, name))
}

/// `permissions` are the bot's permissions in the welcome channel itself,
/// overwrites included.
pub fn can_greet(permissions: Permissions) -> bool {
    permissions.contains(Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES)
}

pub async fn on_ready(ctx: &Context, ready: &Ready, config: &Config) {
    info!("🎉 Logged in as {} (ID: {})", ready.user.tag(), ready.user.id);
    info!("📡 Guilds: {}", ready.guilds.len());
    if let Some(owner_id) = config.owner_id {
        debug!("Owner id configured: {}", owner_id);
    }

    ctx.set_activity(Activity::playing(presence_text(
        &config.command_prefix,
        ready.guilds.len(),
    )))
    .await;
}

pub async fn on_member_join(ctx: &Context, member: &Member, config: &Config) {
    let guild: Guild = match member.guild_id.to_guild_cached(&ctx.cache) {
        Some(guild) => guild,
        None => {
            debug!("Guild {} not cached, skipping welcome", member.guild_id);
            return;
        }
    };

    let channel = match find_text_channel(
        guild.channels.values().filter_map(|channel| match channel {
            Channel::Guild(channel) => Some(channel),
            _ => None,
        }),
        &config.welcome_channel,
    ) {
        Some(channel) => channel,
        None => {
            debug!(
                "Welcome channel '{}' not found in guild {}",
                config.welcome_channel, guild.name
            );
            return;
        }
    };

    let permissions = guild
        .id
        .member(ctx, ctx.cache.current_user_id())
        .await
        .and_then(|bot| guild.user_permissions_in(channel, &bot));
    let can_send = match permissions {
        Ok(permissions) => can_greet(permissions),
        Err(e) => {
            debug!("Could not resolve own permissions in guild {}: {}", guild.name, e);
            false
        }
    };
    if !can_send {
        debug!(
            "No permission to send in welcome channel '{}' of guild {}",
            config.welcome_channel, guild.name
        );
        return;
    }

    let greeting = welcome_message(&member.user.mention().to_string(), &guild.name);
    if let Err(e) = channel.id.say(&ctx.http, greeting).await {
        error!("Failed to send welcome message in guild {}: {}", guild.name, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_text() {
        assert_eq!(presence_text("!", 3), "!help | 3 servers");
        assert_eq!(presence_text("n?", 0), "n?help | 0 servers");
    }

    #[test]
    fn test_welcome_channel_match() {
        assert!(is_welcome_channel(ChannelType::Text, "general", "general"));
        assert!(!is_welcome_channel(ChannelType::Text, "General", "general"));
        assert!(!is_welcome_channel(ChannelType::Voice, "general", "general"));
        assert!(!is_welcome_channel(ChannelType::Text, "general-chat", "general"));
    }

    #[test]
    fn test_greeting_follows_channel_overwrites() {
        let guild_level = Permissions::VIEW_CHANNEL;
        assert!(!can_greet(guild_level));

        let channel_allows = guild_level | Permissions::SEND_MESSAGES;
        assert!(can_greet(channel_allows));

        let channel_denies =
            (Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES) - Permissions::SEND_MESSAGES;
        assert!(!can_greet(channel_denies));

        assert!(can_greet(Permissions::all()));
    }

    #[test]
    fn test_welcome_message() {
        assert_eq!(
            welcome_message("<@42>", "Cat Cafe"),
            "Welcome <@42> to **Cat Cafe**! Say hi 👋"
        );
    }
}
