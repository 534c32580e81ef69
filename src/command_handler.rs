use anyhow::Result;
use log::{debug, error, info};
use serenity::builder::{CreateEmbed, ParseValue};
use serenity::client::bridge::gateway::ShardManager;
use serenity::model::channel::{Channel, Message};
use serenity::model::guild::{Guild, Member, Role};
use serenity::model::id::ChannelId;
use serenity::model::permissions::Permissions;
use serenity::prelude::{Context, Mutex, TypeMapKey};
use std::sync::Arc;

use crate::commands::error::member_lookup_error;
use crate::commands::{
    fun, help, moderation, parse_invocation, prepare, resolve_scope, utility, Command,
    CommandError, CommandRegistry, CommandResult, Invocation, MemberRef, RoleRef,
};
use crate::config::Config;

/// Gives command handlers access to shard latency.
pub struct ShardManagerContainer;

impl TypeMapKey for ShardManagerContainer {
    type Value = Arc<Mutex<ShardManager>>;
}

/// Sends `content` as a reply to `msg` without pinging its author.
pub async fn reply_to(
    ctx: &Context,
    msg: &Message,
    content: impl ToString,
) -> serenity::Result<Message> {
    msg.channel_id
        .send_message(&ctx.http, |m| {
            m.content(content)
                .reference_message(msg)
                .allowed_mentions(|am| {
                    am.replied_user(false)
                        .parse(ParseValue::Users)
                        .parse(ParseValue::Roles)
                })
        })
        .await
}

/// Everything a command handler may touch for one invocation.
pub struct CommandContext<'a> {
    pub ctx: &'a Context,
    pub msg: &'a Message,
    pub config: &'a Config,
    guild: Option<Guild>,
}

impl<'a> CommandContext<'a> {
    pub fn guild(&self) -> CommandResult<&Guild> {
        self.guild.as_ref().ok_or(CommandError::GuildOnly)
    }

    pub async fn reply(&self, content: impl ToString) -> serenity::Result<Message> {
        reply_to(self.ctx, self.msg, content).await
    }

    pub async fn reply_embed<F>(&self, f: F) -> serenity::Result<Message>
    where
        F: FnOnce(&mut CreateEmbed) -> &mut CreateEmbed,
    {
        self.msg
            .channel_id
            .send_message(&self.ctx.http, |m| {
                m.reference_message(self.msg)
                    .allowed_mentions(|am| am.replied_user(false))
                    .embed(f)
            })
            .await
    }

    pub async fn resolve_member(&self, member: &MemberRef) -> CommandResult<Member> {
        let guild = self.guild()?;
        match member {
            MemberRef::Id(user_id) => guild
                .id
                .member(self.ctx, *user_id)
                .await
                .map_err(|e| member_lookup_error(*user_id, e)),
            MemberRef::Name(name) => guild
                .member_named(name)
                .cloned()
                .ok_or_else(|| CommandError::BadArgument(format!("member '{}' not found", name))),
        }
    }

    pub async fn member_or_author(&self, member: Option<&MemberRef>) -> CommandResult<Member> {
        match member {
            Some(member) => self.resolve_member(member).await,
            None => Ok(self.msg.member(self.ctx).await?),
        }
    }

    pub fn resolve_role(&self, role: &RoleRef) -> CommandResult<Role> {
        let guild = self.guild()?;
        let found = match role {
            RoleRef::Id(role_id) => guild.roles.get(role_id),
            RoleRef::Name(name) => guild.role_by_name(name),
        };
        found
            .cloned()
            .ok_or_else(|| CommandError::BadArgument(format!("role {:?} not found", role)))
    }

    pub async fn bot_member(&self) -> CommandResult<Member> {
        let guild = self.guild()?;
        Ok(guild
            .id
            .member(self.ctx, self.ctx.cache.current_user_id())
            .await?)
    }

    pub async fn bot_top_role_position(&self) -> CommandResult<i64> {
        let guild = self.guild()?;
        let bot = self.bot_member().await?;
        Ok(bot
            .roles
            .iter()
            .filter_map(|role_id| guild.roles.get(role_id))
            .map(|role| role.position)
            .max()
            .unwrap_or(0))
    }
}

/// Permissions `member` holds in the channel a message was sent in, with the
/// channel's overwrites applied. Threads use their parent's overwrites.
pub fn channel_permissions(
    guild: &Guild,
    channel_id: ChannelId,
    member: &Member,
) -> CommandResult<Permissions> {
    let channel = match guild.channels.get(&channel_id) {
        Some(Channel::Guild(channel)) => Some(channel),
        _ => guild
            .threads
            .iter()
            .find(|thread| thread.id == channel_id)
            .and_then(|thread| match thread.parent_id.and_then(|id| guild.channels.get(&id)) {
                Some(Channel::Guild(parent)) => Some(parent),
                _ => None,
            }),
    };

    match channel {
        Some(channel) => Ok(guild.user_permissions_in(channel, member)?),
        None => Err(CommandError::Unexpected(anyhow::anyhow!(
            "channel {} is not in the cache of guild {}",
            channel_id,
            guild.id
        ))),
    }
}

#[derive(Clone)]
pub struct CommandHandler {
    config: Arc<Config>,
    registry: Arc<CommandRegistry>,
}

impl CommandHandler {
    pub fn new(config: Config) -> Self {
        CommandHandler {
            config: Arc::new(config),
            registry: Arc::new(CommandRegistry::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn handle_message(&self, ctx: &Context, msg: &Message) -> Result<()> {
        if msg.author.bot {
            return Ok(());
        }

        let bot_id = ctx.cache.current_user_id();
        let invocation = match parse_invocation(&msg.content, &self.config.command_prefix, bot_id) {
            Some(invocation) => invocation,
            None => return Ok(()),
        };

        if let Err(e) = self.dispatch(ctx, msg, &invocation).await {
            self.on_command_error(ctx, msg, &invocation, e).await?;
        }

        Ok(())
    }

    async fn dispatch(&self, ctx: &Context, msg: &Message, invocation: &Invocation) -> CommandResult {
        let spec = self.registry.find(&invocation.name)?;

        let guild = resolve_scope(spec, msg.guild_id, msg.guild(&ctx.cache))?;
        if guild.is_none() && msg.guild_id.is_some() {
            debug!("Guild {:?} not cached, running '{}' without it", msg.guild_id, spec.name);
        }

        let (caller_permissions, bot_permissions) = match &guild {
            Some(guild) if !spec.required_permissions.is_empty() || !spec.bot_permissions.is_empty() => {
                let caller = msg.member(ctx).await?;
                let bot = guild.id.member(ctx, ctx.cache.current_user_id()).await?;
                (
                    channel_permissions(guild, msg.channel_id, &caller)?,
                    channel_permissions(guild, msg.channel_id, &bot)?,
                )
            }
            _ => (Permissions::empty(), Permissions::empty()),
        };

        let command = prepare(spec, caller_permissions, bot_permissions, &invocation.args)?;

        info!(
            "Processing command: {} from user: {}",
            spec.name,
            msg.author.id
        );

        let cmd = CommandContext {
            ctx,
            msg,
            config: &self.config,
            guild,
        };
        self.execute(&cmd, command).await
    }

    async fn execute(&self, cmd: &CommandContext<'_>, command: Command) -> CommandResult {
        match command {
            Command::Ping => utility::ping(cmd).await?,
            Command::Say { message } => utility::say(cmd, &message).await?,
            Command::Avatar { member } => utility::avatar(cmd, member.as_ref()).await?,
            Command::ServerInfo => utility::serverinfo(cmd).await?,
            Command::UserInfo { member } => utility::userinfo(cmd, member.as_ref()).await?,
            Command::Clear { amount } => moderation::clear(cmd, amount).await?,
            Command::Kick { member, reason } => moderation::kick(cmd, &member, &reason).await?,
            Command::Ban { member, reason } => moderation::ban(cmd, &member, &reason).await?,
            Command::Unban { user_id } => moderation::unban(cmd, user_id).await?,
            Command::AddRole { member, role } => moderation::add_role(cmd, &member, &role).await?,
            Command::RemoveRole { member, role } => {
                moderation::remove_role(cmd, &member, &role).await?
            }
            Command::EightBall { question } => {
                let answer = fun::eight_ball(&question, &mut rand::rng());
                cmd.reply(answer).await?;
            }
            Command::Coin => {
                let face = fun::coin(&mut rand::rng());
                cmd.reply(face).await?;
            }
            Command::Roll { sides } => {
                let result = fun::roll(sides, &mut rand::rng());
                cmd.reply(result).await?;
            }
            Command::Help => {
                let bot_tag = cmd.ctx.cache.current_user().tag();
                cmd.reply(help::help_text(&cmd.config.command_prefix, &bot_tag))
                    .await?;
            }
        }

        Ok(())
    }

    /// The single error hook: maps a dispatch error to its reply.
    pub async fn on_command_error(
        &self,
        ctx: &Context,
        msg: &Message,
        invocation: &Invocation,
        error: CommandError,
    ) -> Result<()> {
        if error.is_unexpected() {
            error!(
                "Unhandled command error in '{}' from user {}: {:?}",
                invocation.name, msg.author.id, error
            );
        } else {
            debug!("Command '{}' rejected: {}", invocation.name, error);
        }

        if let Some(reply) = error.user_message() {
            reply_to(ctx, msg, reply).await?;
        }

        Ok(())
    }
}
