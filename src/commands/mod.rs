//! # Command System
//!
//! Prefix commands (`!ping`) and mention commands (`@NekoNi ping`), resolved
//! through a static registry of [`CommandSpec`]s.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.0.0: Utility, moderation and fun commands behind one dispatcher
//!
//! Dispatch runs in fixed stages: [`parse_invocation`] finds the command name,
//! [`CommandRegistry::find`] looks it up, the caller permission guard runs,
//! [`Command::parse`] reads the arguments, and the bot permission guard runs
//! last. Nothing mutates remote state before every stage has passed.

pub mod args;
pub mod error;
pub mod fun;
pub mod help;
pub mod moderation;
pub mod utility;

use serenity::model::id::{GuildId, UserId};
use serenity::model::permissions::Permissions;
use std::collections::HashMap;

pub use crate::command_handler::CommandHandler;
pub use args::{ArgReader, MemberRef, RoleRef};
pub use error::{CommandError, CommandResult};

/// A message recognised as a command: the name and the raw text after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub args: String,
}

/// Strip the prefix or a leading bot mention from `content`.
///
/// The command name keeps its case; `!PING` is not `!ping`.
/// Returns `None` for messages that are not addressed to the bot.
pub fn parse_invocation(content: &str, prefix: &str, bot_id: UserId) -> Option<Invocation> {
    let mention = format!("<@{}>", bot_id.0);
    let nick_mention = format!("<@!{}>", bot_id.0);

    let body = if let Some(rest) = content
        .strip_prefix(mention.as_str())
        .or_else(|| content.strip_prefix(nick_mention.as_str()))
    {
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        rest.trim_start()
    } else if !prefix.is_empty() {
        content.strip_prefix(prefix)?
    } else {
        return None;
    };

    let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
    let name = &body[..name_end];
    if name.is_empty() {
        return None;
    }

    Some(Invocation {
        name: name.to_string(),
        args: body[name_end..].trim_start().to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Ping,
    Say,
    Avatar,
    ServerInfo,
    UserInfo,
    Clear,
    Kick,
    Ban,
    Unban,
    AddRole,
    RemoveRole,
    EightBall,
    Coin,
    Roll,
    Help,
}

/// Static metadata describing one command.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub kind: CommandKind,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    /// Usage after the command name, e.g. `<member> [reason]`.
    pub usage: &'static str,
    pub description: &'static str,
    /// Permissions the caller must hold in the guild.
    pub required_permissions: Permissions,
    /// Permissions the bot must hold in the guild.
    pub bot_permissions: Permissions,
    pub guild_only: bool,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        kind: CommandKind::Ping,
        name: "ping",
        aliases: &[],
        usage: "",
        description: "Show bot latency",
        required_permissions: Permissions::empty(),
        bot_permissions: Permissions::empty(),
        guild_only: false,
    },
    CommandSpec {
        kind: CommandKind::Say,
        name: "say",
        aliases: &[],
        usage: "<message>",
        description: "Make the bot say something (requires Manage Messages)",
        required_permissions: Permissions::MANAGE_MESSAGES,
        bot_permissions: Permissions::empty(),
        guild_only: true,
    },
    CommandSpec {
        kind: CommandKind::Avatar,
        name: "avatar",
        aliases: &[],
        usage: "[member]",
        description: "Show a user's avatar",
        required_permissions: Permissions::empty(),
        bot_permissions: Permissions::empty(),
        guild_only: true,
    },
    CommandSpec {
        kind: CommandKind::ServerInfo,
        name: "serverinfo",
        aliases: &[],
        usage: "",
        description: "Show info about the server",
        required_permissions: Permissions::empty(),
        bot_permissions: Permissions::empty(),
        guild_only: true,
    },
    CommandSpec {
        kind: CommandKind::UserInfo,
        name: "userinfo",
        aliases: &["user"],
        usage: "[member]",
        description: "Show info about a user",
        required_permissions: Permissions::empty(),
        bot_permissions: Permissions::empty(),
        guild_only: true,
    },
    CommandSpec {
        kind: CommandKind::Clear,
        name: "clear",
        aliases: &["purge", "clean"],
        usage: "[amount]",
        description: "Delete messages (requires Manage Messages)",
        required_permissions: Permissions::MANAGE_MESSAGES,
        bot_permissions: Permissions::MANAGE_MESSAGES,
        guild_only: true,
    },
    CommandSpec {
        kind: CommandKind::Kick,
        name: "kick",
        aliases: &[],
        usage: "<member> [reason]",
        description: "Kick a member (requires Kick Members)",
        required_permissions: Permissions::KICK_MEMBERS,
        bot_permissions: Permissions::KICK_MEMBERS,
        guild_only: true,
    },
    CommandSpec {
        kind: CommandKind::Ban,
        name: "ban",
        aliases: &[],
        usage: "<member> [reason]",
        description: "Ban a member (requires Ban Members)",
        required_permissions: Permissions::BAN_MEMBERS,
        bot_permissions: Permissions::BAN_MEMBERS,
        guild_only: true,
    },
    CommandSpec {
        kind: CommandKind::Unban,
        name: "unban",
        aliases: &[],
        usage: "<user_id>",
        description: "Unban by user ID (requires Ban Members)",
        required_permissions: Permissions::BAN_MEMBERS,
        bot_permissions: Permissions::BAN_MEMBERS,
        guild_only: true,
    },
    CommandSpec {
        kind: CommandKind::AddRole,
        name: "addrole",
        aliases: &[],
        usage: "<member> <role>",
        description: "Add a role to a member (requires Manage Roles)",
        required_permissions: Permissions::MANAGE_ROLES,
        bot_permissions: Permissions::MANAGE_ROLES,
        guild_only: true,
    },
    CommandSpec {
        kind: CommandKind::RemoveRole,
        name: "removerole",
        aliases: &[],
        usage: "<member> <role>",
        description: "Remove a role from a member (requires Manage Roles)",
        required_permissions: Permissions::MANAGE_ROLES,
        bot_permissions: Permissions::MANAGE_ROLES,
        guild_only: true,
    },
    CommandSpec {
        kind: CommandKind::EightBall,
        name: "8ball",
        aliases: &["eightball"],
        usage: "<question>",
        description: "Magic 8-ball",
        required_permissions: Permissions::empty(),
        bot_permissions: Permissions::empty(),
        guild_only: false,
    },
    CommandSpec {
        kind: CommandKind::Coin,
        name: "coin",
        aliases: &[],
        usage: "",
        description: "Flip a coin",
        required_permissions: Permissions::empty(),
        bot_permissions: Permissions::empty(),
        guild_only: false,
    },
    CommandSpec {
        kind: CommandKind::Roll,
        name: "roll",
        aliases: &[],
        usage: "[sides]",
        description: "Roll a dice, e.g. roll 20 for a d20",
        required_permissions: Permissions::empty(),
        bot_permissions: Permissions::empty(),
        guild_only: false,
    },
    CommandSpec {
        kind: CommandKind::Help,
        name: "help",
        aliases: &[],
        usage: "",
        description: "Show help information",
        required_permissions: Permissions::empty(),
        bot_permissions: Permissions::empty(),
        guild_only: false,
    },
];

/// Name and alias lookup over [`COMMANDS`], built once at startup.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    by_name: HashMap<&'static str, &'static CommandSpec>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let mut by_name = HashMap::new();
        for spec in COMMANDS {
            by_name.insert(spec.name, spec);
            for alias in spec.aliases {
                by_name.insert(*alias, spec);
            }
        }
        CommandRegistry { by_name }
    }

    pub fn find(&self, name: &str) -> CommandResult<&'static CommandSpec> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| CommandError::CommandNotFound(name.to_string()))
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller permission guard. Runs before any argument is read.
pub fn check_caller_permissions(spec: &CommandSpec, granted: Permissions) -> CommandResult {
    let missing = spec.required_permissions - granted;
    if missing.is_empty() || granted.administrator() {
        Ok(())
    } else {
        Err(CommandError::MissingPermissions(missing))
    }
}

/// Bot permission guard for commands that mutate guild state.
pub fn check_bot_permissions(spec: &CommandSpec, granted: Permissions) -> CommandResult {
    let missing = spec.bot_permissions - granted;
    if missing.is_empty() || granted.administrator() {
        Ok(())
    } else {
        Err(CommandError::BotMissingPermissions(missing))
    }
}

/// Caller guard, then argument parsing, then bot guard. Handlers only ever
/// see a [`Command`] that passed all three.
pub fn prepare(
    spec: &CommandSpec,
    caller_permissions: Permissions,
    bot_permissions: Permissions,
    raw_args: &str,
) -> CommandResult<Command> {
    check_caller_permissions(spec, caller_permissions)?;
    let command = Command::parse(spec.kind, raw_args)?;
    check_bot_permissions(spec, bot_permissions)?;
    Ok(command)
}

/// Decides which guild, if any, a command runs against.
///
/// `cached` is the cache lookup for `guild_id`. Commands usable in DMs fall
/// back to running without a guild when the lookup misses.
pub fn resolve_scope<G>(
    spec: &CommandSpec,
    guild_id: Option<GuildId>,
    cached: Option<G>,
) -> CommandResult<Option<G>> {
    match (guild_id, cached) {
        (Some(_), Some(guild)) => Ok(Some(guild)),
        (Some(guild_id), None) if spec.guild_only => Err(CommandError::Unexpected(
            anyhow::anyhow!("guild {} is not in the cache", guild_id),
        )),
        (None, _) if spec.guild_only => Err(CommandError::GuildOnly),
        _ => Ok(None),
    }
}

/// A fully parsed invocation with typed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Say { message: String },
    Avatar { member: Option<MemberRef> },
    ServerInfo,
    UserInfo { member: Option<MemberRef> },
    Clear { amount: i64 },
    Kick { member: MemberRef, reason: String },
    Ban { member: MemberRef, reason: String },
    Unban { user_id: UserId },
    AddRole { member: MemberRef, role: RoleRef },
    RemoveRole { member: MemberRef, role: RoleRef },
    EightBall { question: String },
    Coin,
    Roll { sides: i64 },
    Help,
}

impl Command {
    pub fn parse(kind: CommandKind, raw_args: &str) -> CommandResult<Command> {
        let mut args = ArgReader::new(raw_args);

        let command = match kind {
            CommandKind::Ping => Command::Ping,
            CommandKind::Say => Command::Say {
                message: args.required_rest("message")?,
            },
            CommandKind::Avatar => Command::Avatar {
                member: args.optional_member(),
            },
            CommandKind::ServerInfo => Command::ServerInfo,
            CommandKind::UserInfo => Command::UserInfo {
                member: args.optional_member(),
            },
            CommandKind::Clear => Command::Clear {
                amount: args
                    .optional_integer()?
                    .unwrap_or(moderation::DEFAULT_CLEAR_AMOUNT),
            },
            CommandKind::Kick => Command::Kick {
                member: args.required_member("member")?,
                reason: args.rest().unwrap_or_else(|| moderation::DEFAULT_REASON.to_string()),
            },
            CommandKind::Ban => Command::Ban {
                member: args.required_member("member")?,
                reason: args.rest().unwrap_or_else(|| moderation::DEFAULT_REASON.to_string()),
            },
            CommandKind::Unban => Command::Unban {
                user_id: args::parse_user_id(args.required_integer("user_id")?)?,
            },
            CommandKind::AddRole => Command::AddRole {
                member: args.required_member("member")?,
                role: args.required_role("role")?,
            },
            CommandKind::RemoveRole => Command::RemoveRole {
                member: args.required_member("member")?,
                role: args.required_role("role")?,
            },
            CommandKind::EightBall => Command::EightBall {
                question: args.required_rest("question")?,
            },
            CommandKind::Coin => Command::Coin,
            CommandKind::Roll => Command::Roll {
                sides: args.optional_integer()?.unwrap_or(fun::DEFAULT_SIDES),
            },
            CommandKind::Help => Command::Help,
        };

        Ok(command)
    }
}
