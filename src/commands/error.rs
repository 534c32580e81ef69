//! Error taxonomy for command dispatch and the single reply mapping for it.

use serenity::http::HttpError;
use serenity::model::id::UserId;
use serenity::model::permissions::Permissions;
use serenity::model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("caller is missing permissions: {0:?}")]
    MissingPermissions(Permissions),

    #[error("bot is missing permissions: {0:?}")]
    BotMissingPermissions(Permissions),

    #[error("missing required argument '{0}'")]
    MissingArgument(&'static str),

    #[error("bad argument: {0}")]
    BadArgument(String),

    #[error("unknown command '{0}'")]
    CommandNotFound(String),

    #[error("command can only be used in a guild")]
    GuildOnly,

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl CommandError {
    /// The reply sent to the invoking user, or `None` when the error is dropped silently.
    pub fn user_message(&self) -> Option<String> {
        match self {
            CommandError::MissingPermissions(_) => {
                Some("You do not have permission to run this command.".to_string())
            }
            CommandError::BotMissingPermissions(_) => {
                Some("I don't have the required permissions to do that.".to_string())
            }
            CommandError::MissingArgument(name) => Some(format!("Missing argument: {}", name)),
            CommandError::BadArgument(_) => Some("Bad argument provided.".to_string()),
            CommandError::CommandNotFound(_) => None,
            CommandError::GuildOnly => {
                Some("This command can only be used in a server.".to_string())
            }
            CommandError::Unexpected(_) => {
                Some("An unexpected error occurred. The error has been logged.".to_string())
            }
        }
    }

    pub fn is_unexpected(&self) -> bool {
        matches!(self, CommandError::Unexpected(_))
    }
}

impl From<serenity::Error> for CommandError {
    fn from(error: serenity::Error) -> Self {
        match &error {
            serenity::Error::Model(ModelError::InvalidPermissions(missing)) => {
                return CommandError::BotMissingPermissions(*missing);
            }
            _ if http_status(&error) == Some(403) => {
                return CommandError::BotMissingPermissions(Permissions::empty());
            }
            _ => {}
        }

        CommandError::Unexpected(anyhow::Error::new(error))
    }
}

/// Status code of a request Discord answered with an error.
pub fn http_status(error: &serenity::Error) -> Option<u16> {
    match error {
        serenity::Error::Http(http_error) => match &**http_error {
            HttpError::UnsuccessfulRequest(response) => Some(response.status_code.as_u16()),
            _ => None,
        },
        _ => None,
    }
}

/// A failed member fetch is a bad argument only when Discord does not know
/// the member. Anything else goes through the usual classification.
pub fn member_lookup_error(user_id: UserId, error: serenity::Error) -> CommandError {
    if http_status(&error) == Some(404) {
        CommandError::BadArgument(format!("member {} not found", user_id))
    } else {
        CommandError::from(error)
    }
}

pub type CommandResult<T = ()> = std::result::Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_messages() {
        assert_eq!(
            CommandError::MissingPermissions(Permissions::KICK_MEMBERS).user_message().unwrap(),
            "You do not have permission to run this command."
        );
        assert_eq!(
            CommandError::BotMissingPermissions(Permissions::BAN_MEMBERS).user_message().unwrap(),
            "I don't have the required permissions to do that."
        );
    }

    #[test]
    fn test_argument_messages() {
        assert_eq!(
            CommandError::MissingArgument("member").user_message().unwrap(),
            "Missing argument: member"
        );
        assert_eq!(
            CommandError::BadArgument("no such role".into()).user_message().unwrap(),
            "Bad argument provided."
        );
    }

    #[test]
    fn test_unknown_command_is_silent() {
        assert!(CommandError::CommandNotFound("nope".into()).user_message().is_none());
    }

    #[test]
    fn test_unexpected_hides_details() {
        let err = CommandError::from(anyhow::anyhow!("database exploded at line 42"));
        assert!(err.is_unexpected());
        let reply = err.user_message().unwrap();
        assert_eq!(reply, "An unexpected error occurred. The error has been logged.");
        assert!(!reply.contains("line 42"));
    }

    #[test]
    fn test_invalid_permissions_maps_to_bot_missing() {
        let err = CommandError::from(serenity::Error::Model(ModelError::InvalidPermissions(
            Permissions::MANAGE_ROLES,
        )));
        assert!(matches!(err, CommandError::BotMissingPermissions(p) if p == Permissions::MANAGE_ROLES));
    }

    #[test]
    fn test_other_serenity_errors_are_unexpected() {
        let err = CommandError::from(serenity::Error::Other("boom"));
        assert!(err.is_unexpected());
        assert_eq!(http_status(&serenity::Error::Other("boom")), None);
    }

    #[test]
    fn test_failed_member_fetch_is_not_a_bad_argument() {
        let err = member_lookup_error(UserId(5), serenity::Error::Other("gateway timed out"));
        assert!(err.is_unexpected());
        assert_eq!(
            err.user_message().unwrap(),
            "An unexpected error occurred. The error has been logged."
        );

        let err = member_lookup_error(
            UserId(5),
            serenity::Error::Model(ModelError::InvalidPermissions(Permissions::VIEW_CHANNEL)),
        );
        assert!(matches!(err, CommandError::BotMissingPermissions(_)));
    }
}
