//! Argument tokenizer and converters for prefix commands.
//!
//! Words are split on whitespace, a double-quoted span counts as one word, and
//! "rest" parameters consume everything that is left verbatim.

use regex::Regex;
use serenity::model::id::{RoleId, UserId};
use std::sync::LazyLock;

use super::error::{CommandError, CommandResult};

static USER_MENTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^<@!?(\d+)>$").unwrap());
static ROLE_MENTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^<@&(\d+)>$").unwrap());

/// A member argument before it has been looked up in the guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberRef {
    Id(UserId),
    Name(String),
}

/// A role argument before it has been looked up in the guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRef {
    Id(RoleId),
    Name(String),
}

pub struct ArgReader<'a> {
    remaining: &'a str,
}

impl<'a> ArgReader<'a> {
    pub fn new(input: &'a str) -> Self {
        ArgReader {
            remaining: input.trim_start(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.trim().is_empty()
    }

    /// Next whitespace-delimited word, honouring double quotes.
    pub fn next_word(&mut self) -> Option<String> {
        let input = self.remaining.trim_start();
        if input.is_empty() {
            self.remaining = input;
            return None;
        }

        if let Some(quoted) = input.strip_prefix('"') {
            if let Some(end) = quoted.find('"') {
                self.remaining = &quoted[end + 1..];
                return Some(quoted[..end].to_string());
            }
        }

        let end = input.find(char::is_whitespace).unwrap_or(input.len());
        self.remaining = &input[end..];
        Some(input[..end].to_string())
    }

    /// Everything left, trimmed. `None` when nothing is left.
    pub fn rest(&mut self) -> Option<String> {
        let rest = self.remaining.trim();
        self.remaining = "";
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    }

    pub fn required_word(&mut self, name: &'static str) -> CommandResult<String> {
        self.next_word().ok_or(CommandError::MissingArgument(name))
    }

    pub fn required_rest(&mut self, name: &'static str) -> CommandResult<String> {
        self.rest().ok_or(CommandError::MissingArgument(name))
    }

    pub fn optional_integer(&mut self) -> CommandResult<Option<i64>> {
        self.next_word().map(|word| parse_integer(&word)).transpose()
    }

    pub fn required_integer(&mut self, name: &'static str) -> CommandResult<i64> {
        parse_integer(&self.required_word(name)?)
    }

    pub fn optional_member(&mut self) -> Option<MemberRef> {
        self.next_word().map(|word| parse_member(&word))
    }

    pub fn required_member(&mut self, name: &'static str) -> CommandResult<MemberRef> {
        Ok(parse_member(&self.required_word(name)?))
    }

    pub fn required_role(&mut self, name: &'static str) -> CommandResult<RoleRef> {
        Ok(parse_role(&self.required_word(name)?))
    }
}

pub fn parse_integer(word: &str) -> CommandResult<i64> {
    word.parse::<i64>()
        .map_err(|_| CommandError::BadArgument(format!("'{}' is not an integer", word)))
}

fn parse_snowflake(digits: &str) -> Option<u64> {
    digits.parse::<u64>().ok().filter(|id| *id != 0)
}

pub fn parse_member(word: &str) -> MemberRef {
    let id = USER_MENTION
        .captures(word)
        .and_then(|caps| parse_snowflake(&caps[1]))
        .or_else(|| {
            if word.chars().all(|c| c.is_ascii_digit()) {
                parse_snowflake(word)
            } else {
                None
            }
        });

    match id {
        Some(id) => MemberRef::Id(UserId(id)),
        None => MemberRef::Name(word.to_string()),
    }
}

pub fn parse_role(word: &str) -> RoleRef {
    let id = ROLE_MENTION
        .captures(word)
        .and_then(|caps| parse_snowflake(&caps[1]))
        .or_else(|| {
            if word.chars().all(|c| c.is_ascii_digit()) {
                parse_snowflake(word)
            } else {
                None
            }
        });

    match id {
        Some(id) => RoleRef::Id(RoleId(id)),
        None => RoleRef::Name(word.to_string()),
    }
}

/// Parses a bare user id as `unban` expects it.
pub fn parse_user_id(value: i64) -> CommandResult<UserId> {
    if value <= 0 {
        return Err(CommandError::BadArgument(format!("'{}' is not a user id", value)));
    }
    Ok(UserId(value as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_and_rest() {
        let mut reader = ArgReader::new("  <@123> spamming   the chat  ");
        assert_eq!(reader.next_word().as_deref(), Some("<@123>"));
        assert_eq!(reader.rest().as_deref(), Some("spamming   the chat"));
        assert!(reader.is_empty());
        assert_eq!(reader.next_word(), None);
    }

    #[test]
    fn test_quoted_word() {
        let mut reader = ArgReader::new(r#""Cool Kids" extra"#);
        assert_eq!(reader.next_word().as_deref(), Some("Cool Kids"));
        assert_eq!(reader.next_word().as_deref(), Some("extra"));
    }

    #[test]
    fn test_unterminated_quote_is_plain_word() {
        let mut reader = ArgReader::new(r#""open quote"#);
        assert_eq!(reader.next_word().as_deref(), Some("\"open"));
        assert_eq!(reader.next_word().as_deref(), Some("quote"));
    }

    #[test]
    fn test_required_reports_parameter_name() {
        let mut reader = ArgReader::new("   ");
        assert!(matches!(
            reader.required_member("member"),
            Err(CommandError::MissingArgument("member"))
        ));
        assert!(matches!(
            reader.required_rest("question"),
            Err(CommandError::MissingArgument("question"))
        ));
    }

    #[test]
    fn test_integer_parsing() {
        assert_eq!(parse_integer("20").unwrap(), 20);
        assert_eq!(parse_integer("-3").unwrap(), -3);
        assert!(matches!(parse_integer("abc"), Err(CommandError::BadArgument(_))));
        assert!(matches!(
            parse_integer("99999999999999999999999"),
            Err(CommandError::BadArgument(_))
        ));
    }

    #[test]
    fn test_optional_integer() {
        assert_eq!(ArgReader::new("").optional_integer().unwrap(), None);
        assert_eq!(ArgReader::new("7").optional_integer().unwrap(), Some(7));
        assert!(ArgReader::new("seven").optional_integer().is_err());
    }

    #[test]
    fn test_member_forms() {
        assert_eq!(parse_member("<@42>"), MemberRef::Id(UserId(42)));
        assert_eq!(parse_member("<@!42>"), MemberRef::Id(UserId(42)));
        assert_eq!(parse_member("42"), MemberRef::Id(UserId(42)));
        assert_eq!(parse_member("neko"), MemberRef::Name("neko".into()));
        assert_eq!(parse_member("<@&42>"), MemberRef::Name("<@&42>".into()));
    }

    #[test]
    fn test_role_forms() {
        assert_eq!(parse_role("<@&7>"), RoleRef::Id(RoleId(7)));
        assert_eq!(parse_role("7"), RoleRef::Id(RoleId(7)));
        assert_eq!(parse_role("Moderators"), RoleRef::Name("Moderators".into()));
    }

    #[test]
    fn test_user_id() {
        assert_eq!(parse_user_id(1234).unwrap(), UserId(1234));
        assert!(parse_user_id(0).is_err());
        assert!(parse_user_id(-5).is_err());
    }
}
