//! The `help` command.

use super::{CommandKind, CommandSpec, COMMANDS};

const SECTIONS: &[(&str, &[CommandKind])] = &[
    (
        "Moderation",
        &[CommandKind::Clear, CommandKind::Kick, CommandKind::Ban, CommandKind::Unban],
    ),
    (
        "Utility",
        &[
            CommandKind::Ping,
            CommandKind::Say,
            CommandKind::Avatar,
            CommandKind::UserInfo,
            CommandKind::ServerInfo,
            CommandKind::Help,
        ],
    ),
    ("Fun", &[CommandKind::EightBall, CommandKind::Coin, CommandKind::Roll]),
    ("Advanced", &[CommandKind::AddRole, CommandKind::RemoveRole]),
];

fn spec_for(kind: CommandKind) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.kind == kind)
}

fn usage_line(prefix: &str, spec: &CommandSpec) -> String {
    let mut line = format!("  {}{}", prefix, spec.name);
    if !spec.usage.is_empty() {
        line.push(' ');
        line.push_str(spec.usage);
    }

    let mut notes = vec![spec.description.to_string()];
    if !spec.aliases.is_empty() {
        let aliases: Vec<String> = spec
            .aliases
            .iter()
            .map(|alias| format!("{}{}", prefix, alias))
            .collect();
        notes.push(format!("aliases: {}", aliases.join(", ")));
    }

    format!("{:<32} - {}", line, notes.join("; "))
}

/// Builds the help listing for the active prefix. `bot_tag` is the bot's
/// `name#discriminator`, shown in the mention hint.
pub fn help_text(prefix: &str, bot_tag: &str) -> String {
    let mut help = String::from("NekoNi2 - commands\n");
    help.push_str(&format!("Prefix: {}\n", prefix));

    for (title, kinds) in SECTIONS {
        help.push_str(&format!("\n{}:\n", title));
        for spec in kinds.iter().filter_map(|kind| spec_for(*kind)) {
            help.push_str(&usage_line(prefix, spec));
            help.push('\n');
        }
    }

    help.push_str(&format!(
        "\nUse @{} as a mention or the prefix to run commands.",
        bot_tag
    ));
    help
}
