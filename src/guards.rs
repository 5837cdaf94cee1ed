use serenity::prelude::Context;

use crate::command_source::CommandSource;

/// Preconditions a handler can require, evaluated in the order given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Check {
    InGuild,
    Moderator,
}

/// Why a command was not dispatched. Every variant carries a user-facing
/// explanation; handlers reply with it instead of raising.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Rejection {
    GuildOnly,
    NotModerator,
    Unverifiable,
    NotAtMaxLevel { level: i64, max_level: i64 },
    PrestigeCeiling { ceiling: i64 },
    AlreadyPending,
}

impl Rejection {
    pub(crate) fn user_message(&self) -> String {
        match self {
            Self::GuildOnly => "This command only works inside a server.".to_owned(),
            Self::NotModerator => {
                "You need the Manage Server permission to use this command.".to_owned()
            }
            Self::Unverifiable => {
                "I could not verify your permissions; please try again.".to_owned()
            }
            Self::NotAtMaxLevel { level, max_level } => format!(
                "A prestige pass-through needs level {max_level}; you are at level {level}."
            ),
            Self::PrestigeCeiling { ceiling } => format!(
                "You already hold the highest configured prestige tier ({ceiling})."
            ),
            Self::AlreadyPending => {
                "You already have a prestige request waiting for confirmation.".to_owned()
            }
        }
    }
}

/// Runs the checks in order and reports the first failure.
pub(crate) async fn enforce(
    ctx: &Context,
    source: &dyn CommandSource,
    checks: &[Check],
) -> Result<(), Rejection> {
    for check in checks {
        match check {
            Check::InGuild => {
                if source.guild_id().is_none() {
                    return Err(Rejection::GuildOnly);
                }
            }
            Check::Moderator => {
                let guild_id = source.guild_id().ok_or(Rejection::GuildOnly)?;
                let member = guild_id
                    .member(ctx, source.author_id())
                    .await
                    .map_err(|_| Rejection::Unverifiable)?;
                let permissions = member
                    .permissions(ctx)
                    .map_err(|_| Rejection::Unverifiable)?;
                if !permissions.manage_guild() {
                    return Err(Rejection::NotModerator);
                }
            }
        }
    }
    Ok(())
}
