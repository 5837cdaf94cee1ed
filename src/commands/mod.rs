use std::collections::HashSet;

use serenity::{
    framework::standard::{
        help_commands,
        macros::{group, help, hook},
        Args, CommandGroup, CommandResult, HelpOptions,
    },
    model::prelude::{ChannelId, Message, RoleId, UserId},
    prelude::Context,
};

use sqlx::PgPool;

use crate::app_state::type_map_keys::PgPoolKey;
use crate::immut_data::dynamic::owners;

pub(crate) mod boost;
pub(crate) mod level;
pub(crate) mod levelrole;
pub(crate) mod ping;
pub(crate) mod prestige;
pub(crate) mod prestigerole;
pub(crate) mod rank;
pub(crate) mod settings;
pub(crate) mod sql;
pub(crate) mod stop;

use self::boost::BOOST_COMMAND;
use self::level::LEVEL_COMMAND;
use self::levelrole::LEVELROLE_COMMAND;
use self::ping::PING_COMMAND;
use self::prestige::PRESTIGE_COMMAND;
use self::prestigerole::PRESTIGEROLE_COMMAND;
use self::rank::RANK_COMMAND;
use self::settings::SET_COMMAND;
use self::sql::SQL_COMMAND;
use self::stop::STOP_COMMAND;

#[group]
#[commands(ping, rank, prestige)]
struct General;

#[group]
#[commands(level, boost, levelrole, prestigerole, set, sql, stop)]
struct Moderation;

#[help]
#[individual_command_tip = "Hello, I'm Clover! 🍀\n\n\
Pass a command as an argument for more information about it."]
#[command_not_found_text = "Could not find: `{}`."]
#[max_levenshtein_distance(3)]
#[indention_prefix = "+"]
#[lacking_permissions = "Hide"]
#[lacking_role = "Hide"]
#[wrong_channel = "Strike"]
async fn my_help(
    context: &Context,
    msg: &Message,
    args: Args,
    help_options: &'static HelpOptions,
    groups: &[&'static CommandGroup],
    owners: HashSet<UserId>,
) -> CommandResult {
    let _ = help_commands::with_embeds(context, msg, args, help_options, groups, owners).await;
    Ok(())
}

/// Top-level error reporter: log, tell the owner, apologize to the user.
#[hook]
pub(crate) async fn after(
    ctx: &Context,
    msg: &Message,
    command_name: &str,
    command_result: CommandResult,
) {
    let Err(why) = command_result else {
        return;
    };
    eprintln!("Command '{command_name}' errored: {why:?}");

    if let Some(owner) = owners().into_iter().next() {
        let report = format!(
            "Command `{command_name}` from {} errored:\n```\n{why:?}\n```",
            msg.author.tag()
        );
        let dm = async {
            let chan = owner.create_dm_channel(&ctx.http).await?;
            chan.say(&ctx.http, &report).await
        };
        if let Err(e) = dm.await {
            eprintln!("Failed to DM the owner about the error: {e}");
        }
    }

    if let Err(e) = msg
        .reply(
            &ctx.http,
            "Something went wrong on my side; the owner has been told. Sorry! 🍀",
        )
        .await
    {
        eprintln!("Failed to apologize for the failed command: {e}");
    }
}

pub(crate) async fn pool(ctx: &Context) -> PgPool {
    let rlock = ctx.data.read().await;
    rlock
        .get::<PgPoolKey>()
        .expect("Failed to get the database pool from the typemap")
        .clone()
}

fn snowflake_from_token(token: &str, prefixes: &[&str]) -> Option<u64> {
    let mut raw = token.trim();
    for prefix in prefixes {
        raw = raw.trim_start_matches(prefix);
    }
    raw.trim_end_matches('>').parse().ok()
}

/// A member argument: `<@id>`, `<@!id>` or a raw id.
pub(crate) fn parse_member_arg(args: &mut Args) -> Option<UserId> {
    let token = args.single::<String>().ok()?;
    snowflake_from_token(&token, &["<@!", "<@"]).map(UserId)
}

/// A role argument: `<@&id>` or a raw id.
pub(crate) fn parse_role_arg(args: &mut Args) -> Option<RoleId> {
    let token = args.single::<String>().ok()?;
    snowflake_from_token(&token, &["<@&"]).map(RoleId)
}

/// A channel argument: `<#id>` or a raw id.
pub(crate) fn parse_channel_arg(args: &mut Args) -> Option<ChannelId> {
    let token = args.single::<String>().ok()?;
    snowflake_from_token(&token, &["<#"]).map(ChannelId)
}

/// A boosted-entity argument: a role mention, a member mention or a raw id.
pub(crate) fn parse_entity_arg(args: &mut Args) -> Option<u64> {
    let token = args.single::<String>().ok()?;
    snowflake_from_token(&token, &["<@&", "<@!", "<@"])
}

#[cfg(test)]
mod tests {
    use serenity::framework::standard::Delimiter;

    use super::*;

    fn args(input: &str) -> Args {
        Args::new(input, &[Delimiter::Single(' ')])
    }

    #[test]
    fn member_arg_accepts_mentions_and_ids() {
        assert_eq!(parse_member_arg(&mut args("<@123>")), Some(UserId(123)));
        assert_eq!(parse_member_arg(&mut args("<@!123>")), Some(UserId(123)));
        assert_eq!(parse_member_arg(&mut args("123")), Some(UserId(123)));
        assert_eq!(parse_member_arg(&mut args("someone")), None);
    }

    #[test]
    fn role_and_channel_args_strip_their_sigils() {
        assert_eq!(parse_role_arg(&mut args("<@&55>")), Some(RoleId(55)));
        assert_eq!(parse_channel_arg(&mut args("<#77>")), Some(ChannelId(77)));
    }

    #[test]
    fn entity_arg_takes_either_kind_of_mention() {
        assert_eq!(parse_entity_arg(&mut args("<@&55>")), Some(55));
        assert_eq!(parse_entity_arg(&mut args("<@99>")), Some(99));
        assert_eq!(parse_entity_arg(&mut args("42")), Some(42));
    }
}
