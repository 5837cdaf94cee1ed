use std::collections::HashMap;

use itertools::Itertools;
use serenity::{
    framework::standard::{macros::command, Args, CommandResult},
    model::prelude::Message,
    prelude::{Context, Mentionable},
};

use crate::command_source::MessageSource;
use crate::db;
use crate::guards::{self, Check};
use crate::guild_cfg;
use crate::leveling::roles::{manage_levels, SyncReason};
use crate::util::{self, say_wo_unintended_mentions};

use super::parse_role_arg;

#[command]
#[sub_commands(add, remove, list)]
#[description = "Level-reward command set: roles granted at level thresholds."]
async fn levelrole(ctx: &Context, msg: &Message) -> CommandResult {
    msg.reply(
        ctx,
        "Try `levelrole add <min-level> <role>`, `levelrole remove <min-level>` \
        or `levelrole list`.",
    )
    .await?;
    Ok(())
}

#[command]
#[description = "Map a level threshold to a reward role and resync everyone."]
async fn add(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let source = MessageSource(msg);
    if let Err(rej) = guards::enforce(ctx, &source, &[Check::InGuild, Check::Moderator]).await {
        msg.reply(ctx, rej.user_message()).await?;
        return Ok(());
    }
    let guild_id = msg
        .guild_id
        .unwrap_or_else(|| unreachable!("checked by the guard"));

    let (Ok(min_level), Some(role_id)) = (args.single::<i64>(), parse_role_arg(&mut args)) else {
        msg.reply(ctx, "Usage: `levelrole add <min-level> <role>`.")
            .await?;
        return Ok(());
    };
    if min_level < 1 {
        msg.reply(ctx, "The threshold must be at least level 1.")
            .await?;
        return Ok(());
    }

    let pool = super::pool(ctx).await;
    db::upsert_level_role(&pool, guild_id, min_level, role_id).await?;
    guild_cfg::refresh(ctx, &pool, guild_id).await?;
    let Some(cfg) = guild_cfg::cached(ctx, guild_id).await else {
        unreachable!("the refresh above populated the store");
    };

    // The new mapping may promote or demote anyone; sweep the roster.
    let members = util::members(&ctx.http, guild_id).await?;
    let levels: HashMap<i64, i64> = db::server_members(&pool, guild_id)
        .await?
        .into_iter()
        .map(|sm| (sm.discord_id, sm.level))
        .collect();
    let mut resynced = 0usize;
    for member in &members {
        if member.user.bot {
            continue;
        }
        #[allow(clippy::cast_possible_wrap)]
        let discord_id = core::convert::identity::<u64>(member.user.id.0) as i64;
        let Some(level) = levels.get(&discord_id) else {
            continue;
        };
        manage_levels(&ctx.http, &cfg, member, *level, SyncReason::NewRoleMapping).await;
        resynced += 1;
    }

    msg.reply(
        ctx,
        format!(
            "Level {min_level} now rewards {}; {resynced} members were resynced.",
            role_id.mention()
        ),
    )
    .await?;
    Ok(())
}

#[command]
#[description = "Drop the reward mapping at a level threshold."]
async fn remove(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let source = MessageSource(msg);
    if let Err(rej) = guards::enforce(ctx, &source, &[Check::InGuild, Check::Moderator]).await {
        msg.reply(ctx, rej.user_message()).await?;
        return Ok(());
    }
    let guild_id = msg
        .guild_id
        .unwrap_or_else(|| unreachable!("checked by the guard"));

    let Ok(min_level) = args.single::<i64>() else {
        msg.reply(ctx, "Usage: `levelrole remove <min-level>`.")
            .await?;
        return Ok(());
    };

    let pool = super::pool(ctx).await;
    let removed = db::remove_level_role(&pool, guild_id, min_level).await?;
    if removed == 0 {
        msg.reply(ctx, format!("No reward is mapped to level {min_level}."))
            .await?;
        return Ok(());
    }
    guild_cfg::refresh(ctx, &pool, guild_id).await?;
    msg.reply(ctx, format!("The level {min_level} reward is gone."))
        .await?;
    Ok(())
}

#[command]
#[description = "List the level-reward table."]
async fn list(ctx: &Context, msg: &Message) -> CommandResult {
    let source = MessageSource(msg);
    if let Err(rej) = guards::enforce(ctx, &source, &[Check::InGuild]).await {
        msg.reply(ctx, rej.user_message()).await?;
        return Ok(());
    }
    let guild_id = msg
        .guild_id
        .unwrap_or_else(|| unreachable!("checked by the guard"));
    let Some(cfg) = guild_cfg::cached(ctx, guild_id).await else {
        msg.reply(ctx, "I'm still warming up; try again in a moment.")
            .await?;
        return Ok(());
    };

    if cfg.sorted_level_roles.is_empty() {
        msg.reply(ctx, "No level rewards are configured.").await?;
        return Ok(());
    }
    let listing = cfg
        .sorted_level_roles
        .iter()
        .map(|entry| format!("\tlevel {}: {}", entry.min_level, entry.role_id.mention()))
        .join("\n");
    say_wo_unintended_mentions(
        msg.channel_id,
        &ctx,
        Some(msg.author.id),
        format!("Level rewards:\n{listing}"),
    )
    .await?;
    Ok(())
}
