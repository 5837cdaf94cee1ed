use itertools::Itertools;
use serenity::{
    framework::standard::{macros::command, Args, CommandResult},
    model::prelude::Message,
    prelude::Context,
};

use crate::command_source::MessageSource;
use crate::db;
use crate::guards::{self, Check};
use crate::guild_cfg;
use crate::util::say_wo_unintended_mentions;

use super::parse_entity_arg;

#[command]
#[sub_commands(add, remove, list)]
#[description = "Boosted-entity command set: XP multipliers for roles or members."]
async fn boost(ctx: &Context, msg: &Message) -> CommandResult {
    msg.reply(
        ctx,
        "Try `boost add <role-or-member> <percent>`, `boost remove <role-or-member>` \
        or `boost list`.",
    )
    .await?;
    Ok(())
}

#[command]
#[description = "Give a role or member a percentage XP bonus. Matching bonuses stack."]
async fn add(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let source = MessageSource(msg);
    if let Err(rej) = guards::enforce(ctx, &source, &[Check::InGuild, Check::Moderator]).await {
        msg.reply(ctx, rej.user_message()).await?;
        return Ok(());
    }
    let guild_id = msg
        .guild_id
        .unwrap_or_else(|| unreachable!("checked by the guard"));

    let (Some(entity_id), Ok(percent)) = (parse_entity_arg(&mut args), args.single::<i64>())
    else {
        msg.reply(ctx, "Usage: `boost add <role-or-member> <percent>`.")
            .await?;
        return Ok(());
    };
    if percent <= 0 {
        msg.reply(ctx, "The bonus must be a positive percentage.")
            .await?;
        return Ok(());
    }

    let pool = super::pool(ctx).await;
    #[allow(clippy::cast_possible_wrap)]
    let entity_id = core::convert::identity::<u64>(entity_id) as i64;
    db::upsert_boosted_entity(&pool, guild_id, entity_id, percent).await?;
    guild_cfg::refresh(ctx, &pool, guild_id).await?;

    msg.reply(ctx, format!("Boost of {percent}% recorded. 🍀"))
        .await?;
    Ok(())
}

#[command]
#[description = "Drop a role's or member's XP bonus."]
async fn remove(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let source = MessageSource(msg);
    if let Err(rej) = guards::enforce(ctx, &source, &[Check::InGuild, Check::Moderator]).await {
        msg.reply(ctx, rej.user_message()).await?;
        return Ok(());
    }
    let guild_id = msg
        .guild_id
        .unwrap_or_else(|| unreachable!("checked by the guard"));

    let Some(entity_id) = parse_entity_arg(&mut args) else {
        msg.reply(ctx, "Usage: `boost remove <role-or-member>`.")
            .await?;
        return Ok(());
    };

    let pool = super::pool(ctx).await;
    #[allow(clippy::cast_possible_wrap)]
    let entity_id = core::convert::identity::<u64>(entity_id) as i64;
    let removed = db::remove_boosted_entity(&pool, guild_id, entity_id).await?;
    if removed == 0 {
        msg.reply(ctx, "No boost was recorded for that entity.")
            .await?;
        return Ok(());
    }
    guild_cfg::refresh(ctx, &pool, guild_id).await?;
    msg.reply(ctx, "Boost removed.").await?;
    Ok(())
}

#[command]
#[description = "List the configured XP boosts."]
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

    if cfg.boosts.is_empty() {
        msg.reply(ctx, "No XP boosts are configured.").await?;
        return Ok(());
    }
    let listing = cfg
        .boosts
        .iter()
        .map(|(entity_id, bonus)| format!("\t`{entity_id}`: +{bonus}%"))
        .join("\n");
    say_wo_unintended_mentions(
        msg.channel_id,
        &ctx,
        Some(msg.author.id),
        format!("Configured XP boosts:\n{listing}"),
    )
    .await?;
    Ok(())
}
