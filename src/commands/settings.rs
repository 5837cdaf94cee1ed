use serenity::{
    framework::standard::{macros::command, Args, CommandResult},
    model::prelude::Message,
    prelude::{Context, Mentionable},
};

use crate::command_source::MessageSource;
use crate::db;
use crate::guards::{self, Check};
use crate::guild_cfg;

use super::parse_channel_arg;

#[command]
#[sub_commands(maxlevel, xpchannel, modchannel)]
#[description = "Guild settings command set."]
async fn set(ctx: &Context, msg: &Message) -> CommandResult {
    msg.reply(
        ctx,
        "Try `set maxlevel <n>`, `set xpchannel <channel>` or `set modchannel <channel>`.",
    )
    .await?;
    Ok(())
}

#[command]
#[description = "Cap the level a member can reach; prestige opens at the cap."]
async fn maxlevel(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let source = MessageSource(msg);
    if let Err(rej) = guards::enforce(ctx, &source, &[Check::InGuild, Check::Moderator]).await {
        msg.reply(ctx, rej.user_message()).await?;
        return Ok(());
    }
    let guild_id = msg
        .guild_id
        .unwrap_or_else(|| unreachable!("checked by the guard"));

    let Ok(max_level) = args.single::<i64>() else {
        msg.reply(ctx, "Usage: `set maxlevel <n>`.").await?;
        return Ok(());
    };
    if max_level < 1 {
        msg.reply(ctx, "The level cap must be at least 1.").await?;
        return Ok(());
    }

    let pool = super::pool(ctx).await;
    db::set_max_level(&pool, guild_id, max_level).await?;
    guild_cfg::refresh(ctx, &pool, guild_id).await?;
    msg.reply(ctx, format!("The level cap is now {max_level}."))
        .await?;
    Ok(())
}

#[command]
#[description = "Pick the channel for level-up and role notifications."]
async fn xpchannel(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let source = MessageSource(msg);
    if let Err(rej) = guards::enforce(ctx, &source, &[Check::InGuild, Check::Moderator]).await {
        msg.reply(ctx, rej.user_message()).await?;
        return Ok(());
    }
    let guild_id = msg
        .guild_id
        .unwrap_or_else(|| unreachable!("checked by the guard"));

    let Some(channel_id) = parse_channel_arg(&mut args) else {
        msg.reply(ctx, "Usage: `set xpchannel <channel>`.").await?;
        return Ok(());
    };

    let pool = super::pool(ctx).await;
    #[allow(clippy::cast_possible_wrap)]
    let raw_id = core::convert::identity::<u64>(channel_id.0) as i64;
    db::set_xp_channel(&pool, guild_id, raw_id).await?;
    guild_cfg::refresh(ctx, &pool, guild_id).await?;
    msg.reply(
        ctx,
        format!("Progression news will land in {}.", channel_id.mention()),
    )
    .await?;
    Ok(())
}

#[command]
#[description = "Pick the channel where failures are escalated to moderators."]
async fn modchannel(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let source = MessageSource(msg);
    if let Err(rej) = guards::enforce(ctx, &source, &[Check::InGuild, Check::Moderator]).await {
        msg.reply(ctx, rej.user_message()).await?;
        return Ok(());
    }
    let guild_id = msg
        .guild_id
        .unwrap_or_else(|| unreachable!("checked by the guard"));

    let Some(channel_id) = parse_channel_arg(&mut args) else {
        msg.reply(ctx, "Usage: `set modchannel <channel>`.").await?;
        return Ok(());
    };

    let pool = super::pool(ctx).await;
    #[allow(clippy::cast_possible_wrap)]
    let raw_id = core::convert::identity::<u64>(channel_id.0) as i64;
    db::set_mod_channel(&pool, guild_id, raw_id).await?;
    guild_cfg::refresh(ctx, &pool, guild_id).await?;
    msg.reply(
        ctx,
        format!("Escalations will land in {}.", channel_id.mention()),
    )
    .await?;
    Ok(())
}
