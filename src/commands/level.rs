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

use super::parse_member_arg;

#[command]
#[sub_commands(set)]
#[description = "Level command set."]
async fn level(ctx: &Context, msg: &Message) -> CommandResult {
    msg.reply(ctx, "Try `level set <member> <level>`.").await?;
    Ok(())
}

#[command]
#[description = "Set a member's level directly. The XP counter restarts at 0."]
async fn set(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let source = MessageSource(msg);
    if let Err(rej) = guards::enforce(ctx, &source, &[Check::InGuild, Check::Moderator]).await {
        msg.reply(ctx, rej.user_message()).await?;
        return Ok(());
    }
    let guild_id = msg
        .guild_id
        .unwrap_or_else(|| unreachable!("checked by the guard"));

    let (Some(member_id), Ok(target_level)) = (parse_member_arg(&mut args), args.single::<i64>())
    else {
        msg.reply(ctx, "Usage: `level set <member> <level>`.").await?;
        return Ok(());
    };

    let Some(cfg) = guild_cfg::cached(ctx, guild_id).await else {
        msg.reply(ctx, "I'm still warming up; try again in a moment.")
            .await?;
        return Ok(());
    };
    let target_level = target_level.clamp(1, cfg.max_level);

    let pool = super::pool(ctx).await;
    db::set_level(&pool, guild_id, member_id, target_level).await?;

    let member = guild_id.member(ctx, member_id).await?;
    manage_levels(&ctx.http, &cfg, &member, target_level, SyncReason::SetLevel).await;

    msg.reply(
        ctx,
        format!("{} is now level {target_level}.", member.mention()),
    )
    .await?;
    Ok(())
}
