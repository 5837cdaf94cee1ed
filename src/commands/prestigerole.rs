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
use crate::util::say_wo_unintended_mentions;

use super::parse_role_arg;

#[command]
#[sub_commands(push, pop, list)]
#[description = "Prestige-reward command set. Tiers grow at the end and shrink from the end."]
async fn prestigerole(ctx: &Context, msg: &Message) -> CommandResult {
    msg.reply(
        ctx,
        "Try `prestigerole push <role>`, `prestigerole pop` or `prestigerole list`.",
    )
    .await?;
    Ok(())
}

#[command]
#[description = "Append the next prestige tier's reward role."]
async fn push(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let source = MessageSource(msg);
    if let Err(rej) = guards::enforce(ctx, &source, &[Check::InGuild, Check::Moderator]).await {
        msg.reply(ctx, rej.user_message()).await?;
        return Ok(());
    }
    let guild_id = msg
        .guild_id
        .unwrap_or_else(|| unreachable!("checked by the guard"));

    let Some(role_id) = parse_role_arg(&mut args) else {
        msg.reply(ctx, "Usage: `prestigerole push <role>`.").await?;
        return Ok(());
    };

    let pool = super::pool(ctx).await;
    let tier = db::push_prestige_role(&pool, guild_id, role_id).await?;
    guild_cfg::refresh(ctx, &pool, guild_id).await?;
    msg.reply(
        ctx,
        format!("Prestige tier {tier} now rewards {}.", role_id.mention()),
    )
    .await?;
    Ok(())
}

#[command]
#[description = "Remove the highest prestige tier."]
async fn pop(ctx: &Context, msg: &Message) -> CommandResult {
    let source = MessageSource(msg);
    if let Err(rej) = guards::enforce(ctx, &source, &[Check::InGuild, Check::Moderator]).await {
        msg.reply(ctx, rej.user_message()).await?;
        return Ok(());
    }
    let guild_id = msg
        .guild_id
        .unwrap_or_else(|| unreachable!("checked by the guard"));

    let pool = super::pool(ctx).await;
    let Some(_role_id) = db::pop_prestige_role(&pool, guild_id).await? else {
        msg.reply(ctx, "There is no prestige tier to remove.").await?;
        return Ok(());
    };
    guild_cfg::refresh(ctx, &pool, guild_id).await?;
    msg.reply(ctx, "The highest prestige tier is gone.").await?;
    Ok(())
}

#[command]
#[description = "List the prestige tiers and their reward roles."]
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

    if cfg.prestige_roles.is_empty() {
        msg.reply(ctx, "No prestige tiers are configured.").await?;
        return Ok(());
    }
    let listing = cfg
        .prestige_roles
        .iter()
        .enumerate()
        .map(|(idx, role_id)| format!("\ttier {}: {}", idx + 1, role_id.mention()))
        .join("\n");
    say_wo_unintended_mentions(
        msg.channel_id,
        &ctx,
        Some(msg.author.id),
        format!("Prestige tiers:\n{listing}"),
    )
    .await?;
    Ok(())
}
