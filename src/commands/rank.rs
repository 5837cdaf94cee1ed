use serenity::{
    builder::CreateEmbed,
    framework::standard::{macros::command, CommandResult},
    model::prelude::Message,
    prelude::Context,
};

use crate::command_source::{CommandSource, MessageSource};
use crate::db;
use crate::guards::{self, Check};
use crate::guild_cfg;
use crate::leveling::threshold::xp_needed_to_level_up;

#[command]
#[description = "Show your progression card: level, XP and prestige."]
async fn rank(ctx: &Context, msg: &Message) -> CommandResult {
    rank_card(ctx, &MessageSource(msg)).await
}

/// Shared core for the prefix and slash entry points.
pub(crate) async fn rank_card(ctx: &Context, source: &dyn CommandSource) -> CommandResult {
    if let Err(rej) = guards::enforce(ctx, source, &[Check::InGuild]).await {
        source.reply(ctx, &rej.user_message()).await?;
        return Ok(());
    }
    let guild_id = source
        .guild_id()
        .unwrap_or_else(|| unreachable!("checked by the guard"));
    let Some(cfg) = guild_cfg::cached(ctx, guild_id).await else {
        source
            .reply(ctx, "I'm still warming up; try again in a moment.")
            .await?;
        return Ok(());
    };
    let pool = super::pool(ctx).await;
    let progress = db::user_progress(&pool, guild_id, source.author_id()).await?;

    let mut embed = CreateEmbed::default();
    embed
        .title("Progression 🍀")
        .field(
            "Level",
            format!("{} / {}", progress.level, cfg.max_level),
            true,
        )
        .field(
            "XP",
            format!(
                "{} / {}",
                progress.xp,
                xp_needed_to_level_up(progress.level)
            ),
            true,
        )
        .field(
            "Prestige",
            format!("{} / {}", progress.prestige, cfg.prestige_ceiling()),
            true,
        );
    source.reply_embed(ctx, embed).await?;
    Ok(())
}
