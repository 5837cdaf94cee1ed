use serenity::{
    framework::standard::{macros::command, Args, CommandResult},
    model::prelude::{Message, ReactionType},
    prelude::{Context, Mentionable},
};

use crate::app_state::type_map_keys::AppStateKey;
use crate::app_state::PendingPrestige;
use crate::command_source::{CommandSource, MessageSource};
use crate::db::{self, dao};
use crate::guards::{self, Check, Rejection};
use crate::guild_cfg::{self, GuildConfig};
use crate::immut_data::consts::{PRESTIGE_ACCEPT, PRESTIGE_REJECT};
use crate::leveling::prestige::{purged_prestiges, removed_prestige};

use super::parse_member_arg;

/// Whether the member may open a prestige pass-through right now.
pub(crate) fn eligibility(progress: &dao::UserProgress, cfg: &GuildConfig) -> Result<(), Rejection> {
    if progress.level != cfg.max_level {
        return Err(Rejection::NotAtMaxLevel {
            level: progress.level,
            max_level: cfg.max_level,
        });
    }
    if progress.prestige >= cfg.prestige_ceiling() {
        return Err(Rejection::PrestigeCeiling {
            ceiling: cfg.prestige_ceiling(),
        });
    }
    Ok(())
}

#[command]
#[sub_commands(remove, purge)]
#[description = "Request a prestige pass-through once you sit at the maximum level."]
async fn prestige(ctx: &Context, msg: &Message) -> CommandResult {
    request_prestige(ctx, &MessageSource(msg)).await
}

/// Shared core for the prefix and slash entry points: validates
/// eligibility, then opens the reaction-confirmed pending request.
pub(crate) async fn request_prestige(ctx: &Context, source: &dyn CommandSource) -> CommandResult {
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
    if let Err(rej) = eligibility(&progress, &cfg) {
        source.reply(ctx, &rej.user_message()).await?;
        return Ok(());
    }
    {
        let rlock = ctx.data.read().await;
        let app_state = rlock
            .get::<AppStateKey>()
            .expect("Failed to get the app state from the typemap");
        if app_state.has_pending_prestige(guild_id, source.author_id()) {
            drop(rlock);
            source
                .reply(ctx, &Rejection::AlreadyPending.user_message())
                .await?;
            return Ok(());
        }
    }

    let next_tier = progress.prestige + 1;
    let confirm_text = format!(
        "{} You are about to enter prestige tier {next_tier}: your level restarts \
        from the redistributed overflow XP and the tier role is yours to keep.\n\
        React {PRESTIGE_ACCEPT} to confirm or {PRESTIGE_REJECT} to cancel.",
        source.author_id().mention()
    );
    let confirm_msg = source.channel_id().say(&ctx.http, &confirm_text).await?;
    confirm_msg
        .react(&ctx.http, ReactionType::Unicode(PRESTIGE_ACCEPT.to_owned()))
        .await?;
    confirm_msg
        .react(&ctx.http, ReactionType::Unicode(PRESTIGE_REJECT.to_owned()))
        .await?;

    let opened = {
        let mut wlock = ctx.data.write().await;
        let app_state = wlock
            .get_mut::<AppStateKey>()
            .expect("Failed to get the app state from the typemap");
        app_state.begin_prestige(PendingPrestige {
            guild_id,
            user_id: source.author_id(),
            message_id: confirm_msg.id,
        })
    };
    if !opened {
        // Lost a race against a concurrent request of the same member.
        confirm_msg.delete(&ctx.http).await?;
        source
            .reply(ctx, &Rejection::AlreadyPending.user_message())
            .await?;
        return Ok(());
    }
    source
        .reply(ctx, "A confirmation is waiting just below; react to decide. 🍀")
        .await?;
    Ok(())
}

#[command]
#[description = "Take one prestige tier away from a member, folding it back into XP."]
async fn remove(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let source = MessageSource(msg);
    if let Err(rej) = guards::enforce(ctx, &source, &[Check::InGuild, Check::Moderator]).await {
        msg.reply(ctx, rej.user_message()).await?;
        return Ok(());
    }
    let guild_id = msg
        .guild_id
        .unwrap_or_else(|| unreachable!("checked by the guard"));
    let Some(member_id) = parse_member_arg(&mut args) else {
        msg.reply(ctx, "Usage: `prestige remove <member>`.").await?;
        return Ok(());
    };
    let Some(cfg) = guild_cfg::cached(ctx, guild_id).await else {
        msg.reply(ctx, "I'm still warming up; try again in a moment.")
            .await?;
        return Ok(());
    };
    let pool = super::pool(ctx).await;
    let progress = db::user_progress(&pool, guild_id, member_id).await?;
    if progress.prestige == 0 {
        msg.reply(ctx, "That member holds no prestige tier.").await?;
        return Ok(());
    }
    let member = guild_id.member(ctx, member_id).await?;
    let change = removed_prestige(&ctx.http, &pool, &cfg, &member).await?;
    msg.reply(
        ctx,
        format!(
            "{} is back to prestige {} with {} XP banked at level {}.",
            member.mention(),
            change.prestige,
            change.xp,
            change.level
        ),
    )
    .await?;
    Ok(())
}

#[command]
#[description = "Strip every prestige tier from a member, folding them all back into XP."]
async fn purge(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let source = MessageSource(msg);
    if let Err(rej) = guards::enforce(ctx, &source, &[Check::InGuild, Check::Moderator]).await {
        msg.reply(ctx, rej.user_message()).await?;
        return Ok(());
    }
    let guild_id = msg
        .guild_id
        .unwrap_or_else(|| unreachable!("checked by the guard"));
    let Some(member_id) = parse_member_arg(&mut args) else {
        msg.reply(ctx, "Usage: `prestige purge <member>`.").await?;
        return Ok(());
    };
    let Some(cfg) = guild_cfg::cached(ctx, guild_id).await else {
        msg.reply(ctx, "I'm still warming up; try again in a moment.")
            .await?;
        return Ok(());
    };
    let pool = super::pool(ctx).await;
    let progress = db::user_progress(&pool, guild_id, member_id).await?;
    if progress.prestige == 0 {
        msg.reply(ctx, "That member holds no prestige tier.").await?;
        return Ok(());
    }
    let member = guild_id.member(ctx, member_id).await?;
    let change = purged_prestiges(&ctx.http, &pool, &cfg, &member).await?;
    msg.reply(
        ctx,
        format!(
            "All prestige tiers of {} were folded back: {} XP banked at level {}.",
            member.mention(),
            change.xp,
            change.level
        ),
    )
    .await?;
    Ok(())
}
