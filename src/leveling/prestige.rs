use std::sync::Arc;

use serenity::{http::Http, model::prelude::Member, prelude::Mentionable};
use sqlx::PgPool;

use crate::db;
use crate::guild_cfg::GuildConfig;
use crate::leveling::roles::{manage_levels, report_to_moderators, SyncReason};
use crate::leveling::threshold::{xp_consumed_by_level, xp_needed_to_level_up};

/// The member's `(level, xp, prestige)` triple after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PrestigeChange {
    pub(crate) level: i64,
    pub(crate) xp: i64,
    pub(crate) prestige: i64,
}

/// Replays the level-up formula against an XP pool: starting at level 1,
/// thresholds are subtracted level-by-level until the pool would go
/// negative or the simulated level hits the cap. Returns the recovered
/// `(level, xp)` pair.
pub(crate) fn redistribute_overflow(xp_pool: i64, max_level: i64) -> (i64, i64) {
    let mut xp = xp_pool;
    let mut level = 1;
    while level < max_level && xp - xp_needed_to_level_up(level) >= 0 {
        xp -= xp_needed_to_level_up(level);
        level += 1;
    }
    (level, xp)
}

/// Inverse of [`redistribute_overflow`]: folds the thresholds consumed by
/// climbing to `level` back into the xp figure.
pub(crate) fn reaccumulate(level: i64, xp: i64) -> i64 {
    xp_consumed_by_level(level) + xp
}

/// Reaccumulation across every tier the member holds: the first tier uses
/// the member's current level, every further tier a full cap-worth of
/// levels.
pub(crate) fn purge_total(level: i64, xp: i64, prestige: i64, max_level: i64) -> i64 {
    let mut total = xp;
    for tier in 0..prestige {
        let top = if tier == 0 { level } else { max_level };
        total += xp_consumed_by_level(top);
    }
    total
}

/// Moves the member one prestige tier up. Eligibility (level at cap,
/// prestige below the tier-table ceiling) is the caller's responsibility.
pub(crate) async fn added_prestige(
    http: &Arc<Http>,
    pool: &PgPool,
    cfg: &GuildConfig,
    member: &Member,
) -> crate::error::Result<PrestigeChange> {
    let guild_id = member.guild_id;
    let progress = db::user_progress(pool, guild_id, member.user.id).await?;
    let (level, xp) = redistribute_overflow(progress.xp, cfg.max_level);
    let prestige = progress.prestige + 1;
    db::set_progress(pool, guild_id, member.user.id, level, xp, prestige).await?;

    if let Some(&role_id) = usize::try_from(prestige)
        .ok()
        .and_then(|tier| cfg.prestige_roles.get(tier - 1))
    {
        if let Err(e) = http
            .add_member_role(guild_id.0, member.user.id.0, role_id.0, None)
            .await
        {
            report_to_moderators(
                http,
                cfg,
                &format!(
                    "Failed to grant the prestige {prestige} role {} to {}: {e}",
                    role_id.mention(),
                    member.user.tag()
                ),
            )
            .await;
        }
    }

    manage_levels(http, cfg, member, level, SyncReason::SetLevel).await;
    Ok(PrestigeChange {
        level,
        xp,
        prestige,
    })
}

/// Moves the member one prestige tier down, folding the current tier's
/// climb back into the xp ledger.
pub(crate) async fn removed_prestige(
    http: &Arc<Http>,
    pool: &PgPool,
    cfg: &GuildConfig,
    member: &Member,
) -> crate::error::Result<PrestigeChange> {
    let guild_id = member.guild_id;
    let progress = db::user_progress(pool, guild_id, member.user.id).await?;
    let xp = reaccumulate(progress.level, progress.xp);
    let level = cfg.max_level;
    let prestige = i64::max(progress.prestige - 1, 0);
    db::set_progress(pool, guild_id, member.user.id, level, xp, prestige).await?;

    revoke_tier_roles(http, cfg, member, (prestige + 1)..=progress.prestige).await;
    manage_levels(http, cfg, member, level, SyncReason::SetLevel).await;
    Ok(PrestigeChange {
        level,
        xp,
        prestige,
    })
}

/// Collapses every prestige tier back into a single xp figure and zeroes
/// the member's prestige.
pub(crate) async fn purged_prestiges(
    http: &Arc<Http>,
    pool: &PgPool,
    cfg: &GuildConfig,
    member: &Member,
) -> crate::error::Result<PrestigeChange> {
    let guild_id = member.guild_id;
    let progress = db::user_progress(pool, guild_id, member.user.id).await?;
    let xp = purge_total(progress.level, progress.xp, progress.prestige, cfg.max_level);
    let level = cfg.max_level;
    db::set_progress(pool, guild_id, member.user.id, level, xp, 0).await?;

    revoke_tier_roles(http, cfg, member, 1..=progress.prestige).await;
    manage_levels(http, cfg, member, level, SyncReason::SetLevel).await;
    Ok(PrestigeChange {
        level,
        xp,
        prestige: 0,
    })
}

/// Removes the reward roles of the given tiers, for whichever of them the
/// member actually holds.
async fn revoke_tier_roles(
    http: &Arc<Http>,
    cfg: &GuildConfig,
    member: &Member,
    tiers: core::ops::RangeInclusive<i64>,
) {
    for (idx, &role_id) in cfg.prestige_roles.iter().enumerate() {
        #[allow(clippy::cast_possible_wrap)]
        let tier = core::convert::identity::<usize>(idx) as i64 + 1;
        if !tiers.contains(&tier) {
            continue;
        }
        if !member.roles.contains(&role_id) {
            continue;
        }
        if let Err(e) = http
            .remove_member_role(member.guild_id.0, member.user.id.0, role_id.0, None)
            .await
        {
            report_to_moderators(
                http,
                cfg,
                &format!(
                    "Failed to revoke the prestige {tier} role {} from {}: {e}",
                    role_id.mention(),
                    member.user.tag()
                ),
            )
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_LEVEL: i64 = 100;

    #[test]
    fn tiny_pool_recovers_level_one() {
        assert_eq!(redistribute_overflow(0, MAX_LEVEL), (1, 0));
        assert_eq!(redistribute_overflow(164, MAX_LEVEL), (1, 164));
    }

    #[test]
    fn pool_exactly_one_threshold_recovers_level_two() {
        assert_eq!(redistribute_overflow(165, MAX_LEVEL), (2, 0));
        assert_eq!(redistribute_overflow(170, MAX_LEVEL), (2, 5));
    }

    #[test]
    fn redistribution_is_capped_by_max_level() {
        let (level, xp) = redistribute_overflow(i64::MAX / 2, 10);
        assert_eq!(level, 10);
        assert!(xp > 0);
    }

    #[test]
    fn add_then_remove_restores_the_exact_pair() {
        // Spread of pools, including cap-bound ones against a small cap.
        for pool in [0, 1, 164, 165, 12_345, 999_999] {
            for max_level in [5, 100] {
                let (level, xp) = redistribute_overflow(pool, max_level);
                assert_eq!(
                    reaccumulate(level, xp),
                    pool,
                    "round trip broke for pool {pool}, cap {max_level}"
                );
            }
        }
    }

    #[test]
    fn purge_of_zero_prestige_keeps_xp() {
        assert_eq!(purge_total(7, 42, 0, MAX_LEVEL), 42);
    }

    #[test]
    fn purge_folds_every_tier() {
        let level = 7;
        let xp = 42;
        let expected = xp + xp_consumed_by_level(level) + 2 * xp_consumed_by_level(MAX_LEVEL);
        assert_eq!(purge_total(level, xp, 3, MAX_LEVEL), expected);
    }
}
