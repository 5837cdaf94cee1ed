use std::sync::Arc;

use serenity::{
    http::Http,
    model::prelude::{Member, RoleId},
    prelude::Mentionable,
};

use crate::guild_cfg::{GuildConfig, LevelRole};

/// Why a role synchronization is running; picks the notification wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SyncReason {
    /// The member crossed a threshold organically.
    NewLevel,
    /// A moderator (or a prestige transition) set the level directly.
    SetLevel,
    /// The level-to-role table itself changed.
    NewRoleMapping,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RolePlan {
    NoChange,
    Assign { remove: Vec<RoleId>, add: RoleId },
}

/// Picks the most senior reward role the level qualifies for and plans the
/// swap. Thresholds are tested highest-first; exactly one table role is
/// held afterwards, never a cumulative set.
pub(crate) fn plan_role_sync(
    held: &[RoleId],
    sorted_level_roles: &[LevelRole],
    level: i64,
) -> RolePlan {
    for entry in sorted_level_roles.iter().rev() {
        if entry.min_level > level {
            continue;
        }
        if held.contains(&entry.role_id) {
            return RolePlan::NoChange;
        }
        let remove: Vec<RoleId> = sorted_level_roles
            .iter()
            .map(|e| e.role_id)
            .filter(|role_id| *role_id != entry.role_id && held.contains(role_id))
            .collect();
        return RolePlan::Assign {
            remove,
            add: entry.role_id,
        };
    }
    RolePlan::NoChange
}

/// Makes the member's reward role match `level`, then notifies the XP
/// channel. Permission failures are apologized for and escalated to the
/// moderator channel; this never propagates an error to the caller.
pub(crate) async fn manage_levels(
    http: &Arc<Http>,
    cfg: &GuildConfig,
    member: &Member,
    level: i64,
    reason: SyncReason,
) {
    let plan = plan_role_sync(&member.roles, &cfg.sorted_level_roles, level);
    let RolePlan::Assign { remove, add } = plan else {
        return;
    };

    let guild_id = member.guild_id;
    for role_id in remove {
        if let Err(e) = http
            .remove_member_role(guild_id.0, member.user.id.0, role_id.0, None)
            .await
        {
            escalate_role_failure(http, cfg, member, role_id, "remove", &e).await;
            return;
        }
    }
    if let Err(e) = http
        .add_member_role(guild_id.0, member.user.id.0, add.0, None)
        .await
    {
        escalate_role_failure(http, cfg, member, add, "add", &e).await;
        return;
    }

    let Some(chan) = cfg.xp_channel else {
        return;
    };
    let text = match reason {
        SyncReason::NewLevel => format!(
            "🍀 {} earned the {} role by reaching level {level}!",
            member.mention(),
            add.mention()
        ),
        SyncReason::SetLevel => format!(
            "🍀 {} is now level {level} and carries the {} role.",
            member.mention(),
            add.mention()
        ),
        SyncReason::NewRoleMapping => format!(
            "🍀 The reward roles changed: {} now carries the {} role.",
            member.mention(),
            add.mention()
        ),
    };
    if let Err(e) = chan.say(http, &text).await {
        report_to_moderators(
            http,
            cfg,
            &format!(
                "Could not announce the role change of {} in {}: {e}",
                member.user.tag(),
                chan.mention()
            ),
        )
        .await;
    }
}

async fn escalate_role_failure(
    http: &Arc<Http>,
    cfg: &GuildConfig,
    member: &Member,
    role_id: RoleId,
    verb: &str,
    err: &serenity::Error,
) {
    let apology = member
        .user
        .direct_message(http, |m| {
            m.content(
                "I could not update your reward role; \
                a moderator has been notified. Sorry! 🍀",
            )
        })
        .await;
    if let Err(dm_err) = apology {
        eprintln!(
            "Failed to DM an apology to {}: {dm_err}",
            member.user.tag()
        );
    }
    report_to_moderators(
        http,
        cfg,
        &format!(
            "Failed to {verb} the reward role {} for {}: {err}. \
            Check the bot's role position and Manage Roles permission.",
            role_id.mention(),
            member.user.tag()
        ),
    )
    .await;
}

/// Best-effort escalation to the guild's moderator-notification channel.
pub(crate) async fn report_to_moderators(http: &Arc<Http>, cfg: &GuildConfig, text: &str) {
    let Some(chan) = cfg.mod_channel else {
        eprintln!("No moderator channel configured; dropping report: {text}");
        return;
    };
    if let Err(e) = chan.say(http, &format!("⚠️ {text}")).await {
        eprintln!("Failed to reach the moderator channel: {e}; report was: {text}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<LevelRole> {
        vec![
            LevelRole {
                min_level: 5,
                role_id: RoleId(105),
            },
            LevelRole {
                min_level: 10,
                role_id: RoleId(110),
            },
            LevelRole {
                min_level: 20,
                role_id: RoleId(120),
            },
        ]
    }

    #[test]
    fn below_every_threshold_changes_nothing() {
        assert_eq!(plan_role_sync(&[], &table(), 4), RolePlan::NoChange);
    }

    #[test]
    fn highest_qualifying_threshold_wins() {
        let plan = plan_role_sync(&[], &table(), 12);
        assert_eq!(
            plan,
            RolePlan::Assign {
                remove: vec![],
                add: RoleId(110)
            }
        );
    }

    #[test]
    fn stale_table_roles_are_swapped_out() {
        let held = [RoleId(105), RoleId(42)];
        let plan = plan_role_sync(&held, &table(), 21);
        assert_eq!(
            plan,
            RolePlan::Assign {
                remove: vec![RoleId(105)],
                add: RoleId(120)
            }
        );
    }

    #[test]
    fn sync_is_idempotent() {
        // First pass assigns; pretend it was applied, then replan.
        let plan = plan_role_sync(&[RoleId(42)], &table(), 10);
        let RolePlan::Assign { add, .. } = plan else {
            panic!("first pass must assign");
        };
        let held_after = [RoleId(42), add];
        assert_eq!(plan_role_sync(&held_after, &table(), 10), RolePlan::NoChange);
    }

    #[test]
    fn non_table_roles_are_never_touched() {
        let held = [RoleId(42), RoleId(105)];
        let RolePlan::Assign { remove, .. } = plan_role_sync(&held, &table(), 10) else {
            panic!("must assign");
        };
        assert!(!remove.contains(&RoleId(42)));
    }
}
