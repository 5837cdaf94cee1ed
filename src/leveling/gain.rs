use std::sync::Arc;

use rand::Rng;
use serenity::{http::Http, model::prelude::Member};
use sqlx::PgPool;

use crate::app_state::voice::VoiceSeat;
use crate::db;
use crate::guild_cfg::GuildConfig;
use crate::immut_data::consts::{
    DEAFENED_XP_FACTOR, MESSAGE_XP_RANGE, PRESTIGE_GAIN_WEIGHT, VOICE_XP_RANGE,
};
use crate::leveling::bonus::boosted_gain;
use crate::leveling::roles::{manage_levels, SyncReason};
use crate::leveling::threshold::xp_needed_to_level_up;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Activity {
    Message,
    Vocal,
}

/// What a single XP credit did to the member's stored progress.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum XpOutcome {
    /// No XP granted: alone in a voice channel, or no longer in one.
    Skipped,
    Accumulated {
        gain: i64,
        xp: i64,
    },
    LeveledUp {
        new_level: i64,
        reached_cap: bool,
    },
}

pub(crate) fn base_gain(activity: Activity, deafened: bool, rng: &mut impl Rng) -> i64 {
    match activity {
        Activity::Message => rng.gen_range(MESSAGE_XP_RANGE),
        Activity::Vocal => {
            let gain = rng.gen_range(VOICE_XP_RANGE);
            if deafened {
                #[allow(clippy::cast_possible_truncation)]
                let reduced = (gain as f64 * DEAFENED_XP_FACTOR).ceil() as i64;
                reduced
            } else {
                gain
            }
        }
    }
}

/// Scales a gain by the member's prestige multiplier, `1 + 10·prestige/max`.
pub(crate) fn scale_for_prestige(gain: i64, prestige: i64, max_level: i64) -> i64 {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    let scaled =
        (gain as f64 * (1.0 + PRESTIGE_GAIN_WEIGHT * prestige as f64 / max_level as f64)).floor();
    scaled as i64
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum GainDecision {
    Accumulate,
    LevelUp { new_level: i64, reached_cap: bool },
}

/// Decides between plain accumulation and a level transition.
///
/// A member already sitting at the level cap never takes the accumulate
/// branch; every credit routes through the (clamped) level-up arithmetic.
pub(crate) fn decide_gain(level: i64, xp: i64, gain: i64, max_level: i64) -> GainDecision {
    if xp + gain < xp_needed_to_level_up(level) && level != max_level {
        GainDecision::Accumulate
    } else {
        let new_level = i64::min(level + 1, max_level);
        GainDecision::LevelUp {
            new_level,
            reached_cap: new_level == max_level,
        }
    }
}

/// Credits one unit of activity to `member`: rolls the base gain, applies
/// the prestige and boost multipliers, then either bumps the stored xp or
/// performs the level transition with its notification and role sync.
///
/// The stored mutation is authoritative; notification and role-sync
/// failures are reported but never roll it back.
pub(crate) async fn manage_xp(
    http: &Arc<Http>,
    pool: &PgPool,
    cfg: &GuildConfig,
    seat: Option<VoiceSeat>,
    member: &Member,
    activity: Activity,
) -> crate::error::Result<XpOutcome> {
    match (activity, seat) {
        // Solo voice farming earns nothing, whatever the activity kind.
        (_, Some(seat)) if seat.alone => return Ok(XpOutcome::Skipped),
        // A vocal credit for somebody who already left voice.
        (Activity::Vocal, None) => return Ok(XpOutcome::Skipped),
        _ => {}
    }
    let deafened = seat.map_or(false, |seat| seat.deafened);
    let gain = {
        let mut rng = rand::thread_rng();
        base_gain(activity, deafened, &mut rng)
    };

    let guild_id = member.guild_id;
    let progress = db::user_progress(pool, guild_id, member.user.id).await?;
    let gain = scale_for_prestige(gain, progress.prestige, cfg.max_level);
    let gain = boosted_gain(gain, member.user.id, &member.roles, &cfg.boosts);

    match decide_gain(progress.level, progress.xp, gain, cfg.max_level) {
        GainDecision::Accumulate => {
            let xp = db::add_xp(pool, guild_id, member.user.id, gain).await?;
            Ok(XpOutcome::Accumulated { gain, xp })
        }
        GainDecision::LevelUp {
            new_level,
            reached_cap,
        } => {
            db::set_progress(pool, guild_id, member.user.id, new_level, 0, progress.prestige)
                .await?;
            announce_level_up(http, cfg, member, new_level, reached_cap).await;
            manage_levels(http, cfg, member, new_level, SyncReason::NewLevel).await;
            Ok(XpOutcome::LeveledUp {
                new_level,
                reached_cap,
            })
        }
    }
}

async fn announce_level_up(
    http: &Arc<Http>,
    cfg: &GuildConfig,
    member: &Member,
    new_level: i64,
    reached_cap: bool,
) {
    use serenity::prelude::Mentionable;

    let Some(chan) = cfg.xp_channel else {
        return;
    };
    let text = if reached_cap {
        format!(
            "🍀 {} reached the maximum level {new_level}! A prestige pass-through is available.",
            member.mention()
        )
    } else {
        format!("🍀 {} leveled up to level {new_level}!", member.mention())
    };
    if let Err(e) = chan.say(http, &text).await {
        crate::leveling::roles::report_to_moderators(
            http,
            cfg,
            &format!(
                "Could not announce the level-up of {} in {}: {e}",
                member.user.tag(),
                chan.mention()
            ),
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn seeded_gain_of_12() -> (StdRng, i64) {
        // Find a seed whose first message roll lands on exactly 12.
        for seed in 0..1000 {
            let mut rng = StdRng::seed_from_u64(seed);
            let gain = base_gain(Activity::Message, false, &mut rng);
            if gain == 12 {
                return (StdRng::seed_from_u64(seed), gain);
            }
        }
        unreachable!("some seed in 0..1000 rolls a 12");
    }

    #[test]
    fn message_gain_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let gain = base_gain(Activity::Message, false, &mut rng);
            assert!((10..=15).contains(&gain));
        }
    }

    #[test]
    fn vocal_gain_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let gain = base_gain(Activity::Vocal, false, &mut rng);
            assert!((15..=25).contains(&gain));
        }
    }

    #[test]
    fn deafened_vocal_gain_is_quartered_rounding_up() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let gain = base_gain(Activity::Vocal, true, &mut rng);
            // ceil(15 * 0.25) = 4, ceil(25 * 0.25) = 7
            assert!((4..=7).contains(&gain));
        }
    }

    #[test]
    fn prestige_zero_leaves_gain_unscaled() {
        assert_eq!(scale_for_prestige(12, 0, 100), 12);
    }

    #[test]
    fn prestige_scaling_floors() {
        // 12 * (1 + 10*3/100) = 15.6
        assert_eq!(scale_for_prestige(12, 3, 100), 15);
        // 10 * (1 + 10*5/100) = 15.0 exactly
        assert_eq!(scale_for_prestige(10, 5, 100), 15);
    }

    #[test]
    fn fresh_member_gaining_12_stays_at_level_one() {
        let (mut rng, _) = seeded_gain_of_12();
        let gain = base_gain(Activity::Message, false, &mut rng);
        assert_eq!(gain, 12);
        let gain = scale_for_prestige(gain, 0, 100);
        // 12 < threshold(1) = 165, so the credit accumulates.
        assert_eq!(
            decide_gain(1, 0, gain, 100),
            GainDecision::Accumulate
        );
    }

    #[test]
    fn crossing_the_threshold_levels_up() {
        let level = 4;
        let one_short = xp_needed_to_level_up(level) - 1;
        assert_eq!(
            decide_gain(level, one_short, 1, 100),
            GainDecision::LevelUp {
                new_level: 5,
                reached_cap: false
            }
        );
    }

    #[test]
    fn level_up_into_the_cap_reports_it() {
        assert_eq!(
            decide_gain(99, xp_needed_to_level_up(99), 1, 100),
            GainDecision::LevelUp {
                new_level: 100,
                reached_cap: true
            }
        );
    }

    #[test]
    fn at_cap_every_credit_routes_through_the_clamped_transition() {
        assert_eq!(
            decide_gain(100, 0, 10, 100),
            GainDecision::LevelUp {
                new_level: 100,
                reached_cap: true
            }
        );
    }
}
