use core::ops::RangeInclusive;
use core::time::Duration;

use serenity::prelude::GatewayIntents;

pub(crate) const SCHEMA: &str = include_str!("../../schema.pgsql");

pub(crate) const DISCORD_INTENTS: GatewayIntents = {
    let bits = GatewayIntents::GUILDS.bits()
        | GatewayIntents::GUILD_MESSAGES.bits()
        | GatewayIntents::MESSAGE_CONTENT.bits()
        | GatewayIntents::GUILD_MEMBERS.bits()
        | GatewayIntents::GUILD_VOICE_STATES.bits()
        | GatewayIntents::GUILD_MESSAGE_REACTIONS.bits();
    match GatewayIntents::from_bits(bits) {
        Some(intents) => intents,
        None => panic!("Invalid intents"),
    }
};

pub(crate) const MESSAGE_XP_RANGE: RangeInclusive<i64> = 10..=15;
pub(crate) const VOICE_XP_RANGE: RangeInclusive<i64> = 15..=25;
pub(crate) const DEAFENED_XP_FACTOR: f64 = 0.25;
pub(crate) const PRESTIGE_GAIN_WEIGHT: f64 = 10.0;

pub(crate) const DEFAULT_XP_COOLDOWN: Duration = Duration::from_secs(5);
pub(crate) const DEFAULT_VOICE_INTERVAL: Duration = Duration::from_secs(7 * 60);
pub(crate) const DEFAULT_PREFIX: &str = "!";

/// Bounded retry for the config-not-yet-loaded race right after startup.
pub(crate) const CFG_RETRY_ATTEMPTS: u32 = 3;
pub(crate) const CFG_RETRY_DELAY: Duration = Duration::from_secs(5);

pub(crate) const PRESTIGE_ACCEPT: &str = "✅";
pub(crate) const PRESTIGE_REJECT: &str = "❌";
