use std::collections::HashSet;
use std::time::Duration;

use anyhow::Context as _;
use once_cell::sync::Lazy;
use regex::Regex;
use serenity::model::prelude::UserId;
use shuttle_secrets::SecretStore;

use crate::immut_data::consts::{DEFAULT_PREFIX, DEFAULT_VOICE_INTERVAL, DEFAULT_XP_COOLDOWN};
use crate::util::parse_duration;

// The method for configuration of the bot
// https://docs.rs/serenity/latest/serenity/framework/standard/struct.Configuration.html#method.owners
#[allow(clippy::unreadable_literal)]
pub(crate) fn owners() -> HashSet<UserId> {
    [UserId(286962466037170176)].into_iter().collect()
}

pub(crate) static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\n\r\t]+").unwrap());

pub(crate) static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$").unwrap());

/// The configuration of the bot, read from the secret store once at startup.
#[derive(Clone)]
pub(crate) struct BotCfg {
    pub(crate) discord_token: String,
    pub(crate) discord_prefix: String,
    /// Minimum gap between two message-activity XP credits per member.
    pub(crate) xp_cooldown: Duration,
    /// Length of one credited voice-activity interval.
    pub(crate) voice_interval: Duration,
}

impl BotCfg {
    pub(crate) fn new(secret_store: &SecretStore) -> anyhow::Result<Self> {
        let discord_token = secret_store
            .get("DISCORD_TOKEN")
            .context("DISCORD_TOKEN secret is not set")?;
        let discord_prefix = secret_store
            .get("DISCORD_PREFIX")
            .unwrap_or_else(|| DEFAULT_PREFIX.to_owned());
        let xp_cooldown = match secret_store.get("XP_COOLDOWN") {
            Some(spec) => parse_duration(&spec)
                .with_context(|| format!("XP_COOLDOWN is not a duration spec: {spec:?}"))?,
            None => DEFAULT_XP_COOLDOWN,
        };
        let voice_interval = match secret_store.get("VOICE_XP_INTERVAL") {
            Some(spec) => parse_duration(&spec)
                .with_context(|| format!("VOICE_XP_INTERVAL is not a duration spec: {spec:?}"))?,
            None => DEFAULT_VOICE_INTERVAL,
        };
        Ok(Self {
            discord_token,
            discord_prefix,
            xp_cooldown,
            voice_interval,
        })
    }
}
