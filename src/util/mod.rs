use std::time::Duration;

use rand::seq::SliceRandom;
use serenity::{
    http::{CacheHttp, Http},
    model::prelude::{ChannelId, GuildId, Member, UserId},
    prelude::Mentionable,
    utils::MessageBuilder,
};

use crate::immut_data::dynamic::DURATION_RE;

pub(crate) mod macros;

pub(crate) async fn members(
    http: impl AsRef<Http>,
    guild_id: GuildId,
) -> serenity::Result<Vec<Member>> {
    const DEFAULT_LIMIT: usize = 1000;
    const USE_DEFAULT_LIMIT: Option<u64> = None;
    const NO_USER_ID_OFFSET: Option<UserId> = None;

    let members = guild_id
        .members(http, USE_DEFAULT_LIMIT, NO_USER_ID_OFFSET)
        .await?;

    if members.len() == DEFAULT_LIMIT {
        let err = concat!(
            "Default limit for GuildId::members(...) reached.\n",
            "Chunkwise member list retrieval is required."
        );
        panic!("{err}");
    }

    Ok(members)
}

pub(crate) async fn say_wo_unintended_mentions(
    chan: ChannelId,
    cache_http: impl CacheHttp,
    author_mention: Option<impl Mentionable>,
    content: impl std::fmt::Display,
) -> serenity::Result<()> {
    // The function works by sending a message with a random emote, then editing

    const SHORT_LIVED_MESSAGES: &[&str] = &[
        "One second :four_leaf_clover:",
        "Fetching that for you :herb:",
        "Rolling the dice :game_die:",
        "Hold on tight :seedling:",
    ];

    let short_lived_msg_wo_mention = SHORT_LIVED_MESSAGES
        .choose(&mut rand::thread_rng())
        .unwrap_or_else(|| unreachable!());

    let short_lived_msg = {
        let mut msg_builder = MessageBuilder::new();
        if let Some(author_mention) = author_mention {
            msg_builder.mention(&author_mention).push(" ");
        }
        msg_builder.push(short_lived_msg_wo_mention).build()
    };

    let mut bots_response = chan.say(cache_http.http(), &short_lived_msg).await?;
    let long_lived_msg = {
        let mut msg_builder = MessageBuilder::new();
        msg_builder
            .push(content)
            .push("\n\n")
            .push("The message was edited in place so that none of the ids above ping anyone.");
        msg_builder.build()
    };
    bots_response
        .edit(cache_http, |m| m.content(&long_lived_msg))
        .await?;

    Ok(())
}

/// Parses a compact duration spec such as `"5s"`, `"7m"` or `"2h30m"`.
pub(crate) fn parse_duration(spec: &str) -> Option<Duration> {
    let caps = DURATION_RE.captures(spec.trim())?;
    let part = |i: usize| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse::<u64>().ok(),
            None => Some(0),
        }
    };
    let (hours, minutes, seconds) = (part(1)?, part(2)?, part(3)?);
    if hours == 0 && minutes == 0 && seconds == 0 {
        return None;
    }
    Some(Duration::from_secs(hours * 3600 + minutes * 60 + seconds))
}

pub(crate) fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, total % 3600 / 60, total % 60);
    let mut parts = Vec::with_capacity(3);
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_specs() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("7m"), Some(Duration::from_secs(420)));
        assert_eq!(parse_duration("2h30m"), Some(Duration::from_secs(9000)));
        assert_eq!(parse_duration("1h2m3s"), Some(Duration::from_secs(3723)));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("later"), None);
        assert_eq!(parse_duration("10"), None);
        assert_eq!(parse_duration("m5"), None);
    }

    #[test]
    fn format_round_trips_parse() {
        for (spec, pretty) in [
            ("5s", "5s"),
            ("7m", "7m"),
            ("2h30m", "2h 30m"),
            ("1h2m3s", "1h 2m 3s"),
        ] {
            let duration = parse_duration(spec).unwrap();
            assert_eq!(format_duration(duration), pretty);
        }
    }

    #[test]
    fn format_zero_is_zero_seconds() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }
}
