use std::collections::HashMap;

use serenity::model::prelude::{ChannelId, GuildId, UserId};

/// Where a member currently sits in voice, as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct VoicePresence {
    pub(crate) channel_id: ChannelId,
    pub(crate) deafened: bool,
    pub(crate) bot: bool,
}

/// What the accumulator needs to know about a member's seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct VoiceSeat {
    pub(crate) deafened: bool,
    /// No other non-bot member shares the channel.
    pub(crate) alone: bool,
}

/// Live voice occupancy per guild, fed by `voice_state_update` events.
#[derive(Debug, Default)]
pub(crate) struct VoiceTracker {
    guilds: HashMap<GuildId, HashMap<UserId, VoicePresence>>,
}

impl VoiceTracker {
    /// Applies a gateway voice-state transition; `None` means the member
    /// left voice entirely.
    pub(crate) fn update(
        &mut self,
        guild_id: GuildId,
        user_id: UserId,
        presence: Option<VoicePresence>,
    ) {
        match presence {
            Some(presence) => {
                self.guilds
                    .entry(guild_id)
                    .or_default()
                    .insert(user_id, presence);
            }
            None => {
                if let Some(seats) = self.guilds.get_mut(&guild_id) {
                    seats.remove(&user_id);
                    if seats.is_empty() {
                        self.guilds.remove(&guild_id);
                    }
                }
            }
        }
    }

    /// The member's seat, if they are in a voice channel of this guild.
    pub(crate) fn seat(&self, guild_id: GuildId, user_id: UserId) -> Option<VoiceSeat> {
        let seats = self.guilds.get(&guild_id)?;
        let mine = seats.get(&user_id)?;
        let alone = !seats.iter().any(|(other_id, other)| {
            *other_id != user_id && other.channel_id == mine.channel_id && !other.bot
        });
        Some(VoiceSeat {
            deafened: mine.deafened,
            alone,
        })
    }

    /// Every non-bot member currently in voice, across all guilds; the
    /// voice ticker credits these.
    pub(crate) fn credit_candidates(&self) -> Vec<(GuildId, UserId)> {
        let mut out = Vec::new();
        for (guild_id, seats) in &self.guilds {
            for (user_id, presence) in seats {
                if !presence.bot {
                    out.push((*guild_id, *user_id));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUILD: GuildId = GuildId(1);
    const CHAN_A: ChannelId = ChannelId(100);
    const CHAN_B: ChannelId = ChannelId(200);
    const ALICE: UserId = UserId(10);
    const BOB: UserId = UserId(11);
    const BOT: UserId = UserId(12);

    fn seat_in(channel_id: ChannelId, deafened: bool, bot: bool) -> Option<VoicePresence> {
        Some(VoicePresence {
            channel_id,
            deafened,
            bot,
        })
    }

    #[test]
    fn single_occupant_is_alone() {
        let mut tracker = VoiceTracker::default();
        tracker.update(GUILD, ALICE, seat_in(CHAN_A, false, false));
        assert!(tracker.seat(GUILD, ALICE).unwrap().alone);
    }

    #[test]
    fn bot_company_still_counts_as_alone() {
        let mut tracker = VoiceTracker::default();
        tracker.update(GUILD, ALICE, seat_in(CHAN_A, false, false));
        tracker.update(GUILD, BOT, seat_in(CHAN_A, false, true));
        assert!(tracker.seat(GUILD, ALICE).unwrap().alone);
    }

    #[test]
    fn human_company_in_the_same_channel_breaks_solitude() {
        let mut tracker = VoiceTracker::default();
        tracker.update(GUILD, ALICE, seat_in(CHAN_A, false, false));
        tracker.update(GUILD, BOB, seat_in(CHAN_A, false, false));
        assert!(!tracker.seat(GUILD, ALICE).unwrap().alone);
    }

    #[test]
    fn company_in_another_channel_does_not_count() {
        let mut tracker = VoiceTracker::default();
        tracker.update(GUILD, ALICE, seat_in(CHAN_A, false, false));
        tracker.update(GUILD, BOB, seat_in(CHAN_B, false, false));
        assert!(tracker.seat(GUILD, ALICE).unwrap().alone);
    }

    #[test]
    fn leaving_clears_the_seat() {
        let mut tracker = VoiceTracker::default();
        tracker.update(GUILD, ALICE, seat_in(CHAN_A, true, false));
        assert!(tracker.seat(GUILD, ALICE).unwrap().deafened);
        tracker.update(GUILD, ALICE, None);
        assert!(tracker.seat(GUILD, ALICE).is_none());
    }

    #[test]
    fn candidates_skip_bots() {
        let mut tracker = VoiceTracker::default();
        tracker.update(GUILD, ALICE, seat_in(CHAN_A, false, false));
        tracker.update(GUILD, BOT, seat_in(CHAN_A, false, true));
        let candidates = tracker.credit_candidates();
        assert_eq!(candidates, vec![(GUILD, ALICE)]);
    }
}
