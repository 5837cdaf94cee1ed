use std::collections::HashMap;
use std::time::{Duration, Instant};

use serenity::model::prelude::{GuildId, MessageId, UserId};

pub(crate) mod membership;
pub(crate) mod type_map_keys;
pub(crate) mod voice;

use self::voice::VoiceTracker;

/// Mutable run-time state shared across handlers through the TypeMap.
#[derive(Default)]
pub(crate) struct AppState {
    cooldowns: HashMap<(GuildId, UserId), Instant>,
    pending_prestiges: Vec<PendingPrestige>,
    pub(crate) voice: VoiceTracker,
}

/// A prestige pass-through awaiting the member's reaction, keyed by the
/// confirmation message. Terminal outcomes (applied, cancelled) remove the
/// record, after which a new request may be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingPrestige {
    pub(crate) guild_id: GuildId,
    pub(crate) user_id: UserId,
    pub(crate) message_id: MessageId,
}

impl AppState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns whether a message-activity credit is due, stamping the
    /// member's window when it is.
    pub(crate) fn cooldown_passed(
        &mut self,
        guild_id: GuildId,
        user_id: UserId,
        window: Duration,
    ) -> bool {
        let now = Instant::now();
        if let Some(last) = self.cooldowns.get(&(guild_id, user_id)) {
            if now.duration_since(*last) < window {
                return false;
            }
        }
        self.cooldowns.insert((guild_id, user_id), now);
        true
    }

    pub(crate) fn has_pending_prestige(&self, guild_id: GuildId, user_id: UserId) -> bool {
        self.pending_prestiges
            .iter()
            .any(|req| req.guild_id == guild_id && req.user_id == user_id)
    }

    /// Opens a pending prestige request. Single-flight per member: returns
    /// `false` without recording anything if one is already open.
    pub(crate) fn begin_prestige(&mut self, req: PendingPrestige) -> bool {
        if self.has_pending_prestige(req.guild_id, req.user_id) {
            return false;
        }
        self.pending_prestiges.push(req);
        true
    }

    /// Takes the pending request resolved by a reaction on `message_id`
    /// from `user_id`, if that pairing exists.
    pub(crate) fn resolve_prestige(
        &mut self,
        message_id: MessageId,
        user_id: UserId,
    ) -> Option<PendingPrestige> {
        let i = self
            .pending_prestiges
            .iter()
            .position(|req| req.message_id == message_id && req.user_id == user_id)?;
        Some(self.pending_prestiges.remove(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUILD: GuildId = GuildId(1);
    const ALICE: UserId = UserId(10);
    const BOB: UserId = UserId(11);

    fn req(message_id: u64, user_id: UserId) -> PendingPrestige {
        PendingPrestige {
            guild_id: GUILD,
            user_id,
            message_id: MessageId(message_id),
        }
    }

    #[test]
    fn prestige_requests_are_single_flight_per_member() {
        let mut state = AppState::new();
        assert!(state.begin_prestige(req(100, ALICE)));
        // A second request while the first is pending is rejected and
        // records nothing.
        assert!(!state.begin_prestige(req(101, ALICE)));
        assert!(state.resolve_prestige(MessageId(101), ALICE).is_none());
        // Another member is unaffected.
        assert!(state.begin_prestige(req(102, BOB)));
    }

    #[test]
    fn resolution_is_terminal_and_reenterable() {
        let mut state = AppState::new();
        assert!(state.begin_prestige(req(100, ALICE)));
        let resolved = state.resolve_prestige(MessageId(100), ALICE);
        assert_eq!(resolved, Some(req(100, ALICE)));
        // Terminal: the record is gone.
        assert!(state.resolve_prestige(MessageId(100), ALICE).is_none());
        // Re-enterable from none.
        assert!(state.begin_prestige(req(103, ALICE)));
    }

    #[test]
    fn foreign_reactions_do_not_resolve_a_request() {
        let mut state = AppState::new();
        assert!(state.begin_prestige(req(100, ALICE)));
        assert!(state.resolve_prestige(MessageId(100), BOB).is_none());
        assert!(state.has_pending_prestige(GUILD, ALICE));
    }

    #[test]
    fn cooldown_blocks_within_the_window() {
        let mut state = AppState::new();
        let window = Duration::from_secs(3600);
        assert!(state.cooldown_passed(GUILD, ALICE, window));
        assert!(!state.cooldown_passed(GUILD, ALICE, window));
        // An elapsed window always passes.
        assert!(state.cooldown_passed(GUILD, BOB, Duration::ZERO));
        assert!(state.cooldown_passed(GUILD, BOB, Duration::ZERO));
    }
}
