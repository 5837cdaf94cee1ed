//! Module for Data Access Objects

use sqlx::FromRow;

/// Whole-record progression state for one member in one guild.
#[derive(FromRow, Debug, Clone, Copy)]
pub(crate) struct UserProgress {
    pub(crate) level: i64,
    pub(crate) xp: i64,
    pub(crate) prestige: i64,
}

/// Data Access Object for the per-guild member roster.
#[derive(FromRow, Debug)]
pub(crate) struct ServerMember {
    pub(crate) discord_id: i64,
    pub(crate) level: i64,
}

#[derive(FromRow)]
pub(crate) struct LevelRole {
    pub(crate) min_level: i64,
    pub(crate) role_id: i64,
}

#[derive(FromRow)]
pub(crate) struct PrestigeRole {
    pub(crate) tier: i64,
    pub(crate) role_id: i64,
}

#[derive(FromRow)]
pub(crate) struct BoostedEntity {
    pub(crate) entity_id: i64,
    pub(crate) bonus: i64,
}

#[derive(FromRow)]
pub(crate) struct GuildSettings {
    pub(crate) max_level: i64,
    pub(crate) xp_channel: Option<i64>,
    pub(crate) mod_channel: Option<i64>,
}
