use std::collections::{BTreeMap, HashMap};

use serenity::model::prelude::{ChannelId, GuildId, RoleId};
use serenity::prelude::Context;
use sqlx::PgPool;

use crate::app_state::type_map_keys::GuildCfgKey;
use crate::db::{self, dao};
use crate::immut_data::consts::{CFG_RETRY_ATTEMPTS, CFG_RETRY_DELAY};

/// One reward-role threshold. The store keeps these sorted ascending by
/// `min_level`; the synchronizer scans them highest-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LevelRole {
    pub(crate) min_level: i64,
    pub(crate) role_id: RoleId,
}

/// A guild's full progression configuration, cached in process so command
/// and event handlers do not pay a database round trip per lookup.
#[derive(Debug, Clone)]
pub(crate) struct GuildConfig {
    pub(crate) sorted_level_roles: Vec<LevelRole>,
    /// Index = tier - 1; tiers are contiguous from 1 by construction.
    pub(crate) prestige_roles: Vec<RoleId>,
    /// entity id (role or member) -> bonus percent, ordered so stacked
    /// boosts always floor in the same sequence.
    pub(crate) boosts: BTreeMap<i64, i64>,
    pub(crate) max_level: i64,
    pub(crate) xp_channel: Option<ChannelId>,
    pub(crate) mod_channel: Option<ChannelId>,
}

impl GuildConfig {
    async fn fetch(pool: &PgPool, guild_id: GuildId) -> crate::error::Result<Self> {
        let settings: dao::GuildSettings = db::guild_settings(pool, guild_id).await?;
        let sorted_level_roles = db::level_roles(pool, guild_id)
            .await?
            .into_iter()
            .map(|row| {
                #[allow(clippy::cast_sign_loss)]
                let role_id = core::convert::identity::<i64>(row.role_id) as u64;
                LevelRole {
                    min_level: row.min_level,
                    role_id: RoleId(role_id),
                }
            })
            .collect();
        let prestige_roles = db::prestige_roles(pool, guild_id)
            .await?
            .into_iter()
            .map(|row| {
                #[allow(clippy::cast_sign_loss)]
                let role_id = core::convert::identity::<i64>(row.role_id) as u64;
                RoleId(role_id)
            })
            .collect();
        let boosts = db::boosted_entities(pool, guild_id)
            .await?
            .into_iter()
            .map(|row| (row.entity_id, row.bonus))
            .collect();
        #[allow(clippy::cast_sign_loss)]
        let chan = |id: Option<i64>| id.map(|id| ChannelId(core::convert::identity::<i64>(id) as u64));
        Ok(GuildConfig {
            sorted_level_roles,
            prestige_roles,
            boosts,
            max_level: settings.max_level,
            xp_channel: chan(settings.xp_channel),
            mod_channel: chan(settings.mod_channel),
        })
    }

    /// The highest prestige tier a member of this guild can hold.
    pub(crate) fn prestige_ceiling(&self) -> i64 {
        #[allow(clippy::cast_possible_wrap)]
        let ceiling = core::convert::identity::<usize>(self.prestige_roles.len()) as i64;
        ceiling
    }
}

/// Owns one [`GuildConfig`] per joined guild. Loaded at `ready` and
/// `guild_create`, refreshed by configuration commands, evicted at
/// `guild_delete`; injected into handlers through the TypeMap.
#[derive(Default)]
pub(crate) struct GuildConfigStore {
    configs: HashMap<GuildId, GuildConfig>,
}

impl GuildConfigStore {
    pub(crate) async fn load(
        &mut self,
        pool: &PgPool,
        guild_id: GuildId,
    ) -> crate::error::Result<()> {
        let cfg = GuildConfig::fetch(pool, guild_id).await?;
        self.configs.insert(guild_id, cfg);
        Ok(())
    }

    /// Re-reads a guild's configuration; configuration commands call this
    /// after every table mutation so the cache never serves stale data.
    pub(crate) async fn refresh(
        &mut self,
        pool: &PgPool,
        guild_id: GuildId,
    ) -> crate::error::Result<()> {
        self.load(pool, guild_id).await
    }

    pub(crate) fn get(&self, guild_id: GuildId) -> Option<&GuildConfig> {
        self.configs.get(&guild_id)
    }

    pub(crate) fn evict(&mut self, guild_id: GuildId) {
        self.configs.remove(&guild_id);
    }
}

/// Snapshot of a guild's configuration out of the TypeMap.
pub(crate) async fn cached(ctx: &Context, guild_id: GuildId) -> Option<GuildConfig> {
    let rlock = ctx.data.read().await;
    rlock.get::<GuildCfgKey>()?.get(guild_id).cloned()
}

/// Like [`cached`], but rides out the just-started race where an event
/// arrives before `ready`/`guild_create` finished loading the guild.
pub(crate) async fn cached_with_retry(ctx: &Context, guild_id: GuildId) -> Option<GuildConfig> {
    for attempt in 0..CFG_RETRY_ATTEMPTS {
        if let Some(cfg) = cached(ctx, guild_id).await {
            return Some(cfg);
        }
        if attempt + 1 < CFG_RETRY_ATTEMPTS {
            tokio::time::sleep(CFG_RETRY_DELAY).await;
        }
    }
    None
}

/// Re-reads one guild's configuration into the store; configuration
/// commands call this after every mutation.
pub(crate) async fn refresh(
    ctx: &Context,
    pool: &PgPool,
    guild_id: GuildId,
) -> crate::error::Result<()> {
    let mut wlock = ctx.data.write().await;
    let store = wlock
        .get_mut::<GuildCfgKey>()
        .expect("Failed to get the guild config store from the typemap");
    store.refresh(pool, guild_id).await
}
