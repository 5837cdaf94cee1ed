use crate::util::macros::{i64_from_as_ref_user_id, i64_from_guild_id, i64_from_role_id};
use serenity::model::prelude::{GuildId, RoleId, UserId};
use sqlx::PgPool;

pub(crate) mod dao;

/// Reads the member's whole progression record, creating the default row
/// on first contact. The upsert doubles as an `on_server` refresh.
pub(crate) async fn user_progress(
    pool: &PgPool,
    guild_id: GuildId,
    discord_id: impl AsRef<UserId>,
) -> Result<dao::UserProgress, sqlx::Error> {
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    let discord_id: i64 = i64_from_as_ref_user_id!(discord_id);
    sqlx::query_as::<_, dao::UserProgress>(
        "INSERT INTO user_progress (guild_id, discord_id) \
        VALUES ($1, $2) \
        ON CONFLICT (guild_id, discord_id) \
        DO UPDATE SET on_server = true \
        RETURNING level, xp, prestige",
    )
    .bind(guild_id)
    .bind(discord_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn add_xp(
    pool: &PgPool,
    guild_id: GuildId,
    discord_id: impl AsRef<UserId>,
    delta: i64,
) -> Result<i64, sqlx::Error> {
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    let discord_id: i64 = i64_from_as_ref_user_id!(discord_id);
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO user_progress (guild_id, discord_id, xp) \
        VALUES ($1, $2, $3) \
        ON CONFLICT (guild_id, discord_id) \
        DO UPDATE SET xp = user_progress.xp + $3 \
        RETURNING xp",
    )
    .bind(guild_id)
    .bind(discord_id)
    .bind(delta)
    .fetch_one(pool)
    .await
}

pub(crate) async fn set_progress(
    pool: &PgPool,
    guild_id: GuildId,
    discord_id: impl AsRef<UserId>,
    level: i64,
    xp: i64,
    prestige: i64,
) -> Result<(), sqlx::Error> {
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    let discord_id: i64 = i64_from_as_ref_user_id!(discord_id);
    sqlx::query(
        "INSERT INTO user_progress (guild_id, discord_id, level, xp, prestige) \
        VALUES ($1, $2, $3, $4, $5) \
        ON CONFLICT (guild_id, discord_id) \
        DO UPDATE SET level = $3, xp = $4, prestige = $5",
    )
    .bind(guild_id)
    .bind(discord_id)
    .bind(level)
    .bind(xp)
    .bind(prestige)
    .execute(pool)
    .await?;
    Ok(())
}

/// Sets the level directly; the threshold restart also zeroes the xp.
pub(crate) async fn set_level(
    pool: &PgPool,
    guild_id: GuildId,
    discord_id: impl AsRef<UserId>,
    level: i64,
) -> Result<(), sqlx::Error> {
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    let discord_id: i64 = i64_from_as_ref_user_id!(discord_id);
    sqlx::query(
        "INSERT INTO user_progress (guild_id, discord_id, level) \
        VALUES ($1, $2, $3) \
        ON CONFLICT (guild_id, discord_id) \
        DO UPDATE SET level = $3, xp = 0",
    )
    .bind(guild_id)
    .bind(discord_id)
    .bind(level)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn ensure_member(
    pool: &PgPool,
    guild_id: GuildId,
    discord_id: impl AsRef<UserId>,
) -> Result<(), sqlx::Error> {
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    let discord_id: i64 = i64_from_as_ref_user_id!(discord_id);
    sqlx::query(
        "INSERT INTO user_progress (guild_id, discord_id) \
        VALUES ($1, $2) \
        ON CONFLICT (guild_id, discord_id) \
        DO UPDATE SET on_server = true",
    )
    .bind(guild_id)
    .bind(discord_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Note that this function returns the active members based on the
/// information *in the database*. They might not be on the server anymore.
pub(crate) async fn server_members(
    pool: &PgPool,
    guild_id: GuildId,
) -> Result<Vec<dao::ServerMember>, sqlx::Error> {
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    sqlx::query_as::<_, dao::ServerMember>(
        "SELECT discord_id, level FROM user_progress \
        WHERE guild_id = $1 AND on_server = true",
    )
    .bind(guild_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn mark_as_quitters(
    pool: &PgPool,
    guild_id: GuildId,
    quitters: &[i64],
) -> Result<(), sqlx::Error> {
    if quitters.is_empty() {
        return Ok(());
    };
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    sqlx::query(
        "UPDATE user_progress \
        SET on_server = false \
        WHERE guild_id = $1 AND discord_id = ANY($2)",
    )
    .bind(guild_id)
    .bind(quitters)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn add_newcomers(
    pool: &PgPool,
    guild_id: GuildId,
    newcomers: &[i64],
) -> Result<(), sqlx::Error> {
    if newcomers.is_empty() {
        return Ok(());
    };
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    let query = format!(
        "INSERT INTO user_progress (guild_id, discord_id) VALUES {} \
        ON CONFLICT (guild_id, discord_id) DO UPDATE SET on_server = true",
        newcomers
            .iter()
            .enumerate()
            .map(|(i, _)| format!("($1, ${})", i + 2))
            .collect::<Vec<String>>()
            .join(",")
    );

    let mut query_builder = sqlx::query(&query).bind(guild_id);

    for newcomer in newcomers {
        query_builder = query_builder.bind(newcomer);
    }

    query_builder.execute(pool).await?;
    Ok(())
}

pub(crate) async fn level_roles(
    pool: &PgPool,
    guild_id: GuildId,
) -> Result<Vec<dao::LevelRole>, sqlx::Error> {
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    sqlx::query_as::<_, dao::LevelRole>(
        "SELECT min_level, role_id FROM level_roles \
        WHERE guild_id = $1 \
        ORDER BY min_level",
    )
    .bind(guild_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn upsert_level_role(
    pool: &PgPool,
    guild_id: GuildId,
    min_level: i64,
    role_id: RoleId,
) -> Result<(), sqlx::Error> {
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    let role_id: i64 = i64_from_role_id!(role_id);
    sqlx::query(
        "INSERT INTO level_roles (guild_id, min_level, role_id) \
        VALUES ($1, $2, $3) \
        ON CONFLICT (guild_id, min_level) \
        DO UPDATE SET role_id = $3",
    )
    .bind(guild_id)
    .bind(min_level)
    .bind(role_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn remove_level_role(
    pool: &PgPool,
    guild_id: GuildId,
    min_level: i64,
) -> Result<u64, sqlx::Error> {
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    let res = sqlx::query(
        "DELETE FROM level_roles \
        WHERE guild_id = $1 AND min_level = $2",
    )
    .bind(guild_id)
    .bind(min_level)
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

pub(crate) async fn prestige_roles(
    pool: &PgPool,
    guild_id: GuildId,
) -> Result<Vec<dao::PrestigeRole>, sqlx::Error> {
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    sqlx::query_as::<_, dao::PrestigeRole>(
        "SELECT tier, role_id FROM prestige_roles \
        WHERE guild_id = $1 \
        ORDER BY tier",
    )
    .bind(guild_id)
    .fetch_all(pool)
    .await
}

/// Appends a tier at the end of the table, keeping tiers contiguous from 1.
pub(crate) async fn push_prestige_role(
    pool: &PgPool,
    guild_id: GuildId,
    role_id: RoleId,
) -> Result<i64, sqlx::Error> {
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    let role_id: i64 = i64_from_role_id!(role_id);
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO prestige_roles (guild_id, tier, role_id) \
        VALUES ($1, COALESCE((SELECT MAX(tier) FROM prestige_roles WHERE guild_id = $1), 0) + 1, $2) \
        RETURNING tier",
    )
    .bind(guild_id)
    .bind(role_id)
    .fetch_one(pool)
    .await
}

/// Removes the last tier only; earlier tiers never leave a gap behind.
pub(crate) async fn pop_prestige_role(
    pool: &PgPool,
    guild_id: GuildId,
) -> Result<Option<i64>, sqlx::Error> {
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    sqlx::query_scalar::<_, i64>(
        "DELETE FROM prestige_roles \
        WHERE guild_id = $1 \
        AND tier = (SELECT MAX(tier) FROM prestige_roles WHERE guild_id = $1) \
        RETURNING role_id",
    )
    .bind(guild_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn boosted_entities(
    pool: &PgPool,
    guild_id: GuildId,
) -> Result<Vec<dao::BoostedEntity>, sqlx::Error> {
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    sqlx::query_as::<_, dao::BoostedEntity>(
        "SELECT entity_id, bonus FROM boosted_entities \
        WHERE guild_id = $1 \
        ORDER BY entity_id",
    )
    .bind(guild_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn upsert_boosted_entity(
    pool: &PgPool,
    guild_id: GuildId,
    entity_id: i64,
    bonus: i64,
) -> Result<(), sqlx::Error> {
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    sqlx::query(
        "INSERT INTO boosted_entities (guild_id, entity_id, bonus) \
        VALUES ($1, $2, $3) \
        ON CONFLICT (guild_id, entity_id) \
        DO UPDATE SET bonus = $3",
    )
    .bind(guild_id)
    .bind(entity_id)
    .bind(bonus)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn remove_boosted_entity(
    pool: &PgPool,
    guild_id: GuildId,
    entity_id: i64,
) -> Result<u64, sqlx::Error> {
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    let res = sqlx::query(
        "DELETE FROM boosted_entities \
        WHERE guild_id = $1 AND entity_id = $2",
    )
    .bind(guild_id)
    .bind(entity_id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

/// Reads the guild settings row, creating it with defaults on first touch.
pub(crate) async fn guild_settings(
    pool: &PgPool,
    guild_id: GuildId,
) -> Result<dao::GuildSettings, sqlx::Error> {
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    sqlx::query_as::<_, dao::GuildSettings>(
        "INSERT INTO guild_settings (guild_id) \
        VALUES ($1) \
        ON CONFLICT (guild_id) \
        DO UPDATE SET guild_id = EXCLUDED.guild_id \
        RETURNING max_level, xp_channel, mod_channel",
    )
    .bind(guild_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn set_max_level(
    pool: &PgPool,
    guild_id: GuildId,
    max_level: i64,
) -> Result<(), sqlx::Error> {
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    sqlx::query(
        "INSERT INTO guild_settings (guild_id, max_level) \
        VALUES ($1, $2) \
        ON CONFLICT (guild_id) \
        DO UPDATE SET max_level = $2",
    )
    .bind(guild_id)
    .bind(max_level)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn set_xp_channel(
    pool: &PgPool,
    guild_id: GuildId,
    channel_id: i64,
) -> Result<(), sqlx::Error> {
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    sqlx::query(
        "INSERT INTO guild_settings (guild_id, xp_channel) \
        VALUES ($1, $2) \
        ON CONFLICT (guild_id) \
        DO UPDATE SET xp_channel = $2",
    )
    .bind(guild_id)
    .bind(channel_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn set_mod_channel(
    pool: &PgPool,
    guild_id: GuildId,
    channel_id: i64,
) -> Result<(), sqlx::Error> {
    let guild_id: i64 = i64_from_guild_id!(guild_id);
    sqlx::query(
        "INSERT INTO guild_settings (guild_id, mod_channel) \
        VALUES ($1, $2) \
        ON CONFLICT (guild_id) \
        DO UPDATE SET mod_channel = $2",
    )
    .bind(guild_id)
    .bind(channel_id)
    .execute(pool)
    .await?;
    Ok(())
}
