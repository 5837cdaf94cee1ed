macro_rules! i64_from_as_ref_user_id {
    ($discord_id:expr) => {{
        let UserId(ref discord_id) = $discord_id.as_ref();
        let discord_id: u64 = discord_id.clone();
        let discord_id: i64 = ::core::convert::identity::<u64>(discord_id) as i64;
        discord_id
    }};
}

macro_rules! i64_from_guild_id {
    ($guild_id:expr) => {{
        let ::serenity::model::prelude::GuildId(guild_id) = $guild_id;
        let guild_id: i64 = ::core::convert::identity::<u64>(guild_id) as i64;
        guild_id
    }};
}

macro_rules! i64_from_role_id {
    ($role_id:expr) => {{
        let ::serenity::model::prelude::RoleId(role_id) = $role_id;
        let role_id: i64 = ::core::convert::identity::<u64>(role_id) as i64;
        role_id
    }};
}

// Exporting the macros
// https://stackoverflow.com/questions/26731243/how-do-i-use-a-macro-across-module-files/67140319#67140319
pub(crate) use i64_from_as_ref_user_id;
pub(crate) use i64_from_guild_id;
pub(crate) use i64_from_role_id;
