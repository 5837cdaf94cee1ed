use serenity::framework::StandardFramework;
use serenity::prelude::*;
use shuttle_secrets::SecretStore;
use sqlx::PgPool;

mod app_state;
mod bots;
mod command_source;
mod commands;
mod db;
mod error;
mod guards;
mod guild_cfg;
mod immut_data;
mod leveling;
mod util;

use app_state::type_map_keys::{AppStateKey, BotCfgKey, GuildCfgKey, PgPoolKey, ShardManagerKey};
use app_state::AppState;
use bots::MainBot;
use commands::{GENERAL_GROUP, MODERATION_GROUP, MY_HELP};
use guild_cfg::GuildConfigStore;
use immut_data::consts::DISCORD_INTENTS;
use immut_data::dynamic::{owners, BotCfg};
use util::format_duration;

#[shuttle_runtime::main]
async fn serenity(
    #[shuttle_shared_db::Postgres] pool: PgPool,
    #[shuttle_secrets::Secrets] secret_store: SecretStore,
) -> shuttle_serenity::ShuttleSerenity {
    let cfg = BotCfg::new(&secret_store)?;
    println!(
        "XP cooldown: {}; voice interval: {}",
        format_duration(cfg.xp_cooldown),
        format_duration(cfg.voice_interval)
    );

    let bot = MainBot::new(pool.clone(), cfg.clone()).await;

    let framework = StandardFramework::new()
        .configure(|c| c.prefix(&cfg.discord_prefix).owners(owners()))
        .group(&GENERAL_GROUP)
        .group(&MODERATION_GROUP)
        .help(&MY_HELP)
        .after(commands::after);

    let client = Client::builder(&cfg.discord_token, DISCORD_INTENTS)
        .framework(framework)
        .event_handler(bot)
        .await
        .expect("Err creating client");

    {
        let mut wlock = client.data.write().await;
        wlock.insert::<ShardManagerKey>(client.shard_manager.clone());
        wlock.insert::<AppStateKey>(AppState::new());
        wlock.insert::<GuildCfgKey>(GuildConfigStore::default());
        wlock.insert::<PgPoolKey>(pool);
        wlock.insert::<BotCfgKey>(cfg);
    }

    Ok(client.into())
}
