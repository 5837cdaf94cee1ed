use core::convert::identity as id;
use std::sync::atomic::{AtomicBool, Ordering};

use serenity::{
    async_trait,
    model::application::interaction::Interaction,
    model::prelude::{
        Guild, GuildId, Member, Message, Reaction, ReactionType, Ready, UnavailableGuild, User,
        UserId, VoiceState,
    },
    prelude::{Context, EventHandler, Mentionable},
};
use sqlx::{Executor, PgPool};

use crate::app_state::membership::Diff;
use crate::app_state::type_map_keys::{AppStateKey, GuildCfgKey};
use crate::app_state::voice::{VoicePresence, VoiceSeat};
use crate::command_source::SlashSource;
use crate::commands;
use crate::db;
use crate::guild_cfg::{self, GuildConfig};
use crate::immut_data::consts::{PRESTIGE_ACCEPT, PRESTIGE_REJECT};
use crate::immut_data::dynamic::BotCfg;
use crate::leveling::gain::{manage_xp, Activity, XpOutcome};
use crate::leveling::prestige::added_prestige;
use crate::leveling::roles::{manage_levels, report_to_moderators, SyncReason};
use crate::util;

use super::cfg_ext::impl_cfg_ext;
use super::CfgExt;

/// The bot structure that is used to
///
/// * populate the [Context::data] with run-time data,
/// * handle [EventHandler] events.
///
/// Note that commands do not have direct access to the [MainBot] struct and
/// use [Context::data] instead.
pub(crate) struct MainBot {
    /// Database connection pool for PostgreSQL database.
    /// It is used to persist data between restarts.
    pub(crate) pool: PgPool,
    /// The configuration of the bot.
    pub(crate) cfg: BotCfg,
    ticker_started: AtomicBool,
}

impl MainBot {
    /// Creates a new instance of the bot.
    pub(crate) async fn new(pool: PgPool, cfg: BotCfg) -> Self {
        pool.execute(crate::immut_data::consts::SCHEMA)
            .await
            .expect("Failed to initialize database");
        Self {
            pool,
            cfg,
            ticker_started: AtomicBool::new(false),
        }
    }

    /// Prints the members of a guild to the console.
    fn print_guild_roster(guild_name: &str, members: &[Member]) {
        println!("Members of {guild_name} ({} total):", members.len());

        for m in members.iter() {
            let id = m.user.id;
            let name = m.display_name();
            println!("{id:>20} {name}");
        }
    }

    /// Starts the periodic voice-XP crediting loop. Idempotent across
    /// gateway reconnects.
    fn spawn_voice_ticker(&self, ctx: &Context) {
        if self.ticker_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let data = ctx.data.clone();
        let http = ctx.http.clone();
        let pool = self.pool.clone();
        let interval = self.voice_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let snapshot: Vec<(GuildId, UserId, VoiceSeat, GuildConfig)> = {
                    let rlock = data.read().await;
                    let (Some(app_state), Some(store)) =
                        (rlock.get::<AppStateKey>(), rlock.get::<GuildCfgKey>())
                    else {
                        continue;
                    };
                    app_state
                        .voice
                        .credit_candidates()
                        .into_iter()
                        .filter_map(|(guild_id, user_id)| {
                            let seat = app_state.voice.seat(guild_id, user_id)?;
                            let cfg = store.get(guild_id)?.clone();
                            Some((guild_id, user_id, seat, cfg))
                        })
                        .collect()
                };
                for (guild_id, user_id, seat, cfg) in snapshot {
                    let member = match guild_id.member(&http, user_id).await {
                        Ok(member) => member,
                        Err(e) => {
                            eprintln!("Failed to fetch voice member {user_id}: {e}");
                            continue;
                        }
                    };
                    if let Err(e) =
                        manage_xp(&http, &pool, &cfg, Some(seat), &member, Activity::Vocal).await
                    {
                        eprintln!("Failed to credit voice XP for {user_id}: {e}");
                    }
                }
            }
        });
    }

    async fn register_slash_commands(ctx: &Context, guild_id: GuildId) {
        let res = guild_id
            .set_application_commands(&ctx.http, |commands| {
                commands
                    .create_application_command(|c| {
                        c.name("rank")
                            .description("Show your progression card: level, XP and prestige")
                    })
                    .create_application_command(|c| {
                        c.name("prestige")
                            .description("Request a prestige pass-through at the level cap")
                    })
            })
            .await;
        if let Err(e) = res {
            eprintln!("Failed to register slash commands for guild {guild_id}: {e}");
        }
    }
}

impl_cfg_ext!(MainBot);

#[async_trait]
impl EventHandler for MainBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        self.spawn_voice_ticker(&ctx);

        let bot_name: &str = &ready.user.name;
        println!(
            "{bot_name} is at your service across {} guilds! 🍀",
            ready.guilds.len()
        );
    }

    async fn guild_create(&self, ctx: Context, guild: Guild, _is_new: bool) {
        let guild_id = guild.id;
        {
            let mut wlock = ctx.data.write().await;
            let store = wlock
                .get_mut::<GuildCfgKey>()
                .expect("Failed to get the guild config store from the typemap");
            if let Err(e) = store.load(&self.pool, guild_id).await {
                eprintln!("Failed to load the configuration of guild {guild_id}: {e}");
                return;
            }
        }

        let members = match util::members(&ctx.http, guild_id).await {
            Ok(members) => members,
            Err(e) => {
                eprintln!("Failed to fetch the member list of guild {guild_id}: {e}");
                return;
            }
        };
        Self::print_guild_roster(&guild.name, &members);

        let db_members = match db::server_members(&self.pool, guild_id).await {
            Ok(db_members) => db_members,
            Err(e) => {
                eprintln!("Failed to read the roster of guild {guild_id}: {e}");
                return;
            }
        };
        if let Err(e) = Diff::of_members(&db_members, &members)
            .sync(&self.pool, guild_id)
            .await
        {
            eprintln!("Failed to reconcile the roster of guild {guild_id}: {e}");
        }

        Self::register_slash_commands(&ctx, guild_id).await;
    }

    async fn guild_delete(&self, ctx: Context, incomplete: UnavailableGuild, _full: Option<Guild>) {
        // An outage sets `unavailable`; only a true removal evicts.
        if incomplete.unavailable {
            return;
        }
        let mut wlock = ctx.data.write().await;
        let store = wlock
            .get_mut::<GuildCfgKey>()
            .expect("Failed to get the guild config store from the typemap");
        store.evict(incomplete.id);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        if msg.content.starts_with(self.discord_prefix()) {
            return;
        }
        let Some(guild_id) = msg.guild_id else {
            return;
        };

        let Some(cfg) = guild_cfg::cached_with_retry(&ctx, guild_id).await else {
            eprintln!("No configuration for guild {guild_id} after retries; dropping XP credit");
            return;
        };

        let seat = {
            let mut wlock = ctx.data.write().await;
            let app_state = wlock
                .get_mut::<AppStateKey>()
                .expect("Failed to get the app state from the typemap");
            if !app_state.cooldown_passed(guild_id, msg.author.id, self.xp_cooldown()) {
                return;
            }
            app_state.voice.seat(guild_id, msg.author.id)
        };

        let author: Member = match msg.member(&ctx).await {
            Ok(member) => member,
            Err(e) => {
                eprintln!("Failed to get member info for the message author: {e}");
                return;
            }
        };

        println!("{}: {}", msg.author.name, msg.content);
        match manage_xp(&ctx.http, &self.pool, &cfg, seat, &author, Activity::Message).await {
            Ok(XpOutcome::Accumulated { gain, xp }) => {
                println!("{} gained {gain} xp ({xp} under the belt)", msg.author.name);
            }
            Ok(XpOutcome::LeveledUp { new_level, .. }) => {
                println!("{} leveled up to {new_level}", msg.author.name);
            }
            Ok(XpOutcome::Skipped) => (),
            Err(e) => {
                eprintln!("Sqlx error during adjusting experience: {e}");
            }
        }
    }

    async fn voice_state_update(&self, ctx: Context, _old: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id else {
            return;
        };
        let presence = new.channel_id.map(|channel_id| VoicePresence {
            channel_id,
            deafened: new.self_deaf || new.deaf,
            bot: new.member.as_ref().map_or(false, |m| m.user.bot),
        });
        let mut wlock = ctx.data.write().await;
        let app_state = wlock
            .get_mut::<AppStateKey>()
            .expect("Failed to get the app state from the typemap");
        app_state.voice.update(guild_id, new.user_id, presence);
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        let ReactionType::Unicode(ref emoji) = reaction.emoji else {
            return;
        };
        let accepted = emoji == PRESTIGE_ACCEPT;
        if !accepted && emoji != PRESTIGE_REJECT {
            return;
        }
        let (Some(guild_id), Some(user_id)) = (reaction.guild_id, reaction.user_id) else {
            return;
        };

        let pending = {
            let mut wlock = ctx.data.write().await;
            let app_state = wlock
                .get_mut::<AppStateKey>()
                .expect("Failed to get the app state from the typemap");
            app_state.resolve_prestige(reaction.message_id, user_id)
        };
        if pending.is_none() {
            return;
        }

        if !accepted {
            if let Err(e) = reaction
                .channel_id
                .say(&ctx.http, "The prestige request was cancelled.")
                .await
            {
                eprintln!("Failed to confirm the cancellation: {e}");
            }
            return;
        }

        let Some(cfg) = guild_cfg::cached(&ctx, guild_id).await else {
            eprintln!("No configuration for guild {guild_id}; dropping the prestige request");
            return;
        };
        let member = match guild_id.member(&ctx, user_id).await {
            Ok(member) => member,
            Err(e) => {
                eprintln!("Failed to fetch the prestige candidate {user_id}: {e}");
                return;
            }
        };
        let progress = match db::user_progress(&self.pool, guild_id, user_id).await {
            Ok(progress) => progress,
            Err(e) => {
                eprintln!("Failed to read the progress of {user_id}: {e}");
                return;
            }
        };
        // Eligibility may have lapsed while the request sat pending.
        if let Err(rej) = commands::prestige::eligibility(&progress, &cfg) {
            if let Err(e) = reaction.channel_id.say(&ctx.http, rej.user_message()).await {
                eprintln!("Failed to report the lapsed eligibility: {e}");
            }
            return;
        }

        match added_prestige(&ctx.http, &self.pool, &cfg, &member).await {
            Ok(change) => {
                let text = format!(
                    "🍀 {} entered prestige tier {}! Back on the road at level {} with {} XP.",
                    member.mention(),
                    change.prestige,
                    change.level,
                    change.xp
                );
                if let Err(e) = reaction.channel_id.say(&ctx.http, &text).await {
                    eprintln!("Failed to announce the prestige: {e}");
                }
            }
            Err(e) => {
                eprintln!("Failed to apply the prestige of {user_id}: {e}");
                report_to_moderators(
                    &ctx.http,
                    &cfg,
                    &format!(
                        "A confirmed prestige of {} failed to apply: {e}",
                        member.user.tag()
                    ),
                )
                .await;
            }
        }
    }

    async fn guild_member_addition(&self, ctx: Context, new_member: Member) {
        let guild_id = new_member.guild_id;
        if let Err(e) = db::ensure_member(&self.pool, guild_id, new_member.user.id).await {
            eprintln!(
                "Failed to record the arrival of {}: {e}",
                new_member.user.tag()
            );
            return;
        }
        // A returning member gets their reward role back.
        let Some(cfg) = guild_cfg::cached_with_retry(&ctx, guild_id).await else {
            return;
        };
        let progress = match db::user_progress(&self.pool, guild_id, new_member.user.id).await {
            Ok(progress) => progress,
            Err(e) => {
                eprintln!("Failed to read the progress of a newcomer: {e}");
                return;
            }
        };
        manage_levels(
            &ctx.http,
            &cfg,
            &new_member,
            progress.level,
            SyncReason::SetLevel,
        )
        .await;
    }

    async fn guild_member_removal(
        &self,
        _ctx: Context,
        guild_id: GuildId,
        user: User,
        _member_data: Option<Member>,
    ) {
        #[allow(clippy::cast_possible_wrap)]
        let discord_id = id::<u64>(user.id.0) as i64;
        if let Err(e) = db::mark_as_quitters(&self.pool, guild_id, &[discord_id]).await {
            eprintln!("Failed to record the departure of {}: {e}", user.tag());
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::ApplicationCommand(cmd) = interaction else {
            return;
        };
        let source = SlashSource(&cmd);
        let res = match cmd.data.name.as_str() {
            "rank" => commands::rank::rank_card(&ctx, &source).await,
            "prestige" => commands::prestige::request_prestige(&ctx, &source).await,
            _ => Ok(()),
        };
        if let Err(e) = res {
            eprintln!("Slash command '{}' errored: {e:?}", cmd.data.name);
        }
    }
}
