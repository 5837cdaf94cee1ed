use serenity::async_trait;
use serenity::builder::CreateEmbed;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::prelude::{ChannelId, GuildId, Message, UserId};
use serenity::prelude::Context;

/// One reply surface for both command entry points. Command cores are
/// written against this trait once instead of branching on the concrete
/// entry type at every call site.
#[async_trait]
pub(crate) trait CommandSource: Send + Sync {
    fn author_id(&self) -> UserId;
    fn guild_id(&self) -> Option<GuildId>;
    fn channel_id(&self) -> ChannelId;
    async fn reply(&self, ctx: &Context, content: &str) -> serenity::Result<()>;
    async fn reply_embed(&self, ctx: &Context, embed: CreateEmbed) -> serenity::Result<()>;
}

/// A prefix command invocation.
pub(crate) struct MessageSource<'a>(pub(crate) &'a Message);

#[async_trait]
impl CommandSource for MessageSource<'_> {
    fn author_id(&self) -> UserId {
        self.0.author.id
    }

    fn guild_id(&self) -> Option<GuildId> {
        self.0.guild_id
    }

    fn channel_id(&self) -> ChannelId {
        self.0.channel_id
    }

    async fn reply(&self, ctx: &Context, content: &str) -> serenity::Result<()> {
        self.0.reply(&ctx.http, content).await?;
        Ok(())
    }

    async fn reply_embed(&self, ctx: &Context, embed: CreateEmbed) -> serenity::Result<()> {
        self.0
            .channel_id
            .send_message(&ctx.http, |m| {
                m.reference_message(self.0).set_embed(embed)
            })
            .await?;
        Ok(())
    }
}

/// A slash command invocation.
pub(crate) struct SlashSource<'a>(pub(crate) &'a ApplicationCommandInteraction);

#[async_trait]
impl CommandSource for SlashSource<'_> {
    fn author_id(&self) -> UserId {
        self.0.user.id
    }

    fn guild_id(&self) -> Option<GuildId> {
        self.0.guild_id
    }

    fn channel_id(&self) -> ChannelId {
        self.0.channel_id
    }

    async fn reply(&self, ctx: &Context, content: &str) -> serenity::Result<()> {
        self.0
            .create_interaction_response(&ctx.http, |r| {
                r.kind(InteractionResponseType::ChannelMessageWithSource)
                    .interaction_response_data(|d| d.content(content))
            })
            .await
    }

    async fn reply_embed(&self, ctx: &Context, embed: CreateEmbed) -> serenity::Result<()> {
        self.0
            .create_interaction_response(&ctx.http, |r| {
                r.kind(InteractionResponseType::ChannelMessageWithSource)
                    .interaction_response_data(|d| d.add_embed(embed))
            })
            .await
    }
}
