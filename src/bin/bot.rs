use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info};
use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::guild::Member;
use serenity::prelude::*;

use nekoni::command_handler::{CommandHandler, ShardManagerContainer};
use nekoni::config::Config;
use nekoni::events;

struct Handler {
    command_handler: CommandHandler,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if let Err(e) = self.command_handler.handle_message(&ctx, &msg).await {
            error!("Error handling message {}: {}", msg.id, e);
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        events::on_ready(&ctx, &ready, self.command_handler.config()).await;
    }

    async fn guild_member_addition(&self, ctx: Context, new_member: Member) {
        events::on_member_join(&ctx, &new_member, self.command_handler.config()).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .init();
            error!("{}", e);
            eprintln!("{}", e);
            return Err(e);
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting NekoNi bot with prefix '{}'...", config.command_prefix);

    let token = config.discord_token.clone();
    let handler = Handler {
        command_handler: CommandHandler::new(config),
    };

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {}", e);
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    {
        let mut data = client.data.write().await;
        data.insert::<ShardManagerContainer>(client.shard_manager.clone());
    }

    info!("Connecting to Discord gateway with intents {:?}", intents);

    if let Err(why) = client.start().await {
        error!("Gateway connection failed: {:?}", why);
        return Err(anyhow::anyhow!("Failed to establish gateway connection: {}", why));
    }

    Ok(())
}
