//! Telegram bot root module

mod cmd;
mod gif;

use crate::prelude::*;
use crate::{http, media, Result};
use dptree::di::DependencyMap;
use serde::Deserialize;
use std::sync::Arc;
use teloxide::adaptors::{CacheMe, DefaultParseMode, Throttle, Trace};
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;

#[derive(Deserialize, Clone)]
pub(crate) struct Config {
    pub(crate) bot_token: String,
}

pub(crate) type Bot = Trace<CacheMe<DefaultParseMode<Throttle<teloxide::Bot>>>>;

pub(crate) struct Ctx {
    bot: Bot,
    media: media::MediaService,
}

pub(crate) async fn run_bot(config: crate::Config) -> Result {
    let http = http::create_client();

    let bot: Bot = teloxide::Bot::new(config.tg.bot_token)
        .throttle(Default::default())
        .parse_mode(ParseMode::MarkdownV2)
        .cache_me()
        .trace(teloxide::adaptors::trace::Settings::all());

    let mut di = DependencyMap::new();

    di.insert(Arc::new(Ctx {
        bot: bot.clone(),
        media: media::MediaService::new(&config.media, http),
    }));

    info!("Starting bot...");

    bot.set_my_commands(cmd::Cmd::bot_commands()).await?;

    let handler = dptree::entry()
        .inspect(|update: Update| {
            metrics::increment_counter!("tg_updates_total");
            trace!(target: "tg_update", update_id = update.id, "Received an update");
        })
        .branch(
            Update::filter_message()
                .filter_command::<cmd::Cmd>()
                .endpoint(cmd::handle::<cmd::Cmd>()),
        )
        .branch(
            Update::filter_message()
                .filter(gif::filter)
                .endpoint(gif::handle),
        );

    Dispatcher::builder(bot, handler)
        .dependencies(di)
        // We don't handle all possible messages that users send,
        // so to suppress the warning that we don't do this we have
        // a noop default handler here
        .default_handler(|_| std::future::ready(()))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped");

    Ok(())
}
