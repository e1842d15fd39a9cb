use crate::prelude::*;
use crate::util::DynResult;
use crate::{tg, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use teloxide::macros::BotCommands;
use teloxide::prelude::*;
use teloxide::types::Message;
use teloxide::utils::markdown;

#[async_trait]
pub(crate) trait Command: fmt::Debug + Send + Sync + 'static {
    async fn handle(self, ctx: &tg::Ctx, msg: &Message) -> Result;
}

pub(crate) fn handle<'a, C: Command>(
) -> impl Fn(Arc<tg::Ctx>, Message, C) -> BoxFuture<'a, DynResult> {
    move |ctx, msg, cmd| {
        let span = info_span!(
            "handle_command",
            chat = %msg.chat.id,
            cmd = format_args!("{cmd:#?}")
        );

        let fut = async move {
            debug!("Processing command");

            let result = cmd.handle(&ctx, &msg).await;
            if let Err(err) = &result {
                warn!(err = tracing_err(err), id = err.id(), "Command handler returned an error");

                let reply_msg = markdown::code_block(&err.display_chain().to_string());

                let msg_result = ctx
                    .bot
                    .send_message(msg.chat.id, reply_msg)
                    .reply_to_message_id(msg.id)
                    .await;

                if let Err(err) = msg_result {
                    warn!(
                        err = tracing_err(&err),
                        "Failed to reply with the error message to the user"
                    );
                }
            }
            result.map_err(Into::into)
        };

        Box::pin(fut.instrument(span))
    }
}

#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "snake_case", description = "Commands:")]
pub(crate) enum Cmd {
    #[command(description = "show the guide")]
    Help,

    #[command(description = "start the bot")]
    Start,
}

#[async_trait]
impl Command for Cmd {
    async fn handle(self, ctx: &tg::Ctx, msg: &Message) -> Result {
        match self {
            Cmd::Help | Cmd::Start => {
                let guide = markdown::escape(
                    "Hi! Send me a GIF or a short video and I'll re-encode it \
                    as an optimized GIF and reply with a download link.\n\n\
                    Works on any device - no special setup needed.",
                );

                ctx.bot
                    .send_message(msg.chat.id, guide)
                    .reply_to_message_id(msg.id)
                    .await?;
            }
        }
        Ok(())
    }
}
