use crate::media::{MediaArtifact, MediaFormat, UploadError};
use crate::prelude::*;
use crate::util::{display, temp_file, DynResult};
use crate::{fatal, tg, Error, ErrorKind, Result};
use std::sync::Arc;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileMeta, InlineKeyboardButton, InlineKeyboardMarkup, Message};
use teloxide::utils::markdown;

pub(crate) fn filter(msg: Message) -> bool {
    msg.animation().is_some() || msg.document().is_some()
}

/// The job boundary: every per-job error is converted into a user-visible
/// reply here, none of them may crash the dispatcher.
pub(crate) async fn handle(ctx: Arc<tg::Ctx>, msg: Message) -> DynResult {
    if let Err(err) = process_media(&ctx, &msg).await {
        warn!(err = tracing_err(&err), id = err.id(), "GIF job failed");

        metrics::increment_counter!("gif_jobs_total", "result" => "err");

        let reply = user_message(&err);
        let reply_result = ctx
            .bot
            .send_message(msg.chat.id, reply)
            .reply_to_message_id(msg.id)
            .await;

        if let Err(err) = reply_result {
            warn!(
                err = tracing_err(&err),
                "Failed to reply with the error message to the user"
            );
        }
    }

    Ok(())
}

fn user_message(err: &Error) -> String {
    match err.kind() {
        ErrorKind::Upload {
            source: UploadError::AllEndpointsExhausted { .. },
        } => markdown::escape("Upload failed - all hosting services are down. Try again later."),
        _ => markdown::escape(&format!(
            "Something went wrong, try again later (error id: {})",
            err.id()
        )),
    }
}

#[instrument(skip_all, fields(chat = %msg.chat.id, msg_id = msg.id.0))]
async fn process_media(ctx: &tg::Ctx, msg: &Message) -> Result {
    let Some(file) = file_meta(msg) else {
        return Err(fatal!("Message passed the media filter without a media attachment"));
    };

    let status = ctx
        .bot
        .send_message(msg.chat.id, markdown::escape("Processing your GIF..."))
        .reply_to_message_id(msg.id)
        .await?;

    let input = download(ctx, file).await?;

    info!(size = input.size(), "Downloaded the original media");
    metrics::histogram!("gif_original_size_bytes", input.size() as f64);

    ctx.bot
        .edit_message_text(
            msg.chat.id,
            status.id,
            markdown::escape("Converting to an optimized GIF..."),
        )
        .await?;

    let artifact = ctx.media.optimize(input).await;

    metrics::histogram!("gif_final_size_bytes", artifact.size() as f64);

    ctx.bot
        .edit_message_text(
            msg.chat.id,
            status.id,
            markdown::escape("Uploading your GIF..."),
        )
        .await?;

    let url = ctx.media.publish(&artifact).await.map_err(Error::from)?;

    let size = display::human_size(artifact.size());
    let format = match artifact.format() {
        MediaFormat::Gif => "Optimized GIF",
        // ffmpeg was missing or every profile failed; the original was
        // uploaded as is
        MediaFormat::Source => "Original file (conversion unavailable)",
    };

    let summary = markdown::escape(&format!(
        "✅ Your GIF is ready!\n\n📁 Size: {size}\n🎯 Format: {format}\n\n\
        Click the button below or copy the link from the next message."
    ));

    let keyboard = InlineKeyboardMarkup::new([[InlineKeyboardButton::url(
        "📥 Download GIF",
        url.clone(),
    )]]);

    ctx.bot
        .edit_message_text(msg.chat.id, status.id, summary)
        .reply_markup(keyboard)
        .await?;

    // A separate message with just the link, so it's easy to copy on mobile
    ctx.bot
        .send_message(msg.chat.id, markdown::code_inline(url.as_str()))
        .await?;

    metrics::increment_counter!("gif_jobs_total", "result" => "ok");

    Ok(())
}

fn file_meta(msg: &Message) -> Option<&FileMeta> {
    if let Some(animation) = msg.animation() {
        return Some(&animation.file);
    }

    msg.document().map(|document| &document.file)
}

async fn download(ctx: &tg::Ctx, file: &FileMeta) -> Result<MediaArtifact> {
    let file = ctx.bot.get_file(file.id.clone()).await?;

    let path = temp_file::scratch_path("bin");

    let mut dst = tokio::fs::File::create(&path)
        .await
        .fatal_ctx(|| format!("Failed to create a scratch file at {path:?}"))?;
    ctx.bot.inner().download_file(&file.path, &mut dst).await?;
    dst.sync_all().await?;

    Ok(MediaArtifact::from_scratch_path(path, MediaFormat::Source).await?)
}
