use crate::bot::resilient::{
    delete_message_quiet, edit_message_safe_resilient, send_message_resilient,
};
use crate::bot::views::{self, CallbackAction};
use anyhow::Result;
use followwatch_core::tracker::{normalize_handle, CheckReport, Tracker, TrackerError};
use std::sync::Arc;
use teloxide::{
    prelude::*,
    types::{ChatId, MessageId},
    utils::command::BotCommands,
};
use tracing::{info, warn};

fn get_user_name(msg: &Message) -> String {
    if let Some(ref user) = msg.from {
        if let Some(ref username) = user.username {
            return username.clone();
        }
        if !user.first_name.is_empty() {
            return user.first_name.clone();
        }
    }
    "Unknown".to_string()
}

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the welcome message
    #[command(description = "Start the bot.")]
    Start,
    /// Show the user guide
    #[command(description = "Show help.")]
    Help,
    /// Start tracking a handle or check it for updates
    #[command(description = "Track a Twitter user or check for updates.")]
    Track(String),
    /// List tracked handles
    #[command(description = "List all tracked users.")]
    List,
    /// Stop tracking a handle
    #[command(description = "Stop tracking a user.")]
    Remove(String),
    /// Show remaining API credits
    #[command(description = "Check remaining API credits.")]
    Credits,
}

/// Start handler
///
/// # Errors
///
/// Returns an error if the welcome message cannot be sent.
pub async fn start(bot: Bot, msg: Message) -> Result<()> {
    info!(
        "User {} ({}) initiated /start command.",
        get_user_id_safe(&msg),
        get_user_name(&msg)
    );
    send_message_resilient(&bot, msg.chat.id, views::welcome(), None).await?;
    Ok(())
}

/// Help handler
///
/// # Errors
///
/// Returns an error if the guide cannot be sent.
pub async fn help(bot: Bot, msg: Message) -> Result<()> {
    send_message_resilient(&bot, msg.chat.id, views::help(), None).await?;
    Ok(())
}

/// `/track <handle>`: first check or update check
///
/// # Errors
///
/// Returns an error if Telegram messages cannot be sent. Upstream and store
/// failures are reported to the chat instead.
pub async fn track(bot: Bot, msg: Message, tracker: Arc<Tracker>, arg: String) -> Result<()> {
    let chat_id = msg.chat.id;
    if arg.trim().is_empty() {
        send_message_resilient(&bot, chat_id, views::usage("track"), None).await?;
        return Ok(());
    }

    let handle = match normalize_handle(&arg) {
        Ok(handle) => handle,
        Err(e) => {
            send_message_resilient(&bot, chat_id, views::error("Error", &e.to_string()), None)
                .await?;
            return Ok(());
        }
    };

    info!("User {} checks @{handle}", get_user_id_safe(&msg));
    let loading = send_message_resilient(&bot, chat_id, views::fetching(&handle), None).await?;
    run_check(&bot, chat_id, &tracker, &handle, loading.id).await
}

/// Runs a check and turns the loading message into its result
async fn run_check(
    bot: &Bot,
    chat_id: ChatId,
    tracker: &Tracker,
    handle: &str,
    loading: MessageId,
) -> Result<()> {
    let observation = match tracker.observe(handle).await {
        Ok(observation) => observation,
        Err(e) => {
            warn!("Check of @{handle} failed: {e}");
            let text = views::error("Error", &e.to_string());
            edit_message_safe_resilient(bot, chat_id, loading, &text, None).await;
            return Ok(());
        }
    };

    if let Some(delta) = observation.new_followings() {
        edit_message_safe_resilient(bot, chat_id, loading, &views::detected(delta), None).await;
    }

    match tracker.apply(observation).await {
        Ok(report) => deliver_report(bot, chat_id, loading, report).await,
        Err(e) => {
            warn!("Check of @{handle} failed: {e}");
            let context = match &e {
                TrackerError::Upstream(_) => "Error fetching following list",
                _ => "Error",
            };
            let text = views::error(context, &e.to_string());
            edit_message_safe_resilient(bot, chat_id, loading, &text, None).await;
            Ok(())
        }
    }
}

async fn deliver_report(
    bot: &Bot,
    chat_id: ChatId,
    loading: MessageId,
    report: CheckReport,
) -> Result<()> {
    let keyboard = views::user_keyboard(&report.account().handle);

    let text = match &report {
        CheckReport::FirstTracked { account } => views::first_tracked(account),
        CheckReport::Decreased { account, by } => views::decreased(account, *by),
        CheckReport::Unchanged { account } => views::unchanged(account),
        CheckReport::NewFollowings {
            account,
            delta,
            outcome,
        } => {
            delete_message_quiet(bot, chat_id, loading).await;
            for chunk in views::following_list(&outcome.records) {
                send_message_resilient(bot, chat_id, chunk, None).await?;
            }
            let summary = views::new_followings_summary(account, *delta, outcome);
            send_message_resilient(bot, chat_id, summary, Some(keyboard)).await?;
            return Ok(());
        }
    };

    if !edit_message_safe_resilient(bot, chat_id, loading, &text, Some(keyboard.clone())).await {
        send_message_resilient(bot, chat_id, text, Some(keyboard)).await?;
    }
    Ok(())
}

/// `/list`
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn list(bot: Bot, msg: Message, tracker: Arc<Tracker>) -> Result<()> {
    let text = match tracker.tracked().await {
        Ok(accounts) => views::tracked_users(&accounts),
        Err(e) => views::error("Error", &e.to_string()),
    };
    send_message_resilient(&bot, msg.chat.id, text, None).await?;
    Ok(())
}

/// `/remove <handle>`
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn remove(bot: Bot, msg: Message, tracker: Arc<Tracker>, arg: String) -> Result<()> {
    let text = if arg.trim().is_empty() {
        views::usage("remove")
    } else {
        untrack_text(&tracker, &arg).await
    };
    send_message_resilient(&bot, msg.chat.id, text, None).await?;
    Ok(())
}

async fn untrack_text(tracker: &Tracker, raw: &str) -> String {
    match tracker.untrack(raw).await {
        Ok(existed) => views::removed(raw.trim().trim_start_matches('@'), existed),
        Err(e) => views::error("Error", &e.to_string()),
    }
}

/// `/credits`
///
/// # Errors
///
/// Returns an error if Telegram messages cannot be sent.
pub async fn credits(bot: Bot, msg: Message, tracker: Arc<Tracker>) -> Result<()> {
    let chat_id = msg.chat.id;
    let loading =
        send_message_resilient(&bot, chat_id, "⏳ Checking API credits...", None).await?;

    let text = match tracker.credits().await {
        Ok(credits) => views::credits(&credits),
        Err(e) => views::error("Error fetching credits", &e.to_string()),
    };
    if !edit_message_safe_resilient(&bot, chat_id, loading.id, &text, None).await {
        send_message_resilient(&bot, chat_id, text, None).await?;
    }
    Ok(())
}

/// Inline button presses under check results
///
/// # Errors
///
/// Returns an error if Telegram calls fail.
pub async fn handle_callback(bot: Bot, q: CallbackQuery, tracker: Arc<Tracker>) -> Result<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        return Ok(());
    };
    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id;

    match action {
        CallbackAction::Check(handle) => {
            info!("User {} checks @{handle} from button", q.from.id);
            let loading =
                send_message_resilient(&bot, chat_id, views::fetching(&handle), None).await?;
            run_check(&bot, chat_id, &tracker, &handle, loading.id).await
        }
        CallbackAction::Remove(handle) => {
            let text = untrack_text(&tracker, &handle).await;
            if !edit_message_safe_resilient(&bot, chat_id, message.id(), &text, None).await {
                send_message_resilient(&bot, chat_id, text, None).await?;
            }
            Ok(())
        }
    }
}
