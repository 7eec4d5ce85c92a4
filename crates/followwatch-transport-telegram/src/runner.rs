use crate::bot;
use crate::bot::handlers::{get_user_id_safe, Command};
use crate::bot::{Access, AccessGate};
use crate::config::{get_access_notice_cache_max_size, get_access_notice_cooldown, BotSettings};
use followwatch_core::storage::JsonFileStore;
use followwatch_core::tracker::Tracker;
use followwatch_core::twitter::TwitterClient;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{error, info};

/// Run the Telegram transport runtime.
pub async fn run_bot(settings: Arc<BotSettings>) {
    let tracker = init_tracker(&settings).await;

    let bot = Bot::new(settings.telegram.telegram_bot_token.clone());
    let access_gate = init_access_gate(&settings);
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![tracker, settings, access_gate])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn init_tracker(settings: &BotSettings) -> Arc<Tracker> {
    let path = settings.tracker.users_db_path();
    let store = match JsonFileStore::open(&path).await {
        Ok(store) => {
            info!("Tracking store opened at {}", store.path().display());
            Arc::new(store)
        }
        Err(e) => {
            error!("Failed to open tracking store {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };

    let client = Arc::new(TwitterClient::new(settings.tracker.as_ref()));
    info!("Twitter client initialized.");

    Arc::new(Tracker::new(
        client,
        store,
        settings.tracker.effective_max_pages(),
    ))
}

fn init_access_gate(settings: &BotSettings) -> Arc<AccessGate> {
    let allowed = settings.telegram.allowed_users();
    let cooldown = get_access_notice_cooldown();
    let max_size = get_access_notice_cache_max_size();

    if allowed.is_empty() {
        info!("No ALLOWED_USERS configured, the bot is open to everyone");
    } else {
        info!(
            "Access limited to {} users (notice cooldown: {}s, max_size: {})",
            allowed.len(),
            cooldown.as_secs(),
            max_size
        );
    }

    Arc::new(AccessGate::new(allowed, cooldown, max_size))
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_callback_query()
                .filter(|q: CallbackQuery, gate: Arc<AccessGate>| {
                    gate.permits(q.from.id.0.cast_signed())
                })
                .endpoint(handle_callback),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message, gate: Arc<AccessGate>| {
                    gate.permits(get_user_id_safe(&msg))
                })
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message, gate: Arc<AccessGate>| {
                    !gate.permits(get_user_id_safe(&msg))
                })
                .endpoint(handle_unauthorized),
        )
}

async fn handle_unauthorized(
    bot: Bot,
    msg: Message,
    gate: Arc<AccessGate>,
) -> Result<(), teloxide::RequestError> {
    let user_id = get_user_id_safe(&msg);
    if gate.admit(user_id).await != Access::Denied {
        return respond(());
    }

    let user_name = msg
        .from
        .as_ref()
        .map_or_else(|| "Unknown".to_string(), |u| u.first_name.clone());
    info!(
        "⛔️ Unauthorized access from user {} ({}). Sending denial message.",
        user_id, user_name
    );

    if let Err(e) = bot.send_message(msg.chat.id, "⛔️ Access denied").await {
        error!("Failed to send access denied message to {}: {}", user_id, e);
    } else {
        gate.notice_sent(user_id).await;
    }

    respond(())
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    tracker: Arc<Tracker>,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => bot::handlers::start(bot, msg).await,
        Command::Help => bot::handlers::help(bot, msg).await,
        Command::Track(arg) => bot::handlers::track(bot, msg, tracker, arg).await,
        Command::List => bot::handlers::list(bot, msg, tracker).await,
        Command::Remove(arg) => bot::handlers::remove(bot, msg, tracker, arg).await,
        Command::Credits => bot::handlers::credits(bot, msg, tracker).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    tracker: Arc<Tracker>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_callback(bot, q, tracker).await {
        error!("Callback handler error: {}", e);
    }
    respond(())
}
