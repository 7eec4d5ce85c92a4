//! Message texts.

use super::keyboards::profile_url;
use chrono::{DateTime, Utc};
use followwatch_core::reconcile::{pages_needed, ReconciliationOutcome, StopReason};
use followwatch_core::storage::TrackedAccount;
use followwatch_core::twitter::{Credits, TwitterUser};
use followwatch_core::utils::truncate_str;
use html_escape::encode_text;

/// Maximum message length for Telegram with safety margin.
/// Telegram's official limit is 4096.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;

const SEPARATOR: &str = "━━━━━━━━━━━━━━━━━━";
const DESCRIPTION_LIMIT: usize = 100;
const CARD_DESCRIPTION_LIMIT: usize = 150;

/// Shorten large counts: `1.2K`, `3.4M`
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_number(num: u64) -> String {
    if num >= 1_000_000 {
        format!("{:.1}M", num as f64 / 1_000_000.0)
    } else if num >= 1_000 {
        format!("{:.1}K", num as f64 / 1_000.0)
    } else {
        num.to_string()
    }
}

/// Provider creation date as `10 December 2024`; unparsable input is returned as is
#[must_use]
pub fn format_join_date(raw: &str) -> String {
    DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y")
        .map_or_else(|_| raw.to_string(), |dt| dt.format("%d %B %Y").to_string())
}

/// Timestamp as `10 Dec 2024, 07:00`
#[must_use]
pub fn format_checked_at(at: &DateTime<Utc>) -> String {
    at.format("%d %b %Y, %H:%M").to_string()
}

fn profile_link(handle: &str) -> String {
    let handle = encode_text(handle);
    format!("<a href=\"{}\">@{handle}</a>", profile_url(&handle))
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

/// Profile card of a tracked account
#[must_use]
pub fn user_card(user: &TwitterUser) -> String {
    let name = encode_text(or_placeholder(&user.name, "N/A")).into_owned();
    let description = truncate_str(
        or_placeholder(&user.description, "No description"),
        CARD_DESCRIPTION_LIMIT,
    );

    format!(
        "<b>{name}</b>\n{}\n\n<i>{}</i>\n\n\
         👥 Followers: <b>{}</b>\n\
         ➕ Following: <b>{}</b>\n\
         📝 Tweets: <b>{}</b>\n\
         📅 Joined: {}\n",
        profile_link(&user.user_name),
        encode_text(&description),
        format_number(user.followers),
        format_number(user.following),
        format_number(user.statuses_count),
        encode_text(&format_join_date(or_placeholder(&user.created_at, "N/A"))),
    )
}

fn following_entry(index: usize, user: &TwitterUser) -> String {
    let description = or_placeholder(&user.description, "No description");
    let description = if description.chars().count() > DESCRIPTION_LIMIT {
        format!("{}...", truncate_str(description, DESCRIPTION_LIMIT - 3))
    } else {
        description.to_string()
    };

    format!(
        "<b>{index}. {}</b>\n{}\n<i>{}</i>\n\n👥 {} • ➕ {} • 📝 {}\n📅 {}\n{SEPARATOR}\n\n",
        encode_text(or_placeholder(&user.name, "N/A")),
        profile_link(&user.user_name),
        encode_text(&description),
        format_number(user.followers),
        format_number(user.following),
        format_number(user.statuses_count),
        encode_text(&format_join_date(or_placeholder(&user.created_at, "N/A"))),
    )
}

/// New followings, split into messages below [`TELEGRAM_MESSAGE_LIMIT`]
#[must_use]
pub fn following_list(records: &[TwitterUser]) -> Vec<String> {
    if records.is_empty() {
        return vec!["No new following.".to_string()];
    }

    let mut messages = vec![format!(
        "<b>🆕 New Following Detected!</b>\n\nTotal: <b>{}</b> new account\n{SEPARATOR}\n\n",
        records.len()
    )];

    for (idx, user) in records.iter().enumerate() {
        let entry = following_entry(idx + 1, user);
        let entry_len = entry.chars().count();
        match messages.last_mut() {
            Some(last) if last.chars().count() + entry_len <= TELEGRAM_MESSAGE_LIMIT => {
                last.push_str(&entry);
            }
            _ => messages.push(entry),
        }
    }

    messages
}

/// Loading message while the profile is fetched
#[must_use]
pub fn fetching(handle: &str) -> String {
    format!("⏳ Fetching data for @{}...", encode_text(handle))
}

/// Progress message once new followings were detected
#[must_use]
pub fn detected(delta: usize) -> String {
    let mut text = format!("🔍 Detected {delta} new following! Fetching details");
    if delta > 200 {
        text.push_str(&format!(" ({} API calls needed)", pages_needed(delta)));
    }
    text.push_str("...");
    text
}

/// Reply to the first check of a handle
#[must_use]
pub fn first_tracked(account: &TrackedAccount) -> String {
    let handle = encode_text(&account.handle);
    format!(
        "✅ <b>Success tracking @{handle}!</b>\n\n{}\n💡 Use <code>/track {handle}</code> to check for updates.",
        user_card(&account.profile)
    )
}

/// Summary sent after the list of new followings
#[must_use]
pub fn new_followings_summary(
    account: &TrackedAccount,
    delta: usize,
    outcome: &ReconciliationOutcome,
) -> String {
    let mut text = format!(
        "✅ <b>Update Complete</b>\n\nUser: @{}\nNew following: <b>{delta}</b>\nTotal following: <b>{}</b>\n",
        encode_text(&account.handle),
        account.following_count
    );

    if outcome.pages_fetched > 1 {
        text.push_str(&format!(
            "\n📄 Pages fetched: <b>{}</b>\n💳 API calls used: <b>{}</b>\n",
            outcome.pages_fetched, outcome.pages_fetched
        ));
    }

    if outcome.is_partial() {
        let reason = match outcome.stop_reason {
            Some(StopReason::PageCeiling) => "page limit reached",
            Some(StopReason::UpstreamFailure) => "a later page failed to load",
            _ => "provider returned fewer accounts",
        };
        text.push_str(&format!(
            "\n⚠️ Partial result: showing <b>{}</b> of {delta} ({reason})\n",
            outcome.records.len()
        ));
    }

    text
}

/// Reply when the following count went down
#[must_use]
pub fn decreased(account: &TrackedAccount, by: u64) -> String {
    format!(
        "📊 <b>Update for @{}</b>\n\nFollowing decrease: <b>{by}</b>\nTotal following: <b>{}</b>\n\nℹ️ User unfollowed accounts",
        encode_text(&account.handle),
        account.following_count
    )
}

/// Reply when nothing changed
#[must_use]
pub fn unchanged(account: &TrackedAccount) -> String {
    format!(
        "✅ <b>@{}</b> is up-to-date!\n\nFollowing: <b>{}</b>\nNothing changed.",
        encode_text(&account.handle),
        account.following_count
    )
}

/// List of tracked accounts
#[must_use]
pub fn tracked_users(accounts: &[TrackedAccount]) -> String {
    if accounts.is_empty() {
        return "No users are being tracked.\n\nUse <code>/track username</code> to start tracking."
            .to_string();
    }

    let mut text = "<b>📋 Tracked users</b>\n\n".to_string();
    for account in accounts {
        text.push_str(&format!(
            "• <b>{}</b>\n  Following: {} | Checked: {}x\n  Last: {}\n\n",
            encode_text(&account.handle),
            account.following_count,
            account.check_count,
            format_checked_at(&account.last_checked),
        ));
    }
    text.push_str(&format!(
        "Total: <b>{}</b> user\n\nUse <code>/track username</code> to check for updates.",
        accounts.len()
    ));
    text
}

/// Remaining API credits
#[must_use]
pub fn credits(credits: &Credits) -> String {
    format!(
        "💳 <b>API Credits Information</b>\n\n\
         💰 Recharge Credits: <b>{}</b>\n\
         🎁 Bonus Credits: <b>{}</b>\n\
         📊 Total Available: <b>{}</b>",
        credits.recharge_credits,
        credits.total_bonus_credits,
        credits.total()
    )
}

/// Error text shown to the user, escaped
#[must_use]
pub fn error(context: &str, message: &str) -> String {
    format!("❌ {context}: {}", encode_text(message))
}

/// Usage hint for commands that need a handle
#[must_use]
pub fn usage(command: &str) -> String {
    format!(
        "❌ Use format: <code>/{command} username</code>\n\nExample: <code>/{command} loxous</code>"
    )
}

/// Reply to `/remove`
#[must_use]
pub fn removed(handle: &str, existed: bool) -> String {
    let handle = encode_text(handle);
    if existed {
        format!("✅ Stopped tracking @{handle}")
    } else {
        format!("❌ User @{handle} not found in tracking list")
    }
}

/// Reply to `/start`
#[must_use]
pub fn welcome() -> &'static str {
    "🤖 <b>Twitter Tracker Bot</b>\n\n\
     Welcome! This bot tracks the accounts a Twitter user starts following.\n\n\
     <b>Commands:</b>\n\
     /start - Start the bot\n\
     /track [username] - Track a Twitter user\n\
     /list - List all tracked users\n\
     /remove [username] - Stop tracking a user\n\
     /credits - Check remaining API credits\n\
     /help - Help\n\n\
     <b>How to use:</b>\n\
     1. Type <code>/track twitter_username</code>\n\
     2. Run it again later to check for changes\n\
     3. New followings are listed with their details"
}

/// Reply to `/help`
#[must_use]
pub fn help() -> &'static str {
    "<b>📖 User Guide</b>\n\n\
     <b>Main Commands:</b>\n\
     • <code>/track [username]</code> - Start tracking a user or check for updates.\n\
       Example: <code>/track loxous</code>\n\n\
     • <code>/list</code> - View tracked users.\n\n\
     • <code>/remove [username]</code> - Stop tracking a user.\n\
       Example: <code>/remove loxous</code>\n\n\
     • <code>/credits</code> - Check your remaining API credits\n\n\
     <b>How it works:</b>\n\
     1. The first check saves the current following count\n\
     2. Later checks compare against it\n\
     3. When the count grew, the new followings are fetched and listed\n\n\
     <b>Tips:</b>\n\
     • Checks only run when you ask for them\n\
     • Use the Twitter username without @\n\
     • Large jumps are fetched up to a page limit"
}
