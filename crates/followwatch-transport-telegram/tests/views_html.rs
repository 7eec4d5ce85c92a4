use chrono::{TimeZone, Utc};
use followwatch_core::reconcile::{ReconciliationOutcome, StopReason};
use followwatch_core::storage::TrackedAccount;
use followwatch_core::twitter::TwitterUser;
use followwatch_transport_telegram::bot::views;
use lazy_regex::{regex, regex_is_match};

const ALLOWED_TAGS: &[&str] = &["b", "i", "a", "code"];

fn hostile_user(i: usize) -> TwitterUser {
    TwitterUser {
        name: format!("<b>Evil {i}</b> & co"),
        user_name: format!("evil_{i}"),
        description: "<script>alert(1)</script> \"quoted\"".to_string(),
        followers: 42,
        following: 7,
        ..TwitterUser::default()
    }
}

fn account(handle: &str, following: u64, checks: u64) -> TrackedAccount {
    let now = Utc.with_ymd_and_hms(2024, 12, 10, 7, 5, 0).single().expect("valid time");
    let mut account = TrackedAccount::first_check(handle, TwitterUser::default(), following, now);
    account.check_count = checks;
    account
}

fn assert_only_known_tags(html: &str) {
    for caps in regex!(r"<(/?)([A-Za-z]+)[^>]*>").captures_iter(html) {
        let tag = &caps[2];
        assert!(ALLOWED_TAGS.contains(&tag), "unexpected tag <{tag}> in {html}");
    }
}

#[test]
fn provider_text_cannot_inject_markup() {
    let users: Vec<TwitterUser> = (0..30).map(hostile_user).collect();
    let messages = views::following_list(&users);

    for message in &messages {
        assert_only_known_tags(message);
        assert!(!message.contains("<script>"));
        assert!(message.contains("&lt;script&gt;"));
    }
}

#[test]
fn card_links_to_profile() {
    let html = views::user_card(&hostile_user(3));
    assert_only_known_tags(&html);
    assert!(html.contains(r#"<a href="https://twitter.com/evil_3">@evil_3</a>"#));
}

#[test]
fn partial_summary_names_the_shortfall() {
    let outcome = ReconciliationOutcome {
        success: true,
        records: (0..150).map(hostile_user).collect(),
        total_fetched: 150,
        pages_fetched: 3,
        requested: 400,
        stop_reason: Some(StopReason::UpstreamFailure),
        error: None,
    };
    let html = views::new_followings_summary(&account("loxous", 900, 2), 400, &outcome);

    assert!(html.contains("New following: <b>400</b>"));
    assert!(html.contains("Pages fetched: <b>3</b>"));
    assert!(html.contains("showing <b>150</b> of 400"));
    assert!(html.contains("a later page failed to load"));
}

#[test]
fn exhausted_feed_summary_blames_the_provider() {
    let outcome = ReconciliationOutcome {
        success: true,
        records: (0..12).map(hostile_user).collect(),
        total_fetched: 12,
        pages_fetched: 1,
        requested: 30,
        stop_reason: Some(StopReason::Exhausted),
        error: None,
    };
    let html = views::new_followings_summary(&account("loxous", 900, 2), 30, &outcome);
    assert!(html.contains("showing <b>12</b> of 30 (provider returned fewer accounts)"));
}

#[test]
fn ceiling_summary_mentions_page_limit() {
    let outcome = ReconciliationOutcome {
        success: true,
        records: Vec::new(),
        total_fetched: 2000,
        pages_fetched: 10,
        requested: 2500,
        stop_reason: Some(StopReason::PageCeiling),
        error: None,
    };
    let html = views::new_followings_summary(&account("loxous", 900, 2), 2500, &outcome);
    assert!(html.contains("page limit reached"));
}

#[test]
fn complete_single_page_summary_is_short() {
    let outcome = ReconciliationOutcome {
        success: true,
        records: (0..5).map(hostile_user).collect(),
        total_fetched: 20,
        pages_fetched: 1,
        requested: 5,
        stop_reason: Some(StopReason::Satisfied),
        error: None,
    };
    let html = views::new_followings_summary(&account("loxous", 900, 2), 5, &outcome);
    assert!(!html.contains("Pages fetched"));
    assert!(!html.contains("Partial result"));
}

#[test]
fn tracked_list_shows_counts_and_time() {
    let html = views::tracked_users(&[account("alice", 120, 3), account("bob", 8, 1)]);

    assert!(html.contains("Following: 120 | Checked: 3x"));
    assert!(html.contains("Total: <b>2</b>"));
    assert!(regex_is_match!(r"Last: \d{2} [A-Z][a-z]{2} \d{4}, \d{2}:\d{2}", &html));
    assert_only_known_tags(&html);
}

#[test]
fn empty_tracked_list_has_hint() {
    let html = views::tracked_users(&[]);
    assert!(html.starts_with("No users are being tracked."));
}
