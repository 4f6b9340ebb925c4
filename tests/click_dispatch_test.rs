mod common;

use common::{controller_for, count, node, RecordingApi, RESULTS_PAGE};
use freelancer_cards::dom::attribute;
use freelancer_cards::{CardAction, ChatOutcome};
use serde_json::json;
use url::Url;

#[tokio::test]
async fn contact_button_initiates_chat_for_its_card() {
    let api = RecordingApi::new();
    api.respond("/api/chat/initiate", json!({"success": true, "chat_id": 55}));
    let (mut controller, hooks) = controller_for(RESULTS_PAGE, api.clone());

    let button = node(&controller, r#"[data-freelancer-id="202"] .btn-contact"#);
    let outcome = controller.handle_click(&button).await;

    assert!(outcome.default_prevented);
    assert_eq!(
        outcome.actions,
        vec![CardAction::OpenChat {
            freelancer_id: "202".into()
        }]
    );

    let chats = api.requests_to("/api/chat/initiate");
    assert_eq!(chats.len(), 1);
    let body = chats[0].body.clone().unwrap();
    assert_eq!(body["freelancer_id"], "202");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    assert_eq!(
        chats[0].headers,
        vec![("X-CSRFToken".to_string(), "tok-123".to_string())]
    );

    assert_eq!(controller.location().href(), Some("/chat/55"));
    assert_eq!(hooks.events(), vec!["freelancer_contact"]);
    assert_eq!(count(&controller, ".toast-info"), 1);

    controller.settle().await;
    assert_eq!(api.tracked_events(), vec!["freelancer_contact"]);
}

#[tokio::test]
async fn contact_link_also_counts_as_card_view() {
    let api = RecordingApi::new();
    api.respond("/api/chat/initiate", json!({"success": true, "chat_id": "abc"}));
    let (mut controller, hooks) = controller_for(RESULTS_PAGE, api.clone());

    let link = node(&controller, r#"[data-freelancer-id="101"] .btn-contact"#);
    let outcome = controller.handle_click(&link).await;

    assert!(outcome.default_prevented);
    assert_eq!(
        outcome.actions,
        vec![
            CardAction::OpenChat {
                freelancer_id: "101".into()
            },
            CardAction::CardView {
                freelancer_id: "101".into()
            },
        ]
    );
    assert_eq!(hooks.events(), vec!["freelancer_contact", "freelancer_card_view"]);
    assert_eq!(controller.location().href(), Some("/chat/abc"));
}

#[tokio::test]
async fn unsuccessful_chat_shows_error_toast() {
    let api = RecordingApi::new();
    api.respond("/api/chat/initiate", json!({"success": false}));
    let (mut controller, hooks) = controller_for(RESULTS_PAGE, api.clone());

    let outcome = controller.open_chat("202").await;

    assert_eq!(outcome, ChatOutcome::Failed);
    assert!(controller.location().href().is_none());
    assert_eq!(count(&controller, ".toast-info"), 1);
    assert_eq!(count(&controller, ".toast-error"), 1);
    assert_eq!(hooks.count("freelancer_contact"), 1);
}

#[tokio::test]
async fn chat_network_failure_shows_error_toast() {
    let api = RecordingApi::new();
    api.fail("/api/chat/initiate", 502);
    let (mut controller, _) = controller_for(RESULTS_PAGE, api.clone());

    assert_eq!(controller.open_chat("101").await, ChatOutcome::Failed);
    assert_eq!(count(&controller, ".toast-error"), 1);
}

#[tokio::test]
async fn missing_csrf_meta_sends_empty_token() {
    let page = RESULTS_PAGE.replace(r#"<meta name="csrf-token" content="tok-123">"#, "");
    let api = RecordingApi::new();
    api.respond("/api/chat/initiate", json!({"success": true, "chat_id": 1}));
    let (mut controller, _) = controller_for(&page, api.clone());

    controller.open_chat("101").await;

    let chats = api.requests_to("/api/chat/initiate");
    assert_eq!(
        chats[0].headers,
        vec![("X-CSRFToken".to_string(), String::new())]
    );
}

#[tokio::test]
async fn hire_button_shrinks_card_then_navigates() {
    let api = RecordingApi::new();
    let (mut controller, hooks) = controller_for(RESULTS_PAGE, api.clone());

    let hire = node(&controller, ".btn-hire");
    let outcome = controller.handle_click(&hire).await;

    assert!(!outcome.default_prevented);
    assert_eq!(
        outcome.actions,
        vec![CardAction::ViewProfile {
            freelancer_id: "101".into()
        }]
    );
    let card = controller.find_card("101").unwrap();
    let style = attribute(&card, "style").unwrap();
    assert!(style.contains("transform: scale(0.98)"));
    assert!(style.contains("opacity: 0.8"));
    assert_eq!(hooks.events(), vec!["freelancer_profile_view"]);

    controller.advance_time(149);
    assert!(controller.location().href().is_none());
    controller.advance_time(1);
    assert_eq!(controller.location().href(), Some("/freelancer/101"));
}

#[tokio::test]
async fn skill_tag_searches_by_trimmed_text() {
    let api = RecordingApi::new();
    let (mut controller, hooks) = controller_for(RESULTS_PAGE, api.clone());

    let tag = node(
        &controller,
        r#"[data-freelancer-id="101"] .skill-tag:nth-child(2)"#,
    );
    let outcome = controller.handle_click(&tag).await;

    assert_eq!(
        outcome.actions,
        vec![CardAction::SkillSearch {
            skill: "UX Design".into()
        }]
    );
    assert_eq!(hooks.events(), vec!["skill_search"]);

    // Both cards carry the tag; "Rust" is left alone.
    let highlighted = controller
        .page()
        .select_all(".skill-tag")
        .unwrap()
        .into_iter()
        .filter(|tag| attribute(tag, "style").is_some())
        .count();
    assert_eq!(highlighted, 2);

    controller.advance_time(199);
    assert!(controller.location().href().is_none());
    controller.advance_time(1);

    let href = controller.location().href().unwrap().to_string();
    let url = Url::parse("http://localhost/").unwrap().join(&href).unwrap();
    assert_eq!(url.path(), "/search");
    let skill = url
        .query_pairs()
        .find(|(key, _)| key == "skill")
        .map(|(_, value)| value.into_owned());
    assert_eq!(skill.as_deref(), Some("UX Design"));
}

#[tokio::test]
async fn overflow_tag_does_nothing() {
    let api = RecordingApi::new();
    let (mut controller, hooks) = controller_for(RESULTS_PAGE, api.clone());

    let more = node(&controller, ".more-skills");
    let outcome = controller.handle_click(&more).await;

    assert!(outcome.actions.is_empty());
    assert!(hooks.events().is_empty());
    assert_eq!(controller.pending_timers(), 0);
}

#[tokio::test]
async fn plain_card_click_records_view() {
    let api = RecordingApi::new();
    let (mut controller, hooks) = controller_for(RESULTS_PAGE, api.clone());

    let name = node(&controller, r#"[data-freelancer-id="202"] .freelancer-name"#);
    let outcome = controller.handle_click(&name).await;

    assert_eq!(
        outcome.actions,
        vec![CardAction::CardView {
            freelancer_id: "202".into()
        }]
    );
    assert_eq!(hooks.events(), vec!["freelancer_card_view"]);

    controller.settle().await;
    let beacons = api.requests_to("/api/analytics/track");
    assert_eq!(beacons.len(), 1);
    let envelope = beacons[0].body.clone().unwrap();
    assert_eq!(envelope["data"]["freelancer_id"], "202");
    assert!(envelope["user_agent"].as_str().unwrap().starts_with("freelancer-cards/"));
    assert!(envelope["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn click_outside_cards_is_ignored() {
    let api = RecordingApi::new();
    let (mut controller, hooks) = controller_for(RESULTS_PAGE, api.clone());

    let results = node(&controller, ".results");
    let outcome = controller.handle_click(&results).await;

    assert_eq!(outcome, Default::default());
    assert!(hooks.events().is_empty());
    controller.settle().await;
    assert!(api.requests().is_empty());
}
