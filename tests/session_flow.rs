#![allow(non_snake_case)]
use dice_chamber::{
    Error,
    dice::DieKind,
    dispatcher::RollOrder,
    protocol::{
        ClientEvent,
        DICE_ERROR,
        ROLL_HISTORY,
    },
    registry::RollPhase,
    test_helpers::*,
    theme::Theme,
    transport::TransportEvent,
    tray::FaceRole,
};
use serde_json::json;

#[test]
fn roll_preset__publishes_request_and_reveals_result_on_schedule() {
    let mut ctx = TestContext::new();
    // given
    let preset = Theme::Dnd.presets()[0];
    let now = ctx.at(0);
    let roll_id = ctx.session_mut().roll_preset(&preset, now).unwrap();
    let request = ctx.last_request();
    assert_eq!(request.dice_type, DieKind::D20);
    assert_eq!(request.character, "Aria");
    assert_eq!(request.roll_type.as_deref(), Some("Attack Roll"));
    assert_eq!(request.theme, Theme::Dnd);
    assert_eq!(request.count, 1);
    assert!(!request.is_gm_roll);
    assert!(!request.is_hidden);
    assert_eq!(request.roll_id, roll_id);

    // when
    ctx.deliver_result(
        json!({
            "roll_id": roll_id.as_str(),
            "dice_type": "d20",
            "result": 17,
            "character": "Aria",
            "roll_type": "Attack Roll",
        }),
        300,
    );

    // then
    let phase = ctx.session().registry().get(&roll_id).unwrap().phase;
    assert_eq!(phase, RollPhase::Settling);

    ctx.advance_to(1799);
    assert!(!ctx.session().tray().faces()[0].settled);

    ctx.advance_to(1800);
    assert_eq!(ctx.tray_labels(), vec!["17"]);
    assert!(ctx.session().history().is_empty());

    ctx.advance_to(2300);
    assert_eq!(ctx.history_headlines(), vec!["Aria's Attack Roll: 17"]);
    assert!(ctx.session().registry().contains(&roll_id));

    ctx.advance_to(4799);
    assert!(ctx.session().registry().contains(&roll_id));
    ctx.advance_to(4800);
    assert!(ctx.session().registry().is_empty());
    assert_eq!(ctx.session().next_deadline(), None);
}

#[test]
fn roll_preset__d100_paints_tens_and_ones_faces() {
    let mut ctx = TestContext::with_character("Aria", Theme::Warhammer);
    // given
    let preset = Theme::Warhammer.presets()[0];
    let now = ctx.at(0);
    let roll_id = ctx.session_mut().roll_preset(&preset, now).unwrap();
    assert_eq!(ctx.session().tray().faces().len(), 2);

    // when
    ctx.deliver_result(
        json!({
            "roll_id": roll_id.as_str(),
            "dice_type": "d100",
            "result": 47,
            "tens_die": 4,
            "ones_die": 7,
            "character": "Aria",
            "roll_type": "Characteristics Test",
        }),
        100,
    );
    ctx.advance_to(1600);

    // then
    assert_eq!(ctx.tray_labels(), vec!["40", "7"]);
    let roles: Vec<_> = ctx.session().tray().faces().iter().map(|f| f.role).collect();
    assert_eq!(roles, vec![FaceRole::Tens, FaceRole::Ones]);
    ctx.advance_to(2100);
    assert_eq!(
        ctx.history_headlines(),
        vec!["Aria's Characteristics Test: 47"]
    );
}

#[test]
fn roll__animates_at_fifteen_hertz_until_finished() {
    let mut ctx = TestContext::new();
    // given
    let now = ctx.at(0);
    let roll_id = ctx
        .session_mut()
        .roll(&RollOrder::new(DieKind::D6, 3), now)
        .unwrap();

    // when
    ctx.advance_to(1000);

    // then
    let entry = ctx.session().registry().get(&roll_id).unwrap();
    assert_eq!(entry.animator.frame(), 15);
    for label in ctx.tray_labels() {
        let value: u32 = label.parse().unwrap();
        assert!((1..=6).contains(&value));
    }

    ctx.advance_to(2500);
    let entry = ctx.session().registry().get(&roll_id).unwrap();
    assert_eq!(entry.animator.frame(), 30);
    assert!(!entry.animator.is_running());
    assert!(ctx.session().tray().faces().iter().all(|f| !f.rolling));
    // A roll that never gets its result stays pending.
    assert_eq!(entry.phase, RollPhase::Animating);
    assert_eq!(ctx.session().next_deadline(), None);
}

#[test]
fn roll__multi_die_result_paints_each_die_and_totals_history() {
    let mut ctx = TestContext::new();
    let now = ctx.at(0);
    let roll_id = ctx
        .session_mut()
        .roll(&RollOrder::new(DieKind::D6, 2), now)
        .unwrap();

    ctx.deliver_result(
        json!({
            "roll_id": roll_id.as_str(),
            "dice_type": "d6",
            "result": 7,
            "total": 7,
            "dice_results": [{"result": 3}, {"result": 4}],
            "character": "Aria",
        }),
        0,
    );
    ctx.advance_to(2000);

    assert_eq!(ctx.tray_labels(), vec!["3", "4"]);
    assert_eq!(ctx.history_headlines(), vec!["Aria rolled 7 (3, 4) on d6"]);
}

#[test]
fn roll__blank_name_is_sent_as_anonymous() {
    let mut ctx = TestContext::with_character("   ", Theme::Warhammer);
    let now = ctx.at(0);
    ctx.session_mut()
        .roll(&RollOrder::new(DieKind::D10, 1), now)
        .unwrap();
    let request = ctx.last_request();
    assert_eq!(request.character, "Anonymous");
    assert_eq!(request.theme, Theme::Warhammer);
    assert_eq!(request.roll_type, None);
}

#[test]
fn roll__consecutive_rolls_get_distinct_ids() {
    let mut ctx = TestContext::new();
    let now = ctx.at(0);
    let first = ctx
        .session_mut()
        .roll(&RollOrder::new(DieKind::D4, 1), now)
        .unwrap();
    let second = ctx
        .session_mut()
        .roll(&RollOrder::new(DieKind::D4, 1), now)
        .unwrap();
    assert_ne!(first, second);
    assert_eq!(ctx.session().registry().len(), 2);
}

#[test]
fn roll__late_result_of_replaced_roll_does_not_paint_new_dice() {
    let mut ctx = TestContext::new();
    // given
    let now = ctx.at(0);
    let first = ctx
        .session_mut()
        .roll(&RollOrder::new(DieKind::D20, 1), now)
        .unwrap();
    let now = ctx.at(100);
    ctx.session_mut()
        .roll(&RollOrder::new(DieKind::D6, 2), now)
        .unwrap();

    // when
    ctx.deliver_result(
        json!({"roll_id": first.as_str(), "dice_type": "d20", "result": 20, "character": "Aria"}),
        200,
    );
    ctx.advance_to(1700);

    // then
    let faces = ctx.session().tray().faces();
    assert_eq!(faces.len(), 2);
    assert!(faces.iter().all(|f| f.role == FaceRole::Standard { faces: 6 }));
    assert!(faces.iter().all(|f| !f.settled));
    ctx.advance_to(2200);
    assert_eq!(ctx.history_headlines(), vec!["Aria rolled 20 on d20"]);
}

#[test]
fn dice_result__unmatched_result_goes_straight_to_history() {
    let mut ctx = TestContext::new();

    ctx.deliver_result(
        json!({"roll_id": "someone-else", "dice_type": "d8", "result": 5, "character": "Bram"}),
        0,
    );

    assert_eq!(ctx.history_headlines(), vec!["Bram rolled 5 on d8"]);
    assert!(ctx.session().tray().is_empty());
    assert_eq!(ctx.session().next_deadline(), None);
}

#[test]
fn dice_result__hidden_result_is_dropped_outside_gm_mode() {
    let mut ctx = TestContext::new();
    let now = ctx.at(0);
    ctx.session_mut()
        .roll(&RollOrder::new(DieKind::D20, 1), now)
        .unwrap();
    let pending_before = ctx.session().registry().len();

    ctx.deliver_result(
        json!({
            "roll_id": "gm-roll",
            "dice_type": "d20",
            "result": 1,
            "character": "Game Master",
            "roll_type": "GM Roll",
            "is_gm_roll": true,
            "is_hidden": true,
        }),
        50,
    );
    ctx.advance_to(10_000);

    assert!(ctx.session().history().is_empty());
    assert_eq!(ctx.session().registry().len(), pending_before);
}

#[test]
fn dice_result__hidden_result_for_pending_roll_leaves_it_animating() {
    let mut ctx = TestContext::new();
    // given
    let now = ctx.at(0);
    let roll_id = ctx
        .session_mut()
        .roll(&RollOrder::new(DieKind::D20, 1), now)
        .unwrap();

    // when
    ctx.deliver_result(
        json!({
            "roll_id": roll_id.as_str(),
            "dice_type": "d20",
            "result": 1,
            "character": "Game Master",
            "roll_type": "GM Roll",
            "is_gm_roll": true,
            "is_hidden": true,
        }),
        50,
    );

    // then
    let entry = ctx.session().registry().get(&roll_id).unwrap();
    assert_eq!(entry.phase, RollPhase::Animating);
    assert!(entry.animator.is_running());
    assert_eq!(ctx.session().next_deadline(), Some(ctx.at(66)));

    // past the settle window a queued reveal would have painted the die
    ctx.advance_to(1600);
    let entry = ctx.session().registry().get(&roll_id).unwrap();
    assert_eq!(entry.phase, RollPhase::Animating);
    assert!(entry.animator.is_running());
    assert!(ctx.session().tray().faces().iter().all(|f| !f.settled));
    assert!(ctx.session().history().is_empty());
}

#[test]
fn dice_error__discards_pending_roll_without_reveal() {
    let mut ctx = TestContext::new();
    // given
    let now = ctx.at(0);
    let roll_id = ctx
        .session_mut()
        .roll(&RollOrder::new(DieKind::D12, 1), now)
        .unwrap();

    // when
    ctx.deliver(
        DICE_ERROR,
        json!({"roll_id": roll_id.as_str(), "message": "Invalid dice type"}),
        100,
    );

    // then
    assert!(ctx.session().registry().is_empty());
    assert_eq!(ctx.session().next_deadline(), None);
    assert!(ctx.session().status().contains("Invalid dice type"));
    ctx.advance_to(10_000);
    assert!(ctx.session().history().is_empty());
}

#[test]
fn roll_history__snapshot_replaces_view_newest_first() {
    let mut ctx = TestContext::new();
    ctx.deliver_result(
        json!({"dice_type": "d4", "result": 1, "character": "Old"}),
        0,
    );

    ctx.deliver(
        ROLL_HISTORY,
        json!([
            {"dice_type": "d6", "result": 2, "character": "A"},
            {"dice_type": "d6", "result": 5, "character": "B", "is_hidden": true},
            {"dice_type": "d8", "result": 3, "character": "C"},
        ]),
        10,
    );

    assert_eq!(
        ctx.history_headlines(),
        vec!["C rolled 3 on d8", "A rolled 2 on d6"]
    );
    assert!(ctx.session().history().entries().all(|e| !e.fresh));
}

#[test]
fn on_connect__requests_player_history() {
    let mut ctx = TestContext::new();
    let now = ctx.at(0);

    ctx.session_mut()
        .handle_transport_event(TransportEvent::Connected, now)
        .unwrap();

    assert!(ctx.session().is_connected());
    assert_eq!(ctx.sent(), vec![ClientEvent::RequestHistory { is_gm: false }]);
}

#[test]
fn disconnected__is_reported_in_status() {
    let mut ctx = TestContext::new();
    let now = ctx.at(0);
    let session = ctx.session_mut();
    session
        .handle_transport_event(TransportEvent::Connected, now)
        .unwrap();

    session
        .handle_transport_event(TransportEvent::Disconnected(Some("boom".into())), now)
        .unwrap();

    assert!(!session.is_connected());
    assert_eq!(session.status(), "Disconnected: boom");
}

#[test]
fn clear_history__player_clears_public_history() {
    let mut ctx = TestContext::new();
    ctx.deliver_result(json!({"dice_type": "d6", "result": 2}), 0);

    ctx.session_mut().clear_history().unwrap();
    assert_eq!(ctx.sent(), vec![ClientEvent::ClearHistory { is_gm: false }]);
    ctx.deliver(ROLL_HISTORY, json!([]), 10);

    assert!(ctx.session().history().is_empty());
}

#[test]
fn roll_gm__requires_gm_mode() {
    let mut ctx = TestContext::new();
    let now = ctx.at(0);

    let err = ctx
        .session_mut()
        .roll_gm(DieKind::D20, false, now)
        .unwrap_err();

    assert!(matches!(err, Error::GmModeRequired));
    assert!(ctx.sent().is_empty());
    assert!(ctx.session().tray().is_empty());
    assert!(ctx.session().registry().is_empty());
}

#[tokio::test]
async fn enter_gm__wrong_password_keeps_prompt_with_error() {
    let mut ctx = TestContext::new();
    ctx.session_mut().open_gm_prompt();

    let granted = ctx
        .session_mut()
        .enter_gm(&FakeVerifier::new("secret"), "guess")
        .await
        .unwrap();

    assert!(!granted);
    let gate = ctx.session().gate();
    assert!(!gate.is_active());
    assert!(gate.prompt().visible);
    assert!(gate.prompt().focused);
    assert!(gate.prompt().error_visible);
    assert!(ctx.sent().is_empty());
}

#[tokio::test]
async fn enter_gm__unreachable_verifier_reads_as_wrong_password() {
    let mut ctx = TestContext::new();
    ctx.session_mut().open_gm_prompt();

    let granted = ctx
        .session_mut()
        .enter_gm(&UnreachableVerifier, "secret")
        .await
        .unwrap();

    assert!(!granted);
    assert!(!ctx.session().gate().is_active());
    assert!(ctx.session().gate().prompt().error_visible);
}

#[tokio::test]
async fn enter_gm__hidden_roll_round_trip() {
    let mut ctx = TestContext::new();
    // given
    ctx.session_mut().open_gm_prompt();
    let granted = ctx
        .session_mut()
        .enter_gm(&FakeVerifier::new("secret"), "secret")
        .await
        .unwrap();
    assert!(granted);
    assert!(!ctx.session().gate().prompt().visible);
    assert_eq!(
        ctx.sent(),
        vec![
            ClientEvent::JoinGmRoom,
            ClientEvent::RequestHistory { is_gm: true },
        ]
    );

    // when
    let now = ctx.at(0);
    let roll_id = ctx
        .session_mut()
        .roll_gm(DieKind::D20, true, now)
        .unwrap();
    let request = ctx.last_request();
    ctx.deliver_result(
        json!({
            "roll_id": roll_id.as_str(),
            "dice_type": "d20",
            "result": 13,
            "character": "Game Master",
            "roll_type": "GM Roll",
            "is_gm_roll": true,
            "is_hidden": true,
        }),
        200,
    );
    ctx.advance_to(2200);

    // then
    assert_eq!(request.character, "Game Master");
    assert_eq!(request.roll_type.as_deref(), Some("GM Roll"));
    assert_eq!(request.count, 1);
    assert!(request.is_gm_roll && request.is_hidden);
    assert_eq!(ctx.tray_labels(), vec!["13"]);
    let head = ctx.session().history().head().unwrap();
    assert_eq!(head.headline, "Game Master's GM Roll: 13");
    assert!(head.is_hidden);
}

#[tokio::test]
async fn exit_gm__requests_player_history_and_clears_as_player() {
    let mut ctx = TestContext::new();
    ctx.session_mut()
        .enter_gm(&FakeVerifier::new("secret"), "secret")
        .await
        .unwrap();
    ctx.session_mut().clear_history().unwrap();
    ctx.sent();

    ctx.session_mut().exit_gm().unwrap();
    ctx.session_mut().clear_history().unwrap();

    assert_eq!(
        ctx.sent(),
        vec![
            ClientEvent::RequestHistory { is_gm: false },
            ClientEvent::ClearHistory { is_gm: false },
        ]
    );
}
