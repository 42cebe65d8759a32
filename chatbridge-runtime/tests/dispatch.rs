//! Dispatch behaviour on both networks, driven through the public handlers.

mod common;

use std::time::Duration;

use chatbridge_core::gate::AccessDecision;
use chatbridge_core::store::AccountStore;
use chatbridge_core::types::{ChannelId, GroupMessage, Identity};
use chatbridge_runtime::dispatch::{self, CAPTURE_BUSY_TEXT, RESTARTING_TEXT};
use chatbridge_runtime::events::GameEvent;
use chatbridge_runtime::{DispatchOutcome, LinkState, hooks};
use common::{admin_msg, connect, connected, group_msg, harness_with};

#[tokio::test(start_paused = true)]
async fn verified_member_ftop_end_to_end() {
    let (h, link) = connected();
    h.store.insert_verified("alice#0001", "Alice");

    let msg = group_msg("alice#0001", "100", "!ftop");
    let outcome = dispatch::handle_group_message(&h.ctx, &msg).await;

    assert_eq!(outcome, DispatchOutcome::Executed);
    assert_eq!(link.sent(), vec!["/f top"]);
    assert!(h.ctx.gate.cooldowns().contains("100"));
    assert!(h.ctx.aggregator.is_capturing());

    for line in ["Top factions", "1. Wolves - $900", "2. Bears - $800"] {
        hooks::handle_game_event(&h.ctx, GameEvent::ChatLine(line.into())).await;
    }
    tokio::time::advance(Duration::from_millis(299)).await;
    tokio::task::yield_now().await;
    assert_eq!(h.sink.len(), 0, "nothing published before the capture delay");

    h.ctx.scheduler.settle().await;
    let published = h.sink.take();
    assert_eq!(published.len(), 1);
    let (channel, message) = &published[0];
    assert_eq!(channel, &ChannelId::new("general"));
    let GroupMessage::Rich { reply } = message else {
        panic!("expected a rich reply");
    };
    let fields: Vec<(&str, &str)> = reply
        .fields
        .iter()
        .map(|f| (f.name.as_str(), f.value.as_str()))
        .collect();
    assert_eq!(fields, [("#1 Wolves", "$900"), ("#2 Bears", "$800")]);
    assert_eq!(reply.footer.as_deref(), Some("alice#0001"));

    assert!(!h.ctx.aggregator.is_capturing());
    assert_eq!(h.ctx.aggregator.ambient_len(), 0, "captured lines never reach ambient");
}

#[tokio::test(start_paused = true)]
async fn raw_capture_keeps_arrival_order() {
    let (h, _link) = connected();
    let outcome = dispatch::handle_group_message(&h.ctx, &admin_msg("!say /list")).await;
    assert_eq!(outcome, DispatchOutcome::Executed);

    hooks::handle_game_event(&h.ctx, GameEvent::ChatLine("A".into())).await;
    hooks::handle_game_event(&h.ctx, GameEvent::ChatLine("B".into())).await;
    h.ctx.scheduler.settle().await;

    let published = h.sink.take();
    let GroupMessage::Rich { reply } = &published[0].1 else {
        panic!("expected a rich reply");
    };
    assert_eq!(reply.description.as_deref(), Some("```A\nB```"));
}

#[tokio::test(start_paused = true)]
async fn cooldown_rejects_then_readmits_once() {
    let (h, _link) = connected();
    h.store.insert_verified("alice#0001", "Alice");
    let msg = group_msg("alice#0001", "100", "!online");

    assert_eq!(dispatch::handle_group_message(&h.ctx, &msg).await, DispatchOutcome::Executed);
    h.ctx.scheduler.settle().await;
    h.sink.take();

    let again = dispatch::handle_group_message(&h.ctx, &msg).await;
    assert_eq!(again, DispatchOutcome::Denied(AccessDecision::DeniedCooldown));
    assert_eq!(h.sink.texts(), vec!["<@100>, You are in a cooldown"]);

    tokio::time::advance(Duration::from_secs(10)).await;
    assert_eq!(dispatch::handle_group_message(&h.ctx, &msg).await, DispatchOutcome::Executed);
    h.ctx.scheduler.settle().await;
    assert_eq!(
        dispatch::handle_group_message(&h.ctx, &msg).await,
        DispatchOutcome::Denied(AccessDecision::DeniedCooldown)
    );
}

#[tokio::test(start_paused = true)]
async fn unverified_member_is_told_and_nothing_runs() {
    let (h, link) = connected();
    let outcome = dispatch::handle_group_message(&h.ctx, &group_msg("bob#0002", "200", "!ftop")).await;

    assert_eq!(outcome, DispatchOutcome::Denied(AccessDecision::DeniedUnverified));
    assert!(link.sent().is_empty());
    assert!(!h.ctx.gate.cooldowns().contains("200"));
    assert_eq!(h.sink.texts(), vec!["<@200>, You need to be verified to run that command"]);
}

#[tokio::test(start_paused = true)]
async fn elevated_member_bypasses_verification_and_cooldown() {
    let (h, _link) = connected();
    for _ in 0..3 {
        let outcome = dispatch::handle_group_message(&h.ctx, &admin_msg("!shield on")).await;
        assert_eq!(outcome, DispatchOutcome::Executed);
    }
    assert!(h.store.is_shield_active().expect("read"));
    assert!(h.ctx.gate.cooldowns().is_empty());
}

#[tokio::test(start_paused = true)]
async fn non_elevated_member_cannot_run_admin_commands() {
    let (h, _link) = connected();
    h.store.insert_verified("alice#0001", "Alice");
    let outcome =
        dispatch::handle_group_message(&h.ctx, &group_msg("alice#0001", "100", "!shield on")).await;
    assert_eq!(outcome, DispatchOutcome::Denied(AccessDecision::DeniedInsufficientPermission));
    assert!(!h.store.is_shield_active().expect("read"));
}

#[tokio::test(start_paused = true)]
async fn missing_arguments_reply_with_usage() {
    let (h, _link) = connected();
    let outcome = dispatch::handle_group_message(&h.ctx, &group_msg("carol#0003", "300", "!verify")).await;
    assert_eq!(
        outcome,
        DispatchOutcome::Denied(AccessDecision::DeniedMissingArgs("!verify <player>".into()))
    );
    assert_eq!(h.sink.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn second_capture_is_rejected_as_busy() {
    let (h, link) = connected();
    h.store.insert_verified("alice#0001", "Alice");

    let first = dispatch::handle_group_message(&h.ctx, &group_msg("alice#0001", "100", "!ftop")).await;
    let second = dispatch::handle_group_message(&h.ctx, &admin_msg("!flist")).await;

    assert_eq!(first, DispatchOutcome::Executed);
    assert_eq!(second, DispatchOutcome::CaptureBusy);
    assert_eq!(link.sent(), vec!["/f top"], "rejected command never reaches the game");
    assert_eq!(h.sink.texts(), vec![CAPTURE_BUSY_TEXT]);
    assert_eq!(h.ctx.counters.snapshot().capture_collisions, 1);

    h.ctx.scheduler.settle().await;
    assert_eq!(dispatch::handle_group_message(&h.ctx, &admin_msg("!flist")).await, DispatchOutcome::Executed);
}

#[tokio::test(start_paused = true)]
async fn bot_authors_and_direct_messages_are_filtered() {
    let (h, _link) = connected();

    let mut bot_help = admin_msg("!help");
    bot_help.is_bot = true;
    assert_eq!(dispatch::handle_group_message(&h.ctx, &bot_help).await, DispatchOutcome::Ignored);

    let mut bot_ftop = admin_msg("!ftop");
    bot_ftop.is_bot = true;
    assert_eq!(dispatch::handle_group_message(&h.ctx, &bot_ftop).await, DispatchOutcome::Executed);

    let mut direct = admin_msg("!help");
    direct.direct = true;
    assert_eq!(dispatch::handle_group_message(&h.ctx, &direct).await, DispatchOutcome::Ignored);

    assert_eq!(
        dispatch::handle_group_message(&h.ctx, &admin_msg("!nosuchcommand")).await,
        DispatchOutcome::Ignored
    );
    assert_eq!(
        dispatch::handle_group_message(&h.ctx, &admin_msg("hello there")).await,
        DispatchOutcome::Ignored
    );
}

#[tokio::test(start_paused = true)]
async fn execution_refused_while_restarting() {
    let (h, link) = connected();
    h.ctx.link.set(LinkState::Reconnecting);

    let outcome = dispatch::handle_group_message(&h.ctx, &admin_msg("!ftop")).await;
    assert_eq!(outcome, DispatchOutcome::Restarting);
    assert!(link.sent().is_empty());
    assert_eq!(h.sink.texts(), vec![RESTARTING_TEXT]);

    let game = dispatch::handle_game_chat(&h.ctx, "Alice", "!token abc").await;
    assert_eq!(game, DispatchOutcome::Restarting);
}

#[tokio::test(start_paused = true)]
async fn help_lists_commands() {
    let (h, _link) = connected();
    let outcome = dispatch::handle_group_message(&h.ctx, &group_msg("dave#0004", "400", "!help")).await;
    assert_eq!(outcome, DispatchOutcome::Executed);

    let published = h.sink.take();
    let GroupMessage::Rich { reply } = &published[0].1 else {
        panic!("expected a rich reply");
    };
    assert!(reply.fields.iter().any(|f| f.name == "!verify <player>"));
    assert!(reply.fields.iter().any(|f| f.value.contains("!checked <walls|buffers>")));
}

#[tokio::test(start_paused = true)]
async fn verification_round_trip_across_networks() {
    let (h, link) = connected();
    let outcome = dispatch::handle_group_message(&h.ctx, &group_msg("carol#0003", "300", "!verify Carol")).await;
    assert_eq!(outcome, DispatchOutcome::Executed);

    let whisper = link.sent().pop().expect("token whispered");
    assert!(whisper.starts_with("/msg Carol Type !token "));
    let token = whisper
        .split_whitespace()
        .nth(4)
        .expect("token in whisper")
        .to_string();
    assert!(!h.store.is_verified(&Identity::member("carol#0003")).expect("read"));

    let wrong = dispatch::handle_game_chat(&h.ctx, "Carol", "!token nope").await;
    assert_eq!(wrong, DispatchOutcome::Executed);
    assert!(!h.store.is_verified(&Identity::member("carol#0003")).expect("read"));

    let right = dispatch::handle_game_chat(&h.ctx, "Carol", &format!("!token {token}")).await;
    assert_eq!(right, DispatchOutcome::Executed);
    assert!(h.store.is_verified(&Identity::member("carol#0003")).expect("read"));
    assert_eq!(link.sent().last().map(String::as_str), Some("/msg Carol Linked to carol#0003"));
}

#[tokio::test(start_paused = true)]
async fn game_side_denials_follow_game_conventions() {
    let (h, link) = connected();
    h.store.insert_verified("alice#0001", "Alice");

    assert_eq!(
        dispatch::handle_game_chat(&h.ctx, "Mallory", "!checked walls").await,
        DispatchOutcome::Denied(AccessDecision::DeniedUnverified)
    );
    assert!(link.sent().is_empty(), "unverified players get no answer");

    assert_eq!(
        dispatch::handle_game_chat(&h.ctx, "Alice", "!checked").await,
        DispatchOutcome::Denied(AccessDecision::DeniedMissingArgs("!checked <walls|buffers>".into()))
    );
    h.store.set_shield(true).expect("shield");
    assert_eq!(
        dispatch::handle_game_chat(&h.ctx, "Alice", "!checked walls").await,
        DispatchOutcome::Denied(AccessDecision::DeniedShielded)
    );
    assert_eq!(
        link.sent(),
        vec![
            "Error: Wrong Syntax, type: !checked <walls|buffers>",
            "Error: Shield is enabled.",
        ]
    );

    assert_eq!(
        dispatch::handle_game_chat(&h.ctx, common::BOT_NAME, "!checked walls").await,
        DispatchOutcome::Ignored
    );
}

#[tokio::test(start_paused = true)]
async fn checked_records_and_announces() {
    let (h, link) = connected();
    h.store.insert_verified("alice#0001", "Alice");
    h.store
        .bind_destination("wallchecks", &ChannelId::new("walls"))
        .expect("bind");

    let outcome = dispatch::handle_game_chat(&h.ctx, "Alice", "!checked walls").await;
    assert_eq!(outcome, DispatchOutcome::Executed);

    let record = h
        .store
        .last_check(chatbridge_core::types::CheckKind::Walls)
        .expect("read")
        .expect("recorded");
    assert_eq!(record.checked_by, "Alice");
    assert_eq!(link.sent(), vec!["Walls marked as checked by Alice"]);
    let published = h.sink.take();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, ChannelId::new("walls"));
}

#[tokio::test(start_paused = true)]
async fn setchannel_binds_invoking_channel() {
    let (h, _link) = connected();
    let outcome = dispatch::handle_group_message(&h.ctx, &admin_msg("!setchannel ServerChat")).await;
    assert_eq!(outcome, DispatchOutcome::Executed);
    assert_eq!(
        h.store.resolve_destination("serverchat").expect("read"),
        Some(ChannelId::new("general"))
    );

    dispatch::handle_group_message(&h.ctx, &admin_msg("!setchannel lobby")).await;
    assert_eq!(h.store.resolve_destination("lobby").expect("read"), None);
}

#[tokio::test(start_paused = true)]
async fn checked_announcement_carries_player_avatar() {
    let (h, _link) = connect(harness_with(|config| {
        config.game.avatar_url = Some("https://minotar.net/helm/".into());
    }));
    h.store.insert_verified("alice#0001", "Alice");
    h.store
        .bind_destination("bufferchecks", &ChannelId::new("buffers"))
        .expect("bind");

    dispatch::handle_game_chat(&h.ctx, "Alice", "!checked buffers").await;
    let published = h.sink.take();
    let GroupMessage::Rich { reply } = &published[0].1 else {
        panic!("expected a rich announcement");
    };
    assert_eq!(reply.thumbnail.as_deref(), Some("https://minotar.net/helm/Alice"));
}

#[tokio::test(start_paused = true)]
async fn announcement_has_no_thumbnail_without_avatar_service() {
    let (h, _link) = connected();
    h.store.insert_verified("alice#0001", "Alice");
    h.store
        .bind_destination("wallchecks", &ChannelId::new("walls"))
        .expect("bind");

    dispatch::handle_game_chat(&h.ctx, "Alice", "!checked walls").await;
    let published = h.sink.take();
    let GroupMessage::Rich { reply } = &published[0].1 else {
        panic!("expected a rich announcement");
    };
    assert_eq!(reply.thumbnail, None);
}
