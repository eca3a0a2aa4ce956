//! Room protocol scenarios run through the in-memory harness.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::client::{MembershipView, SessionState, TextBuffer};
use crate::models::{ClientMessage, ContentChangedMessage, LeftEvent, Member, RoomKey, ServerEvent};
use crate::services::RoomSyncService;
use crate::testing::harness::RoomHarness;

fn ids(members: &[Member]) -> Vec<String> {
    members.iter().map(|m| m.connection_id.to_string()).collect()
}

fn left_events(events: &[ServerEvent]) -> Vec<LeftEvent> {
    events
        .iter()
        .filter_map(|event| match event {
            ServerEvent::Left(left) => Some(left.clone()),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Membership
// ============================================================================

#[tokio::test]
async fn membership_views_converge_with_directory() {
    let mut h = RoomHarness::new();
    h.enter("ann", "room").await;
    h.enter("bob", "room").await;
    h.enter("cy", "room").await;
    h.disconnect("bob").await;
    h.enter("dee", "room").await;
    h.disconnect("ann").await;
    h.enter("eve", "room").await;

    let truth = h.service.list_members(&RoomKey::from("room")).await;
    assert_eq!(
        ids(&truth),
        vec![h.id("cy").to_string(), h.id("dee").to_string(), h.id("eve").to_string()]
    );
    for label in ["cy", "dee", "eve"] {
        assert_eq!(h.members(label), truth, "view of {label} diverged");
    }
}

#[tokio::test]
async fn rooms_are_isolated() {
    let mut h = RoomHarness::new();
    h.enter("ann", "one").await;
    h.enter("bob", "two").await;

    assert_eq!(ids(&h.members("ann")), vec![h.id("ann").to_string()]);
    assert_eq!(ids(&h.members("bob")), vec![h.id("bob").to_string()]);

    h.edit("ann", "only in one").await;
    assert!(h.content_events("bob").is_empty());
}

#[tokio::test]
async fn leave_is_announced_once_to_each_remaining_member() {
    let mut h = RoomHarness::new();
    h.enter("ann", "room").await;
    h.enter("bob", "room").await;
    h.enter("cy", "room").await;
    let bob = h.id("bob");
    h.clear_history();

    h.disconnect("bob").await;

    for label in ["ann", "cy"] {
        let left = left_events(&h.peer(label).received);
        assert_eq!(left.len(), 1, "{label} should see exactly one departure");
        assert_eq!(left[0].connection_id, bob);
        assert_eq!(left[0].display_name, "bob");
    }
    let remaining = h.service.list_members(&RoomKey::from("room")).await;
    assert_eq!(ids(&remaining), vec![h.id("ann").to_string(), h.id("cy").to_string()]);
}

#[tokio::test]
async fn same_snapshot_applied_twice_renders_the_same_list() {
    let mut h = RoomHarness::new();
    h.enter("ann", "room").await;
    h.enter("bob", "room").await;

    let last_joined = h
        .peer("ann")
        .received
        .iter()
        .rev()
        .find(|event| matches!(event, ServerEvent::Joined(_)))
        .cloned()
        .unwrap();

    let mut view = MembershipView::new();
    let ServerEvent::Joined(joined) = last_joined else {
        unreachable!()
    };
    view.apply_snapshot(joined.members.clone());
    view.apply_snapshot(joined.members.clone());

    assert_eq!(view.members(), h.members("ann").as_slice());
    assert_eq!(view.len(), 2);
}

#[tokio::test]
async fn emptied_room_starts_fresh() {
    let mut h = RoomHarness::new();
    h.enter("ann", "room").await;
    h.edit("ann", "old text").await;
    h.disconnect("ann").await;

    assert_eq!(h.service.stats().await.rooms, 0);

    h.enter("bob", "room").await;
    assert_eq!(ids(&h.members("bob")), vec![h.id("bob").to_string()]);
    assert_eq!(h.content("bob"), None);
}

#[tokio::test]
async fn joining_another_room_moves_the_connection() {
    let mut h = RoomHarness::new();
    h.enter("ann", "one").await;
    h.enter("bob", "one").await;
    let bob = h.id("bob");
    h.clear_history();

    h.send(
        "bob",
        ClientMessage::Join(crate::models::JoinMessage {
            room_key: "two".into(),
            display_name: "bob".into(),
        }),
    )
    .await;
    h.settle().await;

    let left = left_events(&h.peer("ann").received);
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].connection_id, bob);
    assert_eq!(ids(&h.members("ann")), vec![h.id("ann").to_string()]);
    assert_eq!(
        ids(&h.service.list_members(&RoomKey::from("two")).await),
        vec![bob.to_string()]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_and_leaves_keep_every_view_consistent() {
    let service = Arc::new(RoomSyncService::new());
    let room = RoomKey::from("busy");

    let mut leavers = Vec::new();
    for i in 0..8 {
        let (id, rx) = service.connect();
        service.join(&id, room.clone(), format!("leaver-{i}")).await.unwrap();
        leavers.push((id, rx));
    }
    let mut stayers: Vec<_> = (0..32).map(|_| service.connect()).collect();

    let mut tasks = JoinSet::new();
    for (i, (id, _)) in stayers.iter().enumerate() {
        let service = Arc::clone(&service);
        let (id, room) = (id.clone(), room.clone());
        tasks.spawn(async move { service.join(&id, room, format!("p{i}")).await.unwrap() });
    }
    for (id, _) in &leavers {
        let service = Arc::clone(&service);
        let id = id.clone();
        tasks.spawn(async move { service.disconnect(&id).await });
    }
    while let Some(done) = tasks.join_next().await {
        done.unwrap();
    }

    let truth = service.list_members(&room).await;
    assert_eq!(truth.len(), stayers.len());
    for (id, rx) in stayers.iter_mut() {
        let mut view = MembershipView::new();
        let mut saw_own_join = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                ServerEvent::Joined(joined) => {
                    saw_own_join |= joined.joined_connection_id == *id;
                    view.apply_snapshot(joined.members);
                }
                ServerEvent::Left(left) => {
                    view.remove(&left.connection_id);
                }
                _ => {}
            }
        }
        assert!(saw_own_join, "{id} never saw its own join");
        assert_eq!(view.members(), truth.as_slice(), "view of {id} diverged");
    }
}

#[tokio::test]
async fn whitespace_room_key_is_an_ordinary_room() {
    let mut h = RoomHarness::new();
    h.enter("a", "  ").await;
    h.enter("b", "  ").await;

    assert_eq!(h.peer("a").participant.state(), SessionState::Joined);
    assert_eq!(ids(&h.members("a")), vec![h.id("a").to_string(), h.id("b").to_string()]);
    assert_eq!(h.service.list_members(&RoomKey::from("  ")).await.len(), 2);
    assert!(h.service.list_members(&RoomKey::from(" ")).await.is_empty());
}

// ============================================================================
// Broadcast
// ============================================================================

#[tokio::test]
async fn change_reaches_every_peer_once_and_never_the_origin() {
    let mut h = RoomHarness::new();
    h.enter("a", "room").await;
    h.enter("b", "room").await;
    h.enter("c", "room").await;
    h.clear_history();

    h.edit("a", "hello").await;

    assert_eq!(h.content_events("b"), vec!["hello".to_string()]);
    assert_eq!(h.content_events("c"), vec!["hello".to_string()]);
    assert!(h.content_events("a").is_empty());

    // Applying the remote update did not trigger further broadcasts
    assert_eq!(h.broadcasts_sent("a"), 1);
    assert_eq!(h.broadcasts_sent("b"), 0);
    assert_eq!(h.broadcasts_sent("c"), 0);
    assert_eq!(h.editor_text("b"), "hello");
    assert_eq!(h.editor_text("c"), "hello");
}

#[tokio::test]
async fn change_racing_a_join_does_not_echo() {
    let mut h = RoomHarness::new();
    h.enter("a", "room").await;
    h.enter("b", "room").await;
    h.clear_history();

    // The change is dispatched before the joiner's events are drained
    h.send(
        "a",
        ClientMessage::ContentChanged(ContentChangedMessage {
            room_key: "room".into(),
            content: "v1".into(),
        }),
    )
    .await;
    h.connect("c", "room", TextBuffer::new()).await;
    h.join("c").await;
    h.edit("a", "v2").await;

    assert!(h.content_events("a").is_empty());
    assert_eq!(h.content_events("b"), vec!["v1".to_string(), "v2".to_string()]);
    assert_eq!(h.content("c").as_deref(), Some("v2"));
}

#[tokio::test]
async fn last_delivered_write_wins() {
    let mut h = RoomHarness::new();
    h.enter("a", "room").await;
    h.enter("b", "room").await;

    h.edit("a", "from a").await;
    h.edit("b", "from b").await;

    assert_eq!(h.content("a").as_deref(), Some("from b"));
    assert_eq!(h.content("b").as_deref(), Some("from b"));
}

#[tokio::test]
async fn change_from_a_non_member_gets_an_error() {
    let mut h = RoomHarness::new();
    h.enter("a", "room").await;
    h.connect("lurker", "room", TextBuffer::new()).await;

    h.send(
        "lurker",
        ClientMessage::ContentChanged(ContentChangedMessage {
            room_key: "room".into(),
            content: "nope".into(),
        }),
    )
    .await;
    h.settle().await;

    assert!(h.content_events("a").is_empty());
    assert!(h
        .peer("lurker")
        .received
        .iter()
        .any(|event| matches!(event, ServerEvent::Error(_))));
}

// ============================================================================
// Sync handshake
// ============================================================================

#[tokio::test]
async fn joiner_receives_existing_content_without_broadcast() {
    let mut h = RoomHarness::new();
    h.enter("a", "room").await;
    h.edit("a", "print(1)").await;
    h.clear_history();

    h.enter("b", "room").await;

    assert_eq!(h.content("b").as_deref(), Some("print(1)"));
    assert_eq!(h.editor_text("b"), "print(1)");
    assert_eq!(h.broadcasts_sent("a"), 0);
    assert_eq!(h.broadcasts_sent("b"), 0);
    assert!(h.content_events("a").is_empty());
}

#[tokio::test]
async fn text_present_before_joining_reaches_the_next_joiner() {
    let mut h = RoomHarness::new();
    h.connect("a", "room", TextBuffer::with_content("print(1)")).await;
    h.join("a").await;

    h.enter("b", "room").await;

    assert_eq!(h.content("b").as_deref(), Some("print(1)"));
    assert_eq!(h.editor_text("b"), "print(1)");
    assert_eq!(h.broadcasts_sent("a"), 0);
    assert_eq!(h.broadcasts_sent("b"), 0);
}

#[tokio::test]
async fn joiner_asks_exactly_one_member() {
    let mut h = RoomHarness::new();
    h.enter("a", "room").await;
    h.enter("b", "room").await;
    h.edit("b", "shared").await;
    h.clear_history();

    h.enter("c", "room").await;

    let requests: Vec<_> = h
        .peer("c")
        .sent
        .iter()
        .filter(|msg| matches!(msg, ClientMessage::RequestSync(_)))
        .collect();
    assert_eq!(requests.len(), 1);

    let asked = |label: &str| {
        h.peer(label)
            .received
            .iter()
            .filter(|event| matches!(event, ServerEvent::SyncRequested(_)))
            .count()
    };
    assert_eq!(asked("a"), 1);
    assert_eq!(asked("b"), 0);
    assert_eq!(h.content("c").as_deref(), Some("shared"));
}

#[tokio::test]
async fn stale_sync_target_leaves_joiner_empty_until_next_change() {
    let mut h = RoomHarness::new();
    h.enter("a", "room").await;
    h.edit("a", "before").await;
    h.enter("b", "room").await;

    // Joined but no answer yet: the chosen target vanishes first
    h.connect("c", "room", TextBuffer::new()).await;
    h.join_unsettled("c").await;
    h.disconnect("a").await;

    assert_eq!(h.peer("c").participant.state(), SessionState::Joined);
    assert_eq!(h.content("c"), None);

    h.edit("b", "after").await;
    assert_eq!(h.content("c").as_deref(), Some("after"));
}

#[tokio::test]
async fn empty_room_key_is_refused() {
    let mut h = RoomHarness::new();
    h.enter("a", "").await;

    assert_eq!(h.peer("a").participant.state(), SessionState::Disconnected);
    assert_eq!(h.service.stats().await.joined, 0);
}
