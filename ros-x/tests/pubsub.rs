use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ros_x::Builder;
use ros_x::context::{XContext, XContextBuilder};
use ros_x::entity::EntityKind;
use ros_x::ros_msg::Twist;

fn ctx() -> XContext {
    XContextBuilder::default()
        .build()
        .expect("failed to create context")
}

#[test]
fn published_samples_reach_a_pull_mode_subscription() {
    let ctx = ctx();
    let node = ctx.create_node("n").build().expect("failed to create node");

    let subscriber = node
        .create_sub::<Twist>("chatter")
        .build()
        .expect("failed to create subscription");
    let publisher = node
        .create_pub::<Twist>("chatter")
        .build()
        .expect("failed to create publisher");

    publisher
        .publish_serialized(b"hello")
        .expect("failed to publish");
    publisher
        .publish_serialized(b"world")
        .expect("failed to publish");

    let first = subscriber.take().expect("expected a sample");
    assert_eq!(first.payload, b"hello");
    assert_eq!(first.sequence_number, 0);
    assert_eq!(first.source_gid, publisher.gid());

    let second = subscriber.take().expect("expected a sample");
    assert_eq!(second.payload, b"world");
    assert_eq!(second.sequence_number, 1);

    assert!(subscriber.take().is_none());
}

#[test]
fn queue_depth_drops_the_oldest_samples() {
    let ctx = ctx();
    let node = ctx.create_node("n").build().expect("failed to create node");

    let subscriber = node
        .create_sub::<Twist>("chatter")
        .with_queue_depth(2)
        .build()
        .expect("failed to create subscription");
    let publisher = node
        .create_pub::<Twist>("chatter")
        .build()
        .expect("failed to create publisher");

    for payload in [&b"one"[..], b"two", b"three"] {
        publisher.publish_serialized(payload).expect("failed to publish");
    }

    assert_eq!(subscriber.take().expect("expected a sample").payload, b"two");
    assert_eq!(
        subscriber.take().expect("expected a sample").payload,
        b"three"
    );
    assert!(subscriber.take().is_none());
}

#[test]
fn callback_mode_dispatches_one_sample_at_a_time() {
    let ctx = ctx();
    let node = ctx.create_node("n").build().expect("failed to create node");

    let seen = Arc::new(AtomicUsize::new(0));
    let subscriber = node
        .create_sub::<Twist>("chatter")
        .build_with_callback({
            let seen = seen.clone();
            move |sample| {
                assert_eq!(sample.payload, b"tick");
                seen.fetch_add(1, Ordering::SeqCst);
            }
        })
        .expect("failed to create subscription");
    let publisher = node
        .create_pub::<Twist>("chatter")
        .build()
        .expect("failed to create publisher");

    publisher.publish_serialized(b"tick").expect("failed to publish");
    publisher.publish_serialized(b"tick").expect("failed to publish");

    assert!(subscriber.dispatch_one());
    assert!(subscriber.dispatch_one());
    assert!(!subscriber.dispatch_one());
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[test]
fn topics_are_isolated_from_each_other() {
    let ctx = ctx();
    let node = ctx.create_node("n").build().expect("failed to create node");

    let subscriber = node
        .create_sub::<Twist>("left")
        .build()
        .expect("failed to create subscription");
    let publisher = node
        .create_pub::<Twist>("right")
        .build()
        .expect("failed to create publisher");

    publisher.publish_serialized(b"data").expect("failed to publish");
    assert!(subscriber.take().is_none());
}

#[test]
fn dropped_subscriptions_stop_receiving() {
    let ctx = ctx();
    let node = ctx.create_node("n").build().expect("failed to create node");

    let subscriber = node
        .create_sub::<Twist>("chatter")
        .build()
        .expect("failed to create subscription");
    let publisher = node
        .create_pub::<Twist>("chatter")
        .build()
        .expect("failed to create publisher");
    drop(subscriber);

    // Publishing into a topic with no live subscriptions is not an error.
    publisher.publish_serialized(b"data").expect("failed to publish");
}

#[test]
fn entities_have_distinct_gids() {
    let ctx = ctx();
    let node = ctx.create_node("n").build().expect("failed to create node");

    let publisher = node
        .create_pub::<Twist>("chatter")
        .build()
        .expect("failed to create publisher");
    let subscriber = node
        .create_sub::<Twist>("chatter")
        .build()
        .expect("failed to create subscription");

    assert_ne!(publisher.gid(), subscriber.gid());
    assert_eq!(publisher.as_entity().kind(), EntityKind::Publisher);
    assert_eq!(subscriber.as_entity().kind(), EntityKind::Subscription);
    assert_ne!(publisher.as_entity().id(), subscriber.as_entity().id());
}
