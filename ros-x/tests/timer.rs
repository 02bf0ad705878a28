use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use ros_x::Builder;
use ros_x::context::{XContext, XContextBuilder};

fn ctx() -> XContext {
    XContextBuilder::default()
        .build()
        .expect("failed to create context")
}

#[test]
fn fractional_periods_truncate_to_whole_nanoseconds() {
    let ctx = ctx();
    let node = ctx.create_node("n").build().expect("failed to create node");

    // 2.5ns truncates to 2ns; rounding would give 3ns.
    let timer = node
        .create_wall_timer_secs(2.5e-9, || {})
        .build()
        .expect("failed to create timer");
    assert_eq!(timer.period(), Duration::from_nanos(2));

    // 0.9999999999s truncates below the full second.
    let timer = node
        .create_wall_timer_secs(0.999_999_999_9, || {})
        .build()
        .expect("failed to create timer");
    assert_eq!(timer.period(), Duration::from_nanos(999_999_999));

    // Exactly representable periods pass through unchanged.
    let timer = node
        .create_wall_timer_secs(1.5, || {})
        .build()
        .expect("failed to create timer");
    assert_eq!(timer.period(), Duration::from_millis(1500));
}

#[test]
fn timers_become_ready_after_their_period() {
    let ctx = ctx();
    let node = ctx.create_node("n").build().expect("failed to create node");

    let fired = Arc::new(AtomicUsize::new(0));
    let timer = node
        .create_wall_timer(Duration::from_millis(5), {
            let fired = fired.clone();
            move || {
                fired.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build()
        .expect("failed to create timer");

    assert!(!timer.is_ready());
    thread::sleep(Duration::from_millis(10));
    assert!(timer.is_ready());

    timer.call();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    // The schedule moved past now; the timer needs another period.
    assert!(!timer.is_ready());
    assert!(timer.time_until_next_call().is_ok());
}

#[test]
fn zero_period_timers_are_always_ready() {
    let ctx = ctx();
    let node = ctx.create_node("n").build().expect("failed to create node");

    let timer = node
        .create_wall_timer(Duration::ZERO, || {})
        .build()
        .expect("failed to create timer");
    assert!(timer.is_ready());
    timer.call();
    assert!(timer.is_ready());
}

#[test]
fn canceled_timers_do_not_fire_until_reset() {
    let ctx = ctx();
    let node = ctx.create_node("n").build().expect("failed to create node");

    let fired = Arc::new(AtomicUsize::new(0));
    let timer = node
        .create_wall_timer(Duration::from_millis(1), {
            let fired = fired.clone();
            move || {
                fired.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build()
        .expect("failed to create timer");

    timer.cancel();
    assert!(timer.is_canceled());
    thread::sleep(Duration::from_millis(3));
    assert!(!timer.is_ready());
    timer.call();
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    timer.reset();
    assert!(!timer.is_canceled());
    thread::sleep(Duration::from_millis(3));
    assert!(timer.is_ready());
    timer.call();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn timers_count_toward_the_creation_counter() {
    let ctx = ctx();
    let node = ctx.create_node("n").build().expect("failed to create node");

    let _a = node
        .create_wall_timer(Duration::from_millis(10), || {})
        .build()
        .expect("failed to create timer");
    let _b = node
        .create_wall_timer_secs(0.01, || {})
        .build()
        .expect("failed to create timer");
    assert_eq!(node.counters().timers(), 2);
}
