use flow_guard_core::clock::ManualClock;
use flow_guard_core::primitives::{Admission, TokenBucket, TokenBucketPolicy};
use flow_guard_core::GuardError;

fn new_bucket(initial: f64) -> (TokenBucket<ManualClock>, ManualClock) {
    let clock = ManualClock::new(0.0);
    let bucket = TokenBucket::with_clock(clock.clone(), initial).unwrap();
    (bucket, clock)
}

fn invalid_argument(result: Result<bool, GuardError>) -> &'static str {
    match result {
        Err(err) => err.argument(),
        Ok(admitted) => panic!("expected InvalidArgument, got Ok({})", admitted),
    }
}

#[test]
fn negative_arguments_are_rejected_before_any_change() {
    let (mut bucket, clock) = new_bucket(2.0);
    clock.set(1.0);

    assert_eq!(invalid_argument(bucket.consume(-1.0, 1.0, 5.0)), "take");
    assert_eq!(invalid_argument(bucket.consume(1.0, -1.0, 5.0)), "avg_rate");
    assert_eq!(invalid_argument(bucket.consume(1.0, 1.0, -5.0)), "burst_size");
    assert_eq!(invalid_argument(bucket.consume(f64::NAN, 1.0, 5.0)), "take");
    assert_eq!(invalid_argument(bucket.consume(1.0, f64::INFINITY, 5.0)), "avg_rate");

    assert_eq!(bucket.amount(), 2.0);
    assert_eq!(bucket.last_consume_time(), 0.0);
}

#[test]
fn verbose_admitted_reports_remaining() {
    let (mut bucket, clock) = new_bucket(0.0);
    clock.set(1.0);
    assert_eq!(
        bucket.consume_verbose(1.0, 10.0, 5.0),
        Ok(Admission::Admitted { remaining: 4.0 })
    );
}

#[test]
fn verbose_rejected_reports_retry_after() {
    let (mut bucket, clock) = new_bucket(0.0);
    clock.set(0.5);

    // 0.5s at 2/s = 1 token, need 3: 2 short at 2/s = 1s
    let admission = bucket.consume_verbose(3.0, 2.0, 10.0).unwrap();
    match admission {
        Admission::Rejected {
            requested,
            available,
            retry_after,
        } => {
            assert_eq!(requested, 3.0);
            assert_eq!(available, 1.0);
            assert_eq!(retry_after, Some(1.0));
        }
        _ => panic!("Expected Rejected"),
    }

    // Waiting exactly that long is enough
    clock.advance(1.0);
    assert_eq!(bucket.consume(3.0, 2.0, 10.0), Ok(true));
}

#[test]
fn verbose_beyond_burst_has_no_retry() {
    let (mut bucket, clock) = new_bucket(0.0);
    clock.set(100.0);
    let admission = bucket.consume_verbose(6.0, 1.0, 5.0).unwrap();
    assert_eq!(
        admission,
        Admission::Rejected {
            requested: 6.0,
            available: 5.0,
            retry_after: None
        }
    );
    assert!(!admission.is_admitted());
}

#[test]
fn non_finite_timestamp_is_rejected() {
    let (mut bucket, _) = new_bucket(0.0);

    // A NaN timestamp must not unlock a full burst with no refill
    assert_eq!(invalid_argument(bucket.consume_at(f64::NAN, 5.0, 0.0, 5.0)), "now");
    assert_eq!(invalid_argument(bucket.consume_at(f64::INFINITY, 5.0, 1.0, 5.0)), "now");
    assert!(bucket.consume_verbose_at(f64::NEG_INFINITY, 0.0, 1.0, 5.0).is_err());
    assert_eq!(bucket.last_consume_time(), 0.0);

    // Bucket still starts from empty
    for _ in 0..100 {
        assert_eq!(bucket.consume_at(0.0, 5.0, 0.0, 5.0), Ok(false));
    }
    assert_eq!(bucket.amount(), 0.0);
}

#[test]
fn non_finite_clock_reading_is_rejected() {
    let (mut bucket, clock) = new_bucket(0.0);

    clock.set(f64::NAN);
    assert_eq!(invalid_argument(bucket.consume(5.0, 0.0, 5.0)), "now");
    assert_eq!(bucket.amount(), 0.0);
    assert_eq!(bucket.last_consume_time(), 0.0);

    clock.set(1.0);
    assert_eq!(bucket.consume(5.0, 0.0, 5.0), Ok(false));

    let skewed = ManualClock::new(f64::INFINITY);
    assert!(TokenBucket::with_clock(skewed, 0.0).is_err());
}

#[test]
fn retry_after_is_enough_despite_rounding() {
    let (mut bucket, _) = new_bucket(0.0);

    // 0.39s at 0.1/s leaves a deficit whose quotient rounds short
    let now = 0.39;
    let retry = match bucket.consume_verbose_at(now, 0.7, 0.1, 100.0).unwrap() {
        Admission::Rejected {
            retry_after: Some(retry),
            ..
        } => retry,
        other => panic!("Expected Rejected with retry_after, got {:?}", other),
    };
    assert!(retry > 6.6 && retry < 6.7);

    assert_eq!(bucket.consume_at(now + retry, 0.7, 0.1, 100.0), Ok(true));
}

#[test]
fn policy_validation() {
    assert!(TokenBucketPolicy::new(0.0, 0.0).is_ok());
    assert!(TokenBucketPolicy::new(-0.1, 1.0).is_err());
    assert!(TokenBucketPolicy::new(1.0, f64::NAN).is_err());
}

#[test]
fn consume_with_policy() {
    let (mut bucket, clock) = new_bucket(0.0);
    let policy = TokenBucketPolicy::new(10.0, 5.0).unwrap();

    assert_eq!(bucket.consume_with(1.0, &policy), Ok(false));
    clock.set(1.0);
    assert_eq!(bucket.consume_with(1.0, &policy), Ok(true));
    assert_eq!(bucket.amount(), 4.0);

    assert_eq!(bucket.consume_with_at(1.0, 4.0, &policy), Ok(true));
    assert_eq!(bucket.amount(), 0.0);
}

#[test]
fn policy_with_public_fields_is_still_checked() {
    let (mut bucket, _) = new_bucket(0.0);
    let policy = TokenBucketPolicy {
        avg_rate: -1.0,
        burst_size: 5.0,
    };
    assert!(bucket.consume_with(0.0, &policy).is_err());
}

#[test]
fn clock_going_backwards_lowers_available_tokens() {
    let (mut bucket, clock) = new_bucket(0.0);
    clock.set(5.0);
    assert_eq!(bucket.consume(0.0, 1.0, 10.0), Ok(true));
    assert_eq!(bucket.amount(), 5.0);

    // Skew of -2s at 1/s: 5 - 2 = 3 tokens visible, not clamped
    clock.set(3.0);
    assert_eq!(bucket.consume(4.0, 1.0, 10.0), Ok(false));
    assert_eq!(bucket.consume(3.0, 1.0, 10.0), Ok(true));
    assert_eq!(bucket.amount(), 0.0);
    assert_eq!(bucket.last_consume_time(), 3.0);
}

#[test]
fn clock_going_backwards_can_reject_zero_take() {
    let (mut bucket, clock) = new_bucket(0.0);
    clock.set(10.0);
    assert_eq!(bucket.consume(0.0, 1.0, 1.0), Ok(true)); // amount = 1

    // 1 + (-5 * 1) = -4, so even a zero take is refused
    clock.set(5.0);
    assert_eq!(bucket.consume(0.0, 1.0, 1.0), Ok(false));
    assert_eq!(bucket.amount(), 1.0);
}

#[test]
fn bucket_over_boxed_clock() {
    use flow_guard_core::clock::Clock;

    let clock = ManualClock::new(0.0);
    let boxed: Box<dyn Clock> = Box::new(clock.clone());
    let mut bucket = TokenBucket::with_clock(boxed, 0.0).unwrap();

    clock.set(2.0);
    assert_eq!(bucket.consume(2.0, 1.0, 2.0), Ok(true));
}
