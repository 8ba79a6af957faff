//! End-to-end behavior of producers, queue, consumer and flush.

mod common;

use common::{current, quiet_config, stalled_pipeline, start_engine};
use eventstats::chrono::{Calibration, TimePoint, TimeUnit};
use eventstats::core::OverflowPolicy;
use eventstats::events::{counter, CounterEvent, EventData};
use eventstats::metrics::{AttributeValue, MetricKind, Summary};
use eventstats::{Engine, StatsError};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_counter_end_to_end() {
    let engine = start_engine();
    let producer = engine.producer();

    producer.counter_init("requests", 0).unwrap();
    for _ in 0..5 {
        producer.counter_increment("requests", 1).unwrap();
    }
    engine.flush().unwrap();

    let summary = current(&engine.view(), "requests");
    let counter = summary.as_counter().unwrap();
    assert_eq!(counter.value, 5);
    assert_eq!(counter.rate, 5);
    assert!(counter.initialized);
}

#[test]
fn test_gauge_window_statistics() {
    let engine = start_engine();
    let producer = engine.producer();

    for value in [10.0, 20.0, 30.0] {
        producer.gauge_set("pool.in_use", value).unwrap();
    }
    engine.flush().unwrap();

    let summary = current(&engine.view(), "pool.in_use");
    let gauge = summary.as_gauge().unwrap();
    assert_eq!(gauge.value, Some(30.0));
    assert_eq!(gauge.count, 3);
    assert_eq!(gauge.min, 10.0);
    assert_eq!(gauge.max, 30.0);
    assert_eq!(gauge.avg, 20.0);
}

#[test]
fn test_timer_records_one_sample_per_span() {
    let engine = start_engine();
    let producer = engine.producer();

    producer.timer_start("db.query", 1).unwrap();
    thread::sleep(Duration::from_millis(5));
    producer.timer_stop("db.query", 1).unwrap();
    // second stop for the same id is ignored
    producer.timer_stop("db.query", 1).unwrap();
    engine.flush().unwrap();

    let summary = current(&engine.view(), "db.query");
    let timer = summary.as_timer().unwrap();
    assert_eq!(timer.unit, TimeUnit::Usec);
    assert_eq!(timer.stats.count, 1);
    assert!(timer.stats.sum >= 4_000.0, "sample was {}us", timer.stats.sum);
    assert_eq!(timer.active_spans, 0);
}

#[test]
fn test_discarded_span_records_nothing() {
    let engine = start_engine();
    let producer = engine.producer();

    producer.timer_start_default("upload").unwrap();
    producer.timer_discard("upload", eventstats::metrics::DEFAULT_SPAN_ID).unwrap();
    producer.timer_stop_default("upload").unwrap();
    engine.flush().unwrap();

    let summary = current(&engine.view(), "upload");
    assert_eq!(summary.as_timer().unwrap().stats.count, 0);
}

#[test]
fn test_attribute_last_enqueued_wins() {
    let engine = start_engine();
    let producer = engine.producer();

    producer.attribute_set("build.version", "1.4.0").unwrap();
    producer.attribute_set("build.version", "1.4.1").unwrap();
    engine.flush().unwrap();

    let summary = current(&engine.view(), "build.version");
    let attribute = summary.as_attribute().unwrap();
    assert_eq!(attribute.value, Some(AttributeValue::from("1.4.1")));
    assert!(attribute.updated.unwrap().to_datetime().is_some());
}

#[test]
fn test_multi_producer_total_order() {
    const PRODUCERS: i64 = 4;
    const PER_PRODUCER: i64 = 500;

    let (dispatcher, _registry) = stalled_pipeline(4_096, OverflowPolicy::DropNewest);
    let dispatcher = Arc::new(dispatcher);

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let dispatcher = Arc::clone(&dispatcher);
            thread::spawn(move || {
                (0..PER_PRODUCER)
                    .map(|i| {
                        let value = p * 1_000_000 + i;
                        let event = counter::create_set_event("order", value, TimePoint::default());
                        (dispatcher.enqueue(event).unwrap(), value)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    // sequence handed back to each producer -> the value it enqueued
    let mut assigned = BTreeMap::new();
    for handle in handles {
        for (sequence, value) in handle.join().unwrap() {
            assert!(assigned.insert(sequence, value).is_none(), "sequence {} assigned twice", sequence);
        }
    }
    let mut expected = assigned.into_iter();

    let mut last_sequence = None;
    let mut last_per_producer = vec![-1_i64; PRODUCERS as usize];
    let mut seen = 0;
    while let Some(event) = dispatcher.try_next() {
        assert!(last_sequence.map_or(true, |last| event.sequence == last + 1));
        last_sequence = Some(event.sequence);

        let EventData::Counter(CounterEvent::Set(value)) = event.message.data() else {
            panic!("unexpected payload");
        };
        assert_eq!(expected.next(), Some((event.sequence, *value)));

        let (producer, index) = ((value / 1_000_000) as usize, value % 1_000_000);
        assert!(index > last_per_producer[producer], "producer {} reordered", producer);
        last_per_producer[producer] = index;
        seen += 1;
    }
    assert_eq!(seen, PRODUCERS * PER_PRODUCER);
    assert_eq!(expected.next(), None);
}

#[test]
fn test_overflow_drops_newest_with_stalled_consumer() {
    const CAPACITY: usize = 16;
    const EXTRA: usize = 5;

    let (dispatcher, mut registry) = stalled_pipeline(CAPACITY, OverflowPolicy::DropNewest);
    let mut rejected = 0;
    for _ in 0..CAPACITY + EXTRA {
        match dispatcher.enqueue(counter::create_increment_event("hits", 1, TimePoint::default())) {
            Ok(_) => {},
            Err(StatsError::QueueFull) => rejected += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(rejected, EXTRA);
    assert_eq!(dispatcher.drain(&mut registry), CAPACITY);
    let value = registry.metric("hits").unwrap().as_counter().unwrap().value();
    assert_eq!(value, CAPACITY as i64);

    let stats = registry.view().stats();
    assert_eq!(stats.enqueued, CAPACITY as u64);
    assert_eq!(stats.dropped, EXTRA as u64);
    assert_eq!(stats.processed, CAPACITY as u64);
}

#[test]
fn test_overflow_drop_oldest_keeps_recent() {
    let (dispatcher, mut registry) = stalled_pipeline(4, OverflowPolicy::DropOldest);
    for value in 1..=10 {
        dispatcher
            .enqueue(counter::create_set_event("latest", value, TimePoint::default()))
            .unwrap();
    }

    assert_eq!(dispatcher.drain(&mut registry), 4);
    let counter = registry.metric("latest").unwrap().as_counter().unwrap();
    assert_eq!(counter.value(), 10);

    let stats = registry.view().stats();
    assert_eq!(stats.enqueued, 10);
    assert_eq!(stats.dropped, 6);
    assert_eq!(stats.evicted, 6);
    assert_eq!(stats.in_flight, 0);
}

#[test]
fn test_shutdown_applies_everything_accepted() {
    let mut engine = start_engine();
    let producer = engine.producer();
    let view = engine.view();

    let mut accepted = 0;
    for _ in 0..1_000 {
        if producer.counter_increment("jobs", 1).is_ok() {
            accepted += 1;
        }
    }
    engine.shutdown().unwrap();

    let summary = current(&view, "jobs");
    assert_eq!(summary.as_counter().unwrap().value, accepted);
    let stats = view.stats();
    assert_eq!(stats.processed, stats.enqueued);
    assert!(matches!(producer.counter_increment("jobs", 1), Err(StatsError::QueueClosed)));
}

#[test]
fn test_drop_flushes_pending_events() {
    let engine = start_engine();
    let producer = engine.producer();
    let view = engine.view();

    producer.counter_increment("late", 3).unwrap();
    drop(engine);

    assert_eq!(current(&view, "late").as_counter().unwrap().value, 3);
}

#[test]
fn test_protocol_errors_are_counted() {
    let engine = start_engine();
    let producer = engine.producer();

    producer.gauge_set("temperature", f64::NAN).unwrap();
    producer.gauge_set("temperature", 21.5).unwrap();
    producer.counter_increment("temperature", 1).unwrap();
    engine.flush().unwrap();

    let stats = engine.stats();
    assert_eq!(stats.protocol_errors, 2);
    assert_eq!(stats.processed, 3);
    let summary = current(&engine.view(), "temperature");
    assert_eq!(summary.as_gauge().unwrap().value, Some(21.5));
}

#[test]
fn test_eager_metrics_are_visible_before_events() {
    let mut config = quiet_config();
    config.eager.push(eventstats::core::EagerMetric {
        name: "cache.hits".to_string(),
        kind: MetricKind::Counter,
    });
    let engine = Engine::start(config).unwrap();

    let snapshot = engine.view().get("cache.hits").unwrap();
    assert_eq!(snapshot.kind, MetricKind::Counter);
    assert!(snapshot.current.is_none());

    engine.flush().unwrap();
    let summary = current(&engine.view(), "cache.hits");
    assert!(!summary.as_counter().unwrap().initialized);
}

#[test]
fn test_history_retains_configured_windows() {
    let mut config = quiet_config();
    config.flush.retained_windows = 3;
    let engine = Engine::start(config).unwrap();
    let producer = engine.producer();

    for round in 1..=5 {
        producer.counter_increment("ticks", round).unwrap();
        engine.flush().unwrap();
    }

    let snapshot = engine.view().get("ticks").unwrap();
    let rates: Vec<i64> = snapshot
        .history
        .iter()
        .filter_map(|window| window.summary.as_counter().map(|c| c.rate))
        .collect();
    assert_eq!(rates, vec![3, 4, 5]);
    assert_eq!(engine.stats().flushes, 5);
}

#[test]
fn test_periodic_flush_without_explicit_request() {
    let mut config = quiet_config();
    config.flush.interval = Duration::from_millis(20);
    let engine = Engine::start(config).unwrap();
    engine.producer().counter_increment("heartbeat", 1).unwrap();

    let view = engine.view();
    let mut flushed = false;
    for _ in 0..100 {
        if view.get("heartbeat").map_or(false, |s| s.current.is_some()) {
            flushed = true;
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    assert!(flushed, "no window finalized within a second");
}

#[test]
fn test_snapshot_serializes_to_json() {
    let engine = start_engine();
    let producer = engine.producer();
    producer.counter_increment("exported", 2).unwrap();
    producer.attribute_set("region", "eu-west-1").unwrap();
    engine.flush().unwrap();

    let snapshots = engine.view().snapshot();
    let json = serde_json::to_value(&*snapshots[0]).unwrap();
    assert_eq!(json["name"], "exported");
    assert_eq!(json["kind"], "counter");
    assert_eq!(json["current"]["summary"]["kind"], "counter");
    assert_eq!(json["current"]["summary"]["value"], 2);

    let json = serde_json::to_value(&*snapshots[1]).unwrap();
    assert_eq!(json["current"]["summary"]["value"], "eu-west-1");
}

#[test]
fn test_calibration_is_installed_by_engine() {
    let _engine = start_engine();
    let calibration = Calibration::get().unwrap();
    assert!(calibration.cycles_per_sec() > 0);
}

#[test]
fn test_window_summary_kinds_match_metric_kinds() {
    let engine = start_engine();
    let producer = engine.producer();
    producer.counter_increment("a.counter", 1).unwrap();
    producer.gauge_set("a.gauge", 1.0).unwrap();
    producer.timer_init("a.timer").unwrap();
    producer.attribute_set("an.attribute", true).unwrap();
    engine.flush().unwrap();

    let kinds: Vec<MetricKind> = engine
        .view()
        .snapshot()
        .iter()
        .map(|snapshot| snapshot.current.as_ref().unwrap().summary.kind())
        .collect();
    assert_eq!(
        kinds,
        vec![MetricKind::Counter, MetricKind::Gauge, MetricKind::Timer, MetricKind::Attribute]
    );
    assert!(matches!(
        current(&engine.view(), "an.attribute"),
        Summary::Attribute(_)
    ));
}
