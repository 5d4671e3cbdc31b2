// tests/backpressure.rs

use std::error::Error;
use std::time::Duration;

use futures::channel::mpsc as input_channel;
use futures::stream;
use tokio::sync::mpsc;

use topostream::errors::TopostreamError;
use topostream::{SortEvent, SortOptions, TopoSort};
use topostream_test_utils::builders::{ids, item, item_resolver, Item};
use topostream_test_utils::fake_resolver::FakeResolver;
use topostream_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn independent(count: u32) -> Vec<Item> {
    (0..count).map(|id| item(id, &[])).collect()
}

#[tokio::test]
async fn max_in_flight_limits_concurrent_resolutions() -> TestResult {
    init_tracing();
    let resolver = FakeResolver::new().with_default_delay(Duration::from_millis(10));
    let options = SortOptions::default().with_max_in_flight(2);

    let report = with_timeout(
        TopoSort::new(resolver.clone())
            .with_options(options)
            .spawn(stream::iter(independent(10)))
            .collect_report(),
    )
    .await?;

    assert_eq!(report.items.len(), 10);
    assert!(resolver.peak_in_flight() <= 2, "peak was {}", resolver.peak_in_flight());
    assert!(resolver.peak_in_flight() >= 1);
    Ok(())
}

#[tokio::test]
async fn unbounded_by_default() -> TestResult {
    init_tracing();
    let resolver = FakeResolver::new().with_default_delay(Duration::from_millis(50));

    let report = with_timeout(
        TopoSort::new(resolver.clone())
            .spawn(stream::iter(independent(10)))
            .collect_report(),
    )
    .await?;

    assert_eq!(report.items.len(), 10);
    assert_eq!(resolver.peak_in_flight(), 10);
    Ok(())
}

#[tokio::test]
async fn slow_consumer_receives_everything_in_order() -> TestResult {
    init_tracing();
    let options = SortOptions::default().with_output_buffer(1);
    let mut events = TopoSort::new(item_resolver())
        .with_options(options)
        .spawn(stream::iter(independent(20)));

    let mut received = Vec::new();
    while let Some(event) = with_timeout(events.recv()).await {
        tokio::time::sleep(Duration::from_millis(1)).await;
        received.extend(event.into_item());
    }

    assert_eq!(ids(&received), (0..20).collect::<Vec<_>>());
    let outcome = events.join().await?;
    assert_eq!(outcome.stats.emitted, 20);
    Ok(())
}

#[tokio::test]
async fn items_are_emitted_before_input_ends() -> TestResult {
    init_tracing();
    let (input_tx, input_rx) = input_channel::unbounded();
    let mut events = TopoSort::new(item_resolver()).spawn(input_rx);

    input_tx.unbounded_send(item(2, &[1])).unwrap();
    input_tx.unbounded_send(item(1, &[])).unwrap();

    let first = with_timeout(events.recv()).await.and_then(SortEvent::into_item);
    let second = with_timeout(events.recv()).await.and_then(SortEvent::into_item);
    assert_eq!(first.map(|item| item.id), Some(1));
    assert_eq!(second.map(|item| item.id), Some(2));

    input_tx.unbounded_send(item(3, &[2])).unwrap();
    let third = with_timeout(events.recv()).await.and_then(SortEvent::into_item);
    assert_eq!(third.map(|item| item.id), Some(3));

    drop(input_tx);
    assert!(with_timeout(events.recv()).await.is_none());
    let outcome = events.join().await?;
    assert_eq!(outcome.stats.submitted, 3);
    assert!(outcome.diagnosis.is_none());
    Ok(())
}

#[tokio::test]
async fn run_inline_against_caller_channel() -> TestResult {
    init_tracing();
    let (tx, mut rx) = mpsc::channel(4);
    let consumer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            seen.extend(SortEvent::into_item(event).map(|item: Item| item.id));
        }
        seen
    });

    let input = vec![item(2, &[1]), item(3, &[2]), item(1, &[])];
    let outcome = with_timeout(TopoSort::new(item_resolver()).run(stream::iter(input), tx)).await?;

    assert_eq!(outcome.stats.emitted, 3);
    assert_eq!(consumer.await?, vec![1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn dropped_receiver_stops_the_driver() -> TestResult {
    init_tracing();
    let (tx, rx) = mpsc::channel::<SortEvent<u32, Item>>(1);
    drop(rx);

    let result = with_timeout(
        TopoSort::new(item_resolver()).run(stream::iter(independent(3)), tx),
    )
    .await;

    assert!(matches!(result, Err(TopostreamError::OutputClosed)));
    Ok(())
}
