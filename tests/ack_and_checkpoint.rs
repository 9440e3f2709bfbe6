mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{deletion, listener_ctx_with_counter, mutation, MockAgent, MockDcpClient};
use dcp_sink::{DefaultMapper, Listener, Processor, SinkConfig};

fn test_config(batch_size_limit: usize) -> SinkConfig {
    SinkConfig {
        batch_size_limit,
        batch_byte_size_limit: dcp_sink::ByteSize(1_000_000),
        batch_ticker_duration: Duration::from_secs(3600),
        request_timeout: Duration::from_secs(5),
        max_inflight_requests: 16,
        bucket_name: "target".to_string(),
        hosts: vec!["127.0.0.1".to_string()],
        ..Default::default()
    }
}

fn build(
    batch_size_limit: usize,
) -> (
    Arc<Listener<MockAgent, MockDcpClient>>,
    Arc<Processor<MockAgent, MockDcpClient>>,
    Arc<MockAgent>,
    Arc<MockDcpClient>,
) {
    let agent = MockAgent::new();
    let dcp = MockDcpClient::new();
    let metrics = Arc::new(dcp_sink::MetricsCollector::new());
    let target_client = dcp_sink::TargetKvClient::new(Arc::clone(&agent));
    let processor = Arc::new(Processor::new(
        test_config(batch_size_limit),
        target_client.clone(),
        None,
        Arc::clone(&dcp),
        Arc::clone(&metrics),
    ));
    let listener = Arc::new(Listener::new(
        Arc::clone(&processor),
        Arc::new(DefaultMapper),
        target_client,
        metrics,
        batch_size_limit,
    ));
    (listener, processor, agent, dcp)
}

#[tokio::test]
async fn a_filtered_event_acks_without_touching_the_target() {
    struct DropEverything;
    impl dcp_sink::Mapper<MockAgent> for DropEverything {
        fn map(&self, _ctx: &dcp_sink::EventContext<MockAgent>) -> Vec<dcp_sink::Action> {
            Vec::new()
        }
    }

    let agent = MockAgent::new();
    let dcp = MockDcpClient::new();
    let metrics = Arc::new(dcp_sink::MetricsCollector::new());
    let target_client = dcp_sink::TargetKvClient::new(Arc::clone(&agent));
    let processor = Arc::new(Processor::new(
        test_config(100),
        target_client.clone(),
        None,
        Arc::clone(&dcp),
        Arc::clone(&metrics),
    ));
    let listener = Listener::new(processor, Arc::new(DropEverything), target_client, metrics, 100);

    let (ctx, acked) = listener_ctx_with_counter(mutation("k", b"v"));
    listener.on_event(ctx).await;

    assert_eq!(acked.load(Ordering::SeqCst), 1);
    assert_eq!(agent.call_count().await, 0);
}

#[tokio::test]
async fn a_mutation_is_acked_exactly_once() {
    let (listener, _processor, agent, _dcp) = build(100);
    let (ctx, acked) = listener_ctx_with_counter(mutation("doc-1", b"{\"a\":1}"));
    listener.on_event(ctx).await;

    assert_eq!(acked.load(Ordering::SeqCst), 1);
    assert_eq!(agent.call_count().await, 1);
}

#[tokio::test]
async fn a_deletion_maps_to_a_delete_action() {
    let (listener, _processor, agent, _dcp) = build(100);
    let (ctx, acked) = listener_ctx_with_counter(deletion("doc-1"));
    listener.on_event(ctx).await;

    assert_eq!(acked.load(Ordering::SeqCst), 1);
    assert_eq!(agent.call_count().await, 1);
}

#[tokio::test]
async fn an_event_producing_more_actions_than_the_batch_limit_is_still_acked_exactly_once() {
    struct FanOut;
    impl dcp_sink::Mapper<MockAgent> for FanOut {
        fn map(&self, ctx: &dcp_sink::EventContext<MockAgent>) -> Vec<dcp_sink::Action> {
            (0..5)
                .map(|i| {
                    dcp_sink::Action::new_set(
                        format!("{}-{}", String::from_utf8_lossy(&ctx.event.key), i),
                        ctx.event.value.clone(),
                    )
                })
                .collect()
        }
    }

    let agent = MockAgent::new();
    let dcp = MockDcpClient::new();
    let metrics = Arc::new(dcp_sink::MetricsCollector::new());
    let target_client = dcp_sink::TargetKvClient::new(Arc::clone(&agent));
    let processor = Arc::new(Processor::new(
        test_config(2),
        target_client.clone(),
        None,
        Arc::clone(&dcp),
        Arc::clone(&metrics),
    ));
    let listener = Listener::new(processor, Arc::new(FanOut), target_client, metrics, 2);

    let (ctx, acked) = listener_ctx_with_counter(mutation("doc", b"v"));
    listener.on_event(ctx).await;

    assert_eq!(acked.load(Ordering::SeqCst), 1);
    assert_eq!(agent.call_count().await, 5);
}

#[tokio::test]
async fn closing_the_processor_flushes_a_partial_batch_and_commits() {
    let (listener, processor, agent, dcp) = build(100);
    let (ctx, acked) = listener_ctx_with_counter(mutation("doc", b"v"));
    listener.on_event(ctx).await;
    assert_eq!(acked.load(Ordering::SeqCst), 1);

    // a single mutation never crosses the size/byte threshold on its own
    assert_eq!(dcp.commit_count(), 0);
    assert_eq!(agent.call_count().await, 0);

    processor.close().await;

    assert_eq!(dcp.commit_count(), 1);
    assert_eq!(agent.call_count().await, 1);
    assert!(agent.is_closed());
}
