//! # Delivery Semantics
//!
//! Ordering, filtering cost, skip-and-continue on bad records, independent
//! subscriptions and offset reset.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use typed_bus::{
        BincodeDeserializer, BincodeSerializer, ConsumerConfig, Envelope, EnvelopeCodec,
        InMemoryBroker, JsonDeserializer, OffsetReset, Publisher, Source,
    };

    #[tokio::test]
    async fn test_order_is_preserved() {
        let broker = InMemoryBroker::new();
        let source = order_source(&broker, "ledger").build().unwrap();
        let mut orders = source.messages().unwrap();
        let publisher = order_publisher(Arc::new(broker.clone())).build().unwrap();

        for order_id in 0..100 {
            publisher.publish(&placed(order_id, "eu")).await.unwrap();
        }

        for expected in 0..100 {
            assert_eq!(next_item(&mut orders).await, Some(placed(expected, "eu")));
        }
    }

    #[tokio::test]
    async fn test_filter_runs_before_any_deserializer() {
        let broker = InMemoryBroker::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Source::<OrderEvent>::builder(
            Arc::new(broker.clone()),
            broker_config("counting"),
            ORDERS_TOPIC,
        )
        .deserializer(CountingDeserializer::new(
            JsonDeserializer::<OrderPlaced>::new(),
            calls.clone(),
        ))
        .property_filter(region_is("eu"))
        .build()
        .unwrap();
        let mut orders = source.messages().unwrap();

        let publisher = order_publisher(Arc::new(broker.clone())).build().unwrap();
        for order_id in 0..3 {
            publisher.publish(&placed(order_id, "us")).await.unwrap();
        }
        publisher.publish(&placed(3, "eu")).await.unwrap();

        assert_eq!(next_item(&mut orders).await, Some(placed(3, "eu")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_filter_sees_absent_properties() {
        let broker = InMemoryBroker::new();
        let seen_absent = Arc::new(AtomicUsize::new(0));
        let counter = seen_absent.clone();
        let source = order_source(&broker, "no-props")
            .property_filter(move |props| {
                if props.is_none() {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                true
            })
            .build()
            .unwrap();
        let mut orders = source.messages().unwrap();

        // No property provider configured.
        let publisher = Publisher::<OrderEvent>::builder(
            Arc::new(broker.clone()),
            broker_config("bare-writer"),
            ORDERS_TOPIC,
            Arc::new(typed_bus::JsonSerializer),
        )
        .build()
        .unwrap();
        publisher.publish(&cancelled(4)).await.unwrap();

        assert_eq!(next_item(&mut orders).await, Some(cancelled(4)));
        assert_eq!(seen_absent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bad_records_do_not_stop_the_stream() {
        let broker = InMemoryBroker::new();
        let source = order_source(&broker, "resilient").build().unwrap();
        let mut orders = source.messages().unwrap();

        broker.append(ORDERS_TOPIC, b"not an envelope".to_vec()).unwrap();
        broker
            .append(
                ORDERS_TOPIC,
                EnvelopeCodec::encode(&Envelope::new("orders.placed.v1", None, b"{oops".to_vec()))
                    .unwrap(),
            )
            .unwrap();
        let publisher = order_publisher(Arc::new(broker.clone())).build().unwrap();
        publisher.publish(&placed(7, "eu")).await.unwrap();

        assert_eq!(next_item(&mut orders).await, Some(placed(7, "eu")));
    }

    #[tokio::test]
    async fn test_each_subscription_gets_every_record() {
        let broker = InMemoryBroker::new();
        let source = order_source(&broker, "fan-out").build().unwrap();
        let mut first = source.messages().unwrap();
        let mut second = source.messages().unwrap();

        let publisher = order_publisher(Arc::new(broker.clone())).build().unwrap();
        publisher.publish(&placed(1, "eu")).await.unwrap();

        assert_eq!(next_item(&mut first).await, Some(placed(1, "eu")));
        assert_eq!(next_item(&mut second).await, Some(placed(1, "eu")));
        assert_eq!(broker.sessions_opened(), 2);
    }

    #[tokio::test]
    async fn test_earliest_replays_retained_records() {
        let broker = InMemoryBroker::new();
        let publisher = order_publisher(Arc::new(broker.clone())).build().unwrap();
        publisher.publish(&placed(1, "eu")).await.unwrap();

        let late_source = order_source(&broker, "late-joiner")
            .consumer_config(ConsumerConfig::default().with_offset_reset(OffsetReset::Earliest))
            .build()
            .unwrap();
        let mut replayed = late_source.messages().unwrap();
        assert_eq!(next_item(&mut replayed).await, Some(placed(1, "eu")));

        let live_source = order_source(&broker, "live-only").build().unwrap();
        let mut live = live_source.messages().unwrap();
        assert_silent(&mut live, Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_bincode_payloads() {
        let broker = InMemoryBroker::new();
        let source = Source::<OrderPlaced>::builder(
            Arc::new(broker.clone()),
            broker_config("compact"),
            "orders.compact",
        )
        .deserializer(BincodeDeserializer::<OrderPlaced>::new())
        .build()
        .unwrap();
        let mut orders = source.messages().unwrap();

        let publisher = Publisher::<OrderPlaced>::builder(
            Arc::new(broker.clone()),
            broker_config("compact-writer"),
            "orders.compact",
            Arc::new(BincodeSerializer),
        )
        .build()
        .unwrap();
        let order = OrderPlaced {
            order_id: 42,
            region: "eu".into(),
            amount_cents: 1_999,
        };
        publisher.publish(&order).await.unwrap();

        assert_eq!(next_item(&mut orders).await, Some(order));
    }
}
