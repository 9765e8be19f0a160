//! # Observability
//!
//! The Prometheus counters move with publish and consume traffic.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use bus_telemetry::{
        encode_metrics, register_metrics, CONSUMER_SESSIONS_OPENED, ENVELOPES_PUBLISHED,
        MESSAGES_DELIVERED, RECORDS_DROPPED,
    };
    use std::sync::Arc;
    use typed_bus::{InMemoryBroker, Publisher, Source};

    const TOPIC: &str = "orders.metrics";

    #[tokio::test]
    async fn test_counters_follow_traffic() {
        register_metrics().unwrap();
        let broker = InMemoryBroker::new();

        let source = Source::<OrderEvent>::builder(
            Arc::new(broker.clone()),
            broker_config("metrics"),
            TOPIC,
        )
        .deserializer(typed_bus::JsonDeserializer::<OrderPlaced>::new())
        .property_filter(region_is("eu"))
        .build()
        .unwrap();
        let mut orders = source.messages().unwrap();

        let publisher = Publisher::<OrderEvent>::builder(
            Arc::new(broker.clone()),
            broker_config("metrics-writer"),
            TOPIC,
            Arc::new(typed_bus::JsonSerializer),
        )
        .property_provider(region_properties)
        .build()
        .unwrap();
        publisher.publish(&placed(1, "us")).await.unwrap();
        publisher.publish(&placed(2, "eu")).await.unwrap();
        broker.append(TOPIC, b"junk".to_vec()).unwrap();
        publisher.publish(&placed(3, "eu")).await.unwrap();

        assert_eq!(next_item(&mut orders).await, Some(placed(2, "eu")));
        assert_eq!(next_item(&mut orders).await, Some(placed(3, "eu")));

        assert_eq!(ENVELOPES_PUBLISHED.with_label_values(&[TOPIC]).get(), 3);
        assert_eq!(MESSAGES_DELIVERED.with_label_values(&[TOPIC]).get(), 2);
        assert_eq!(CONSUMER_SESSIONS_OPENED.with_label_values(&[TOPIC]).get(), 1);
        assert_eq!(
            RECORDS_DROPPED
                .with_label_values(&[TOPIC, "filtered"])
                .get(),
            1
        );
        assert_eq!(
            RECORDS_DROPPED
                .with_label_values(&[TOPIC, "malformed_envelope"])
                .get(),
            1
        );

        let text = encode_metrics().unwrap();
        assert!(text.contains("typed_bus_records_dropped_total"));
    }
}
