//! # End-to-End Scenarios
//!
//! Publisher → in-memory broker → source, with the order domain:
//!
//! 1. **Region filter**: a source filtering `region == "eu"` sees only EU orders
//! 2. **Unknown shape**: records of an unregistered payload type are skipped
//!    and the next registered record is still delivered
//! 3. **Tagged union**: several shapes share one topic and come back as the
//!    right enum variant

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use std::sync::Arc;
    use std::time::Duration;
    use typed_bus::{InMemoryBroker, JsonSerializer, Publisher};

    #[tokio::test]
    async fn test_eu_source_only_sees_eu_orders() -> anyhow::Result<()> {
        let broker = InMemoryBroker::new();
        let source = order_source(&broker, "eu-fulfilment")
            .property_filter(region_is("eu"))
            .build()?;
        let mut eu_orders = source.messages()?;

        let publisher = order_publisher(Arc::new(broker.clone())).build()?;
        publisher.publish(&placed(1, "us")).await?;
        publisher.publish(&placed(2, "eu")).await?;
        publisher.publish(&cancelled(2)).await?;
        publisher.publish(&placed(3, "eu")).await?;

        assert_eq!(next_item(&mut eu_orders).await, Some(placed(2, "eu")));
        assert_eq!(next_item(&mut eu_orders).await, Some(placed(3, "eu")));
        assert_silent(&mut eu_orders, Duration::from_millis(50)).await;

        publisher.dispose().await;
        source.dispose();
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_payload_type_is_skipped() -> anyhow::Result<()> {
        let broker = InMemoryBroker::new();
        let source = order_source(&broker, "order-audit").build()?;
        let mut orders = source.messages()?;

        let refunds = Publisher::<RefundIssued>::builder(
            Arc::new(broker.clone()),
            broker_config("refunds"),
            ORDERS_TOPIC,
            Arc::new(JsonSerializer),
        )
        .build()?;
        let publisher = order_publisher(Arc::new(broker.clone())).build()?;

        refunds.publish(&RefundIssued { order_id: 9 }).await?;
        publisher.publish(&placed(10, "eu")).await?;

        assert_eq!(next_item(&mut orders).await, Some(placed(10, "eu")));
        assert_eq!(broker.records(ORDERS_TOPIC).len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_tagged_union_routes_each_shape() -> anyhow::Result<()> {
        let broker = InMemoryBroker::new();
        let source = order_source(&broker, "order-history").build()?;
        let mut orders = source.messages()?;

        let publisher = order_publisher(Arc::new(broker.clone())).build()?;
        publisher.publish(&placed(5, "apac")).await?;
        publisher.publish(&cancelled(5)).await?;

        let first = next_item(&mut orders).await;
        let second = next_item(&mut orders).await;
        assert!(matches!(first, Some(OrderEvent::Placed(ref p)) if p.order_id == 5));
        assert!(matches!(second, Some(OrderEvent::Cancelled(ref c)) if c.order_id == 5));
        Ok(())
    }

    #[tokio::test]
    async fn test_registered_shapes_are_listed() -> anyhow::Result<()> {
        let broker = InMemoryBroker::new();
        let source = order_source(&broker, "introspection").build()?;

        assert_eq!(
            source.registered_payload_types(),
            vec!["orders.cancelled.v1", "orders.placed.v1"]
        );
        Ok(())
    }
}
