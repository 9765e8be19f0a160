//! # Message Identity
//!
//! Payload-type tags are constants owned by the schema type rather than
//! derived from runtime type names, so independently evolving message types
//! that share a topic cannot collide by accident.
//!
//! A topic carrying several shapes is modelled as an enum (tagged union)
//! whose [`Message::payload_type`] reports the tag of the active variant:
//!
//! ```ignore
//! #[derive(Serialize)]
//! #[serde(untagged)]
//! enum OrderEvent {
//!     Created(OrderCreated),
//!     Cancelled(OrderCancelled),
//! }
//!
//! impl Message for OrderEvent {
//!     fn payload_type(&self) -> &'static str {
//!         match self {
//!             Self::Created(_) => OrderCreated::PAYLOAD_TYPE,
//!             Self::Cancelled(_) => OrderCancelled::PAYLOAD_TYPE,
//!         }
//!     }
//! }
//! ```

/// Stable tag of a concrete payload shape.
pub trait PayloadType {
    /// Tag written into the envelope and used as the registry key.
    const PAYLOAD_TYPE: &'static str;
}

/// A value that can be published on a topic.
pub trait Message: Send + Sync + 'static {
    /// Tag of this value's concrete shape.
    fn payload_type(&self) -> &'static str;
}

/// Implement [`PayloadType`] and [`Message`] for a single-shape type.
///
/// ```ignore
/// impl_payload_type!(OrderCreated);                        // tag "OrderCreated"
/// impl_payload_type!(OrderShipped => "orders.shipped.v2"); // explicit tag
/// ```
#[macro_export]
macro_rules! impl_payload_type {
    ($ty:ident) => {
        $crate::impl_payload_type!($ty => stringify!($ty));
    };
    ($ty:ty => $tag:expr) => {
        impl $crate::domain::message::PayloadType for $ty {
            const PAYLOAD_TYPE: &'static str = $tag;
        }

        impl $crate::domain::message::Message for $ty {
            fn payload_type(&self) -> &'static str {
                <$ty as $crate::domain::message::PayloadType>::PAYLOAD_TYPE
            }
        }
    };
}
