//! Value object marker: equality by value, not identity.

/// Marker trait for the immutable saga building blocks.
///
/// Identifiers, statuses, metadata descriptors and expire rules are compared by their
/// attribute values and never change after construction. To "modify" one, build a new one.
///
/// ```ignore
/// let a = SagaId::new("42", "order.fulfilment")?;
/// let b = SagaId::new("42", "order.fulfilment")?;
/// assert_eq!(a, b);
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
