//! Response containers
//!
//! The wrap step hands the transport an empty container; the transport fills
//! it with the decoded response body; the unwrap step takes the value out.

use std::any::{type_name, Any};

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;

/// A mutable response target the transport populates
pub trait ResponseContainer: Any + Send {
    /// Decodes `body` into the container
    fn populate(&mut self, body: serde_json::Value) -> std::result::Result<(), serde_json::Error>;

    fn is_populated(&self) -> bool;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

/// Default container: an empty slot for one `T`
#[derive(Debug)]
pub struct Slot<T>(Option<T>);

impl<T> Slot<T> {
    pub fn new() -> Self {
        Slot(None)
    }

    pub fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned + Send + 'static> Slot<T> {
    /// Takes the value out of a boxed `Slot<T>`.
    ///
    /// Fails if the container is some other type or was never populated.
    pub fn take(container: Box<dyn ResponseContainer>) -> Result<T> {
        let slot = container
            .into_any()
            .downcast::<Slot<T>>()
            .map_err(|_| anyhow!("response container is not a Slot<{}>", type_name::<T>()))?;
        slot.0
            .ok_or_else(|| anyhow!("response container for {} was not populated", type_name::<T>()))
    }
}

impl<T: DeserializeOwned + Send + 'static> ResponseContainer for Slot<T> {
    fn populate(&mut self, body: serde_json::Value) -> std::result::Result<(), serde_json::Error> {
        self.0 = Some(serde_json::from_value(body)?);
        Ok(())
    }

    fn is_populated(&self) -> bool {
        self.0.is_some()
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn populate_then_take() {
        let mut slot: Box<dyn ResponseContainer> = Box::new(Slot::<Vec<u32>>::new());
        assert!(!slot.is_populated());
        slot.populate(json!([1, 2, 3])).unwrap();
        assert!(slot.is_populated());
        assert_eq!(Slot::<Vec<u32>>::take(slot).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn take_unpopulated_fails() {
        let slot: Box<dyn ResponseContainer> = Box::new(Slot::<String>::new());
        let err = Slot::<String>::take(slot).unwrap_err();
        assert!(err.to_string().contains("not populated"));
    }

    #[test]
    fn take_wrong_type_fails() {
        let slot: Box<dyn ResponseContainer> = Box::new(Slot::<String>::new());
        assert!(Slot::<u32>::take(slot).is_err());
    }

    #[test]
    fn populate_rejects_mismatched_body() {
        let mut slot = Slot::<u32>::new();
        assert!(slot.populate(json!("nope")).is_err());
        assert!(slot.get().is_none());
    }
}
