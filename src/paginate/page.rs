//! Page result capabilities
//!
//! A paginated binding's return type decides how pages are combined:
//! sequences (`Vec<T>`) are concatenated, anything else implements its own
//! merge and reports whether more pages remain.

use anyhow::anyhow;

use crate::value::Value;

/// How successive pages are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    /// Pages are appended; an empty page ends pagination
    Sequence,
    /// Pages merge themselves; `has_more` ends pagination
    Mergeable,
}

/// A value returned by one page of a paginated binding.
///
/// The first fetched page becomes the running total; later pages are merged
/// into it with [`merge_from`](PageResult::merge_from).
pub trait PageResult: Default + Send + 'static {
    const KIND: MergeKind;

    /// Number of items on this page
    fn item_count(&self) -> usize;

    fn has_more(&self) -> bool {
        self.item_count() > 0
    }

    fn merge_from(&mut self, next: Self) -> anyhow::Result<()>;

    /// Cursor capability, needed for the `after` convention
    fn as_after_cursor(&self) -> Option<&dyn AfterCursor> {
        None
    }
}

/// Result types that know the cursor of the next page
pub trait AfterCursor {
    /// `None` when there are no further pages
    fn after_cursor(&self) -> Option<Value>;
}

impl<T: Send + 'static> PageResult for Vec<T> {
    const KIND: MergeKind = MergeKind::Sequence;

    fn item_count(&self) -> usize {
        self.len()
    }

    fn merge_from(&mut self, next: Self) -> anyhow::Result<()> {
        self.extend(next);
        Ok(())
    }
}

/// Raw JSON pages: arrays are joined end to end, `null` is an empty page
impl PageResult for serde_json::Value {
    const KIND: MergeKind = MergeKind::Sequence;

    fn item_count(&self) -> usize {
        match self {
            serde_json::Value::Null => 0,
            serde_json::Value::Array(items) => items.len(),
            _ => 1,
        }
    }

    fn merge_from(&mut self, next: Self) -> anyhow::Result<()> {
        match (self, next) {
            (_, serde_json::Value::Null) => Ok(()),
            (total @ serde_json::Value::Null, next) => {
                *total = next;
                Ok(())
            }
            (serde_json::Value::Array(total), serde_json::Value::Array(next)) => {
                total.extend(next);
                Ok(())
            }
            (total, next) => Err(anyhow!(
                "cannot join JSON pages of {} and {}: only arrays concatenate",
                json_kind(total),
                json_kind(&next)
            )),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Feed {
        items: Vec<u32>,
        next: Option<String>,
    }

    impl PageResult for Feed {
        const KIND: MergeKind = MergeKind::Mergeable;

        fn item_count(&self) -> usize {
            self.items.len()
        }

        fn has_more(&self) -> bool {
            self.next.is_some()
        }

        fn merge_from(&mut self, next: Self) -> anyhow::Result<()> {
            self.items.extend(next.items);
            self.next = next.next;
            Ok(())
        }

        fn as_after_cursor(&self) -> Option<&dyn AfterCursor> {
            Some(self)
        }
    }

    impl AfterCursor for Feed {
        fn after_cursor(&self) -> Option<Value> {
            self.next.clone().map(Value::from)
        }
    }

    #[test]
    fn vectors_are_sequences() {
        let mut total = vec![1, 2];
        assert_eq!(<Vec<i32> as PageResult>::KIND, MergeKind::Sequence);
        total.merge_from(vec![3]).unwrap();
        assert_eq!(total, vec![1, 2, 3]);
        assert!(total.has_more());
        assert!(!Vec::<i32>::new().has_more());
        assert!(total.as_after_cursor().is_none());
    }

    #[test]
    fn json_arrays_join_end_to_end() {
        let mut total = serde_json::Value::default();
        assert_eq!(total.item_count(), 0);
        total.merge_from(json!([1, 2])).unwrap();
        total.merge_from(json!([3])).unwrap();
        total.merge_from(serde_json::Value::Null).unwrap();
        assert_eq!(total, json!([1, 2, 3]));
        assert_eq!(total.item_count(), 3);
        assert!(!json!([]).has_more());

        let err = total.merge_from(json!({"id": 4})).unwrap_err();
        assert!(err.to_string().contains("array and object"));
        assert_eq!(total, json!([1, 2, 3]));
    }

    #[test]
    fn mergeable_types_carry_their_cursor() {
        let mut total = Feed {
            items: vec![1],
            next: Some("c1".into()),
        };
        assert_eq!(total.as_after_cursor().unwrap().after_cursor(), Some(Value::from("c1")));
        total
            .merge_from(Feed {
                items: vec![2],
                next: None,
            })
            .unwrap();
        assert_eq!(total.items, vec![1, 2]);
        assert!(!total.has_more());
        assert_eq!(total.as_after_cursor().unwrap().after_cursor(), None);
    }
}
