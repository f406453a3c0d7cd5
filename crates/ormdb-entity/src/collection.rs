//! Multi-valued collections bound to an entity property.
//!
//! A collection holds the values of a `many` property. It remembers which
//! (entity class, property) pair it belongs to by name only, so it never keeps
//! its owner alive.

use serde::{Deserialize, Serialize};

use crate::value::{EntityRef, Value};

/// Ordered, index-addressable sequence of values for one entity property.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ManyCollection {
    owner: String,
    property: String,
    /// Class of referenced entities, when the property holds references to
    /// a single class. Bare ids passed to `add`/`sync` are wrapped with it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    items: Vec<Value>,
}

impl ManyCollection {
    /// Create an empty collection bound to `owner.property`.
    pub fn new(owner: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            property: property.into().to_lowercase(),
            target: None,
            items: Vec::new(),
        }
    }

    /// Wrap bare ids into references to `class`.
    pub fn with_target(mut self, class: impl Into<String>) -> Self {
        self.target = Some(class.into());
        self
    }

    /// Start with the given items.
    pub fn with_items(mut self, items: impl IntoIterator<Item = Value>) -> Self {
        self.items = items.into_iter().collect();
        self
    }

    /// Owning entity class.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Owning property name.
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Referenced class, if any.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Replace the whole content.
    pub fn set_all(&mut self, values: impl IntoIterator<Item = Value>) -> &mut Self {
        self.items = values.into_iter().collect();
        self
    }

    /// Append one element.
    pub fn push(&mut self, value: Value) {
        self.items.push(value);
    }

    /// Add every id not already a member.
    pub fn add(&mut self, ids: impl IntoIterator<Item = Value>) -> &mut Self {
        for id in ids {
            let element = self.element_for(id);
            if !self.contains(&element) {
                self.items.push(element);
            }
        }
        self
    }

    /// Remove every member whose identity matches one of `ids`.
    pub fn remove(&mut self, ids: impl IntoIterator<Item = Value>) -> &mut Self {
        let doomed = self.identities(ids);
        self.items.retain(|item| !doomed.contains(&item.identity()));
        self
    }

    /// Reconcile membership to exactly `ids`.
    ///
    /// Members outside the target set are removed, missing ones are appended
    /// in the order given, and members present in both keep their position.
    pub fn sync(&mut self, ids: impl IntoIterator<Item = Value>) -> &mut Self {
        let wanted: Vec<Value> = ids.into_iter().map(|id| self.element_for(id)).collect();
        let identities: Vec<Value> = wanted.iter().map(Value::identity).collect();

        self.items
            .retain(|item| identities.contains(&item.identity()));
        self.add(wanted)
    }

    /// Whether an element with the same identity is a member.
    ///
    /// Bare ids are wrapped with the target class first.
    pub fn contains(&self, value: &Value) -> bool {
        let identity = self.element_for(value.clone()).identity();
        self.items.iter().any(|item| item.identity() == identity)
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the elements in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    /// Elements as a slice.
    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }

    /// Take the elements out.
    pub fn into_vec(self) -> Vec<Value> {
        self.items
    }

    // Bare ids take the target class; `[class, id]` pairs become references.
    fn element_for(&self, id: Value) -> Value {
        match (&self.target, id) {
            (Some(class), Value::Int(id)) => Value::Reference(EntityRef::new(class.clone(), id)),
            (_, Value::List(pair)) => match pair.as_slice() {
                [Value::String(class), Value::Int(id)] => {
                    Value::Reference(EntityRef::new(class.clone(), *id))
                }
                _ => Value::List(pair),
            },
            (_, other) => other,
        }
    }

    fn identities(&self, ids: impl IntoIterator<Item = Value>) -> Vec<Value> {
        ids.into_iter()
            .map(|id| self.element_for(id).identity())
            .collect()
    }
}

impl<'a> IntoIterator for &'a ManyCollection {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
