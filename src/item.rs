/// A key together with the opaque payload stored under it.
///
/// The tree orders items by key and never looks at the payload.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Item<K, V> {
    key: K,
    payload: V,
}

impl<K, V> Item<K, V> {
    /// Creates an item.
    pub const fn new(key: K, payload: V) -> Self {
        Self { key, payload }
    }

    /// Returns the key.
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// Returns the payload.
    pub const fn payload(&self) -> &V {
        &self.payload
    }

    /// Returns the payload mutably.
    pub const fn payload_mut(&mut self) -> &mut V {
        &mut self.payload
    }

    /// Splits the item into its key and payload.
    pub fn into_parts(self) -> (K, V) {
        (self.key, self.payload)
    }

    pub(crate) fn into_payload(self) -> V {
        self.payload
    }
}
