//! Creation-time configuration for a [`BTree`](crate::BTree).
//!
//! Both settings are fixed for the lifetime of a tree.

use crate::error::{Error, Result};

/// Smallest usable minimum degree. With `t = 2` every node holds one to three
/// keys (a 2-3-4 tree).
pub const MIN_DEGREE: usize = 2;

/// Minimum degree used by [`Config::default`].
pub const DEFAULT_MIN_DEGREE: usize = MIN_DEGREE;

/// Who is responsible for payloads once they leave the tree.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Ownership {
    /// Payloads belong to the caller. Every payload the tree lets go of, on
    /// delete or teardown, is handed back.
    #[default]
    Caller,
    /// The tree releases payloads itself when their items are deleted or the
    /// nodes holding them are torn down.
    Tree,
}

impl Ownership {
    /// Hands a payload leaving the tree to its owner: back to the caller, or
    /// dropped here.
    pub(crate) fn release<V>(self, payload: V) -> Option<V> {
        match self {
            Ownership::Caller => Some(payload),
            Ownership::Tree => {
                drop(payload);
                None
            }
        }
    }
}

/// Branching factor and payload ownership of a tree.
///
/// ```
/// use btree_index::{Config, Ownership};
///
/// let config = Config::new(4).with_ownership(Ownership::Tree);
/// assert_eq!(config.max_keys(), 7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Config {
    min_degree: usize,
    ownership: Ownership,
}

impl Config {
    /// Creates a configuration with the given minimum degree and caller-owned payloads.
    #[must_use]
    pub const fn new(min_degree: usize) -> Self {
        Self {
            min_degree,
            ownership: Ownership::Caller,
        }
    }

    /// Sets the payload ownership mode.
    #[must_use]
    pub const fn with_ownership(mut self, ownership: Ownership) -> Self {
        self.ownership = ownership;
        self
    }

    /// Returns the minimum degree `t`.
    #[must_use]
    pub const fn min_degree(&self) -> usize {
        self.min_degree
    }

    /// Returns the payload ownership mode.
    #[must_use]
    pub const fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Most keys a node may hold, `2t - 1`.
    #[must_use]
    pub const fn max_keys(&self) -> usize {
        self.min_degree.saturating_mul(2).saturating_sub(1)
    }

    /// Fewest keys a non-root node may hold, `t - 1`.
    #[must_use]
    pub const fn min_keys(&self) -> usize {
        self.min_degree.saturating_sub(1)
    }

    /// Most children an internal node may hold, `2t`.
    #[must_use]
    pub const fn max_children(&self) -> usize {
        self.min_degree.saturating_mul(2)
    }

    /// Checks that the minimum degree is at least [`MIN_DEGREE`] and that the
    /// derived node capacities are representable.
    pub fn validate(&self) -> Result<()> {
        if self.min_degree < MIN_DEGREE || self.min_degree.checked_mul(2).is_none() {
            return Err(Error::InvalidConfig {
                min_degree: self.min_degree,
                minimum: MIN_DEGREE,
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DEGREE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_two_three_four_tree() {
        let config = Config::default();
        assert_eq!(config.min_degree(), 2);
        assert_eq!(config.ownership(), Ownership::Caller);
        assert_eq!(config.min_keys(), 1);
        assert_eq!(config.max_keys(), 3);
        assert_eq!(config.max_children(), 4);
    }

    #[test]
    fn degree_below_two_is_rejected() {
        for min_degree in [0, 1] {
            assert_eq!(
                Config::new(min_degree).validate(),
                Err(Error::InvalidConfig { min_degree, minimum: 2 })
            );
        }
        assert!(Config::new(2).validate().is_ok());
    }

    #[test]
    fn overflowing_degree_is_rejected() {
        let config = Config::new(usize::MAX / 2 + 1);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig { .. })));
    }
}
