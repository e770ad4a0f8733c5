//! Quantifier level algebra.
//!
//! An expression's level records the deepest universal and the deepest
//! existential block it depends on, independently; the same subformula can
//! straddle both sides of an alternation. `None` is the identity of `merge`.

/// Two-sided quantifier level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaxLevel {
    /// Deepest universal block index, if any.
    pub fa: Option<u32>,
    /// Deepest existential block index, if any.
    pub ex: Option<u32>,
}

impl MaxLevel {
    /// Level touching no quantifier block.
    #[must_use]
    pub fn unset() -> Self {
        Self::default()
    }

    /// Level of a universal block.
    #[must_use]
    pub fn forall(index: u32) -> Self {
        Self {
            fa: Some(index),
            ex: None,
        }
    }

    /// Level of an existential block.
    #[must_use]
    pub fn exists(index: u32) -> Self {
        Self {
            fa: None,
            ex: Some(index),
        }
    }

    /// Pointwise maximum; unset components take the other side.
    pub fn merge(&mut self, other: MaxLevel) {
        self.fa = merge_component(self.fa, other.fa);
        self.ex = merge_component(self.ex, other.ex);
    }

    /// The deeper of the two components, `None` when both are unset.
    #[must_use]
    pub fn max(&self) -> Option<u32> {
        merge_component(self.fa, self.ex)
    }

    /// Whether neither component is set.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        self.fa.is_none() && self.ex.is_none()
    }
}

fn merge_component(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_is_merge_identity() {
        let mut l = MaxLevel::unset();
        l.merge(MaxLevel::forall(2));
        assert_eq!(l, MaxLevel::forall(2));
        l.merge(MaxLevel::unset());
        assert_eq!(l, MaxLevel::forall(2));
    }

    #[test]
    fn merge_is_pointwise() {
        let mut l = MaxLevel::forall(1);
        l.merge(MaxLevel::exists(4));
        assert_eq!(l.fa, Some(1));
        assert_eq!(l.ex, Some(4));
        assert_eq!(l.max(), Some(4));
        l.merge(MaxLevel::forall(5));
        assert_eq!(l.fa, Some(5));
        assert_eq!(l.max(), Some(5));
    }

    #[test]
    fn max_of_unset_is_none() {
        assert_eq!(MaxLevel::unset().max(), None);
        assert!(MaxLevel::unset().is_unset());
    }
}
