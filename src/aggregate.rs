//! Attribute aggregation module.
//!
//! Inheritable attributes are contributed by many sources: the target's
//! own data, its species, classes, feats, traits, talents, active
//! conditions and equipped gear. The [`AttributeIndex`] collects every
//! contribution once per evaluation or resolve pass and reduces them on
//! request.
//!
//! ```text
//! [own attributes] ─┐
//! [species/class]  ─┼─→ AttributeIndex ─→ reduce(key, Sum | Max | Min | Any)
//! [equipped gear]  ─┘
//! ```

use crate::attribute_key::AttributeKey;
use crate::model::{AttributeValue, DefenseBonus, ItemKind, Target};
use std::collections::HashMap;

/// How multiple contributions to the same key combine.
///
/// # Examples
///
/// ```rust
/// use swse_rules::aggregate::{AttributeIndex, Reduced, Reduction};
/// use swse_rules::model::{Actor, Item, ItemKind};
///
/// let actor = Actor::new("Tamsin")
///     .with_item(Item::new("Soldier", ItemKind::Class).with_attribute("classFortitudeDefenseBonus", 2))
///     .with_item(Item::new("Jedi", ItemKind::Class).with_attribute("classFortitudeDefenseBonus", 1));
///
/// let index = AttributeIndex::collect(&actor);
/// let key = "classFortitudeDefenseBonus".into();
/// assert_eq!(index.reduce(&key, Some(Reduction::Sum)), Some(Reduced::Number(3)));
/// assert_eq!(index.reduce(&key, Some(Reduction::Max)), Some(Reduced::Number(2)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reduction {
    /// Numeric sum.
    Sum,
    /// Largest contribution; ties keep the first seen.
    Max,
    /// Smallest contribution; ties keep the first seen.
    Min,
    /// True if any contribution is truthy.
    Any,
}

/// The result of reducing a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reduced {
    Number(i64),
    Flag(bool),
    /// Raw contributions, when no reduction was requested.
    List(Vec<AttributeValue>),
}

impl Reduced {
    /// Numeric reading: flags count as 1/0, lists as their sum.
    pub fn as_number(&self) -> i64 {
        match self {
            Reduced::Number(n) => *n,
            Reduced::Flag(b) => i64::from(*b),
            Reduced::List(values) => values.iter().filter_map(AttributeValue::as_number).sum(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Reduced::Number(n) => *n != 0,
            Reduced::Flag(b) => *b,
            Reduced::List(values) => values.iter().any(AttributeValue::is_truthy),
        }
    }
}

/// Snapshot of every attribute a target inherits, keyed for lookup.
///
/// Built once per pass and read many times; the snapshot never observes
/// later changes to the target, so rebuild it after the target changes.
#[derive(Debug, Clone, Default)]
pub struct AttributeIndex {
    inheritable: HashMap<AttributeKey, Vec<AttributeValue>>,
    traits: HashMap<AttributeKey, Vec<AttributeValue>>,
}

impl AttributeIndex {
    /// Collect contributions from the target's own attributes, then from
    /// each inheritable item in item order.
    pub fn collect<T: Target + ?Sized>(target: &T) -> Self {
        let mut index = Self::default();
        for attribute in target.own_attributes() {
            index
                .inheritable
                .entry(attribute.key.clone())
                .or_default()
                .push(attribute.value.clone());
        }
        for item in target.items().iter().filter(|item| item.is_inheritable()) {
            for attribute in &item.attributes {
                index
                    .inheritable
                    .entry(attribute.key.clone())
                    .or_default()
                    .push(attribute.value.clone());
                if item.kind == ItemKind::Trait {
                    index
                        .traits
                        .entry(attribute.key.clone())
                        .or_default()
                        .push(attribute.value.clone());
                }
            }
        }
        index
    }

    /// All contributions to `key`, in collection order.
    pub fn inheritable(&self, key: &AttributeKey) -> &[AttributeValue] {
        self.inheritable.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Contributions granted by traits only, unreduced.
    pub fn trait_attributes(&self, key: &AttributeKey) -> &[AttributeValue] {
        self.traits.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Reduce the contributions to `key`.
    ///
    /// Returns `None` when nothing contributes (or, for numeric modes,
    /// when no contribution has a numeric reading). `mode = None` returns
    /// the raw list.
    pub fn reduce(&self, key: &AttributeKey, mode: Option<Reduction>) -> Option<Reduced> {
        let values = self.inheritable.get(key).filter(|values| !values.is_empty())?;
        let mut numbers = values.iter().filter_map(AttributeValue::as_number);
        match mode {
            None => Some(Reduced::List(values.clone())),
            Some(Reduction::Any) => Some(Reduced::Flag(values.iter().any(AttributeValue::is_truthy))),
            Some(Reduction::Sum) => {
                let first = numbers.next()?;
                Some(Reduced::Number(numbers.fold(first, |acc, n| acc + n)))
            }
            Some(Reduction::Max) => {
                let first = numbers.next()?;
                Some(Reduced::Number(numbers.fold(first, |acc, n| if n > acc { n } else { acc })))
            }
            Some(Reduction::Min) => {
                let first = numbers.next()?;
                Some(Reduced::Number(numbers.fold(first, |acc, n| if n < acc { n } else { acc })))
            }
        }
    }

    /// [`reduce`](Self::reduce), falling back to `default` when nothing contributes.
    pub fn reduce_or(&self, key: &AttributeKey, mode: Option<Reduction>, default: Reduced) -> Reduced {
        self.reduce(key, mode).unwrap_or(default)
    }

    /// Summed contributions; 0 when there are none.
    pub fn sum(&self, key: &AttributeKey) -> i64 {
        self.reduce_or(key, Some(Reduction::Sum), Reduced::Number(0))
            .as_number()
    }

    /// Largest numeric contribution, or `None` when nothing contributes.
    ///
    /// ```rust
    /// use swse_rules::aggregate::AttributeIndex;
    /// use swse_rules::model::{Actor, Item, ItemKind};
    ///
    /// let actor = Actor::new("Tamsin")
    ///     .with_item(Item::new("Scout", ItemKind::Class).with_attribute("classReflexDefenseBonus", 2))
    ///     .with_item(Item::new("Soldier", ItemKind::Class).with_attribute("classReflexDefenseBonus", 1));
    ///
    /// let index = AttributeIndex::collect(&actor);
    /// assert_eq!(index.max(&"classReflexDefenseBonus".into()), Some(2));
    /// assert_eq!(index.min(&"classReflexDefenseBonus".into()), Some(1));
    /// assert_eq!(index.max(&"classWillDefenseBonus".into()), None);
    /// ```
    pub fn max(&self, key: &AttributeKey) -> Option<i64> {
        self.reduce(key, Some(Reduction::Max)).map(|r| r.as_number())
    }

    /// Smallest numeric contribution, or `None` when nothing contributes.
    pub fn min(&self, key: &AttributeKey) -> Option<i64> {
        self.reduce(key, Some(Reduction::Min)).map(|r| r.as_number())
    }

    /// Whether any contribution is truthy; false when there are none.
    pub fn any(&self, key: &AttributeKey) -> bool {
        self.reduce(key, Some(Reduction::Any))
            .is_some_and(|r| r.is_truthy())
    }

    /// Trait-granted defense bonuses.
    pub fn defense_bonuses(&self) -> Vec<&DefenseBonus> {
        self.trait_attributes(&AttributeKey::DEFENSE_BONUSES)
            .iter()
            .filter_map(AttributeValue::as_defense_bonus)
            .collect()
    }

    /// Sum of trait-granted numeric contributions to `key`.
    pub fn trait_sum(&self, key: &AttributeKey) -> i64 {
        self.trait_attributes(key)
            .iter()
            .filter_map(AttributeValue::as_number)
            .sum()
    }
}
