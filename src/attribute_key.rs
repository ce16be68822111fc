//! Attribute key module.
//!
//! Provides the `AttributeKey` type, an interned string naming an
//! inheritable attribute (`isDroid`, `damageReduction`, ...). Uses
//! `Arc<str>` so keys are cheap to clone into indexes and content.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// Interned string identifier for inheritable attributes.
///
/// # Examples
///
/// ```rust
/// use swse_rules::AttributeKey;
///
/// let droid = AttributeKey::new("isDroid");
/// let droid2: AttributeKey = "isDroid".into();
/// let droid3: AttributeKey = String::from("isDroid").into();
///
/// assert_eq!(droid, droid2);
/// assert_eq!(droid, droid3);
/// assert_eq!(droid, AttributeKey::IS_DROID);
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct AttributeKey(Key);

#[derive(Debug, Clone)]
enum Key {
    Static(&'static str),
    Shared(Arc<str>),
}

impl AttributeKey {
    pub const IS_DROID: Self = Self::constant("isDroid");
    pub const IGNORE_CON: Self = Self::constant("ignoreCon");
    pub const DAMAGE_REDUCTION: Self = Self::constant("damageReduction");
    pub const DEFENSE_BONUSES: Self = Self::constant("defenseBonuses");
    pub const SIZE_MODIFIER: Self = Self::constant("sizeModifier");
    pub const DAMAGE_THRESHOLD_SIZE_MODIFIER: Self = Self::constant("damageThresholdSizeModifier");
    pub const CLASS_FORTITUDE_DEFENSE_BONUS: Self = Self::constant("classFortitudeDefenseBonus");
    pub const CLASS_REFLEX_DEFENSE_BONUS: Self = Self::constant("classReflexDefenseBonus");
    pub const CLASS_WILL_DEFENSE_BONUS: Self = Self::constant("classWillDefenseBonus");
    pub const FORTITUDE_DEFENSE_BONUS: Self = Self::constant("fortitudeDefenseBonus");
    pub const DODGE_REFLEX_DEFENSE_BONUS: Self = Self::constant("bonusDodgeReflexDefense");

    const fn constant(s: &'static str) -> Self {
        Self(Key::Static(s))
    }

    /// Create a new `AttributeKey` from a string slice.
    pub fn new(s: &str) -> Self {
        Self(Key::Shared(Arc::from(s)))
    }

    /// Get the string representation of this key.
    ///
    /// ```rust
    /// use swse_rules::AttributeKey;
    ///
    /// assert_eq!(AttributeKey::new("sizeModifier").as_str(), "sizeModifier");
    /// ```
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

// Static and shared keys with the same text must compare equal, so equality,
// ordering and hashing all go through the string form.
impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Key {}

impl std::hash::Hash for Key {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl Key {
    fn as_str(&self) -> &str {
        match self {
            Key::Static(s) => s,
            Key::Shared(s) => s,
        }
    }
}

impl Serialize for AttributeKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.as_str().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AttributeKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(AttributeKey::from(s))
    }
}

impl From<&str> for AttributeKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AttributeKey {
    fn from(s: String) -> Self {
        Self(Key::Shared(Arc::from(s)))
    }
}

impl std::fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
