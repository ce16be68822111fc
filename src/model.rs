//! Character model module.
//!
//! The actor and item shapes the evaluator and defense resolver read.
//! Hosts normally build these from their own document layer; every type
//! also deserializes from camelCase JSON so content can be loaded directly.
//!
//! The [`Target`] trait is the read-only seam the prerequisite evaluator
//! works against. Both [`Actor`] and [`Item`] implement it: an item target
//! only exposes its own attributes, every actor-only field reports the
//! absent case.

use crate::attribute_key::AttributeKey;
use crate::prerequisite::{self, Prerequisite};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    Str,
    Dex,
    Con,
    Int,
    Wis,
    Cha,
}

impl Ability {
    /// All abilities in sheet order.
    pub const ALL: [Ability; 6] = [
        Ability::Str,
        Ability::Dex,
        Ability::Con,
        Ability::Int,
        Ability::Wis,
        Ability::Cha,
    ];

    /// The three-letter abbreviation used in authored content (`WIS`).
    pub fn abbreviation(self) -> &'static str {
        match self {
            Ability::Str => "STR",
            Ability::Dex => "DEX",
            Ability::Con => "CON",
            Ability::Int => "INT",
            Ability::Wis => "WIS",
            Ability::Cha => "CHA",
        }
    }

    /// Parse an abbreviation, ignoring case.
    pub fn from_abbreviation(s: &str) -> Option<Self> {
        Ability::ALL
            .into_iter()
            .find(|a| a.abbreviation().eq_ignore_ascii_case(s))
    }
}

/// Ability score totals. Missing scores default to 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityScores {
    pub str: i64,
    pub dex: i64,
    pub con: i64,
    pub int: i64,
    pub wis: i64,
    pub cha: i64,
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self {
            str: 10,
            dex: 10,
            con: 10,
            int: 10,
            wis: 10,
            cha: 10,
        }
    }
}

impl AbilityScores {
    /// The total score for an ability.
    pub fn score(&self, ability: Ability) -> i64 {
        match ability {
            Ability::Str => self.str,
            Ability::Dex => self.dex,
            Ability::Con => self.con,
            Ability::Int => self.int,
            Ability::Wis => self.wis,
            Ability::Cha => self.cha,
        }
    }

    /// The modifier for an ability: `floor((score - 10) / 2)`.
    ///
    /// ```rust
    /// use swse_rules::model::{Ability, AbilityScores};
    ///
    /// let scores = AbilityScores { dex: 15, wis: 7, ..AbilityScores::default() };
    /// assert_eq!(scores.modifier(Ability::Dex), 2);
    /// assert_eq!(scores.modifier(Ability::Wis), -2);
    /// assert_eq!(scores.modifier(Ability::Con), 0);
    /// ```
    pub fn modifier(&self, ability: Ability) -> i64 {
        (self.score(ability) - 10).div_euclid(2)
    }
}

/// Which defense a trait-granted bonus applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefenseKind {
    All,
    Fortitude,
    Reflex,
    Will,
}

impl DefenseKind {
    /// Capitalized name as shown on the sheet.
    pub fn title(self) -> &'static str {
        match self {
            DefenseKind::All => "All",
            DefenseKind::Fortitude => "Fortitude",
            DefenseKind::Reflex => "Reflex",
            DefenseKind::Will => "Will",
        }
    }

    /// Whether a bonus tagged with `self` applies to `defense`.
    pub fn applies_to(self, defense: DefenseKind) -> bool {
        self == DefenseKind::All || self == defense
    }
}

/// A trait-granted defense bonus. Bonuses with a `modifier` only apply in
/// the situation it names and are reported rather than summed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseBonus {
    pub defense: DefenseKind,
    pub bonus: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,
}

/// A value contributed by an attribute source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Flag(bool),
    Number(i64),
    DefenseBonus(DefenseBonus),
    Text(String),
}

impl AttributeValue {
    /// Numeric reading of this value.
    ///
    /// Flags count as 1/0 and numeric text is parsed. Anything else has no
    /// numeric reading and is skipped by numeric reductions.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Flag(b) => Some(i64::from(*b)),
            AttributeValue::Text(s) => s.trim().parse().ok(),
            AttributeValue::DefenseBonus(_) => None,
        }
    }

    /// Truthiness used by `Any` reductions.
    pub fn is_truthy(&self) -> bool {
        match self {
            AttributeValue::Flag(b) => *b,
            AttributeValue::Number(n) => *n != 0,
            AttributeValue::Text(s) => !s.is_empty() && !s.eq_ignore_ascii_case("false"),
            AttributeValue::DefenseBonus(_) => true,
        }
    }

    pub fn as_defense_bonus(&self) -> Option<&DefenseBonus> {
        match self {
            AttributeValue::DefenseBonus(bonus) => Some(bonus),
            _ => None,
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        AttributeValue::Number(n)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Flag(b)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<DefenseBonus> for AttributeValue {
    fn from(bonus: DefenseBonus) -> Self {
        AttributeValue::DefenseBonus(bonus)
    }
}

/// A keyed attribute attached to an actor or item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: AttributeKey,
    pub value: AttributeValue,
}

impl Attribute {
    pub fn new(key: impl Into<AttributeKey>, value: impl Into<AttributeValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Item type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemKind {
    Feat,
    Class,
    Trait,
    Talent,
    ForceTradition,
    ForceTechnique,
    Species,
    Armor,
    Weapon,
    Equipment,
    Condition,
}

impl ItemKind {
    /// Physical possessions. Gear only contributes attributes while equipped.
    pub fn is_gear(self) -> bool {
        matches!(self, ItemKind::Armor | ItemKind::Weapon | ItemKind::Equipment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArmorType {
    Light,
    Medium,
    Heavy,
}

impl fmt::Display for ArmorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArmorType::Light => "Light",
            ArmorType::Medium => "Medium",
            ArmorType::Heavy => "Heavy",
        };
        f.write_str(name)
    }
}

/// Defensive statistics of an armor item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmorStats {
    pub armor_type: ArmorType,
    #[serde(default)]
    pub reflex_bonus: Option<i64>,
    #[serde(default)]
    pub fortitude_bonus: Option<i64>,
    #[serde(default)]
    pub max_dex_bonus: Option<i64>,
    #[serde(default)]
    pub special: Vec<String>,
}

/// An owned item: feat, class, trait, talent, gear, active condition, ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Resolved display name, the value prerequisites match against.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default)]
    pub equipped: bool,
    #[serde(
        default,
        alias = "prerequisite",
        deserialize_with = "prerequisite::deserialize_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub prerequisites: Vec<Prerequisite>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub talent_tree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_talent_tree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armor: Option<ArmorStats>,
}

impl Item {
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            name: name.into(),
            kind,
            equipped: false,
            prerequisites: Vec::new(),
            attributes: Vec::new(),
            talent_tree: None,
            bonus_talent_tree: None,
            armor: None,
        }
    }

    pub fn with_prerequisites(mut self, prerequisites: Vec<Prerequisite>) -> Self {
        self.prerequisites = prerequisites;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<AttributeKey>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.push(Attribute::new(key, value));
        self
    }

    pub fn with_talent_tree(mut self, tree: impl Into<String>) -> Self {
        self.talent_tree = Some(tree.into());
        self
    }

    pub fn with_armor(mut self, armor: ArmorStats) -> Self {
        self.armor = Some(armor);
        self
    }

    pub fn equipped(mut self) -> Self {
        self.equipped = true;
        self
    }

    /// Whether this talent belongs to `tree` directly or as a bonus tree.
    pub fn in_talent_tree(&self, tree: &str) -> bool {
        self.talent_tree.as_deref() == Some(tree) || self.bonus_talent_tree.as_deref() == Some(tree)
    }

    /// Whether this item contributes attributes to its owner.
    pub fn is_inheritable(&self) -> bool {
        !self.kind.is_gear() || self.equipped
    }
}

/// One movement mode, e.g. `Stand 6 Squares`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speed {
    pub mode: String,
    pub squares: u32,
}

impl Speed {
    pub fn new(mode: impl Into<String>, squares: u32) -> Self {
        Self {
            mode: mode.into(),
            squares,
        }
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} Squares", self.mode, self.squares)
    }
}

/// Position on the condition track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionStep {
    #[default]
    Normal,
    MinusOne,
    MinusTwo,
    MinusFive,
    MinusTen,
    Helpless,
}

impl ConditionStep {
    /// Penalty applied to every defense at this step.
    pub fn defense_penalty(self) -> i64 {
        match self {
            ConditionStep::Normal => 0,
            ConditionStep::MinusOne => -1,
            ConditionStep::MinusTwo => -2,
            ConditionStep::MinusFive => -5,
            ConditionStep::MinusTen | ConditionStep::Helpless => -10,
        }
    }
}

/// A character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Actor {
    pub name: String,
    pub age: Option<u32>,
    pub sex: Option<String>,
    pub character_level: u32,
    pub heroic_level: u32,
    pub base_attack_bonus: i64,
    pub dark_side_score: i64,
    pub abilities: AbilityScores,
    pub weapon_proficiencies: Vec<String>,
    pub armor_proficiencies: Vec<String>,
    pub trained_skills: Vec<String>,
    pub items: Vec<Item>,
    pub speed: Vec<Speed>,
    pub condition: ConditionStep,
    pub attributes: Vec<Attribute>,
    /// NPCs skip prerequisite gating.
    pub ignore_prerequisites: bool,
}

impl Default for Actor {
    fn default() -> Self {
        Self {
            name: String::new(),
            age: None,
            sex: None,
            character_level: 0,
            heroic_level: 0,
            base_attack_bonus: 0,
            dark_side_score: 0,
            abilities: AbilityScores::default(),
            weapon_proficiencies: Vec::new(),
            armor_proficiencies: Vec::new(),
            trained_skills: Vec::new(),
            items: Vec::new(),
            speed: vec![Speed::new("Stand", 6)],
            condition: ConditionStep::Normal,
            attributes: Vec::new(),
            ignore_prerequisites: false,
        }
    }
}

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<AttributeKey>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.push(Attribute::new(key, value));
        self
    }
}

/// Read access the prerequisite evaluator needs from whatever it evaluates.
///
/// Every accessor except [`Target::own_attributes`] has a default that
/// reports the absent case, so sparse targets (items) only override what
/// they have.
pub trait Target {
    /// Attributes recorded directly on the target.
    fn own_attributes(&self) -> &[Attribute];

    fn items(&self) -> &[Item] {
        &[]
    }

    fn age(&self) -> Option<u32> {
        None
    }

    fn character_level(&self) -> u32 {
        0
    }

    fn base_attack_bonus(&self) -> i64 {
        0
    }

    fn dark_side_score(&self) -> i64 {
        0
    }

    fn sex(&self) -> Option<&str> {
        None
    }

    fn weapon_proficiencies(&self) -> &[String] {
        &[]
    }

    fn armor_proficiencies(&self) -> &[String] {
        &[]
    }

    fn trained_skills(&self) -> &[String] {
        &[]
    }

    fn ability_score(&self, _ability: Ability) -> Option<i64> {
        None
    }

    fn ignores_prerequisites(&self) -> bool {
        false
    }

    fn items_of_kind(&self, kind: ItemKind) -> Vec<&Item> {
        self.items().iter().filter(|item| item.kind == kind).collect()
    }

    fn equipped_items(&self) -> Vec<&Item> {
        self.items().iter().filter(|item| item.equipped).collect()
    }

    /// Physical possessions, equipped or not.
    fn inventory_items(&self) -> Vec<&Item> {
        self.items().iter().filter(|item| item.kind.is_gear()).collect()
    }
}

impl Target for Actor {
    fn own_attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    fn items(&self) -> &[Item] {
        &self.items
    }

    fn age(&self) -> Option<u32> {
        self.age
    }

    fn character_level(&self) -> u32 {
        self.character_level
    }

    fn base_attack_bonus(&self) -> i64 {
        self.base_attack_bonus
    }

    fn dark_side_score(&self) -> i64 {
        self.dark_side_score
    }

    fn sex(&self) -> Option<&str> {
        self.sex.as_deref()
    }

    fn weapon_proficiencies(&self) -> &[String] {
        &self.weapon_proficiencies
    }

    fn armor_proficiencies(&self) -> &[String] {
        &self.armor_proficiencies
    }

    fn trained_skills(&self) -> &[String] {
        &self.trained_skills
    }

    fn ability_score(&self, ability: Ability) -> Option<i64> {
        Some(self.abilities.score(ability))
    }

    fn ignores_prerequisites(&self) -> bool {
        self.ignore_prerequisites
    }
}

impl Target for Item {
    fn own_attributes(&self) -> &[Attribute] {
        &self.attributes
    }
}
