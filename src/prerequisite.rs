//! Prerequisite content module.
//!
//! Authored prerequisites arrive as loosely-typed records: a `type` tag, a
//! display `text`, and a `requirement` string whose meaning depends on the
//! tag. [`RawPrerequisite`] mirrors that authored shape; converting it into
//! a [`Prerequisite`] parses every requirement once, at load time, into a
//! per-kind payload of [`PrerequisiteKind`].
//!
//! Unknown tags and unknown SPECIAL texts still load. They become
//! [`PrerequisiteKind::Unsupported`] and [`SpecialRule::Other`] and fail
//! when evaluated, so one bad node never blocks loading a whole item.

use crate::attribute_key::AttributeKey;
use crate::error::{ContentError, RulesError};
use crate::model::Ability;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A prerequisite node: display text plus a typed condition.
///
/// # Examples
///
/// ```rust
/// use swse_rules::{Prerequisite, PrerequisiteKind};
///
/// let nodes = Prerequisite::from_json(r#"{
///     "type": "OR", "text": "Two of", "count": 2,
///     "children": [
///         {"type": "FEAT", "text": "Dodge", "requirement": "Dodge"},
///         {"type": "TRAINED SKILL", "text": "Trained in Acrobatics", "requirement": "Acrobatics"}
///     ]
/// }"#).unwrap();
///
/// assert_eq!(nodes.len(), 1);
/// match &nodes[0].kind {
///     PrerequisiteKind::Or { count, children } => {
///         assert_eq!(*count, 2);
///         assert_eq!(children.len(), 2);
///     }
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPrerequisite", into = "RawPrerequisite")]
pub struct Prerequisite {
    /// Text shown when this node fails.
    pub text: String,
    pub kind: PrerequisiteKind,
}

/// One variant per prerequisite kind, each with its parsed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PrerequisiteKind {
    /// Inclusive age range; no `high` means no upper bound.
    Age { low: u32, high: Option<u32> },
    CharacterLevel(u32),
    BaseAttackBonus(i64),
    DarkSideScore(Threshold),
    /// An inventory item with this name.
    Item(String),
    Species(String),
    TrainedSkill(String),
    Feat(String),
    Class(String),
    Trait(String),
    /// A talent with this name, or any talent from a tree with this name.
    Talent(String),
    Tradition(String),
    ForceTechnique(ForceTechniqueRequirement),
    Attribute { key: AttributeKey, threshold: i64 },
    Proficiency(String),
    Gender(String),
    Equipped(String),
    Special(SpecialRule),
    And(Vec<Prerequisite>),
    /// At least `count` satisfied children.
    Or { count: u32, children: Vec<Prerequisite> },
    /// A tag outside the known vocabulary.
    Unsupported { tag: String, requirement: Option<String> },
}

/// A numeric requirement that may reference the target's own data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Threshold {
    Fixed(i64),
    /// `@key`: the summed inheritable attribute.
    Attribute(AttributeKey),
    /// `@WISTOTAL`: an ability score total.
    AbilityScore(Ability),
}

/// FORCE TECHNIQUE requirements are either a count or a technique name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForceTechniqueRequirement {
    Count(u32),
    Named(String),
}

/// Free-text SPECIAL requirements the evaluator understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialRule {
    NotADroid,
    IsADroid,
    /// Cannot be verified from sheet data; always reported, never blocks.
    HasBuiltLightsaber,
    Other(String),
}

/// Number-or-string scalar as found in authored content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Integer(i64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Integer(n) => write!(f, "{n}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// The authored record shape, before parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPrerequisite {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RawPrerequisite>,
}

impl Prerequisite {
    pub fn new(text: impl Into<String>, kind: PrerequisiteKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    /// Load a node or a list of nodes from JSON.
    pub fn from_json(json: &str) -> Result<Vec<Prerequisite>, RulesError> {
        let raw: OneOrMany<RawPrerequisite> = serde_json::from_str(json)?;
        Ok(parse_list(raw.into_vec())?)
    }

    /// The authored tag for this node's kind.
    pub fn tag(&self) -> &str {
        self.kind.tag()
    }
}

impl PrerequisiteKind {
    pub fn tag(&self) -> &str {
        match self {
            PrerequisiteKind::Age { .. } => "AGE",
            PrerequisiteKind::CharacterLevel(_) => "CHARACTER LEVEL",
            PrerequisiteKind::BaseAttackBonus(_) => "BASE ATTACK BONUS",
            PrerequisiteKind::DarkSideScore(_) => "DARK SIDE SCORE",
            PrerequisiteKind::Item(_) => "ITEM",
            PrerequisiteKind::Species(_) => "SPECIES",
            PrerequisiteKind::TrainedSkill(_) => "TRAINED SKILL",
            PrerequisiteKind::Feat(_) => "FEAT",
            PrerequisiteKind::Class(_) => "CLASS",
            PrerequisiteKind::Trait(_) => "TRAIT",
            PrerequisiteKind::Talent(_) => "TALENT",
            PrerequisiteKind::Tradition(_) => "TRADITION",
            PrerequisiteKind::ForceTechnique(_) => "FORCE TECHNIQUE",
            PrerequisiteKind::Attribute { .. } => "ATTRIBUTE",
            PrerequisiteKind::Proficiency(_) => "PROFICIENCY",
            PrerequisiteKind::Gender(_) => "GENDER",
            PrerequisiteKind::Equipped(_) => "EQUIPPED",
            PrerequisiteKind::Special(_) => "SPECIAL",
            PrerequisiteKind::And(_) => "AND",
            PrerequisiteKind::Or { .. } => "OR",
            PrerequisiteKind::Unsupported { tag, .. } => tag,
        }
    }
}

impl Threshold {
    fn parse(kind: &str, s: &str) -> Result<Self, ContentError> {
        let s = s.trim();
        if let Ok(n) = s.parse() {
            return Ok(Threshold::Fixed(n));
        }
        let Some(reference) = s.strip_prefix('@') else {
            return Err(invalid_number(kind, s));
        };
        let upper = reference.to_ascii_uppercase();
        if let Some(ability) = upper
            .strip_suffix("TOTAL")
            .and_then(Ability::from_abbreviation)
        {
            return Ok(Threshold::AbilityScore(ability));
        }
        if reference.is_empty() {
            return Err(invalid_number(kind, s));
        }
        Ok(Threshold::Attribute(AttributeKey::new(reference)))
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Fixed(n) => write!(f, "{n}"),
            Threshold::Attribute(key) => write!(f, "@{key}"),
            Threshold::AbilityScore(ability) => write!(f, "@{}TOTAL", ability.abbreviation()),
        }
    }
}

impl SpecialRule {
    /// The droid rules ignore case. The lightsaber rule must match exactly.
    fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed == "Has Built Lightsaber" {
            return SpecialRule::HasBuiltLightsaber;
        }
        match trimmed.to_lowercase().as_str() {
            "not a droid" => SpecialRule::NotADroid,
            "is a droid" => SpecialRule::IsADroid,
            _ => SpecialRule::Other(s.to_string()),
        }
    }

    fn as_requirement(&self) -> String {
        match self {
            SpecialRule::NotADroid => "not a droid".into(),
            SpecialRule::IsADroid => "is a droid".into(),
            SpecialRule::HasBuiltLightsaber => "Has Built Lightsaber".into(),
            SpecialRule::Other(s) => s.clone(),
        }
    }
}

fn invalid_number(kind: &str, value: &str) -> ContentError {
    ContentError::InvalidNumber {
        kind: kind.to_string(),
        value: value.to_string(),
    }
}

fn parse_number<N: std::str::FromStr>(kind: &str, scalar: &Scalar) -> Result<N, ContentError> {
    let text = scalar.to_string();
    text.trim()
        .parse()
        .map_err(|_| invalid_number(kind, &text))
}

/// Canonical tag: upper case, underscores read as spaces.
fn normalize_tag(tag: &str) -> String {
    tag.trim().to_ascii_uppercase().replace('_', " ")
}

impl TryFrom<RawPrerequisite> for Prerequisite {
    type Error = ContentError;

    fn try_from(raw: RawPrerequisite) -> Result<Self, Self::Error> {
        let RawPrerequisite {
            kind,
            text,
            requirement,
            low,
            high,
            count,
            children,
        } = raw;
        let authored_tag = kind.unwrap_or_default();
        let tag = normalize_tag(&authored_tag);

        let require = || {
            requirement
                .as_ref()
                .map(Scalar::to_string)
                .ok_or_else(|| ContentError::MissingRequirement(tag.clone()))
        };

        let kind = match tag.as_str() {
            "AGE" => PrerequisiteKind::Age {
                low: low
                    .as_ref()
                    .map(|s| parse_number(&tag, s))
                    .transpose()?
                    .unwrap_or(0),
                high: high.as_ref().map(|s| parse_number(&tag, s)).transpose()?,
            },
            "CHARACTER LEVEL" => PrerequisiteKind::CharacterLevel(parse_number(&tag, &Scalar::Text(require()?))?),
            "BASE ATTACK BONUS" => PrerequisiteKind::BaseAttackBonus(parse_number(&tag, &Scalar::Text(require()?))?),
            "DARK SIDE SCORE" => PrerequisiteKind::DarkSideScore(Threshold::parse(&tag, &require()?)?),
            "ITEM" => PrerequisiteKind::Item(require()?),
            "SPECIES" => PrerequisiteKind::Species(require()?),
            "TRAINED SKILL" => PrerequisiteKind::TrainedSkill(require()?),
            "FEAT" => PrerequisiteKind::Feat(require()?),
            "CLASS" => PrerequisiteKind::Class(require()?),
            "TRAIT" => PrerequisiteKind::Trait(require()?),
            "TALENT" => PrerequisiteKind::Talent(require()?),
            "TRADITION" => PrerequisiteKind::Tradition(require()?),
            "FORCE TECHNIQUE" => {
                let requirement = require()?;
                PrerequisiteKind::ForceTechnique(match requirement.trim().parse() {
                    Ok(n) => ForceTechniqueRequirement::Count(n),
                    Err(_) => ForceTechniqueRequirement::Named(requirement),
                })
            }
            "ATTRIBUTE" => {
                let requirement = require()?;
                let mut tokens = requirement.split_whitespace();
                match (tokens.next(), tokens.next(), tokens.next()) {
                    (Some(key), Some(threshold), None) => PrerequisiteKind::Attribute {
                        key: AttributeKey::new(key),
                        threshold: threshold.parse().map_err(|_| {
                            ContentError::InvalidAttributeRequirement(requirement.clone())
                        })?,
                    },
                    _ => return Err(ContentError::InvalidAttributeRequirement(requirement)),
                }
            }
            "PROFICIENCY" => PrerequisiteKind::Proficiency(require()?),
            "GENDER" => PrerequisiteKind::Gender(require()?),
            "EQUIPPED" => PrerequisiteKind::Equipped(require()?),
            "SPECIAL" => PrerequisiteKind::Special(SpecialRule::parse(&require()?)),
            "AND" | "OR" => {
                if children.is_empty() {
                    return Err(ContentError::MissingChildren(tag.clone()));
                }
                let children = parse_list(children)?;
                if tag == "AND" {
                    PrerequisiteKind::And(children)
                } else {
                    PrerequisiteKind::Or {
                        count: count
                            .as_ref()
                            .map(|s| parse_number(&tag, s))
                            .transpose()?
                            .unwrap_or(1),
                        children,
                    }
                }
            }
            _ => PrerequisiteKind::Unsupported {
                tag: authored_tag,
                requirement: requirement.map(|r| r.to_string()),
            },
        };

        Ok(Prerequisite { text, kind })
    }
}

impl From<Prerequisite> for RawPrerequisite {
    fn from(prerequisite: Prerequisite) -> Self {
        let tag = prerequisite.kind.tag().to_string();
        let mut raw = RawPrerequisite {
            kind: Some(tag),
            text: prerequisite.text,
            ..RawPrerequisite::default()
        };
        let text = |s: String| Some(Scalar::Text(s));
        match prerequisite.kind {
            PrerequisiteKind::Age { low, high } => {
                raw.low = Some(Scalar::Integer(i64::from(low)));
                raw.high = high.map(|h| Scalar::Integer(i64::from(h)));
            }
            PrerequisiteKind::CharacterLevel(level) => raw.requirement = text(level.to_string()),
            PrerequisiteKind::BaseAttackBonus(bonus) => raw.requirement = text(bonus.to_string()),
            PrerequisiteKind::DarkSideScore(threshold) => raw.requirement = text(threshold.to_string()),
            PrerequisiteKind::Item(name)
            | PrerequisiteKind::Species(name)
            | PrerequisiteKind::TrainedSkill(name)
            | PrerequisiteKind::Feat(name)
            | PrerequisiteKind::Class(name)
            | PrerequisiteKind::Trait(name)
            | PrerequisiteKind::Talent(name)
            | PrerequisiteKind::Tradition(name)
            | PrerequisiteKind::Proficiency(name)
            | PrerequisiteKind::Gender(name)
            | PrerequisiteKind::Equipped(name) => raw.requirement = text(name),
            PrerequisiteKind::ForceTechnique(ForceTechniqueRequirement::Count(n)) => {
                raw.requirement = text(n.to_string())
            }
            PrerequisiteKind::ForceTechnique(ForceTechniqueRequirement::Named(name)) => {
                raw.requirement = text(name)
            }
            PrerequisiteKind::Attribute { key, threshold } => {
                raw.requirement = text(format!("{key} {threshold}"))
            }
            PrerequisiteKind::Special(rule) => raw.requirement = text(rule.as_requirement()),
            PrerequisiteKind::And(children) => {
                raw.children = children.into_iter().map(RawPrerequisite::from).collect()
            }
            PrerequisiteKind::Or { count, children } => {
                raw.count = Some(Scalar::Integer(i64::from(count)));
                raw.children = children.into_iter().map(RawPrerequisite::from).collect();
            }
            PrerequisiteKind::Unsupported { requirement, .. } => raw.requirement = requirement.map(Scalar::Text),
        }
        raw
    }
}

/// Parse a list of authored nodes. Untyped entries carry no condition and
/// are skipped.
pub fn parse_list(raw: Vec<RawPrerequisite>) -> Result<Vec<Prerequisite>, ContentError> {
    raw.into_iter()
        .filter(|node| node.kind.as_deref().is_some_and(|k| !k.trim().is_empty()))
        .map(Prerequisite::try_from)
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

/// Deserialize a prerequisite field authored either as one node, a list,
/// or `null`.
pub(crate) fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<Prerequisite>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<OneOrMany<RawPrerequisite>> = Option::deserialize(deserializer)?;
    let raw = raw.map(OneOrMany::into_vec).unwrap_or_default();
    parse_list(raw).map_err(serde::de::Error::custom)
}
