//! Defense resolution module.
//!
//! Derives Fortitude, Will and Reflex defenses, the damage threshold and
//! damage reduction from an [`Actor`], together with a summary block for
//! each equipped armor. Every defense keeps an ordered breakdown of the
//! terms folded into its total.
//!
//! The `ability_bonus`, `armor_bonus`, `class_bonus` and `misc_bonus`
//! fields are sheet display columns. They may overlap each other (Will's
//! `armor_bonus` is the heroic level, for instance); `total` is the
//! authoritative value.
//!
//! Equipment Fortitude bonuses come from `fortitudeDefenseBonus`
//! attributes only. [`ArmorStats::fortitude_bonus`] is shown in the armor
//! summary but never added to the total, so armor granting a Fortitude
//! bonus carries the attribute as well.

use crate::aggregate::AttributeIndex;
use crate::attribute_key::AttributeKey;
use crate::model::{Ability, Actor, ArmorStats, ArmorType, DefenseBonus, DefenseKind, Item, ItemKind, Speed, Target};
use serde::{Deserialize, Serialize};

/// Every defense starts from this value.
pub const BASE_DEFENSE: i64 = 10;

/// A resolved defense with its breakdown.
///
/// # Examples
///
/// ```rust
/// use swse_rules::DefenseScore;
///
/// let mut fort = DefenseScore::default();
/// fort.add_source("Base", 10);
/// fort.add_source("Heroic Level", 5);
/// fort.add_source("Constitution", 2);
///
/// assert_eq!(fort.total, 17);
/// assert_eq!(fort.sources.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefenseScore {
    pub total: i64,
    pub ability_bonus: i64,
    pub armor_bonus: i64,
    pub class_bonus: i64,
    pub misc_bonus: i64,
    /// Each entry is `(label, value)`, in the order it was added to `total`.
    pub sources: Vec<(String, i64)>,
}

impl DefenseScore {
    /// Add a term to the total and record it in the breakdown.
    pub fn add_source(&mut self, label: impl Into<String>, value: i64) {
        self.total += value;
        self.sources.push((label.into(), value));
    }
}

/// The defense block of a character sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefenseSet {
    pub fort: DefenseScore,
    pub will: DefenseScore,
    #[serde(rename = "ref")]
    pub reflex: DefenseScore,
    pub dt: DefenseScore,
    /// Same value as `dt`, kept under the sheet's long name.
    pub damage_threshold: DefenseScore,
    pub damage_reduction: i64,
    /// Conditional trait bonuses, rendered for display only.
    pub situational_bonuses: Vec<String>,
}

/// Display block for one equipped armor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmorSummary {
    pub name: String,
    /// The wearer's unmodified speed, for display. Use
    /// [`reduce_speed_for_armor`] for the speed while wearing it.
    pub speed: Vec<Speed>,
    pub ref_defense: i64,
    pub fort_defense: i64,
    pub max_dex: i64,
    pub notes: String,
    #[serde(rename = "type")]
    pub armor_type: ArmorType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defenses {
    pub defense: DefenseSet,
    pub armors: Vec<ArmorSummary>,
}

/// Defense resolver.
///
/// Stateless: each call snapshots the actor's attributes once and derives
/// every defense from that snapshot.
///
/// # Examples
///
/// ```rust
/// use swse_rules::DefenseResolver;
/// use swse_rules::model::{AbilityScores, Actor};
///
/// let mut actor = Actor::new("Vel");
/// actor.heroic_level = 5;
/// actor.abilities = AbilityScores { con: 14, ..AbilityScores::default() };
///
/// let defenses = DefenseResolver::resolve(&actor);
/// assert_eq!(defenses.defense.fort.total, 17);
/// assert_eq!(defenses.defense.dt.total, 17);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefenseResolver;

impl DefenseResolver {
    pub fn resolve(actor: &Actor) -> Defenses {
        let index = AttributeIndex::collect(actor);
        let bonuses = index.defense_bonuses();
        let condition = actor.condition.defense_penalty();

        let fort = resolve_fort(actor, &index, &bonuses, condition);
        let will = resolve_will(actor, &index, &bonuses, condition);
        let reflex = resolve_reflex(actor, &index, &bonuses, condition);

        let mut dt = DefenseScore::default();
        dt.add_source("Fortitude Defense", fort.total);
        dt.add_source(
            "Size",
            index.trait_sum(&AttributeKey::DAMAGE_THRESHOLD_SIZE_MODIFIER),
        );

        let situational_bonuses = bonuses
            .iter()
            .filter_map(|bonus| {
                bonus
                    .modifier
                    .as_deref()
                    .map(|modifier| situational_bonus(bonus.bonus, bonus.defense, modifier))
            })
            .collect();

        let armors = actor
            .equipped_items()
            .into_iter()
            .filter(|item| item.kind == ItemKind::Armor)
            .filter_map(|item| armor_summary(actor, item))
            .collect();

        tracing::debug!(
            actor = %actor.name,
            fort = fort.total,
            will = will.total,
            reflex = reflex.total,
            dt = dt.total,
            "resolved defenses"
        );

        Defenses {
            defense: DefenseSet {
                fort,
                will,
                reflex,
                damage_threshold: dt.clone(),
                dt,
                damage_reduction: index.sum(&AttributeKey::DAMAGE_REDUCTION),
                situational_bonuses,
            },
            armors,
        }
    }
}

/// Shorthand for [`DefenseResolver::resolve`].
pub fn resolve_defenses(actor: &Actor) -> Defenses {
    DefenseResolver::resolve(actor)
}

fn resolve_fort(actor: &Actor, index: &AttributeIndex, bonuses: &[&DefenseBonus], condition: i64) -> DefenseScore {
    let mut fort = DefenseScore::default();
    let heroic = i64::from(actor.heroic_level);
    let ignore_con = index.any(&AttributeKey::IGNORE_CON) || index.any(&AttributeKey::IS_DROID);
    let (ability_label, ability) = if ignore_con {
        ("Strength", Ability::Str)
    } else {
        ("Constitution", Ability::Con)
    };
    let ability_bonus = actor.abilities.modifier(ability);
    let trait_bonus = trait_defense_bonus(DefenseKind::Fortitude, bonuses);
    let class_bonus = index.max(&AttributeKey::CLASS_FORTITUDE_DEFENSE_BONUS).unwrap_or(0);
    let equipment_bonus = index.sum(&AttributeKey::FORTITUDE_DEFENSE_BONUS);

    fort.add_source("Base", BASE_DEFENSE);
    fort.add_source("Heroic Level", heroic);
    fort.add_source(ability_label, ability_bonus);
    fort.add_source("Traits", trait_bonus);
    fort.add_source("Class", class_bonus);
    fort.add_source("Equipment", equipment_bonus);
    fort.add_source("Condition", condition);

    fort.ability_bonus = ability_bonus;
    fort.armor_bonus = equipment_bonus + heroic;
    fort.class_bonus = class_bonus;
    fort.misc_bonus = condition + trait_bonus;
    fort
}

fn resolve_will(actor: &Actor, index: &AttributeIndex, bonuses: &[&DefenseBonus], condition: i64) -> DefenseScore {
    let mut will = DefenseScore::default();
    let heroic = i64::from(actor.heroic_level);
    let character_level = i64::from(actor.character_level);
    let ability_bonus = actor.abilities.modifier(Ability::Wis);
    let class_bonus = index.max(&AttributeKey::CLASS_WILL_DEFENSE_BONUS).unwrap_or(0).max(0);
    let trait_bonus = trait_defense_bonus(DefenseKind::Will, bonuses);

    will.add_source("Base", BASE_DEFENSE);
    will.add_source("Heroic Level", heroic);
    will.add_source("Character Level", character_level);
    will.add_source("Wisdom", ability_bonus);
    will.add_source("Class", class_bonus);
    will.add_source("Traits", trait_bonus);
    will.add_source("Condition", condition);

    will.ability_bonus = ability_bonus;
    will.armor_bonus = heroic;
    will.class_bonus = class_bonus;
    will.misc_bonus = trait_bonus + condition;
    will
}

fn resolve_reflex(actor: &Actor, index: &AttributeIndex, bonuses: &[&DefenseBonus], condition: i64) -> DefenseScore {
    let mut reflex = DefenseScore::default();
    // A zero armor bonus counts as no bonus.
    let best_armor = equipped_armor(actor)
        .filter_map(|armor| armor.reflex_bonus)
        .filter(|bonus| *bonus != 0)
        .max();
    let (armor_label, armor_bonus) = match best_armor {
        Some(bonus) => ("Armor", bonus),
        None => ("Heroic Level", i64::from(actor.heroic_level)),
    };
    let dexterity = actor.abilities.modifier(Ability::Dex);
    let ability_bonus = match equipped_armor(actor).filter_map(|armor| armor.max_dex_bonus).min() {
        Some(cap) => dexterity.min(cap),
        None => dexterity,
    };
    let trait_bonus = trait_defense_bonus(DefenseKind::Reflex, bonuses);
    let class_bonus = index.max(&AttributeKey::CLASS_REFLEX_DEFENSE_BONUS).unwrap_or(0).max(0);
    let size_modifier = index.trait_sum(&AttributeKey::SIZE_MODIFIER);
    let dodge_bonus = index.sum(&AttributeKey::DODGE_REFLEX_DEFENSE_BONUS);

    reflex.add_source("Base", BASE_DEFENSE);
    reflex.add_source(armor_label, armor_bonus);
    reflex.add_source("Dexterity", ability_bonus);
    reflex.add_source("Traits", trait_bonus);
    reflex.add_source("Class", class_bonus);
    reflex.add_source("Size", size_modifier);
    reflex.add_source("Condition", condition);
    reflex.add_source("Dodge", dodge_bonus);

    reflex.ability_bonus = ability_bonus;
    reflex.armor_bonus = armor_bonus;
    reflex.class_bonus = class_bonus;
    reflex.misc_bonus = trait_bonus + condition + dodge_bonus;
    reflex
}

fn equipped_armor(actor: &Actor) -> impl Iterator<Item = &ArmorStats> {
    actor
        .items
        .iter()
        .filter(|item| item.equipped)
        .filter_map(|item| item.armor.as_ref())
}

/// Unconditional trait bonuses for `defense`; situational ones are excluded.
fn trait_defense_bonus(defense: DefenseKind, bonuses: &[&DefenseBonus]) -> i64 {
    bonuses
        .iter()
        .filter(|bonus| bonus.modifier.is_none() && bonus.defense.applies_to(defense))
        .map(|bonus| bonus.bonus)
        .sum()
}

/// Render a conditional bonus for the sheet.
///
/// ```rust
/// use swse_rules::defense::situational_bonus;
/// use swse_rules::model::DefenseKind;
///
/// assert_eq!(
///     situational_bonus(2, DefenseKind::Will, "Mind-Affecting effects"),
///     "+2 bonus to their Will Defense to resist Mind-Affecting effects"
/// );
/// assert_eq!(
///     situational_bonus(-1, DefenseKind::Reflex, "area attacks"),
///     "-1 penalty to their Reflex Defense to resist area attacks"
/// );
/// ```
pub fn situational_bonus(bonus: i64, defense: DefenseKind, modifier: &str) -> String {
    let sign = if bonus >= 0 { "+" } else { "" };
    let word = if bonus < 0 { "penalty" } else { "bonus" };
    format!("{sign}{bonus} {word} to their {} Defense to resist {modifier}", defense.title())
}

/// Speed while wearing armor of `armor_type`.
///
/// Light armor leaves speed unchanged; Medium and Heavy armor reduce it to
/// three quarters, rounded down (6 squares become 4, 4 become 3).
pub fn reduce_speed_for_armor(squares: u32, armor_type: ArmorType) -> u32 {
    match armor_type {
        ArmorType::Light => squares,
        ArmorType::Medium | ArmorType::Heavy => squares * 3 / 4,
    }
}

fn armor_summary(actor: &Actor, item: &Item) -> Option<ArmorSummary> {
    let armor = item.armor.as_ref()?;
    Some(ArmorSummary {
        name: item.name.clone(),
        speed: actor.speed.clone(),
        ref_defense: armor.reflex_bonus.unwrap_or(0),
        fort_defense: armor.fortitude_bonus.unwrap_or(0),
        max_dex: armor.max_dex_bonus.unwrap_or(0),
        notes: armor.special.join(", "),
        armor_type: armor.armor_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AbilityScores, ArmorStats, ConditionStep};

    fn armor(name: &str, armor_type: ArmorType, reflex: Option<i64>, max_dex: Option<i64>) -> Item {
        Item::new(name, ItemKind::Armor).with_armor(ArmorStats {
            armor_type,
            reflex_bonus: reflex,
            fortitude_bonus: None,
            max_dex_bonus: max_dex,
            special: Vec::new(),
        })
    }

    #[test]
    fn test_reduce_speed() {
        assert_eq!(reduce_speed_for_armor(6, ArmorType::Light), 6);
        assert_eq!(reduce_speed_for_armor(6, ArmorType::Medium), 4);
        assert_eq!(reduce_speed_for_armor(4, ArmorType::Heavy), 3);
    }

    #[test]
    fn test_unarmored_reflex_uses_heroic_level() {
        let mut actor = Actor::new("Scout");
        actor.heroic_level = 3;
        actor.abilities = AbilityScores {
            dex: 16,
            ..AbilityScores::default()
        };
        let reflex = DefenseResolver::resolve(&actor).defense.reflex;
        assert_eq!(reflex.total, 10 + 3 + 3);
        assert_eq!(reflex.armor_bonus, 3);
        assert_eq!(reflex.sources[1], ("Heroic Level".to_string(), 3));
    }

    #[test]
    fn test_armor_caps_dexterity() {
        let mut actor = Actor::new("Trooper")
            .with_item(armor("Battle Armor", ArmorType::Medium, Some(6), Some(2)).equipped())
            .with_item(armor("Spare Armor", ArmorType::Light, Some(9), Some(0)));
        actor.heroic_level = 4;
        actor.abilities.dex = 18;
        let reflex = DefenseResolver::resolve(&actor).defense.reflex;
        assert_eq!(reflex.armor_bonus, 6);
        assert_eq!(reflex.ability_bonus, 2);
        assert_eq!(reflex.total, 18);
    }

    #[test]
    fn test_droid_fortitude_uses_strength() {
        let mut actor = Actor::new("R-9")
            .with_item(Item::new("Droid", ItemKind::Species).with_attribute("isDroid", true));
        actor.abilities.str = 16;
        actor.abilities.con = 4;
        let fort = DefenseResolver::resolve(&actor).defense.fort;
        assert_eq!(fort.ability_bonus, 3);
        assert_eq!(fort.total, 13);
    }

    #[test]
    fn test_class_bonus_takes_maximum() {
        let actor = Actor::new("Multiclass")
            .with_item(Item::new("Soldier", ItemKind::Class).with_attribute("classFortitudeDefenseBonus", 2))
            .with_item(Item::new("Scout", ItemKind::Class).with_attribute("classFortitudeDefenseBonus", 1));
        let fort = DefenseResolver::resolve(&actor).defense.fort;
        assert_eq!(fort.class_bonus, 2);
        assert_eq!(fort.total, 12);
    }

    #[test]
    fn test_condition_applies_to_every_defense() {
        let mut actor = Actor::new("Hurt");
        actor.condition = ConditionStep::MinusTwo;
        let set = DefenseResolver::resolve(&actor).defense;
        assert_eq!(set.fort.total, 8);
        assert_eq!(set.will.total, 8);
        assert_eq!(set.reflex.total, 8);
        assert_eq!(set.will.misc_bonus, -2);
    }

    #[test]
    fn test_situational_bonuses_are_not_summed() {
        let actor = Actor::new("Wary").with_item(
            Item::new("Iron Will", ItemKind::Trait)
                .with_attribute(
                    "defenseBonuses",
                    DefenseBonus {
                        defense: DefenseKind::Will,
                        bonus: 2,
                        modifier: Some("fear effects".into()),
                    },
                )
                .with_attribute(
                    "defenseBonuses",
                    DefenseBonus {
                        defense: DefenseKind::All,
                        bonus: 1,
                        modifier: None,
                    },
                ),
        );
        let set = DefenseResolver::resolve(&actor).defense;
        assert_eq!(set.will.total, 11);
        assert_eq!(set.fort.total, 11);
        assert_eq!(
            set.situational_bonuses,
            vec!["+2 bonus to their Will Defense to resist fear effects".to_string()]
        );
    }

    #[test]
    fn test_armor_summary() {
        let mut plate = armor("Heavy Battle Armor", ArmorType::Heavy, Some(8), Some(0));
        if let Some(stats) = plate.armor.as_mut() {
            stats.fortitude_bonus = Some(4);
            stats.special = vec!["Helmet Package".into(), "Climate Control".into()];
        }
        let actor = Actor::new("Tank").with_item(plate.equipped());
        let defenses = DefenseResolver::resolve(&actor);
        assert_eq!(defenses.armors.len(), 1);
        let summary = &defenses.armors[0];
        assert_eq!(summary.speed, vec![Speed::new("Stand", 6)]);
        assert_eq!(summary.fort_defense, 4);
        assert_eq!(summary.notes, "Helmet Package, Climate Control");
        assert_eq!(summary.max_dex, 0);
    }

    #[test]
    fn test_armor_fortitude_counted_once() {
        let mut plate = armor("Heavy Battle Armor", ArmorType::Heavy, Some(8), Some(0))
            .with_attribute("fortitudeDefenseBonus", 4);
        if let Some(stats) = plate.armor.as_mut() {
            stats.fortitude_bonus = Some(4);
        }
        let fort = DefenseResolver::resolve(&Actor::new("Tank").with_item(plate.equipped()))
            .defense
            .fort;
        assert_eq!(fort.total, 14);
        assert_eq!(fort.sources[5], ("Equipment".to_string(), 4));
    }

    #[test]
    fn test_will_adds_both_level_terms() {
        let mut actor = Actor::new("Mentor");
        actor.heroic_level = 4;
        actor.character_level = 4;
        let will = DefenseResolver::resolve(&actor).defense.will;
        assert_eq!(will.total, 18);
        assert_eq!(will.sources[2], ("Character Level".to_string(), 4));
        assert_eq!(will.armor_bonus, 4);
    }

    #[test]
    fn test_zero_armor_reflex_falls_back_to_heroic_level() {
        let mut actor = Actor::new("Pilot")
            .with_item(armor("Flight Suit", ArmorType::Light, Some(0), None).equipped());
        actor.heroic_level = 5;
        let reflex = DefenseResolver::resolve(&actor).defense.reflex;
        assert_eq!(reflex.armor_bonus, 5);
        assert_eq!(reflex.total, 15);
        assert_eq!(reflex.sources[1], ("Heroic Level".to_string(), 5));
    }
}
