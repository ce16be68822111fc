use serde_json::json;
use swse_rules::defense::reduce_speed_for_armor;
use swse_rules::model::{AbilityScores, Actor, ArmorType, ConditionStep, Speed};
use swse_rules::*;

fn trooper() -> Actor {
    serde_json::from_value(json!({
        "name": "TK-421",
        "heroicLevel": 4,
        "characterLevel": 4,
        "abilities": {"str": 12, "dex": 17, "con": 14, "wis": 11},
        "speed": [{"mode": "Stand", "squares": 6}, {"mode": "Climb", "squares": 4}],
        "items": [
            {"name": "Soldier", "type": "class", "attributes": [
                {"key": "classFortitudeDefenseBonus", "value": 2},
                {"key": "classReflexDefenseBonus", "value": 1}
            ]},
            {"name": "Nonheroic", "type": "class", "attributes": [
                {"key": "classWillDefenseBonus", "value": 0}
            ]},
            {"name": "Dodge", "type": "feat", "attributes": [
                {"key": "bonusDodgeReflexDefense", "value": 1}
            ]},
            {"name": "Stormtrooper Armor", "type": "armor", "equipped": true, "attributes": [
                {"key": "fortitudeDefenseBonus", "value": 2}
            ], "armor": {
                "armorType": "Medium",
                "reflexBonus": 6,
                "fortitudeBonus": 2,
                "maxDexBonus": 2,
                "special": ["Helmet Package"]
            }},
            {"name": "Blast Vest", "type": "armor", "armor": {
                "armorType": "Light", "reflexBonus": 2, "maxDexBonus": 5
            }},
            {"name": "Shield Generator", "type": "equipment", "equipped": true, "attributes": [
                {"key": "damageReduction", "value": 5}
            ]}
        ]
    }))
    .unwrap()
}

#[test]
fn test_fortitude_scenario() {
    let mut actor = Actor::new("Rookie");
    actor.heroic_level = 5;
    actor.abilities = AbilityScores {
        con: 14,
        ..AbilityScores::default()
    };

    let fort = resolve_defenses(&actor).defense.fort;
    assert_eq!(fort.total, 17);
    assert_eq!(fort.ability_bonus, 2);
    assert_eq!(fort.armor_bonus, 5);
    assert_eq!(fort.class_bonus, 0);
    assert_eq!(fort.misc_bonus, 0);
}

#[test]
fn test_armored_trooper() {
    let defenses = resolve_defenses(&trooper());
    let set = &defenses.defense;

    // 10 + 4 heroic + 2 con + 2 class + 2 armor
    assert_eq!(set.fort.total, 20);
    assert_eq!(set.fort.armor_bonus, 6);

    // 10 + 4 heroic + 4 character level + 0 wis
    assert_eq!(set.will.total, 18);
    assert_eq!(set.will.armor_bonus, 4);

    // 10 + 6 armor + 2 capped dex + 1 class + 1 dodge
    assert_eq!(set.reflex.total, 20);
    assert_eq!(set.reflex.ability_bonus, 2);
    assert_eq!(set.reflex.armor_bonus, 6);
    assert_eq!(set.reflex.misc_bonus, 1);

    assert_eq!(set.dt.total, 20);
    assert_eq!(set.damage_threshold, set.dt);
    assert_eq!(set.damage_reduction, 5);
}

#[test]
fn test_reflex_dexterity_never_exceeds_cap() {
    let mut actor = trooper();
    for dex in [6, 10, 14, 18, 24] {
        actor.abilities.dex = dex;
        let modifier = actor.abilities.modifier(model::Ability::Dex);
        let reflex = resolve_defenses(&actor).defense.reflex;
        assert_eq!(reflex.ability_bonus, modifier.min(2), "dex {dex}");
    }

    actor.items.retain(|item| item.name != "Stormtrooper Armor");
    actor.abilities.dex = 24;
    let reflex = resolve_defenses(&actor).defense.reflex;
    assert_eq!(reflex.ability_bonus, 7);
    assert_eq!(reflex.armor_bonus, 4);
}

#[test]
fn test_armor_summaries_for_equipped_armor_only() {
    let defenses = resolve_defenses(&trooper());
    assert_eq!(defenses.armors.len(), 1);

    let summary = &defenses.armors[0];
    assert_eq!(summary.name, "Stormtrooper Armor");
    assert_eq!(summary.armor_type, ArmorType::Medium);
    assert_eq!(summary.ref_defense, 6);
    assert_eq!(summary.fort_defense, 2);
    assert_eq!(summary.max_dex, 2);
    assert_eq!(summary.notes, "Helmet Package");
    assert_eq!(
        summary.speed,
        vec![Speed::new("Stand", 6), Speed::new("Climb", 4)]
    );
    assert_eq!(
        reduce_speed_for_armor(summary.speed[0].squares, summary.armor_type),
        4
    );
}

#[test]
fn test_speed_reduction_steps() {
    assert_eq!(reduce_speed_for_armor(6, ArmorType::Light), 6);
    assert_eq!(reduce_speed_for_armor(6, ArmorType::Medium), 4);
    assert_eq!(reduce_speed_for_armor(6, ArmorType::Heavy), 4);
    assert_eq!(reduce_speed_for_armor(4, ArmorType::Medium), 3);
    assert_eq!(reduce_speed_for_armor(8, ArmorType::Heavy), 6);
}

#[test]
fn test_trait_bonuses_and_size() {
    let actor: Actor = serde_json::from_value(json!({
        "name": "Ewok Scout",
        "items": [
            {"name": "Small", "type": "trait", "attributes": [
                {"key": "sizeModifier", "value": 1},
                {"key": "damageThresholdSizeModifier", "value": -5}
            ]},
            {"name": "Keen Instincts", "type": "trait", "attributes": [
                {"key": "defenseBonuses", "value": {"defense": "reflex", "bonus": 1}},
                {"key": "defenseBonuses", "value": {"defense": "all", "bonus": 1}},
                {"key": "defenseBonuses", "value": {"defense": "will", "bonus": -2, "modifier": "Persuasion checks"}}
            ]}
        ]
    }))
    .unwrap();

    let set = resolve_defenses(&actor).defense;
    assert_eq!(set.reflex.total, 10 + 1 + 1 + 1);
    assert_eq!(set.fort.total, 11);
    assert_eq!(set.will.total, 11);
    assert_eq!(set.dt.total, 11 - 5);
    assert_eq!(
        set.situational_bonuses,
        vec!["-2 penalty to their Will Defense to resist Persuasion checks".to_string()]
    );
}

#[test]
fn test_condition_track_and_breakdown() {
    let mut actor = trooper();
    actor.condition = ConditionStep::MinusFive;
    let set = resolve_defenses(&actor).defense;
    assert_eq!(set.fort.total, 15);
    assert_eq!(set.fort.misc_bonus, -5);
    assert_eq!(set.fort.sources.iter().map(|(_, value)| value).sum::<i64>(), set.fort.total);
    assert!(set
        .reflex
        .sources
        .contains(&("Condition".to_string(), -5)));
}

#[test]
fn test_defenses_serialize_with_sheet_names() {
    let value = serde_json::to_value(resolve_defenses(&trooper())).unwrap();
    assert_eq!(value["defense"]["ref"]["total"], 20);
    assert_eq!(value["defense"]["damageThreshold"]["total"], 20);
    assert_eq!(value["armors"][0]["type"], "Medium");
    assert_eq!(value["armors"][0]["refDefense"], 6);
}

#[test]
fn test_will_counts_heroic_and_character_levels() {
    let mut actor = Actor::new("Padawan");
    actor.heroic_level = 4;
    actor.character_level = 4;
    actor.abilities.wis = 14;

    let will = resolve_defenses(&actor).defense.will;
    assert_eq!(will.total, 10 + 4 + 4 + 2);
    assert_eq!(will.sources.iter().map(|(_, value)| value).sum::<i64>(), will.total);
}

#[test]
fn test_zero_reflex_armor_uses_heroic_level() {
    let actor: Actor = serde_json::from_value(json!({
        "name": "Smuggler",
        "heroicLevel": 5,
        "items": [
            {"name": "Padded Flight Suit", "type": "armor", "equipped": true, "armor": {
                "armorType": "Light", "reflexBonus": 0
            }}
        ]
    }))
    .unwrap();

    let reflex = resolve_defenses(&actor).defense.reflex;
    assert_eq!(reflex.armor_bonus, 5);
    assert_eq!(reflex.total, 15);
}

#[test]
fn test_armor_fortitude_bonus_is_display_only() {
    let mut actor = trooper();
    for item in &mut actor.items {
        if item.name == "Stormtrooper Armor" {
            item.attributes.clear();
        }
    }

    let defenses = resolve_defenses(&actor);
    assert_eq!(defenses.armors[0].fort_defense, 2);
    // 10 + 4 heroic + 2 con + 2 class
    assert_eq!(defenses.defense.fort.total, 18);
}
