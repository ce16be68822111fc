//! Prerequisite evaluation module.
//!
//! Evaluates a list of [`Prerequisite`] nodes against a [`Target`] in a
//! single deterministic pass. Every node either records a [`Success`] or
//! one or more [`Failure`] entries; AND/OR nodes recurse into their
//! children and fold the child failures into the parent report.
//!
//! Owned feats, classes, traits, talents, traditions and force techniques
//! only count when their own prerequisites still pass, so matching one
//! re-enters the evaluator with that item's tree. Items already being
//! evaluated further up the recursion are treated as failing, which
//! breaks authored cycles.

use crate::aggregate::AttributeIndex;
use crate::attribute_key::AttributeKey;
use crate::model::{Item, ItemKind, Target};
use crate::prerequisite::{ForceTechniqueRequirement, Prerequisite, PrerequisiteKind, SpecialRule, Threshold};
use serde::{Deserialize, Serialize};

/// Evaluator settings.
///
/// # Examples
///
/// ```rust
/// use swse_rules::EvaluatorConfig;
///
/// let config: EvaluatorConfig = serde_json::from_str(r#"{"maxDepth": 16}"#).unwrap();
/// assert_eq!(config, EvaluatorConfig::new().with_max_depth(16));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EvaluatorConfig {
    /// Deepest nesting of combinators and owned-item trees evaluated.
    pub max_depth: usize,
}

impl EvaluatorConfig {
    /// Depth used when none is configured.
    pub const DEFAULT_MAX_DEPTH: usize = 64;

    /// Settings with every field at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the deepest nesting evaluated. Nodes below it fail with a
    /// [`DiagnosticKind::DepthExceeded`] diagnostic.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}

/// One entry of a failure report.
///
/// Soft entries (`hard_fail == false`) are informational: they are shown
/// to the user but never make an evaluation fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub hard_fail: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Failure>,
}

impl Failure {
    /// A blocking entry with no children.
    ///
    /// ```rust
    /// use swse_rules::Failure;
    ///
    /// let failure = Failure::hard("Dodge");
    /// assert!(failure.hard_fail);
    /// assert!(failure.children.is_empty());
    /// ```
    pub fn hard(message: impl Into<String>) -> Self {
        Self {
            hard_fail: true,
            message: message.into(),
            children: Vec::new(),
        }
    }

    /// An informational entry. It is reported but never fails an evaluation.
    pub fn soft(message: impl Into<String>) -> Self {
        Self {
            hard_fail: false,
            message: message.into(),
            children: Vec::new(),
        }
    }

    /// A labelled entry grouping the failures of a combinator's children.
    pub fn group(message: impl Into<String>, hard_fail: bool, children: Vec<Failure>) -> Self {
        Self {
            hard_fail,
            message: message.into(),
            children,
        }
    }
}

/// A satisfied node and how many qualifying matches it counted.
///
/// `count` is 1 except for talent-tree matches, which count every
/// qualifying talent so an enclosing OR can compare against its threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Success<'a> {
    pub prerequisite: &'a Prerequisite,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// A node whose tag is outside the known vocabulary.
    UnsupportedKind,
    /// A SPECIAL node with text the evaluator does not understand.
    UnsupportedSpecial,
    /// An owned item re-entered while its own tree was being evaluated.
    Cycle,
    /// Nesting exceeded [`EvaluatorConfig::max_depth`].
    DepthExceeded,
}

/// A content problem noticed during evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

/// The outcome of one [`Evaluator::evaluate`] call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation<'a> {
    /// True iff a top-level failure entry is a hard fail.
    pub overall_failed: bool,
    pub failures: Vec<Failure>,
    /// Reserved for non-blocking notices; currently always empty.
    pub silent_failures: Vec<Failure>,
    pub successes: Vec<Success<'a>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Evaluation<'_> {
    /// Sum of success counts, the figure an OR compares to its threshold.
    pub fn satisfied_count(&self) -> u32 {
        self.successes.iter().map(|s| s.count).sum()
    }

    pub fn passed(&self) -> bool {
        !self.overall_failed
    }
}

/// Prerequisite evaluator.
///
/// # Examples
///
/// ```rust
/// use swse_rules::{Evaluator, Prerequisite};
/// use swse_rules::model::Actor;
///
/// let nodes = Prerequisite::from_json(r#"[
///     {"type": "AGE", "text": "Adult", "low": 18},
///     {"type": "CHARACTER LEVEL", "text": "Level 3", "requirement": "3"}
/// ]"#).unwrap();
///
/// let mut actor = Actor::new("Rell");
/// actor.age = Some(17);
/// actor.character_level = 4;
///
/// let evaluation = Evaluator::new().evaluate(&actor, &nodes);
/// assert!(evaluation.overall_failed);
/// assert_eq!(evaluation.failures.len(), 1);
/// assert_eq!(evaluation.failures[0].message, "AGE: Adult");
/// assert_eq!(evaluation.successes.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvaluatorConfig,
}

impl Evaluator {
    /// An evaluator with [`EvaluatorConfig::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// An evaluator with custom settings.
    ///
    /// ```rust
    /// use swse_rules::{Evaluator, EvaluatorConfig};
    ///
    /// let evaluator = Evaluator::with_config(EvaluatorConfig::new().with_max_depth(8));
    /// assert_eq!(evaluator.config().max_depth, 8);
    /// ```
    pub fn with_config(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    /// The settings this evaluator runs with.
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluate `nodes` against `target`.
    ///
    /// The nodes form an implicit top-level list: each is reported on its
    /// own, without the `all of:` envelope an explicit AND adds. Pass a
    /// single node with [`std::slice::from_ref`].
    pub fn evaluate<'a, T: Target + ?Sized>(&self, target: &T, nodes: &'a [Prerequisite]) -> Evaluation<'a> {
        let mut pass = Pass {
            target,
            index: AttributeIndex::collect(target),
            max_depth: self.config.max_depth,
            in_progress: Vec::new(),
            diagnostics: Vec::new(),
        };
        let mut evaluation = pass.evaluate_list(nodes, 0);
        evaluation.diagnostics = pass.diagnostics;
        evaluation
    }

    /// Whether `target` may take something gated by `nodes`.
    ///
    /// Targets that ignore prerequisites (NPCs) always qualify.
    pub fn qualifies<T: Target + ?Sized>(&self, target: &T, nodes: &[Prerequisite]) -> bool {
        target.ignores_prerequisites() || self.evaluate(target, nodes).passed()
    }
}

enum Outcome {
    Pass(u32),
    Fail,
    /// The branch already wrote its own failure entries.
    Recorded,
}

impl Outcome {
    fn from_bool(passed: bool) -> Self {
        if passed {
            Outcome::Pass(1)
        } else {
            Outcome::Fail
        }
    }
}

/// State of one top-level evaluation.
struct Pass<'t, T: ?Sized> {
    target: &'t T,
    index: AttributeIndex,
    max_depth: usize,
    in_progress: Vec<&'t Item>,
    diagnostics: Vec<Diagnostic>,
}

impl<'t, T: Target + ?Sized> Pass<'t, T> {
    fn evaluate_list<'a>(&mut self, nodes: &'a [Prerequisite], depth: usize) -> Evaluation<'a> {
        let mut evaluation = Evaluation::default();
        for node in nodes {
            self.evaluate_node(node, depth, &mut evaluation);
        }
        evaluation.overall_failed = evaluation.failures.iter().any(|f| f.hard_fail);
        evaluation
    }

    fn evaluate_node<'a>(&mut self, node: &'a Prerequisite, depth: usize, out: &mut Evaluation<'a>) {
        if depth > self.max_depth {
            self.diagnose(
                DiagnosticKind::DepthExceeded,
                format!("prerequisite nesting exceeds {} levels at `{}`", self.max_depth, node.text),
            );
            out.failures.push(Failure::hard(node.text.clone()));
            return;
        }

        let target = self.target;
        let outcome = match &node.kind {
            PrerequisiteKind::Age { low, high } => {
                let in_range = target
                    .age()
                    .is_some_and(|age| *low <= age && high.map_or(true, |high| age <= high));
                if in_range {
                    Outcome::Pass(1)
                } else {
                    out.failures.push(Failure::hard(format!("AGE: {}", node.text)));
                    Outcome::Recorded
                }
            }
            PrerequisiteKind::CharacterLevel(level) => Outcome::from_bool(target.character_level() >= *level),
            PrerequisiteKind::BaseAttackBonus(bonus) => Outcome::from_bool(target.base_attack_bonus() >= *bonus),
            PrerequisiteKind::DarkSideScore(threshold) => {
                Outcome::from_bool(target.dark_side_score() >= self.resolve_threshold(threshold))
            }
            PrerequisiteKind::Item(name) => {
                Outcome::from_bool(target.inventory_items().iter().any(|item| item.name == *name))
            }
            PrerequisiteKind::Species(name) => Outcome::from_bool(
                target
                    .items_of_kind(ItemKind::Species)
                    .iter()
                    .any(|species| species.name == *name),
            ),
            PrerequisiteKind::TrainedSkill(skill) => Outcome::from_bool(
                target
                    .trained_skills()
                    .iter()
                    .any(|trained| trained.to_lowercase() == skill.to_lowercase()),
            ),
            PrerequisiteKind::Feat(name) => Outcome::from_bool(self.first_owned_passes(ItemKind::Feat, name, depth)),
            PrerequisiteKind::Class(name) => Outcome::from_bool(self.first_owned_passes(ItemKind::Class, name, depth)),
            PrerequisiteKind::Tradition(name) => {
                Outcome::from_bool(self.first_owned_passes(ItemKind::ForceTradition, name, depth))
            }
            PrerequisiteKind::Trait(name) => {
                let mut passed = false;
                for owned in target.items_of_kind(ItemKind::Trait) {
                    if owned.name == *name && self.owned_item_passes(owned, depth) {
                        passed = true;
                        break;
                    }
                }
                Outcome::from_bool(passed)
            }
            PrerequisiteKind::Talent(name) => {
                if self.first_owned_passes(ItemKind::Talent, name, depth) {
                    Outcome::Pass(1)
                } else {
                    let mut count = 0;
                    for talent in target.items_of_kind(ItemKind::Talent) {
                        if talent.in_talent_tree(name) && self.owned_item_passes(talent, depth) {
                            count += 1;
                        }
                    }
                    if count > 0 {
                        Outcome::Pass(count)
                    } else {
                        Outcome::Fail
                    }
                }
            }
            PrerequisiteKind::ForceTechnique(ForceTechniqueRequirement::Count(required)) => {
                let owned = target.items_of_kind(ItemKind::ForceTechnique).len();
                Outcome::from_bool(owned >= *required as usize)
            }
            PrerequisiteKind::ForceTechnique(ForceTechniqueRequirement::Named(name)) => {
                Outcome::from_bool(self.first_owned_passes(ItemKind::ForceTechnique, name, depth))
            }
            PrerequisiteKind::Attribute { key, threshold } => Outcome::from_bool(self.index.sum(key) >= *threshold),
            PrerequisiteKind::Proficiency(name) => {
                let wanted = name.to_lowercase();
                Outcome::from_bool(
                    target
                        .weapon_proficiencies()
                        .iter()
                        .chain(target.armor_proficiencies())
                        .any(|proficiency| proficiency.to_lowercase() == wanted),
                )
            }
            PrerequisiteKind::Gender(sex) => Outcome::from_bool(
                target
                    .sex()
                    .is_some_and(|recorded| recorded.to_lowercase() == sex.to_lowercase()),
            ),
            PrerequisiteKind::Equipped(name) => {
                Outcome::from_bool(target.equipped_items().iter().any(|item| item.name == *name))
            }
            PrerequisiteKind::Special(rule) => match rule {
                SpecialRule::NotADroid => Outcome::from_bool(!self.index.any(&AttributeKey::IS_DROID)),
                SpecialRule::IsADroid => Outcome::from_bool(self.index.any(&AttributeKey::IS_DROID)),
                SpecialRule::HasBuiltLightsaber => {
                    out.failures.push(Failure::soft(format!("SPECIAL: {}", node.text)));
                    Outcome::Recorded
                }
                SpecialRule::Other(text) => {
                    self.diagnose(
                        DiagnosticKind::UnsupportedSpecial,
                        format!("unsupported SPECIAL prerequisite `{text}`"),
                    );
                    Outcome::Fail
                }
            },
            PrerequisiteKind::And(children) => {
                let sub = self.evaluate_list(children, depth + 1);
                if sub.passed() {
                    keep_notices(sub.failures, out);
                    Outcome::Pass(1)
                } else {
                    fold_failures("all of:".to_string(), true, sub.failures, out);
                    Outcome::Recorded
                }
            }
            PrerequisiteKind::Or { count, children } => {
                let sub = self.evaluate_list(children, depth + 1);
                if sub.satisfied_count() >= *count {
                    keep_notices(sub.failures, out);
                    Outcome::Pass(1)
                } else {
                    let label = format!("at least of {count}:");
                    if sub.failures.is_empty() {
                        out.failures.push(Failure::group(label, true, Vec::new()));
                    } else {
                        fold_failures(label, sub.overall_failed, sub.failures, out);
                    }
                    Outcome::Recorded
                }
            }
            PrerequisiteKind::Unsupported { tag, .. } => {
                self.diagnose(
                    DiagnosticKind::UnsupportedKind,
                    format!("unsupported prerequisite type `{tag}` (`{}`)", node.text),
                );
                Outcome::Fail
            }
        };

        match outcome {
            Outcome::Pass(count) => out.successes.push(Success {
                prerequisite: node,
                count,
            }),
            Outcome::Fail => out.failures.push(Failure::hard(node.text.clone())),
            Outcome::Recorded => {}
        }
    }

    /// The first owned item of `kind` named `name` exists and its own tree passes.
    fn first_owned_passes(&mut self, kind: ItemKind, name: &str, depth: usize) -> bool {
        let target = self.target;
        match target.items().iter().find(|item| item.kind == kind && item.name == name) {
            Some(owned) => self.owned_item_passes(owned, depth),
            None => false,
        }
    }

    fn owned_item_passes(&mut self, owned: &'t Item, depth: usize) -> bool {
        if owned.prerequisites.is_empty() {
            return true;
        }
        if self.in_progress.iter().any(|item| std::ptr::eq(*item, owned)) {
            let path: Vec<&str> = self
                .in_progress
                .iter()
                .map(|item| item.name.as_str())
                .chain(std::iter::once(owned.name.as_str()))
                .collect();
            self.diagnose(
                DiagnosticKind::Cycle,
                format!("prerequisite cycle: {}", path.join(" -> ")),
            );
            return false;
        }
        self.in_progress.push(owned);
        let sub = self.evaluate_list(&owned.prerequisites, depth + 1);
        self.in_progress.pop();
        sub.passed()
    }

    fn resolve_threshold(&self, threshold: &Threshold) -> i64 {
        match threshold {
            Threshold::Fixed(n) => *n,
            Threshold::Attribute(key) => self.index.sum(key),
            Threshold::AbilityScore(ability) => self.target.ability_score(*ability).unwrap_or(0),
        }
    }

    fn diagnose(&mut self, kind: DiagnosticKind, message: String) {
        tracing::warn!(?kind, "{}", message);
        self.diagnostics.push(Diagnostic { kind, message });
    }
}

/// Fold a failed combinator's child failures into the parent: several are
/// wrapped under one labelled entry, a single one is spliced in directly.
fn fold_failures(label: String, hard_fail: bool, failures: Vec<Failure>, out: &mut Evaluation<'_>) {
    if failures.len() > 1 {
        out.failures.push(Failure::group(label, hard_fail, failures));
    } else {
        out.failures.extend(failures);
    }
}

/// A passing combinator still surfaces its children's soft notices.
fn keep_notices(failures: Vec<Failure>, out: &mut Evaluation<'_>) {
    out.failures
        .extend(failures.into_iter().filter(|failure| !failure.hard_fail));
}
