//! Timed buffs and status conditions that only answer queries.
use tactics_core::brick::{Brick, BrickKind, QueryCx, StackMode};
use tactics_core::fact::FactRef;
use tactics_core::{Answer, GameState, Modifier, QueryKey};

fn is_save(key: QueryKey) -> bool {
    matches!(
        key,
        QueryKey::FortitudeSave | QueryKey::ReflexSave | QueryKey::WillSave
    )
}

/// +1 status to attack per stack, two stacks at most.
#[derive(Debug)]
pub struct Bless;

impl Brick for Bless {
    fn id(&self) -> &str {
        "bless"
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Buff
    }

    fn display_name(&self) -> &str {
        "Blessed"
    }

    fn stack_mode(&self) -> StackMode {
        StackMode::Stack
    }

    fn max_stacks(&self) -> u32 {
        2
    }

    fn query(&self, cx: &QueryCx<'_>) -> Option<Answer> {
        let stacks = i32::try_from(cx.stacks).unwrap_or(i32::MAX);
        (cx.key == QueryKey::AttackBonus).then(|| Answer::Modifier(Modifier::status(stacks, "bless")))
    }

    fn on_fact_added(&self, fact: FactRef, state: &mut GameState) {
        if fact.entity.is_player() {
            state.journal.pline("You feel righteous.");
        }
    }
}

/// +1 status to attack and all saves.
#[derive(Debug)]
pub struct Heroism;

impl Brick for Heroism {
    fn id(&self) -> &str {
        "heroism"
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Buff
    }

    fn display_name(&self) -> &str {
        "Heroism"
    }

    fn stack_mode(&self) -> StackMode {
        StackMode::ExtendDuration
    }

    fn query(&self, cx: &QueryCx<'_>) -> Option<Answer> {
        (cx.key == QueryKey::AttackBonus || is_save(cx.key))
            .then(|| Answer::Modifier(Modifier::status(1, "heroism")))
    }
}

/// +4 circumstance AC.
#[derive(Debug)]
pub struct Shield;

impl Brick for Shield {
    fn id(&self) -> &str {
        "shield"
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Buff
    }

    fn display_name(&self) -> &str {
        "Shield"
    }

    fn stack_mode(&self) -> StackMode {
        StackMode::ExtendDuration
    }

    fn query(&self, cx: &QueryCx<'_>) -> Option<Answer> {
        (cx.key == QueryKey::Ac).then(|| Answer::Modifier(Modifier::circumstance(4, "shield")))
    }
}

/// A status condition that answers one flag, e.g. `prone` answers [`QueryKey::Prone`].
#[derive(Debug)]
pub struct Condition {
    id: &'static str,
    name: &'static str,
    key: QueryKey,
}

impl Condition {
    pub const fn new(id: &'static str, name: &'static str, key: QueryKey) -> Self {
        Self { id, name, key }
    }
}

impl Brick for Condition {
    fn id(&self) -> &str {
        self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Buff
    }

    fn display_name(&self) -> &str {
        self.name
    }

    fn stack_mode(&self) -> StackMode {
        StackMode::ExtendDuration
    }

    fn query(&self, cx: &QueryCx<'_>) -> Option<Answer> {
        (cx.key == self.key).then_some(Answer::Flag(true))
    }

    fn on_fact_added(&self, fact: FactRef, state: &mut GameState) {
        if fact.entity.is_player() {
            state.journal.pline(format!("You are {}!", self.id));
        }
    }

    fn on_fact_removed(&self, fact: FactRef, state: &mut GameState) {
        if fact.entity.is_player() {
            state.journal.pline(format!("You are no longer {}.", self.id));
        }
    }
}

/// `query+<key>/<value>`: a fixed integer or flag answer.
#[derive(Debug)]
pub struct ConstantAnswer {
    id: String,
    key: QueryKey,
    answer: Answer,
}

impl ConstantAnswer {
    /// `value` is an integer or `true`/`false`.
    pub fn parse(key: QueryKey, value: &str) -> Option<Self> {
        let answer = match value {
            "true" => Answer::Flag(true),
            "false" => Answer::Flag(false),
            n => Answer::Int(n.parse().ok()?),
        };
        Some(Self {
            id: format!("query+{key}/{value}"),
            key,
            answer,
        })
    }
}

impl Brick for ConstantAnswer {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Logic
    }

    fn query(&self, cx: &QueryCx<'_>) -> Option<Answer> {
        (cx.key == self.key).then(|| self.answer.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_answers_parse_ints_and_flags() {
        let flying = ConstantAnswer::parse(QueryKey::Flying, "true").unwrap();
        assert_eq!(flying.id(), "query+flying/true");
        assert_eq!(flying.answer, Answer::Flag(true));
        assert_eq!(
            ConstantAnswer::parse(QueryKey::Speed, "-3").unwrap().answer,
            Answer::Int(-3)
        );
        assert!(ConstantAnswer::parse(QueryKey::Speed, "fast").is_none());
    }
}
