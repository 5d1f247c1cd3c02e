//! Dice and dice formulas.
//!
//! A [`DiceFormula`] is a sum of [`Dice`] terms, each `count`d`sides` plus a
//! flat amount. Formulas parse from and print to the familiar `2d6+3` notation.
use std::fmt;
use std::str::FromStr;

use crate::primitives::GameRng;

/// `count` dice with `sides` faces plus `flat`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dice {
    pub count: i32,
    pub sides: i32,
    pub flat: i32,
}

impl Dice {
    pub const fn new(count: i32, sides: i32, flat: i32) -> Self {
        Self { count, sides, flat }
    }

    /// One die.
    pub const fn d(sides: i32) -> Self {
        Self::new(1, sides, 0)
    }

    /// `count`d`sides`.
    pub const fn nd(count: i32, sides: i32) -> Self {
        Self::new(count, sides, 0)
    }

    pub const fn flat(value: i32) -> Self {
        Self::new(0, 0, value)
    }

    pub fn roll(&self, rng: &mut GameRng) -> i32 {
        self.roll_with_extra(rng, 0)
    }

    pub fn roll_with_extra(&self, rng: &mut GameRng, extra: i32) -> i32 {
        (0..self.count + extra.max(0)).fold(self.flat, |sum, _| sum + rng.rn1(self.sides, 1))
    }

    pub fn average(&self) -> f64 {
        f64::from(self.count) * f64::from(self.sides + 1) / 2.0 + f64::from(self.flat)
    }

    pub const fn plus(self, bonus: i32) -> Self {
        Self::new(self.count, self.sides, self.flat + bonus)
    }
}

impl fmt::Display for Dice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 || self.sides == 0 {
            return write!(f, "{}", self.flat);
        }
        if self.count == 1 {
            write!(f, "d{}", self.sides)?;
        } else {
            write!(f, "{}d{}", self.count, self.sides)?;
        }
        match self.flat {
            0 => Ok(()),
            n if n > 0 => write!(f, "+{n}"),
            n => write!(f, "{n}"),
        }
    }
}

/// Sum of dice terms. Serializes as its notation, e.g. `"2d6+3"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct DiceFormula(pub Vec<Dice>);

impl DiceFormula {
    const DIE_STEPS: [i32; 5] = [4, 6, 8, 10, 12];

    pub fn flat(value: i32) -> Self {
        Self(vec![Dice::flat(value)])
    }

    pub fn terms(&self) -> &[Dice] {
        &self.0
    }

    pub fn roll(&self, rng: &mut GameRng) -> i32 {
        self.roll_with_extra(rng, 0)
    }

    /// Extra dice are added to the first term.
    pub fn roll_with_extra(&self, rng: &mut GameRng, extra: i32) -> i32 {
        self.0
            .iter()
            .enumerate()
            .map(|(i, d)| d.roll_with_extra(rng, if i == 0 { extra } else { 0 }))
            .sum()
    }

    pub fn average(&self) -> f64 {
        self.0.iter().map(Dice::average).sum()
    }

    /// `d4 -> d6 -> d8 -> d10 -> d12 -> 2d6` for a single one-die term; anything else is unchanged.
    pub fn step_up(&self) -> DiceFormula {
        let [die] = self.0.as_slice() else {
            return self.clone();
        };
        if die.count != 1 {
            return self.clone();
        }
        match Self::DIE_STEPS.iter().position(|&s| s == die.sides) {
            Some(idx) if idx + 1 < Self::DIE_STEPS.len() => {
                DiceFormula(vec![Dice::new(1, Self::DIE_STEPS[idx + 1], die.flat)])
            }
            Some(_) => DiceFormula(vec![Dice::new(2, 6, die.flat)]),
            None => self.clone(),
        }
    }
}

impl From<Dice> for DiceFormula {
    fn from(d: Dice) -> Self {
        Self(vec![d])
    }
}

impl From<i32> for DiceFormula {
    fn from(flat: i32) -> Self {
        Self::flat(flat)
    }
}

impl fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "0");
        }
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "+")?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

/// Malformed dice notation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DiceParseError {
    #[error("empty dice formula")]
    Empty,

    #[error("invalid number '{0}' in dice formula")]
    BadNumber(String),

    #[error("invalid dice term '{0}'")]
    BadTerm(String),
}

impl crate::error::GameError for DiceParseError {
    fn severity(&self) -> crate::error::ErrorSeverity {
        crate::error::ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Empty => "DICE_EMPTY",
            Self::BadNumber(_) => "DICE_BAD_NUMBER",
            Self::BadTerm(_) => "DICE_BAD_TERM",
        }
    }
}

fn parse_int(s: &str) -> Result<i32, DiceParseError> {
    s.parse::<i32>()
        .map_err(|_| DiceParseError::BadNumber(s.to_string()))
}

impl FromStr for DiceFormula {
    type Err = DiceParseError;

    /// Accepts `d6`, `2d6`, `2d6+3`, `d4-1`, `7`, and `+`-joined terms such as `d6+d4+2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DiceParseError::Empty);
        }

        let mut terms: Vec<Dice> = Vec::new();
        for chunk in s.split('+') {
            let chunk = chunk.trim();
            if chunk.is_empty() {
                return Err(DiceParseError::BadTerm(s.to_string()));
            }
            // "d4-1": trailing negative flat belongs to the die before it
            let (head, neg_flat) = match chunk.find('-') {
                Some(0) => (chunk, 0),
                Some(i) => (&chunk[..i], parse_int(&chunk[i..])?),
                None => (chunk, 0),
            };

            match head.split_once('d') {
                Some((count, sides)) => {
                    let count = if count.is_empty() { 1 } else { parse_int(count)? };
                    let sides = parse_int(sides)?;
                    if count < 0 || sides <= 0 {
                        return Err(DiceParseError::BadTerm(chunk.to_string()));
                    }
                    terms.push(Dice::new(count, sides, neg_flat));
                }
                None => {
                    let value = parse_int(head)? + neg_flat;
                    match terms.last_mut() {
                        Some(last) if last.count > 0 => last.flat += value,
                        _ => terms.push(Dice::flat(value)),
                    }
                }
            }
        }

        Ok(DiceFormula(terms))
    }
}

impl TryFrom<String> for DiceFormula {
    type Error = DiceParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DiceFormula> for String {
    fn from(formula: DiceFormula) -> Self {
        formula.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_agree() {
        for text in ["d6", "2d6+3", "d4-1", "7", "3d8+d4"] {
            let formula: DiceFormula = text.parse().unwrap();
            assert_eq!(formula.to_string(), text);
        }
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!("".parse::<DiceFormula>(), Err(DiceParseError::Empty));
        assert!("2dx".parse::<DiceFormula>().is_err());
        assert!("d0".parse::<DiceFormula>().is_err());
        assert!("2d6+".parse::<DiceFormula>().is_err());
    }

    #[test]
    fn roll_respects_bounds() {
        let mut rng = GameRng::new(5);
        let formula: DiceFormula = "2d6+3".parse().unwrap();
        for _ in 0..200 {
            let r = formula.roll(&mut rng);
            assert!((5..=15).contains(&r));
        }
        assert_eq!(DiceFormula::flat(20).roll(&mut rng), 20);
    }

    #[test]
    fn extra_dice_go_to_first_term() {
        let mut rng = GameRng::new(3);
        rng.push_script([5, 5, 5]);
        // three d6 all forced to 6
        assert_eq!(DiceFormula::from(Dice::d(6)).roll_with_extra(&mut rng, 2), 18);
    }

    #[test]
    fn average_matches_expectation() {
        let formula: DiceFormula = "2d6+1".parse().unwrap();
        assert!((formula.average() - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn step_up_walks_the_die_ladder() {
        let d4: DiceFormula = Dice::d(4).into();
        assert_eq!(d4.step_up().to_string(), "d6");
        let d12: DiceFormula = Dice::d(12).plus(1).into();
        assert_eq!(d12.step_up().to_string(), "2d6+1");
        let two_d6: DiceFormula = Dice::nd(2, 6).into();
        assert_eq!(two_d6.step_up(), two_d6);
    }
}
