//! Forgiving name lookup for driver input.
//!
//! A query is compared against candidate names case-insensitively, with `_`
//! and spaces treated alike. Earlier rules win outright:
//! 1. exact match
//! 2. unique prefix
//! 3. unique substring
//!
//! Several exact matches, or several prefix/substring matches at the first
//! rule that matches anything, is [`Match::Ambiguous`].

/// Outcome of a lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Match<T> {
    Found(T),
    /// Names of the competing candidates, in candidate order.
    Ambiguous(Vec<String>),
    NotFound,
}

impl<T> Match<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase().replace('_', " ")
}

pub fn fuzzy_match<K, T, I>(query: &str, candidates: I) -> Match<T>
where
    K: AsRef<str>,
    I: IntoIterator<Item = (K, T)>,
{
    let needle = normalize(query);
    if needle.is_empty() {
        return Match::NotFound;
    }
    let candidates: Vec<(String, String, T)> = candidates
        .into_iter()
        .map(|(name, value)| {
            let name = name.as_ref().to_string();
            (normalize(&name), name, value)
        })
        .collect();

    let rules: [&dyn Fn(&str) -> bool; 3] = [
        &|hay: &str| hay == needle,
        &|hay: &str| hay.starts_with(&needle),
        &|hay: &str| hay.contains(&needle),
    ];
    for rule in rules {
        let hits: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, (hay, _, _))| rule(hay.as_str()))
            .map(|(i, _)| i)
            .collect();
        match hits.as_slice() {
            [] => continue,
            [only] => {
                let index = *only;
                return candidates
                    .into_iter()
                    .nth(index)
                    .map_or(Match::NotFound, |(_, _, value)| Match::Found(value));
            }
            many => {
                return Match::Ambiguous(many.iter().map(|&i| candidates[i].1.clone()).collect());
            }
        }
    }
    Match::NotFound
}

/// Narration for an ambiguous lookup.
pub fn which_line(names: &[String]) -> String {
    format!("Which do you mean: {}?", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPELLS: [&str; 4] = ["fireball", "fire_shield", "magic_missile", "cure_light_wounds"];

    fn spells() -> impl Iterator<Item = (&'static str, &'static str)> {
        SPELLS.into_iter().map(|s| (s, s))
    }

    #[test]
    fn exact_beats_prefix() {
        let names = [("fire", 1), ("fireball", 2)];
        assert_eq!(fuzzy_match("FIRE", names), Match::Found(1));
    }

    #[test]
    fn unique_prefix_and_substring() {
        assert_eq!(fuzzy_match("magic", spells()), Match::Found("magic_missile"));
        assert_eq!(fuzzy_match("light", spells()), Match::Found("cure_light_wounds"));
        assert_eq!(fuzzy_match("magic missile", spells()), Match::Found("magic_missile"));
    }

    #[test]
    fn shared_prefix_is_ambiguous() {
        match fuzzy_match("fire", spells()) {
            Match::Ambiguous(names) => {
                assert_eq!(names, ["fireball", "fire_shield"]);
                assert_eq!(which_line(&names), "Which do you mean: fireball, fire_shield?");
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn nothing_matches() {
        assert_eq!(fuzzy_match("wish", spells()), Match::NotFound);
        assert_eq!(fuzzy_match("  ", spells()), Match::NotFound);
    }
}
