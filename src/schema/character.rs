use serde::{Deserialize, Serialize};

/// Handle to a character declared during one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterId(pub usize);

/// Pronoun set for a character, used by kernels and templates to refer
/// back to someone already introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pronouns {
    /// she/her/her/hers/herself
    SheHer,
    /// he/him/his/his/himself
    HeHim,
    /// they/them/their/theirs/themselves
    TheyThem,
    /// it/its/its/its/itself
    ItIts,
}

impl Default for Pronouns {
    fn default() -> Self {
        Self::TheyThem
    }
}

impl Pronouns {
    /// Nominative/subject form: "she", "he", "they", "it".
    pub fn subject(&self) -> &'static str {
        match self {
            Self::SheHer => "she",
            Self::HeHim => "he",
            Self::TheyThem => "they",
            Self::ItIts => "it",
        }
    }

    /// Accusative/object form: "her", "him", "them", "it".
    pub fn object(&self) -> &'static str {
        match self {
            Self::SheHer => "her",
            Self::HeHim => "him",
            Self::TheyThem => "them",
            Self::ItIts => "it",
        }
    }

    /// Possessive determiner: "her", "his", "their", "its".
    pub fn possessive(&self) -> &'static str {
        match self {
            Self::SheHer => "her",
            Self::HeHim => "his",
            Self::TheyThem => "their",
            Self::ItIts => "its",
        }
    }

    /// Reflexive: "herself", "himself", "themselves", "itself".
    pub fn reflexive(&self) -> &'static str {
        match self {
            Self::SheHer => "herself",
            Self::HeHim => "himself",
            Self::TheyThem => "themselves",
            Self::ItIts => "itself",
        }
    }

    /// Infer pronouns from a character kind such as "girl" or "king".
    pub fn for_kind(kind: &str) -> Self {
        match kind {
            "girl" | "woman" | "queen" | "princess" | "mother" | "mom" | "mommy" | "grandma"
            | "sister" | "lady" => Self::SheHer,
            "boy" | "man" | "king" | "prince" | "father" | "dad" | "daddy" | "grandpa"
            | "brother" | "farmer" => Self::HeHim,
            _ => Self::TheyThem,
        }
    }
}

/// Nouns that name what a character is rather than how it behaves. When the
/// first declared trait is one of these it becomes the character's kind.
pub const KNOWN_KINDS: &[&str] = &[
    "girl", "boy", "man", "woman", "dog", "cat", "bird", "fish", "rabbit", "bunny", "bear",
    "lion", "mouse", "frog", "duck", "mother", "father", "mom", "dad", "mommy", "daddy",
    "grandma", "grandpa", "friend", "teacher", "farmer", "king", "queen", "princess", "prince",
    "sister", "brother", "lady", "whale", "shark", "owl", "fox", "wolf", "horse", "pig",
];

/// The five emotional scalars every character carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Emotion {
    Joy,
    Fear,
    Love,
    Anger,
    Sadness,
}

/// How emotional scalars are bounded after an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ClampPolicy {
    /// Scalars may grow or shrink without limit.
    Unbounded,
    /// Scalars are clamped into `[min, max]` after every adjustment.
    Range { min: f64, max: f64 },
}

impl Default for ClampPolicy {
    fn default() -> Self {
        Self::Unbounded
    }
}

impl ClampPolicy {
    /// The natural `[0, 100]` range.
    pub fn percent() -> Self {
        Self::Range {
            min: 0.0,
            max: 100.0,
        }
    }

    pub fn apply(&self, value: f64) -> f64 {
        match *self {
            Self::Unbounded => value,
            Self::Range { min, max } => value.max(min).min(max),
        }
    }
}

/// Emotional state of a character.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Emotions {
    pub joy: f64,
    pub fear: f64,
    pub love: f64,
    pub anger: f64,
    pub sadness: f64,
}

impl Default for Emotions {
    fn default() -> Self {
        Self {
            joy: 50.0,
            fear: 0.0,
            love: 50.0,
            anger: 0.0,
            sadness: 0.0,
        }
    }
}

impl Emotions {
    pub fn get(&self, emotion: Emotion) -> f64 {
        match emotion {
            Emotion::Joy => self.joy,
            Emotion::Fear => self.fear,
            Emotion::Love => self.love,
            Emotion::Anger => self.anger,
            Emotion::Sadness => self.sadness,
        }
    }

    /// Add `delta` to one scalar and bound the result with `policy`.
    pub fn adjust(&mut self, emotion: Emotion, delta: f64, policy: ClampPolicy) {
        let slot = match emotion {
            Emotion::Joy => &mut self.joy,
            Emotion::Fear => &mut self.fear,
            Emotion::Love => &mut self.love,
            Emotion::Anger => &mut self.anger,
            Emotion::Sadness => &mut self.sadness,
        };
        *slot = policy.apply(*slot + delta);
    }
}

/// A story character declared with `Name(Character, traits...)`.
///
/// Characters live for a single evaluation; kernels read them through an
/// `Invocation` and change them only by recording effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub kind: Option<String>,
    pub traits: Vec<String>,
    pub emotions: Emotions,
    pub pronouns: Pronouns,
}

impl Character {
    /// Build a character from its declared trait words. A leading kind noun
    /// is split off and used to infer pronouns.
    pub fn declare(id: CharacterId, name: &str, mut traits: Vec<String>) -> Self {
        let kind = match traits.first() {
            Some(first) if KNOWN_KINDS.contains(&first.as_str()) => Some(traits.remove(0)),
            _ => None,
        };
        let mut unique: Vec<String> = Vec::with_capacity(traits.len());
        for t in traits {
            if !t.is_empty() && !unique.contains(&t) {
                unique.push(t);
            }
        }
        let pronouns = kind
            .as_deref()
            .map(Pronouns::for_kind)
            .unwrap_or_default();
        Self {
            id,
            name: name.to_string(),
            kind,
            traits: unique,
            emotions: Emotions::default(),
            pronouns,
        }
    }

    /// Returns true if this character was declared with the given trait.
    pub fn has_trait(&self, word: &str) -> bool {
        self.traits.iter().any(|t| t == word)
    }

    /// The kind noun, or "character" when none was declared.
    pub fn kind_or_default(&self) -> &str {
        self.kind.as_deref().unwrap_or("character")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn declare_splits_kind() {
        let c = Character::declare(CharacterId(0), "Lily", words(&["girl", "curious", "hopeful"]));
        assert_eq!(c.kind.as_deref(), Some("girl"));
        assert_eq!(c.traits, words(&["curious", "hopeful"]));
        assert_eq!(c.pronouns, Pronouns::SheHer);
    }

    #[test]
    fn declare_without_kind() {
        let c = Character::declare(CharacterId(1), "Tim", words(&["brave", "brave", "kind"]));
        assert!(c.kind.is_none());
        assert_eq!(c.traits, words(&["brave", "kind"]));
        assert_eq!(c.pronouns, Pronouns::TheyThem);
        assert_eq!(c.kind_or_default(), "character");
        assert!(c.has_trait("kind"));
        assert!(!c.has_trait("shy"));
    }

    #[test]
    fn pronoun_forms() {
        assert_eq!(Pronouns::HeHim.subject(), "he");
        assert_eq!(Pronouns::HeHim.possessive(), "his");
        assert_eq!(Pronouns::SheHer.object(), "her");
        assert_eq!(Pronouns::TheyThem.reflexive(), "themselves");
        assert_eq!(Pronouns::for_kind("king"), Pronouns::HeHim);
        assert_eq!(Pronouns::for_kind("dog"), Pronouns::TheyThem);
    }

    #[test]
    fn unbounded_adjust_exceeds_range() {
        let mut e = Emotions::default();
        e.adjust(Emotion::Joy, 80.0, ClampPolicy::Unbounded);
        assert_eq!(e.get(Emotion::Joy), 130.0);
        e.adjust(Emotion::Fear, -5.0, ClampPolicy::Unbounded);
        assert_eq!(e.get(Emotion::Fear), -5.0);
    }

    #[test]
    fn percent_clamp_bounds_scalars() {
        let mut e = Emotions::default();
        e.adjust(Emotion::Joy, 80.0, ClampPolicy::percent());
        assert_eq!(e.get(Emotion::Joy), 100.0);
        e.adjust(Emotion::Sadness, -10.0, ClampPolicy::percent());
        assert_eq!(e.get(Emotion::Sadness), 0.0);
        e.adjust(Emotion::Love, 10.0, ClampPolicy::percent());
        assert_eq!(e.get(Emotion::Love), 60.0);
    }
}
