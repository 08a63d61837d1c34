/// Template engine: named categories of interchangeable surface strings
/// with `{slot}` substitution and seeded, weighted selection.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use thiserror::Error;

use crate::core::phrase;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    #[error("template parse error: {0}")]
    Parse(String),
    #[error("template category '{0}' has an alternative with zero weight")]
    ZeroWeight(String),
    #[error("template category '{0}' has weights adding up to more than {max}", max = u32::MAX)]
    WeightOverflow(String),
    #[error("template '{category}' needs slot '{slot}' but it was not provided")]
    MissingSlot { category: String, slot: String },
}

/// A segment of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSegment {
    /// Literal text, emitted as-is.
    Literal(String),
    /// Named slot: `{name}`.
    Slot(String),
}

/// A parsed template: a sequence of segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub segments: Vec<TemplateSegment>,
}

impl Template {
    /// Parse a template string into a sequence of segments.
    ///
    /// Syntax:
    /// - `{slot_name}` → `Slot`
    /// - `{{` / `}}` → literal `{` / `}`
    /// - Everything else → `Literal`
    pub fn parse(input: &str) -> Result<Template, TemplateError> {
        let mut segments = Vec::new();
        let mut literal_buf = String::new();
        let chars: Vec<char> = input.chars().collect();
        let len = chars.len();
        let mut i = 0;

        while i < len {
            if chars[i] == '{' {
                // Escaped brace
                if i + 1 < len && chars[i + 1] == '{' {
                    literal_buf.push('{');
                    i += 2;
                    continue;
                }

                if !literal_buf.is_empty() {
                    segments.push(TemplateSegment::Literal(std::mem::take(&mut literal_buf)));
                }

                let start = i + 1;
                let mut end = start;
                while end < len && chars[end] != '}' {
                    if chars[end] == '{' {
                        return Err(TemplateError::Parse(
                            "nested braces are not allowed".to_string(),
                        ));
                    }
                    end += 1;
                }
                if end >= len {
                    return Err(TemplateError::Parse("unclosed brace".to_string()));
                }

                let content: String = chars[start..end].iter().collect();
                let content = content.trim();
                if content.is_empty() {
                    return Err(TemplateError::Parse("empty braces".to_string()));
                }
                if !content.chars().all(|c| c.is_alphanumeric() || c == '_') {
                    return Err(TemplateError::Parse(format!(
                        "invalid slot name '{}'",
                        content
                    )));
                }

                segments.push(TemplateSegment::Slot(content.to_string()));
                i = end + 1;
            } else if chars[i] == '}' {
                if i + 1 < len && chars[i + 1] == '}' {
                    literal_buf.push('}');
                    i += 2;
                    continue;
                }
                return Err(TemplateError::Parse(
                    "unmatched closing brace".to_string(),
                ));
            } else {
                literal_buf.push(chars[i]);
                i += 1;
            }
        }

        if !literal_buf.is_empty() {
            segments.push(TemplateSegment::Literal(literal_buf));
        }

        Ok(Template { segments })
    }

    /// Names of all slots, in order of appearance.
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            TemplateSegment::Slot(name) => Some(name.as_str()),
            TemplateSegment::Literal(_) => None,
        })
    }

    /// Substitute slot values. A missing `{article}` is derived from the
    /// first non-empty slot value that follows it.
    pub fn fill(&self, category: &str, slots: &Slots) -> Result<String, TemplateError> {
        let mut out = String::new();
        for (idx, segment) in self.segments.iter().enumerate() {
            match segment {
                TemplateSegment::Literal(text) => out.push_str(text),
                TemplateSegment::Slot(name) => {
                    if let Some(value) = slots.get(name) {
                        out.push_str(value);
                    } else if name == "article" {
                        let next = self.segments[idx + 1..].iter().find_map(|s| match s {
                            TemplateSegment::Slot(next) => {
                                slots.get(next).filter(|v| !v.trim().is_empty())
                            }
                            TemplateSegment::Literal(_) => None,
                        });
                        out.push_str(phrase::article(next.unwrap_or("")));
                    } else {
                        return Err(TemplateError::MissingSlot {
                            category: category.to_string(),
                            slot: name.clone(),
                        });
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Named values substituted into template slots.
#[derive(Debug, Clone, Default)]
pub struct Slots {
    values: FxHashMap<String, String>,
}

impl Slots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl ToString) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// A weighted template alternative within a category.
#[derive(Debug, Clone)]
pub struct Alternative {
    pub weight: u32,
    pub template: Template,
}

/// The phrase returned for a category nobody registered.
pub fn default_phrase(category: &str) -> String {
    format!("there was {}", phrase::humanize(category))
}

/// Serialized shape of one alternative: `(weight: 2, text: "...")`, with
/// the weight optional.
#[derive(Debug, Deserialize)]
pub struct RawAlternative {
    #[serde(default = "default_weight")]
    pub weight: u32,
    pub text: String,
}

fn default_weight() -> u32 {
    1
}

/// Named categories of templates. Supplied by the caller and shared
/// read-only across evaluations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "FxHashMap<String, Vec<RawAlternative>>")]
pub struct TemplateTable {
    categories: FxHashMap<String, Vec<Alternative>>,
}

impl TryFrom<FxHashMap<String, Vec<RawAlternative>>> for TemplateTable {
    type Error = TemplateError;

    fn try_from(raw: FxHashMap<String, Vec<RawAlternative>>) -> Result<Self, Self::Error> {
        let mut table = TemplateTable::new();
        // sorted so that validation errors are reported deterministically
        let mut entries: Vec<_> = raw.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (category, alternatives) in entries {
            let weighted: Vec<(u32, String)> =
                alternatives.into_iter().map(|a| (a.weight, a.text)).collect();
            table.register_weighted(&category, weighted)?;
        }
        Ok(table)
    }
}

impl TemplateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add equally weighted templates to a category.
    pub fn register_templates<I, S>(&mut self, category: &str, templates: I) -> Result<(), TemplateError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.register_weighted(category, templates.into_iter().map(|t| (1, t)))
    }

    /// Add templates with explicit selection weights to a category.
    pub fn register_weighted<I, S>(&mut self, category: &str, templates: I) -> Result<(), TemplateError>
    where
        I: IntoIterator<Item = (u32, S)>,
        S: AsRef<str>,
    {
        // selection sums the weights of a category in u32
        let mut total = self
            .alternatives(category)
            .iter()
            .try_fold(0u32, |sum, a| sum.checked_add(a.weight))
            .ok_or_else(|| TemplateError::WeightOverflow(category.to_string()))?;
        let mut parsed = Vec::new();
        for (weight, text) in templates {
            if weight == 0 {
                return Err(TemplateError::ZeroWeight(category.to_string()));
            }
            total = total
                .checked_add(weight)
                .ok_or_else(|| TemplateError::WeightOverflow(category.to_string()))?;
            parsed.push(Alternative {
                weight,
                template: Template::parse(text.as_ref())?,
            });
        }
        self.categories
            .entry(category.to_string())
            .or_default()
            .extend(parsed);
        Ok(())
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories
            .get(category)
            .is_some_and(|alts| !alts.is_empty())
    }

    pub fn alternatives(&self, category: &str) -> &[Alternative] {
        self.categories.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Registered category names, sorted.
    pub fn categories(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.categories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Merge another table into this one. Categories from `other` replace
    /// categories of the same name.
    pub fn merge(&mut self, other: TemplateTable) {
        for (name, alternatives) in other.categories {
            self.categories.insert(name, alternatives);
        }
    }

    /// Pick one template of `category` with `rng` and fill its slots.
    ///
    /// An unregistered category yields [`default_phrase`] instead of an
    /// error so that generation stays total.
    pub fn generate(
        &self,
        category: &str,
        slots: &Slots,
        rng: &mut StdRng,
    ) -> Result<String, TemplateError> {
        let alternatives = self.alternatives(category);
        if alternatives.is_empty() {
            tracing::debug!(category, "template category not registered, using default phrase");
            return Ok(default_phrase(category));
        }

        let weights: Vec<u32> = alternatives.iter().map(|a| a.weight).collect();
        let index = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            Err(err) => {
                tracing::warn!(category, %err, "template weights rejected, using the first alternative");
                0
            }
        };
        tracing::debug!(category, index, "template selected");
        alternatives[index].template.fill(category, slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn parse_literal_only() {
        let t = Template::parse("Hello, world.").unwrap();
        assert_eq!(
            t.segments,
            vec![TemplateSegment::Literal("Hello, world.".to_string())]
        );
    }

    #[test]
    fn parse_slots() {
        let t = Template::parse("{name} found {article} {object}.").unwrap();
        assert_eq!(t.slots().collect::<Vec<_>>(), vec!["name", "article", "object"]);
        assert_eq!(t.segments.len(), 6);
    }

    #[test]
    fn parse_escaped_braces() {
        let t = Template::parse("Use {{braces}} here.").unwrap();
        assert_eq!(
            t.segments,
            vec![TemplateSegment::Literal("Use {braces} here.".to_string())]
        );
    }

    #[test]
    fn parse_errors() {
        assert!(Template::parse("Bad {} here").is_err());
        assert!(Template::parse("Bad {outer{inner}} here").is_err());
        assert!(Template::parse("Bad {unclosed here").is_err());
        assert!(Template::parse("Bad } here").is_err());
        assert!(Template::parse("Bad {two words}").is_err());
    }

    #[test]
    fn fill_substitutes_slots() {
        let t = Template::parse("{name} was scared.").unwrap();
        let out = t.fill("fear", &Slots::new().with("name", "Tim")).unwrap();
        assert_eq!(out, "Tim was scared.");
    }

    #[test]
    fn fill_derives_article() {
        let t = Template::parse("{name} saw {article} {object}.").unwrap();
        let slots = Slots::new().with("name", "Tim").with("object", "owl");
        assert_eq!(t.fill("see", &slots).unwrap(), "Tim saw an owl.");

        let t = Template::parse("{article} {adj} {type}").unwrap();
        let slots = Slots::new().with("adj", "").with("type", "owl");
        assert_eq!(t.fill("intro", &slots).unwrap(), "an  owl");
    }

    #[test]
    fn fill_missing_slot_is_error() {
        let t = Template::parse("{name} met {other}.").unwrap();
        let err = t.fill("meet", &Slots::new().with("name", "Tim")).unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingSlot {
                category: "meet".to_string(),
                slot: "other".to_string()
            }
        );
    }

    #[test]
    fn missing_category_returns_default_phrase() {
        let table = TemplateTable::new();
        let mut rng = StdRng::seed_from_u64(1);
        let out = table.generate("happy_end", &Slots::new(), &mut rng).unwrap();
        assert_eq!(out, "there was happy end");
        assert!(!table.contains("happy_end"));
    }

    #[test]
    fn generate_is_deterministic_per_seed() {
        let mut table = TemplateTable::new();
        table
            .register_templates("joy", ["{name} smiled.", "{name} laughed.", "{name} beamed."])
            .unwrap();
        let slots = Slots::new().with("name", "Ann");
        let pick = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            table.generate("joy", &slots, &mut rng).unwrap()
        };
        assert_eq!(pick(7), pick(7));
        let distinct: std::collections::HashSet<String> = (0..50).map(pick).collect();
        assert!(distinct.len() > 1, "expected variation across seeds");
    }

    #[test]
    fn weighted_selection_prefers_heavier_alternative() {
        let mut table = TemplateTable::new();
        table
            .register_weighted("greet", [(9, "hello"), (1, "hi")])
            .unwrap();
        let mut hello = 0;
        for seed in 0..1000 {
            let mut rng = StdRng::seed_from_u64(seed);
            if table.generate("greet", &Slots::new(), &mut rng).unwrap() == "hello" {
                hello += 1;
            }
        }
        assert!(hello > 800, "expected ~90% 'hello', got {}/1000", hello);
    }

    #[test]
    fn zero_weight_rejected() {
        let mut table = TemplateTable::new();
        assert_eq!(
            table.register_weighted("x", [(0, "never")]),
            Err(TemplateError::ZeroWeight("x".to_string()))
        );
    }

    #[test]
    fn weights_overflowing_u32_rejected() {
        let mut table = TemplateTable::new();
        assert_eq!(
            table.register_weighted("x", [(u32::MAX, "huge"), (2, "small")]),
            Err(TemplateError::WeightOverflow("x".to_string()))
        );
        assert!(!table.contains("x"));

        table.register_weighted("y", [(u32::MAX - 1, "huge")]).unwrap();
        assert_eq!(
            table.register_weighted("y", [(2, "small")]),
            Err(TemplateError::WeightOverflow("y".to_string()))
        );
        assert_eq!(table.alternatives("y").len(), 1);

        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(table.generate("y", &Slots::new(), &mut rng).unwrap(), "huge");
    }

    #[test]
    fn merge_precedence() {
        let mut base = TemplateTable::new();
        base.register_templates("shared", ["base version"]).unwrap();
        base.register_templates("base_only", ["only in base"]).unwrap();

        let mut overrides = TemplateTable::new();
        overrides.register_templates("shared", ["override version"]).unwrap();

        base.merge(overrides);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            base.generate("shared", &Slots::new(), &mut rng).unwrap(),
            "override version"
        );
        assert_eq!(base.categories(), vec!["base_only", "shared"]);
    }

    #[test]
    fn load_table_from_ron() {
        let input = r#"{
            "intro": [
                (weight: 3, text: "Once upon a time, there was {article} {kind} named {name}."),
                (text: "{name} was {article} {kind}."),
            ],
            "fear": [(text: "{name} was scared.")],
        }"#;
        let table: TemplateTable = ron::from_str(input).unwrap();
        assert_eq!(table.alternatives("intro").len(), 2);
        assert_eq!(table.alternatives("intro")[0].weight, 3);
        assert_eq!(table.alternatives("intro")[1].weight, 1);
        assert!(table.contains("fear"));
    }

    #[test]
    fn ron_with_bad_template_is_rejected() {
        let input = r#"{ "broken": [(text: "oops {")] }"#;
        assert!(ron::from_str::<TemplateTable>(input).is_err());
    }
}
