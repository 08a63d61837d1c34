//! Starter kernel pack: character introductions, emotions, everyday actions
//! and a few story patterns, with the templates they draw on.
//!
//! Callers usually start from [`starter_registry`] and [`starter_templates`]
//! and merge their own packs on top.

pub mod actions;
pub mod emotions;
pub mod patterns;

use crate::core::phrase;
use crate::core::registry::{Invocation, KernelArgs, KernelError, KernelRegistry};
use crate::core::template::{Slots, TemplateError, TemplateTable};
use crate::schema::character::CharacterId;
use crate::schema::fragment::Fragment;
use crate::schema::value::Value;

/// (category, weight, template)
const STARTER_TEMPLATES: &[(&str, u32, &str)] = &[
    ("intro_first", 2, "Once upon a time, there was {article} {adj} {type} named {name}."),
    ("intro_first", 1, "There once was {article} {adj} {type} named {name}."),
    ("intro", 1, "There was also {article} {type} named {name}."),
    ("intro", 1, "{name} was {article} {adj} {type}."),
    ("intro", 1, "{name}, {article} {adj} {type}, lived nearby."),
    ("joy", 1, "{name} felt very happy."),
    ("joy", 1, "{name} was filled with joy."),
    ("joy", 1, "{name} smiled happily."),
    ("sad", 1, "{name} felt sad."),
    ("sad", 1, "{name} was unhappy."),
    ("fear", 2, "{name} was scared."),
    ("fear", 1, "{name} felt afraid."),
    ("play", 1, "{name} played happily."),
    ("play", 1, "{name} had fun playing."),
    ("find", 2, "{name} found {article} {object}."),
    ("find", 1, "One day, {name} found {article} {object}."),
    ("journey", 1, "{name} went on a journey."),
    ("journey", 1, "{name}'s life was about to change."),
    ("cautionary", 1, "This is a story about being careful."),
    ("friendship", 2, "{name} and {other} became good friends."),
    ("friendship", 1, "{name} and {other} were best friends."),
];

/// Every starter kernel, plus the `Character` introduction handler.
pub fn starter_registry() -> KernelRegistry {
    let mut registry = KernelRegistry::new();
    registry.register("Character", introduce);
    emotions::register(&mut registry);
    actions::register(&mut registry);
    patterns::register(&mut registry);
    registry
}

/// The templates the starter kernels use.
pub fn starter_templates() -> Result<TemplateTable, TemplateError> {
    let mut table = TemplateTable::new();
    for (category, weight, text) in STARTER_TEMPLATES {
        table.register_weighted(category, [(*weight, *text)])?;
    }
    Ok(table)
}

/// Introduce a freshly declared character. The first character of a story
/// gets the "once upon a time" treatment.
fn introduce(inv: &mut Invocation<'_, '_>, args: &KernelArgs) -> Result<Fragment, KernelError> {
    let id = args
        .first_character()
        .ok_or_else(|| shape("Character introduces a declared character"))?;
    let (name, kind, adj) = match inv.character(id) {
        Some(c) => {
            let adj = phrase::join_list(&c.traits[..c.traits.len().min(2)], "and");
            (c.name.clone(), c.kind_or_default().to_string(), adj)
        }
        None => return Err(shape("unknown character")),
    };
    let category = if id == CharacterId(0) { "intro_first" } else { "intro" };
    let slots = Slots::new()
        .with("name", name)
        .with("type", kind)
        .with("adj", adj);
    let text = inv.template(category, &slots)?;
    Ok(inv.fragment(text))
}

pub(crate) fn shape(message: &str) -> KernelError {
    KernelError::InvalidArgumentShape(message.to_string())
}

/// Characters a kernel acts on: the character arguments, or the current
/// focus when there are none and the call stands on its own.
pub(crate) fn affected(inv: &Invocation<'_, '_>, args: &KernelArgs) -> Vec<CharacterId> {
    let characters = args.characters();
    if !characters.is_empty() || inv.is_nested() {
        return characters;
    }
    inv.focus().into_iter().collect()
}

pub(crate) fn name(inv: &Invocation<'_, '_>, id: CharacterId) -> String {
    inv.phrase(&Value::Character(id))
}

/// Phrases of the positional arguments that are not characters.
pub(crate) fn objects(inv: &Invocation<'_, '_>, args: &KernelArgs) -> Vec<String> {
    args.positional
        .iter()
        .filter(|v| v.as_character().is_none())
        .map(|v| inv.phrase(v))
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::generate;

    #[test]
    fn starter_pack_is_complete() {
        let registry = starter_registry();
        for name in [
            "Character", "Joy", "Fear", "Sadness", "Happy", "Brave", "Love", "Play", "Find",
            "Run", "Help", "Give", "Cry", "Journey", "Cautionary", "Friendship", "Routine",
        ] {
            assert!(registry.contains(name), "missing kernel {}", name);
        }
        let templates = starter_templates().unwrap();
        assert!(templates.contains("intro_first"));
        assert_eq!(templates.alternatives("intro").len(), 3);
    }

    #[test]
    fn first_character_gets_once_upon_a_time() {
        let registry = starter_registry();
        let templates = starter_templates().unwrap();
        let story = generate("Lily(Character, girl, curious)", &registry, &templates, 3).unwrap();
        assert!(story.text.contains("girl named Lily"), "{}", story.text);
        assert!(story.diagnostics.is_empty());
    }

    #[test]
    fn later_characters_use_plain_intro() {
        let registry = starter_registry();
        let templates = starter_templates().unwrap();
        let story = generate(
            "Lily(Character, girl)\nMax(Character, dog, Loyal)",
            &registry,
            &templates,
            5,
        )
        .unwrap();
        assert_eq!(story.fragments.len(), 2);
        assert!(story.fragments[1].text.contains("Max"));
        assert!(!story.fragments[1].text.starts_with("Once"));
    }
}
