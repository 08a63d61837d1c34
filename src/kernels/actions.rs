use crate::core::phrase;
use crate::core::registry::{Invocation, KernelArgs, KernelError, KernelRegistry};
use crate::core::template::Slots;
use crate::schema::character::Emotion;
use crate::schema::fragment::Fragment;

use super::{affected, name, objects};

pub fn register(registry: &mut KernelRegistry) {
    registry
        .register("Play", play)
        .register("Find", find)
        .register("Run", run)
        .register("Help", help)
        .register("Give", give)
        .register("Cry", cry);
}

fn play(inv: &mut Invocation<'_, '_>, args: &KernelArgs) -> Result<Fragment, KernelError> {
    let characters = affected(inv, args);
    let things = objects(inv, args);
    for &id in &characters {
        inv.adjust(id, Emotion::Joy, 10.0);
    }

    let text = match characters.as_slice() {
        [] if things.is_empty() => "playing".to_string(),
        [] => format!("playing with the {}", phrase::join_list(&things, "and")),
        [only] if !things.is_empty() => format!(
            "{} played with the {}.",
            name(inv, *only),
            phrase::join_list(&things, "and")
        ),
        [only] => {
            let slots = Slots::new().with("name", name(inv, *only));
            inv.template("play", &slots)?
        }
        many => {
            let names: Vec<String> = many.iter().map(|&id| name(inv, id)).collect();
            format!("{} played together and had fun.", phrase::join_list(&names, "and"))
        }
    };
    Ok(inv.fragment(text))
}

fn find(inv: &mut Invocation<'_, '_>, args: &KernelArgs) -> Result<Fragment, KernelError> {
    let finder = inv.subject(args);
    let thing = objects(inv, args)
        .into_iter()
        .next()
        .or_else(|| args.keyword("object").map(|v| inv.phrase(v)))
        .unwrap_or_else(|| "something".to_string());

    let Some(id) = finder else {
        return Ok(inv.fragment(format!("Someone found {}.", phrase::with_article(&thing))));
    };
    inv.adjust(id, Emotion::Joy, 5.0);
    inv.set_object(Some(thing.clone()));
    let slots = Slots::new().with("name", name(inv, id)).with("object", thing);
    let text = inv.template("find", &slots)?;
    Ok(inv.fragment(text))
}

fn run(inv: &mut Invocation<'_, '_>, args: &KernelArgs) -> Result<Fragment, KernelError> {
    if let Some(id) = args.first_character() {
        inv.adjust(id, Emotion::Fear, 5.0);
        let pronoun = inv
            .character(id)
            .map(|c| c.pronouns.subject())
            .unwrap_or("they");
        let text = format!("{} ran as fast as {} could.", name(inv, id), pronoun);
        return Ok(inv.fragment(text));
    }
    let text = match args.concepts().first() {
        Some(runner) => format!("The {} ran away.", runner),
        None => "They ran quickly.".to_string(),
    };
    Ok(inv.fragment(text))
}

fn help(inv: &mut Invocation<'_, '_>, args: &KernelArgs) -> Result<Fragment, KernelError> {
    let text = match args.characters().as_slice() {
        [helper, helped, ..] => {
            inv.adjust(*helper, Emotion::Love, 10.0);
            inv.adjust(*helped, Emotion::Love, 5.0);
            inv.adjust(*helped, Emotion::Joy, 5.0);
            format!("{} helped {}.", name(inv, *helper), name(inv, *helped))
        }
        [helper] => format!("{} helped out.", name(inv, *helper)),
        [] => "Someone helped.".to_string(),
    };
    Ok(inv.fragment(text))
}

fn give(inv: &mut Invocation<'_, '_>, args: &KernelArgs) -> Result<Fragment, KernelError> {
    let gift = objects(inv, args).into_iter().next();
    let text = match (args.characters().as_slice(), gift) {
        ([giver, receiver, ..], gift) => {
            let gift = gift.unwrap_or_else(|| "gift".to_string());
            inv.adjust(*giver, Emotion::Love, 5.0);
            inv.adjust(*receiver, Emotion::Joy, 10.0);
            inv.set_object(Some(gift.clone()));
            format!(
                "{} gave {} {}.",
                name(inv, *giver),
                name(inv, *receiver),
                phrase::with_article(&gift)
            )
        }
        ([giver], Some(gift)) => format!("{} gave away the {}.", name(inv, *giver), gift),
        _ => "A gift was given.".to_string(),
    };
    Ok(inv.fragment(text))
}

fn cry(inv: &mut Invocation<'_, '_>, args: &KernelArgs) -> Result<Fragment, KernelError> {
    let Some(id) = args.first_character() else {
        let text = if inv.is_nested() {
            "cried"
        } else {
            "Someone started to cry."
        };
        return Ok(inv.fragment(text));
    };
    inv.adjust(id, Emotion::Sadness, 15.0);
    inv.adjust(id, Emotion::Joy, -10.0);
    Ok(inv.fragment(format!("{} started to cry.", name(inv, id))))
}

#[cfg(test)]
mod tests {
    use crate::core::pipeline::{generate, Story};
    use crate::kernels::{starter_registry, starter_templates};

    fn run(source: &str) -> Story {
        generate(source, &starter_registry(), &starter_templates().unwrap(), 5).unwrap()
    }

    fn last(story: &Story) -> &str {
        story.fragments.last().map(|f| f.text.as_str()).unwrap_or("")
    }

    #[test]
    fn play_variants() {
        let story = run("Ann(Character, girl)\nMax(Character, dog)\nPlay(Ann, Max)");
        assert_eq!(last(&story), "Ann and Max played together and had fun.");
        assert_eq!(story.character("Max").unwrap().emotions.joy, 60.0);

        let story = run("Ann(Character, girl)\nPlay(Ann, ball, kite)");
        assert_eq!(last(&story), "Ann played with the ball and kite.");

        let story = run("Day(Play(ball))");
        assert_eq!(story.text, "There was day: playing with the ball.");
    }

    #[test]
    fn find_sets_the_object() {
        let story = run("Ann(Character, girl)\nFind(Ann, owl)");
        assert!(last(&story).contains("found an owl."), "{}", last(&story));
        assert!(story
            .effects
            .contains(&crate::core::context::Effect::Object(Some("owl".into()))));
    }

    #[test]
    fn run_uses_pronouns() {
        let story = run("Ann(Character, girl)\nRun(Ann)\nRun(wolf)");
        assert!(story.text.contains("Ann ran as fast as she could."));
        assert!(story.text.ends_with("The wolf ran away."));
    }

    #[test]
    fn help_and_give() {
        let story = run("Ann(Character, girl)\nBo(Character, boy)\nHelp(Ann, Bo)\nGive(Bo, Ann, apple)");
        assert!(story.text.contains("Ann helped Bo."));
        assert!(story.text.ends_with("Bo gave Ann an apple."));
        let ann = story.character("Ann").unwrap();
        assert_eq!(ann.emotions.love, 60.0);
        assert_eq!(ann.emotions.joy, 60.0);
    }

    #[test]
    fn cry_without_anyone() {
        assert_eq!(run("Cry()").text, "Someone started to cry.");
        assert_eq!(run("Rain(Cry())").text, "There was rain: cried.");
    }
}
