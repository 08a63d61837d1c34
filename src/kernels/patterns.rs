//! Story patterns: whole arcs described by keyword arguments, such as
//! `Journey(Tim, state=Routine, catalyst=Storm(), insight=Brave())`.

use crate::core::phrase;
use crate::core::registry::{Invocation, KernelArgs, KernelError, KernelRegistry};
use crate::core::template::Slots;
use crate::schema::character::{CharacterId, Emotion};
use crate::schema::fragment::{join_sentence, Fragment};
use crate::schema::value::Value;

use super::{affected, name, objects, shape};

/// Concept words with a better reading as a state: "Tim was {state}."
const STATE_WORDS: &[(&str, &str)] = &[
    ("routine", "going about the day"),
    ("playful", "feeling playful"),
    ("joy", "joyful"),
    ("fear", "afraid"),
    ("longing", "longing for something"),
    ("play", "playing"),
    ("wonder", "wondering"),
];

/// Concept words with a better reading as an action: "Tim {action}."
const ACTION_WORDS: &[(&str, &str)] = &[
    ("find", "found something"),
    ("see", "saw something"),
    ("discover", "discovered something"),
    ("wait", "waited patiently"),
    ("joy", "felt joyful"),
    ("fear", "felt scared"),
];

pub fn register(registry: &mut KernelRegistry) {
    registry
        .register("Journey", journey)
        .register("Cautionary", cautionary)
        .register("Friendship", friendship)
        .register("Routine", routine);
}

fn lookup(table: &[(&str, &'static str)], word: &str) -> Option<&'static str> {
    table.iter().find(|(key, _)| *key == word).map(|(_, v)| *v)
}

/// A value as a state: the part after "was" of a generated sentence, or a
/// concept word.
fn state_phrase(inv: &Invocation<'_, '_>, value: &Value) -> String {
    match value {
        Value::Concept(word) => phrase::humanize(word)
            .split(" and ")
            .map(|part| lookup(STATE_WORDS, part).map_or_else(|| part.to_string(), str::to_string))
            .collect::<Vec<_>>()
            .join(" and "),
        Value::Fragment(_) | Value::Composition(_) => {
            let text = inv.phrase(value).to_lowercase();
            match text.rsplit_once(" was ") {
                Some((_, state)) => state.to_string(),
                None => without_leading_name(&text),
            }
        }
        other => inv.phrase(other),
    }
}

/// A value as something that happened.
fn event_phrase(inv: &Invocation<'_, '_>, value: &Value) -> String {
    match value {
        Value::Concept(word) => format!("something {} happened", phrase::humanize(word)),
        Value::Fragment(_) | Value::Composition(_) => {
            let text = inv.phrase(value);
            let text = text.strip_prefix("There was ").unwrap_or(&text);
            decapitalize(text)
        }
        other => inv.phrase(other),
    }
}

/// A value as a past-tense verb phrase with the subject dropped.
fn action_phrase(inv: &Invocation<'_, '_>, value: &Value) -> String {
    match value {
        Value::Concept(word) => {
            let words = phrase::humanize(word);
            if let Some(action) = lookup(ACTION_WORDS, &words) {
                return action.to_string();
            }
            let mut parts = words.split_whitespace();
            let mut action = parts.next().map(phrase::past_tense).unwrap_or_default();
            for rest in parts {
                action.push(' ');
                action.push_str(rest);
            }
            action
        }
        Value::Fragment(_) | Value::Composition(_) => without_leading_name(&inv.phrase(value)),
        other => inv.phrase(other),
    }
}

fn without_leading_name(text: &str) -> String {
    let mut words = text.split_whitespace();
    match words.next() {
        Some(first) if first.starts_with(char::is_uppercase) && text.split_whitespace().count() > 1 => {
            words.collect::<Vec<_>>().join(" ")
        }
        _ => text.to_string(),
    }
}

fn decapitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Collect the sentences of an arc into one fragment.
fn arc(inv: &Invocation<'_, '_>, sentences: &[String]) -> Fragment {
    let mut text = String::new();
    for sentence in sentences {
        join_sentence(&mut text, sentence);
    }
    inv.fragment(text)
}

/// The character an arc is about, or "someone".
fn hero(inv: &Invocation<'_, '_>, args: &KernelArgs) -> (Option<CharacterId>, String) {
    match inv.subject(args) {
        Some(id) => (Some(id), name(inv, id)),
        None => (None, "someone".to_string()),
    }
}

/// A character changed by experience: state, catalyst, process, insight,
/// transformation.
fn journey(inv: &mut Invocation<'_, '_>, args: &KernelArgs) -> Result<Fragment, KernelError> {
    let (id, who) = hero(inv, args);
    let mut sentences = Vec::new();

    if let Some(state) = args.keyword("state") {
        sentences.push(format!("{} was {}.", who, state_phrase(inv, state)));
    }
    for key in ["catalyst", "crisis"] {
        if let Some(event) = args.keyword(key) {
            sentences.push(format!("But then, {}!", event_phrase(inv, event)));
        }
    }
    if let Some(process) = args.keyword("process") {
        sentences.push(format!("{} {}.", who, action_phrase(inv, process)));
    }
    if args.keyword("insight").is_some() {
        if let Some(id) = id {
            inv.adjust(id, Emotion::Joy, 15.0);
        }
        sentences.push(format!("{} learned something important.", who));
    }
    if let Some(change) = args.keyword("transformation") {
        if let Some(id) = id {
            inv.adjust(id, Emotion::Joy, 10.0);
        }
        sentences.push(format!("After that, {} felt {}.", who, state_phrase(inv, change)));
    }

    if sentences.is_empty() {
        let text = inv.template("journey", &Slots::new().with("name", who))?;
        return Ok(inv.fragment(text));
    }
    Ok(arc(inv, &sentences))
}

/// A character learns from a mistake.
fn cautionary(inv: &mut Invocation<'_, '_>, args: &KernelArgs) -> Result<Fragment, KernelError> {
    let (id, who) = hero(inv, args);
    let mut sentences = Vec::new();

    if let Some(state) = args.keyword("state") {
        sentences.push(format!("{} was {}.", who, state_phrase(inv, state)));
    }
    if let Some(event) = args.keyword("event").or_else(|| args.keyword("trigger")) {
        sentences.push(format!("One day, {}.", event_phrase(inv, event)));
    }
    if let Some(consequence) = args.keyword("consequence") {
        if let Some(id) = id {
            inv.adjust(id, Emotion::Fear, 10.0);
            inv.adjust(id, Emotion::Joy, -10.0);
        }
        sentences.push(format!(
            "Because of that, {} felt {}.",
            who,
            state_phrase(inv, consequence)
        ));
    }
    if let Some(lesson) = args.keyword("lesson") {
        sentences.push(format!("{} learned to be more {}.", who, inv.phrase(lesson)));
    }

    if sentences.is_empty() {
        let text = inv.template("cautionary", &Slots::new())?;
        return Ok(inv.fragment(text));
    }
    Ok(arc(inv, &sentences))
}

/// Two characters become friends.
fn friendship(inv: &mut Invocation<'_, '_>, args: &KernelArgs) -> Result<Fragment, KernelError> {
    let characters = affected(inv, args);
    let Some(&first) = characters.first() else {
        return Err(shape("Friendship needs at least one character"));
    };
    for &id in characters.iter().take(2) {
        inv.adjust(id, Emotion::Love, 15.0);
    }
    let who = name(inv, first);
    let other = characters
        .get(1)
        .map(|&id| name(inv, id))
        .unwrap_or_else(|| "a new friend".to_string());

    let mut sentences = Vec::new();
    if let Some(state) = args.keyword("state") {
        sentences.push(format!("{} was {}.", who, state_phrase(inv, state)));
    }
    if let Some(catalyst) = args.keyword("catalyst") {
        sentences.push(format!("Then, {}.", event_phrase(inv, catalyst)));
    }
    if let Some(process) = args.keyword("process") {
        sentences.push(inv.phrase(process));
    }
    let slots = Slots::new().with("name", who).with("other", other);
    sentences.push(inv.template("friendship", &slots)?);
    if let Some(change) = args.keyword("transformation") {
        sentences.push(format!("They were {} together.", state_phrase(inv, change)));
    }
    Ok(arc(inv, &sentences))
}

/// The ordinary day before anything happens.
fn routine(inv: &mut Invocation<'_, '_>, args: &KernelArgs) -> Result<Fragment, KernelError> {
    let activity = args
        .fragments()
        .first()
        .map(|f| f.phrase().to_string())
        .or_else(|| {
            args.keyword("activity")
                .or_else(|| args.keyword("process"))
                .map(|v| inv.phrase(v))
        })
        .or_else(|| objects(inv, args).into_iter().next());

    let text = match (inv.subject(args), activity) {
        (Some(id), Some(activity)) if activity.ends_with("ing") => {
            format!("Every day, {} spent time {}.", name(inv, id), activity)
        }
        (Some(id), Some(activity)) => format!("Every day, {} would {}.", name(inv, id), activity),
        (Some(id), None) => {
            let possessive = inv
                .character(id)
                .map(|c| c.pronouns.possessive())
                .unwrap_or("their");
            format!("{} was going about {} day as usual.", name(inv, id), possessive)
        }
        (None, _) => "It was a normal day.".to_string(),
    };
    Ok(inv.fragment(text))
}
