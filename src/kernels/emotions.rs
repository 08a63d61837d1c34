use crate::core::registry::{Invocation, KernelArgs, KernelError, KernelRegistry};
use crate::core::template::Slots;
use crate::schema::character::Emotion;
use crate::schema::fragment::Fragment;

use super::{affected, name, objects};

/// How one emotion kernel reads and what it does to the characters it names.
struct Feeling {
    shifts: &'static [(Emotion, f64)],
    /// Template category for the sentence; `None` uses `sentence`.
    category: Option<&'static str>,
    /// Sentence after the character name.
    sentence: &'static str,
    /// Phrase used when the kernel is an argument of another kernel.
    concept: &'static str,
    /// Sentence used when nobody is around to feel it.
    nobody: &'static str,
}

const JOY: Feeling = Feeling {
    shifts: &[(Emotion::Joy, 20.0)],
    category: Some("joy"),
    sentence: "felt very happy.",
    concept: "felt joyful",
    nobody: "Everyone felt joyful.",
};

const FEAR: Feeling = Feeling {
    shifts: &[(Emotion::Fear, 20.0)],
    category: Some("fear"),
    sentence: "was scared.",
    concept: "afraid",
    nobody: "Fear filled the air.",
};

const SADNESS: Feeling = Feeling {
    shifts: &[(Emotion::Sadness, 15.0), (Emotion::Joy, -10.0)],
    category: Some("sad"),
    sentence: "felt sad.",
    concept: "sad",
    nobody: "Everyone felt sad.",
};

const HAPPY: Feeling = Feeling {
    shifts: &[(Emotion::Joy, 15.0)],
    category: None,
    sentence: "was happy.",
    concept: "happy",
    nobody: "Everyone was happy.",
};

const BRAVE: Feeling = Feeling {
    shifts: &[(Emotion::Fear, -10.0), (Emotion::Joy, 5.0)],
    category: None,
    sentence: "was very brave.",
    concept: "brave",
    nobody: "Someone was very brave.",
};

pub fn register(registry: &mut KernelRegistry) {
    registry
        .register("Joy", joy)
        .register("Fear", |inv, args| feel(inv, args, &FEAR))
        .register("Sadness", |inv, args| feel(inv, args, &SADNESS))
        .register("Happy", |inv, args| feel(inv, args, &HAPPY))
        .register("Brave", |inv, args| feel(inv, args, &BRAVE))
        .register("Love", love);
}

fn feel(
    inv: &mut Invocation<'_, '_>,
    args: &KernelArgs,
    feeling: &Feeling,
) -> Result<Fragment, KernelError> {
    let characters = affected(inv, args);
    let Some(&first) = characters.first() else {
        let text = if inv.is_nested() {
            feeling.concept
        } else {
            feeling.nobody
        };
        return Ok(inv.fragment(text));
    };

    for &id in &characters {
        for &(emotion, delta) in feeling.shifts {
            inv.adjust(id, emotion, delta);
        }
    }

    let subject = name(inv, first);
    let text = match feeling.category {
        Some(category) => inv.template(category, &Slots::new().with("name", subject))?,
        None => format!("{} {}", subject, feeling.sentence),
    };
    Ok(inv.fragment(text))
}

/// `Joy(Tim, intensity=quite)` picks its own wording; plain `Joy(Tim)` uses
/// the joy templates.
fn joy(inv: &mut Invocation<'_, '_>, args: &KernelArgs) -> Result<Fragment, KernelError> {
    let Some(intensity) = args.keyword("intensity") else {
        return feel(inv, args, &JOY);
    };
    let intensity = inv.phrase(intensity);
    let characters = affected(inv, args);
    let Some(&first) = characters.first() else {
        return feel(inv, args, &JOY);
    };
    for &id in &characters {
        inv.adjust(id, Emotion::Joy, 20.0);
    }
    let text = format!("{} felt {} happy.", name(inv, first), intensity);
    Ok(inv.fragment(text))
}

fn love(inv: &mut Invocation<'_, '_>, args: &KernelArgs) -> Result<Fragment, KernelError> {
    let characters = affected(inv, args);
    let things = objects(inv, args);
    let target = match characters.get(1) {
        Some(&other) => Some(name(inv, other)),
        None => things.first().cloned(),
    };

    let Some(&lover) = characters.first() else {
        let text = match target {
            Some(target) => format!("loved {}", target),
            None => "loved".to_string(),
        };
        return Ok(inv.fragment(text));
    };
    inv.adjust(lover, Emotion::Love, 15.0);
    let text = format!(
        "{} loved {}.",
        name(inv, lover),
        target.unwrap_or_else(|| "it".to_string())
    );
    Ok(inv.fragment(text))
}
