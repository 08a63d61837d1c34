/// Bedtime example: a short story written as kernel expressions and rendered
/// with the starter kernel pack, in three seeded variants.
///
/// Run with: cargo run --example bedtime
/// Set RUST_LOG=story_kernel=debug to watch kernels being dispatched.

use story_kernel::core::template::TemplateTable;
use story_kernel::kernels::{starter_registry, starter_templates};
use story_kernel::{EngineConfig, StoryEngine};

const STORY: &str = r#"
# Lily finds an owl and makes a friend
Lily(Character, girl, curious)
Max(Character, dog, loyal)

Routine(Lily, activity="play in the garden")
Find(Lily, owl) + Joy(Lily, intensity=quite)
Fear(Lily) / 4
Friendship(Lily, Max, transformation=Happy())
Journey(Lily,
    catalyst=Storm(),
    process=Help(Max, Lily),
    insight=Brave(),
)
Hug(Lily, Max)
"#;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // --- A pack of our own on top of the starter templates ---
    let extra: TemplateTable = ron::from_str(
        r#"{
            "intro": [
                (weight: 2, text: "{name} the {adj} {type} lived next door."),
            ],
        }"#,
    )
    .expect("Failed to parse extra templates");

    let config: EngineConfig = ron::from_str("(clamp: Range(min: 0.0, max: 100.0))")
        .expect("Failed to parse engine config");

    let engine = StoryEngine::builder()
        .seed(2026)
        .registry(starter_registry())
        .templates(starter_templates().expect("Failed to build starter templates"))
        .templates(extra)
        .config(config)
        .build()
        .expect("Failed to build engine");

    let variants = engine
        .generate_variants(STORY, 3)
        .expect("Failed to generate story");

    for (i, story) in variants.iter().enumerate() {
        println!("--- Variant {} ---", i + 1);
        println!("{}", story.text);
        println!();
    }

    let story = &variants[0];
    println!("--- Characters ---");
    for character in &story.characters {
        println!(
            "{:<6} joy {:>5.1}  fear {:>5.1}  love {:>5.1}",
            character.name, character.emotions.joy, character.emotions.fear, character.emotions.love
        );
    }

    if !story.diagnostics.is_empty() {
        println!();
        println!("--- Diagnostics ---");
        for diagnostic in &story.diagnostics {
            println!("{}", diagnostic);
        }
    }
}
