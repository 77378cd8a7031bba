//! Mention input example
//!
//! Demonstrates how to drive a `MentionInput` through the state manager.

use mention_core::{
    Candidate, CommandResult, InputCommand, InputStateManager, Key, MentionInput,
    MentionRegistry, MentionType, Selection, SessionOptions,
};

fn main() {
    println!("=== Mention input example ===\n");

    let registry = MentionRegistry::new(vec![
        MentionType::new("@", "@[__display__](user:__id__)")
            .append_space_on_add(true)
            .with_data(vec![
                Candidate::new("1", "John"),
                Candidate::new("2", "Jane"),
                Candidate::new("3", "Bob"),
            ]),
        MentionType::new("#", "#[__display__](tag:__id__)")
            .with_data(vec![Candidate::from("rust"), Candidate::from("wasm")]),
    ])
    .unwrap();

    let mut manager = InputStateManager::new(MentionInput::new(registry, SessionOptions::default()));
    manager.subscribe(|change| {
        println!("  [v{}] {:?}", change.new_version, change.change_type);
    });

    // 1. Type a trigger and a query
    println!("1. Typing 'Hi @Ja':");
    manager
        .execute(InputCommand::Change {
            plain_text: "Hi @Ja".to_string(),
            selection: Selection::caret(6),
        })
        .unwrap();
    for item in manager.get_suggestions_state().items {
        println!("  suggestion: {} ({})", item.display, item.id);
    }

    // 2. Commit the focused suggestion
    println!("\n2. Pressing Enter:");
    if let Ok(CommandResult::Inserted { id, display, .. }) =
        manager.execute(InputCommand::Key(Key::Enter))
    {
        println!("  inserted {display} ({id})");
    }

    let value = manager.get_value_state();
    println!("  markup: {}", value.markup);
    println!("  plain:  {}", value.plain_text);

    // 3. Backspace into the mention removes it as a whole
    println!("\n3. Backspace inside the mention:");
    let plain = value.plain_text.clone();
    let mut edited: String = plain.chars().take(6).collect();
    edited.extend(plain.chars().skip(7));
    manager
        .execute(InputCommand::Select(Selection::caret(7)))
        .unwrap();
    manager
        .execute(InputCommand::Change {
            plain_text: edited,
            selection: Selection::caret(6),
        })
        .unwrap();
    println!("  markup: {}", manager.get_value_state().markup);
}
