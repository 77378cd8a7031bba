//! End-to-end tests through the command interface and the state manager.

use mention_core::{
    Candidate, CommandError, CommandResult, InputCommand, InputConfig, InputStateManager, Key,
    MentionInput, MentionRegistry, MentionType, MetaData, QueryResponder, Selection,
    SessionOptions, StateChangeType,
};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

fn users() -> MentionRegistry {
    MentionRegistry::new(vec![MentionType::new("@", "@[__display__](user:__id__)")
        .with_data(vec![Candidate::new("1", "John"), Candidate::new("2", "Jane")])])
    .unwrap()
}

fn input(markup: &str) -> MentionInput {
    MentionInput::new(users(), SessionOptions::default()).with_value(markup)
}

fn change(plain_text: &str, caret: usize) -> InputCommand {
    InputCommand::Change {
        plain_text: plain_text.to_string(),
        selection: Selection::caret(caret),
    }
}

#[test]
fn test_type_query_and_insert() {
    let mut input = input("Hi @[John](user:1) and ");
    assert_eq!(input.plain_text(), "Hi John and ");

    input.execute(change("Hi John and @Ja", 15)).unwrap();
    assert_eq!(input.markup(), "Hi @[John](user:1) and @Ja");
    assert_eq!(input.session().suggestion_count(), 1);

    let result = input.execute(InputCommand::Key(Key::Enter)).unwrap();
    assert_eq!(
        result,
        CommandResult::Inserted {
            type_index: 0,
            id: "2".to_string(),
            display: "Jane".to_string(),
            caret: 16,
        }
    );
    assert_eq!(input.markup(), "Hi @[John](user:1) and @[Jane](user:2)");
    assert_eq!(input.plain_text(), "Hi John and Jane");
    assert_eq!(input.mentions().len(), 2);
    assert_eq!(input.selection(), Selection::caret(16));
    assert!(!input.session().is_active());
}

#[test]
fn test_backspace_into_mention_removes_it() {
    let mut input = input("Hi @[John](user:1)!");
    input.execute(InputCommand::Select(Selection::caret(7))).unwrap();

    let result = input.execute(change("Hi Joh!", 6)).unwrap();
    let CommandResult::Changed { selection, removed } = result else {
        panic!("expected a change, got {result:?}");
    };
    assert_eq!(selection, Selection::caret(3));
    assert_eq!(removed.len(), 1);
    assert_eq!(input.markup(), "Hi !");
    assert_eq!(input.plain_text(), "Hi !");
}

#[test]
fn test_copy_and_cut() {
    let mut input = input("Hi @[John](user:1)!");
    input.execute(InputCommand::Select(Selection::new(4, 8))).unwrap();

    let copied = input.execute(InputCommand::Copy).unwrap();
    assert_eq!(
        copied,
        CommandResult::Clipboard {
            plain_text: "ohn!".to_string(),
            markup: "@[John](user:1)!".to_string(),
        }
    );
    assert_eq!(input.markup(), "Hi @[John](user:1)!");

    let cut = input.execute(InputCommand::Cut).unwrap();
    assert_eq!(cut, copied);
    assert_eq!(input.markup(), "Hi ");
    assert_eq!(input.selection(), Selection::caret(3));
}

#[test]
fn test_paste_markup_and_text() {
    let mut input = input("Hi !");
    input.execute(InputCommand::Select(Selection::caret(3))).unwrap();
    input
        .execute(InputCommand::Paste {
            text: "Ann".to_string(),
            markup: Some("@[Ann](user:7)".to_string()),
        })
        .unwrap();
    assert_eq!(input.markup(), "Hi @[Ann](user:7)!");
    assert_eq!(input.selection(), Selection::caret(6));

    let mut input = self::input("ab");
    input.execute(InputCommand::Select(Selection::caret(1))).unwrap();
    input
        .execute(InputCommand::Paste {
            text: "X\r\nY".to_string(),
            markup: None,
        })
        .unwrap();
    assert_eq!(input.markup(), "aX\nYb");
    assert_eq!(input.selection(), Selection::caret(4));
}

#[test]
fn test_edit_before_mention_without_select() {
    // After loading a value the stored selection sits at the end of the text.
    let mut input = input("@[Ann](user:1) hi");
    let result = input.execute(change("xAnn hi", 1)).unwrap();
    let CommandResult::Changed { selection, removed } = result else {
        panic!("expected a change, got {result:?}");
    };
    assert!(removed.is_empty());
    assert_eq!(selection, Selection::caret(1));
    assert_eq!(input.markup(), "x@[Ann](user:1) hi");
    assert_eq!(input.mentions().len(), 1);
}

#[test]
fn test_blur_cancels_suggestions() {
    let mut input = input("");
    input.execute(change("@", 1)).unwrap();
    assert!(input.session().is_active());
    input.execute(InputCommand::Blur).unwrap();
    assert!(!input.session().is_active());
}

#[test]
fn test_composition_defers_queries() {
    let mut input = input("");
    input.execute(InputCommand::CompositionStart).unwrap();
    input.execute(change("@Jo", 3)).unwrap();
    assert!(!input.session().is_active());

    input.execute(InputCommand::CompositionEnd).unwrap();
    assert_eq!(input.session().suggestion_count(), 1);
}

#[test]
fn test_async_delivery_through_commands() {
    let responders = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&responders);
    let registry = MentionRegistry::new(vec![MentionType::new("@", "@[__display__](__id__)")
        .with_provider(
            move |_: &str, responder: QueryResponder| -> Option<Vec<Candidate>> {
                sink.lock().unwrap().push(responder);
                None
            },
        )])
    .unwrap();
    let mut input = MentionInput::new(registry, SessionOptions::default());

    input.execute(change("@a", 2)).unwrap();
    input.execute(change("@ab", 3)).unwrap();
    let (stale, fresh) = {
        let r = responders.lock().unwrap();
        (r[0], r[1])
    };

    let result = input
        .execute(InputCommand::DeliverResults {
            responder: stale,
            results: vec![Candidate::from("old")],
        })
        .unwrap();
    assert_eq!(result, CommandResult::Delivered { accepted: false });

    let result = input
        .execute(InputCommand::DeliverResults {
            responder: fresh,
            results: vec![Candidate::from("abby")],
        })
        .unwrap();
    assert_eq!(result, CommandResult::Delivered { accepted: true });

    input.execute(InputCommand::SelectCandidate(0)).unwrap();
    assert_eq!(input.markup(), "@[abby](abby)");

    let unknown = QueryResponder {
        token: fresh.token,
        type_index: 9,
    };
    assert_eq!(
        input.execute(InputCommand::DeliverResults {
            responder: unknown,
            results: Vec::new(),
        }),
        Err(CommandError::UnknownType(9))
    );
}

#[test]
fn test_japanese_text_switches_word_boundary() {
    let registry = MentionRegistry::new(vec![MentionType::new("@", "@[__display__](user:__id__)")
        .append_space_on_add(true)
        .with_data(vec![Candidate::new("t", "田中")])])
    .unwrap();
    let mut input =
        MentionInput::new(registry, SessionOptions::default()).with_value("こんにちは");

    input.execute(change("こんにちは@田", 7)).unwrap();
    assert_eq!(input.session().suggestion_count(), 1);

    input.execute(InputCommand::Key(Key::Tab)).unwrap();
    assert_eq!(input.plain_text(), "こんにちは田中\u{3000}");
}

#[test]
fn test_metadata_resolved_from_data() {
    let mut meta = MetaData::new();
    meta.insert("role".to_string(), "admin".to_string());
    let registry = MentionRegistry::new(vec![MentionType::new(
        "@",
        "@[__display__](__id__){__metaData__}",
    )
    .resolve_metadata_from_data(true)
    .with_data(vec![Candidate::new("1", "Ann").with_meta_data(meta.clone())])])
    .unwrap();

    let input = MentionInput::new(registry, SessionOptions::default()).with_value("@[Ann](1)");
    assert_eq!(input.mentions()[0].meta_data, meta);
}

#[test]
fn test_config_from_json() {
    let config = InputConfig::from_json(
        r##"{
            "types": [
                {
                    "trigger": "@",
                    "markup": "@[__display__](user:__id__)",
                    "displayTemplate": "@__display__",
                    "data": [
                        { "id": "1", "display": "John" },
                        "Jane",
                        { "id": "team", "display": "Team", "data": [{ "id": "a", "metaData": { "k": "v" } }] }
                    ]
                },
                { "trigger": "#", "markup": "#[__display__](tag:__id__)", "appendSpaceOnAdd": true }
            ],
            "accordion": true,
            "language": "en"
        }"##,
    )
    .unwrap();
    assert_eq!(config.types.len(), 2);
    assert!(config.types[1].append_space_on_add);
    assert_eq!(config.types[0].data[1], Candidate::from("Jane"));
    assert_eq!(config.types[0].data[2].children().len(), 1);

    let mut input = MentionInput::from_config(&config).unwrap();
    assert!(input.session().options().accordion);
    assert_eq!(input.lookup().len(), 4);

    input
        .execute(InputCommand::SetValue("cc @[John](user:1)".to_string()))
        .unwrap();
    assert_eq!(input.plain_text(), "cc @John");

    let round_trip = InputConfig::from_json(&config.to_json().unwrap()).unwrap();
    assert_eq!(round_trip, config);
}

#[test]
fn test_state_manager_notifications() {
    let mut manager = InputStateManager::new(input(""));
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    manager.subscribe(move |change| {
        sink.lock()
            .unwrap()
            .push((change.change_type, change.added.clone()));
    });

    manager.execute(change("@Jo", 3)).unwrap();
    manager.execute(InputCommand::Key(Key::Enter)).unwrap();

    let events = events.lock().unwrap();
    let kinds: Vec<StateChangeType> = events.iter().map(|(kind, _)| *kind).collect();
    assert_eq!(
        kinds,
        vec![
            StateChangeType::ValueChanged,
            StateChangeType::SuggestionsChanged,
            StateChangeType::SelectionChanged,
            StateChangeType::ValueChanged,
            StateChangeType::MentionAdded,
            StateChangeType::SuggestionsChanged,
            StateChangeType::SelectionChanged,
        ]
    );
    let added = events[4].1.clone().unwrap();
    assert_eq!((added.type_index, added.id.as_str()), (0, "1"));

    let value = manager.get_value_state();
    assert_eq!(value.markup, "@[John](user:1)");
    assert_eq!(value.version, 7);
    assert!(manager.get_suggestions_state().items.is_empty());
}
