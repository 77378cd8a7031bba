//! Suggestion session tests: trigger detection, stale results, navigation and commits.

use mention_core::{
    Candidate, DocumentContext, Key, KeyOutcome, MentionRegistry, MentionType, QueryPhase,
    QueryResponder, Selection, SessionOptions, SuggestionSession, WordBoundary, plain_text,
};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

fn people() -> Vec<Candidate> {
    vec![Candidate::new("1", "John"), Candidate::new("2", "Jane")]
}

fn users() -> MentionRegistry {
    MentionRegistry::new(vec![
        MentionType::new("@", "@[__display__](user:__id__)").with_data(people()),
    ])
    .unwrap()
}

/// Run `f` against a session document built from `markup`.
fn with_doc<R>(
    markup: &str,
    registry: &MentionRegistry,
    f: impl FnOnce(DocumentContext<'_>) -> R,
) -> R {
    let plain = plain_text(markup, registry);
    f(DocumentContext {
        markup,
        plain_text: &plain,
        registry,
        lookup: None,
    })
}

fn query_at_end(session: &mut SuggestionSession, markup: &str, registry: &MentionRegistry) {
    let caret = plain_text(markup, registry).chars().count();
    with_doc(markup, registry, |doc| {
        session.update_queries(doc, Selection::caret(caret));
    });
}

fn shown_ids(session: &SuggestionSession) -> Vec<String> {
    session
        .flat_candidates()
        .iter()
        .map(|(_, c)| c.id().to_string())
        .collect()
}

#[test]
fn test_trigger_needs_word_start() {
    let reg = users();
    let mut session = SuggestionSession::default();

    query_at_end(&mut session, "mail@j", &reg);
    assert!(!session.is_active());

    query_at_end(&mut session, "ping @j", &reg);
    assert_eq!(shown_ids(&session), vec!["1", "2"]);

    query_at_end(&mut session, "ping @j x", &reg);
    assert!(!session.is_active());
}

#[test]
fn test_trigger_right_after_mention() {
    let reg = users();
    let mut session = SuggestionSession::default();
    query_at_end(&mut session, "@[John](user:1)@Ja", &reg);

    let (info, candidate) = session.flat_candidates()[0];
    assert_eq!(info.query, "Ja");
    assert_eq!((info.sequence_start, info.sequence_end), (4, 7));
    assert_eq!(candidate.id(), "2");
}

#[test]
fn test_allow_space_in_query() {
    let reg = MentionRegistry::new(vec![
        MentionType::new("@", "@[__display__](__id__)")
            .allow_space_in_query(true)
            .with_data(vec![Candidate::new("7", "John Smith")]),
    ])
    .unwrap();
    let mut session = SuggestionSession::default();
    query_at_end(&mut session, "hi @John Sm", &reg);
    let (info, _) = session.flat_candidates()[0];
    assert_eq!(info.query, "John Sm");
}

#[test]
fn test_types_flatten_in_registration_order() {
    let reg = MentionRegistry::new(vec![
        MentionType::new("@", "@[__display__](user:__id__)").with_data(people()),
        MentionType::new("@", "@[__display__](group:__id__)")
            .with_data(vec![Candidate::new("g1", "Janitors")]),
    ])
    .unwrap();
    let mut session = SuggestionSession::default();
    query_at_end(&mut session, "@Ja", &reg);

    let rows: Vec<(usize, String)> = session
        .flat_candidates()
        .iter()
        .map(|(info, c)| (info.type_index, c.id().to_string()))
        .collect();
    assert_eq!(rows, vec![(0, "2".to_string()), (1, "g1".to_string())]);
}

#[test]
fn test_stale_results_are_dropped() {
    let calls: Arc<Mutex<Vec<(String, QueryResponder)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let reg = MentionRegistry::new(vec![MentionType::new("@", "@[__display__](__id__)")
        .with_provider(
            move |query: &str, responder: QueryResponder| -> Option<Vec<Candidate>> {
                sink.lock().unwrap().push((query.to_string(), responder));
                None
            },
        )])
    .unwrap();
    let mut session = SuggestionSession::default();

    query_at_end(&mut session, "@J", &reg);
    query_at_end(&mut session, "@Ja", &reg);
    assert_eq!(session.phase(0), QueryPhase::Querying);

    let calls = calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    let (first_query, first) = &calls[0];
    let (second_query, second) = &calls[1];
    assert_eq!((first_query.as_str(), second_query.as_str()), ("J", "Ja"));
    assert!(first.token < second.token);

    assert!(!session.deliver(*first, vec![Candidate::new("x", "Jx")]));
    assert_eq!(session.phase(0), QueryPhase::Querying);
    assert_eq!(session.suggestion_count(), 0);

    assert!(session.deliver(*second, people()));
    assert_eq!(session.phase(0), QueryPhase::Resolved);
    assert_eq!(session.suggestion_count(), 2);

    // Delivering twice does nothing.
    assert!(!session.deliver(*second, people()));
}

#[test]
fn test_cancel_invalidates_in_flight_queries() {
    let responders = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&responders);
    let reg = MentionRegistry::new(vec![MentionType::new("@", "@[__display__](__id__)")
        .with_provider(
            move |_: &str, responder: QueryResponder| -> Option<Vec<Candidate>> {
                sink.lock().unwrap().push(responder);
                None
            },
        )])
    .unwrap();
    let mut session = SuggestionSession::default();
    query_at_end(&mut session, "@", &reg);
    session.clear();

    let responder = responders.lock().unwrap()[0];
    assert!(!session.deliver(responder, people()));
    assert_eq!(session.phase(0), QueryPhase::Idle);
}

#[test]
fn test_keys_navigate_and_commit() {
    let reg = users();
    let mut session = SuggestionSession::default();
    query_at_end(&mut session, "Hi @", &reg);

    let outcome = with_doc("Hi @", &reg, |doc| {
        assert_eq!(session.handle_key(doc, Key::Down), KeyOutcome::Handled);
        assert_eq!(session.focus().focus_index, 1);
        assert_eq!(session.handle_key(doc, Key::Down), KeyOutcome::Handled);
        assert_eq!(session.focus().focus_index, 0);
        assert_eq!(session.handle_key(doc, Key::Up), KeyOutcome::Handled);
        session.handle_key(doc, Key::Enter)
    });

    let KeyOutcome::Committed(insertion) = outcome else {
        panic!("expected a commit, got {outcome:?}");
    };
    assert_eq!(insertion.markup, "Hi @[Jane](user:2)");
    assert_eq!(insertion.plain_text, "Hi Jane");
    assert_eq!(insertion.caret, 7);
    assert!(!session.is_active());
}

#[test]
fn test_escape_closes_and_keys_pass_through() {
    let reg = users();
    let mut session = SuggestionSession::default();
    query_at_end(&mut session, "@", &reg);

    with_doc("@", &reg, |doc| {
        assert_eq!(session.handle_key(doc, Key::Escape), KeyOutcome::Handled);
        assert_eq!(session.handle_key(doc, Key::Enter), KeyOutcome::Ignored);
    });
}

#[test]
fn test_accordion_navigation() {
    let reg = MentionRegistry::new(vec![MentionType::new("@", "@[__display__](user:__id__)")
        .with_data(vec![
            Candidate::new("team", "Team").with_children(vec![
                Candidate::new("a", "Alice"),
                Candidate::new("b", "Bob"),
            ]),
            Candidate::new("solo", "Solo"),
        ])])
    .unwrap();
    let mut session = SuggestionSession::new(SessionOptions {
        accordion: true,
        ..SessionOptions::default()
    });
    query_at_end(&mut session, "@", &reg);

    let outcome = with_doc("@", &reg, |doc| {
        // Enter opens a candidate with children.
        session.handle_key(doc, Key::Enter);
        assert_eq!(session.focus().open_index, Some(0));
        assert_eq!(session.focus().child_index, Some(0));

        session.handle_key(doc, Key::Down);
        assert_eq!(session.focus().child_index, Some(1));

        // Past the last child: next top-level candidate, closed.
        session.handle_key(doc, Key::Down);
        assert_eq!(session.focus().focus_index, 1);
        assert_eq!(session.focus().open_index, None);

        session.handle_key(doc, Key::Up);
        assert_eq!(session.focus().focus_index, 0);

        // Before the first child: back to the parent.
        session.handle_key(doc, Key::Enter);
        session.handle_key(doc, Key::Up);
        assert_eq!(session.focus().open_index, None);
        assert_eq!(session.focus().focus_index, 0);

        session.handle_key(doc, Key::Enter);
        session.handle_key(doc, Key::Enter)
    });

    let KeyOutcome::Committed(insertion) = outcome else {
        panic!("expected a commit, got {outcome:?}");
    };
    assert_eq!(insertion.id, "a");
    assert_eq!(insertion.markup, "@[Alice](user:a)");
}

#[test]
fn test_accordion_click_toggles() {
    let reg = MentionRegistry::new(vec![MentionType::new("@", "@[__display__](__id__)")
        .with_data(vec![
            Candidate::new("team", "Team").with_children(vec![Candidate::new("a", "Alice")]),
        ])])
    .unwrap();
    let mut session = SuggestionSession::new(SessionOptions {
        accordion: true,
        ..SessionOptions::default()
    });
    query_at_end(&mut session, "@", &reg);

    with_doc("@", &reg, |doc| {
        assert_eq!(session.select_candidate(doc, 0), None);
        assert_eq!(session.focus().open_index, Some(0));
        assert_eq!(session.select_candidate(doc, 0), None);
        assert_eq!(session.focus().open_index, None);

        session.select_candidate(doc, 0);
        let insertion = session.select_child(doc, 0).unwrap();
        assert_eq!(insertion.markup, "@[Alice](a)");
    });
}

#[test]
fn test_caret_inside_mention_switches_it() {
    let reg = users();
    let markup = "Hi @[John](user:1)!";
    let mut session = SuggestionSession::default();

    let insertion = with_doc(markup, &reg, |doc| {
        session.update_queries(doc, Selection::caret(5));
        let (info, _) = session.flat_candidates()[0];
        let target = info.replace.clone().unwrap();
        assert_eq!((target.markup_start, target.markup_end), (3, 18));
        assert_eq!(info.query, "");

        session.select_candidate(doc, 1).unwrap()
    });
    assert_eq!(insertion.markup, "Hi @[Jane](user:2)!");
    assert_eq!(insertion.plain_text, "Hi Jane!");
    assert_eq!(insertion.caret, 7);
}

#[test]
fn test_highlight_to_tag_expands_to_word() {
    let reg = MentionRegistry::new(vec![MentionType::new("#", "#[__display__](tag:__id__)")
        .highlight_to_tag(true)
        .with_data(vec![Candidate::new("lang-rust", "Rust")])])
    .unwrap();
    let markup = "I like rust lang";
    let mut session = SuggestionSession::default();

    let insertion = with_doc(markup, &reg, |doc| {
        let shown = session.handle_select(doc, Selection::new(8, 10));
        assert_eq!(shown, Some(Selection::new(7, 11)));
        assert_eq!(session.suggestion_count(), 1);
        session.commit_focused(doc).unwrap()
    });
    assert_eq!(insertion.markup, "I like #[rust](tag:lang-rust) lang");
    assert_eq!(insertion.plain_text, "I like rust lang");
    assert_eq!(insertion.caret, 11);
}

#[test]
fn test_range_selection_without_highlight_cancels() {
    let reg = users();
    let mut session = SuggestionSession::default();
    query_at_end(&mut session, "@", &reg);
    with_doc("@ abc", &reg, |doc| {
        assert_eq!(session.handle_select(doc, Selection::new(2, 4)), None);
    });
    assert!(!session.is_active());
}

#[test]
fn test_preserve_value_keeps_typed_word() {
    let reg = MentionRegistry::new(vec![MentionType::new("@", "@[__display__](user:__id__)")
        .preserve_value(true)
        .with_data(vec![Candidate::new("42", "Answer")])])
    .unwrap();
    let markup = "see @foo";
    let mut session = SuggestionSession::default();

    let insertion = with_doc(markup, &reg, |doc| {
        session.update_queries(doc, Selection::caret(8));
        let (info, _) = session.flat_candidates()[0];
        assert_eq!(info.query, "");
        session.commit_focused(doc).unwrap()
    });
    assert_eq!(insertion.markup, "see @[foo](user:42)");
    assert_eq!(insertion.plain_text, "see foo");
}

#[test]
fn test_append_space_on_add() {
    let reg = MentionRegistry::new(vec![MentionType::new("@", "@[__display__](user:__id__)")
        .append_space_on_add(true)
        .with_data(people())])
    .unwrap();
    let mut session = SuggestionSession::default();
    query_at_end(&mut session, "Hi @Ja", &reg);

    let insertion = with_doc("Hi @Ja", &reg, |doc| session.commit_focused(doc).unwrap());
    assert_eq!(insertion.markup, "Hi @[Jane](user:2) ");
    assert_eq!(insertion.plain_text, "Hi Jane ");
    assert_eq!(insertion.caret, 8);
}

#[test]
fn test_unsegmented_text_triggers_without_space() {
    let reg = MentionRegistry::new(vec![MentionType::new("@", "@[__display__](user:__id__)")
        .append_space_on_add(true)
        .with_data(vec![Candidate::new("t", "田中")])])
    .unwrap();
    let mut session = SuggestionSession::new(SessionOptions {
        word_boundary: WordBoundary::ideographic(),
        ..SessionOptions::default()
    });
    query_at_end(&mut session, "こんにちは@田", &reg);
    assert_eq!(session.suggestion_count(), 1);

    let insertion = with_doc("こんにちは@田", &reg, |doc| session.commit_focused(doc).unwrap());
    assert_eq!(insertion.markup, "こんにちは@[田中](user:t)\u{3000}");
    assert_eq!(insertion.plain_text, "こんにちは田中\u{3000}");
}

#[test]
fn test_composition_suppresses_queries() {
    let reg = users();
    let mut session = SuggestionSession::default();
    session.composition_start();
    with_doc("@Jo", &reg, |doc| {
        session.handle_select(doc, Selection::caret(3));
    });
    assert!(!session.is_active());
    assert_eq!(session.selection(), Some(Selection::caret(3)));

    session.composition_end();
    with_doc("@Jo", &reg, |doc| {
        session.handle_select(doc, Selection::caret(3));
    });
    assert_eq!(session.suggestion_count(), 1);
}
