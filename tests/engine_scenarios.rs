use readalong_rs::config::ContextOrder;
use readalong_rs::{
    EngineConfig, EngineEvent, FollowEngine, HighlightCommand, RecognitionEvent,
    RecognitionMode, StatusUpdate, WordState,
};

const FOX: &str = "the quick brown fox jumps over the lazy dog";

fn engine_with(config: EngineConfig) -> FollowEngine {
    let mut engine = FollowEngine::new(config).expect("valid config");
    engine.set_reference_text(FOX);
    engine
}

fn precise(order: ContextOrder) -> FollowEngine {
    let mut config = EngineConfig::default();
    config.precise.context_order = order;
    engine_with(config)
}

fn speed() -> FollowEngine {
    engine_with(EngineConfig {
        mode: RecognitionMode::Speed,
        ..EngineConfig::default()
    })
}

fn highlights(events: &[EngineEvent]) -> Vec<HighlightCommand> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::Highlight(c) => Some(c.clone()),
            EngineEvent::Status(_) => None,
        })
        .collect()
}

#[test]
fn precise_longest_first_scenario() {
    let mut engine = precise(ContextOrder::LongestFirst);

    engine.on_recognition_event(&RecognitionEvent::interim("the quick"));
    assert_eq!(engine.cursor(), Some(1));
    assert_eq!(
        &engine.word_states()[..2],
        [WordState::Matched, WordState::Matched]
    );

    engine.on_recognition_event(&RecognitionEvent::settled("brown fox jumps"));
    assert_eq!(engine.cursor(), Some(4));
    assert!(engine.word_states()[2..=4]
        .iter()
        .all(|s| *s == WordState::Matched));

    engine.on_recognition_event(&RecognitionEvent::settled("fox jumps over"));
    assert_eq!(engine.cursor(), Some(5));
    assert!(engine.word_states()[..=5]
        .iter()
        .all(|s| *s == WordState::Matched));
    assert!(engine.word_states()[6..]
        .iter()
        .all(|s| *s == WordState::Pending));
}

#[test]
fn precise_shortest_first_marks_leading_word_missed() {
    let mut engine = precise(ContextOrder::ShortestFirst);
    engine.on_recognition_event(&RecognitionEvent::interim("the quick"));
    assert_eq!(engine.cursor(), Some(1));
    assert_eq!(engine.word_states()[0], WordState::Missed);
    assert_eq!(engine.word_states()[1], WordState::Matched);
}

#[test]
fn precise_word_by_word_finals_are_monotonic() {
    for order in [ContextOrder::LongestFirst, ContextOrder::ShortestFirst] {
        let mut engine = precise(order);
        let mut last = None;
        for word in FOX.split(' ') {
            engine.on_recognition_event(&RecognitionEvent::settled(word));
            assert!(engine.cursor() >= last, "{order:?}: cursor went back at {word}");
            last = engine.cursor();
        }
        assert_eq!(engine.cursor(), Some(8));
        assert!(engine
            .word_states()
            .iter()
            .all(|s| *s == WordState::Matched));
    }
}

#[test]
fn precise_cumulative_interims_are_monotonic() {
    let mut engine = precise(ContextOrder::LongestFirst);
    let words: Vec<&str> = FOX.split(' ').collect();
    let mut last = None;
    for n in 1..=words.len() {
        engine.on_recognition_event(&RecognitionEvent::interim(words[..n].join(" ")));
        assert!(engine.cursor() >= last);
        last = engine.cursor();
    }
    engine.on_recognition_event(&RecognitionEvent::settled(FOX));
    assert_eq!(engine.cursor(), Some(8));
    assert_eq!(engine.progress().matched, 9);
}

#[test]
fn speed_rollback_reverts_uncommitted_words() {
    let mut engine = speed();
    engine.on_recognition_event(&RecognitionEvent::settled("the quick"));
    engine.on_recognition_event(&RecognitionEvent::interim("brown fox jumps"));
    assert_eq!(engine.alignment_state().map(), [Some(2), Some(3), Some(4)]);
    assert_eq!(engine.cursor(), Some(4));

    let events = engine.on_recognition_event(&RecognitionEvent::interim("brown fox xylophone"));
    assert_eq!(
        highlights(&events),
        [HighlightCommand::Rollback { target: Some(3) }]
    );
    assert_eq!(engine.cursor(), Some(3));
    assert!(engine.word_states()[..=3]
        .iter()
        .all(|s| *s == WordState::Matched));
    assert!(engine.word_states()[4..]
        .iter()
        .all(|s| *s == WordState::Pending));
}

#[test]
fn speed_final_does_not_move_back_over_committed_words() {
    let mut engine = speed();
    engine.on_recognition_event(&RecognitionEvent::settled("the quick brown fox jumps"));
    assert_eq!(engine.cursor(), Some(4));
    engine.on_recognition_event(&RecognitionEvent::settled("fox jumps over"));
    assert_eq!(engine.cursor(), Some(5));
    assert_eq!(engine.progress().matched, 6);
}

#[test]
fn speed_stability_is_informational_and_bounded() {
    let mut engine = speed();
    for transcript in ["the quick", "brown fox", "jumps over the lazy dog"] {
        engine.on_recognition_event(&RecognitionEvent::settled(transcript));
        assert!((0.0..=1.0).contains(&engine.stability()));
    }
    assert_eq!(engine.cursor(), Some(8));
}

#[test]
fn mode_switch_keeps_committed_states() {
    let mut engine = precise(ContextOrder::LongestFirst);
    engine.on_recognition_event(&RecognitionEvent::settled("the quick brown"));
    engine.set_mode(RecognitionMode::Speed);
    assert_eq!(engine.cursor(), Some(2));
    assert_eq!(engine.alignment_state().anchor(), Some(2));
    engine.on_recognition_event(&RecognitionEvent::settled("fox jumps"));
    assert_eq!(engine.cursor(), Some(4));
    assert_eq!(engine.progress().matched, 5);
}

#[test]
fn smoothed_confidence_stays_in_unit_range() {
    let mut engine = precise(ContextOrder::LongestFirst);
    let words: Vec<&str> = FOX.split(' ').collect();
    let samples = [
        vec![Some(1.7)],
        vec![None],
        vec![Some(f32::NAN), Some(-3.0)],
        vec![],
        vec![Some(f32::INFINITY)],
        vec![Some(0.4), Some(0.6)],
    ];
    let mut highlighted = 0;
    let mut statuses = 0;
    for (n, sample) in samples.into_iter().enumerate() {
        let events = engine.on_recognition_event(&RecognitionEvent {
            transcript: words[..=n].join(" "),
            is_final: false,
            confidence_samples: sample,
        });
        for event in &events {
            let confidence = match event {
                EngineEvent::Highlight(
                    HighlightCommand::Match { confidence, .. }
                    | HighlightCommand::Skip { confidence, .. }
                    | HighlightCommand::Tentative { confidence, .. },
                ) => {
                    highlighted += 1;
                    *confidence
                }
                EngineEvent::Status(
                    StatusUpdate::Listening { confidence, .. }
                    | StatusUpdate::Recognized { confidence, .. },
                ) => {
                    statuses += 1;
                    *confidence
                }
                _ => continue,
            };
            assert!((0.0..=1.0).contains(&confidence), "step {n}: {confidence}");
        }
    }
    assert_eq!(highlighted, 6);
    assert_eq!(statuses, 6);
    assert_eq!(engine.cursor(), Some(5));
    for c in engine.confidence() {
        assert!((0.0..=1.0).contains(c));
    }
}

#[test]
fn speed_revision_of_first_word_rolls_back() {
    let mut engine = speed();
    engine.on_recognition_event(&RecognitionEvent::interim("the quick brown fox"));
    assert_eq!(engine.cursor(), Some(3));

    let events = engine.on_recognition_event(&RecognitionEvent::interim("they quick"));
    let commands = highlights(&events);
    assert_eq!(commands[0], HighlightCommand::Rollback { target: None });
    assert_eq!(engine.cursor(), Some(1));
    assert!(engine.word_states()[2..]
        .iter()
        .all(|s| *s == WordState::Pending));
}

#[test]
fn speed_final_far_ahead_is_recovered_by_window_alignment() {
    let mut engine = speed();
    engine.set_reference_text(
        "pine kiwi lime fig jelly hedge dime wink deli helm wing yelp knife vein oscar tuba bus pixie",
    );
    engine.on_recognition_event(&RecognitionEvent::settled("pine"));
    assert_eq!(engine.cursor(), Some(0));

    engine.on_recognition_event(&RecognitionEvent::settled("oscar"));
    assert_eq!(engine.cursor(), Some(14));
    assert_eq!(engine.word_states()[14], WordState::Matched);
    assert!(engine.word_states()[1..14]
        .iter()
        .all(|s| *s == WordState::Missed));
    let progress = engine.progress();
    assert_eq!((progress.matched, progress.missed, progress.pending), (2, 13, 3));
}

#[test]
fn new_reference_is_a_full_reset() {
    let mut engine = precise(ContextOrder::LongestFirst);
    engine.on_recognition_event(&RecognitionEvent::settled("the quick"));
    engine.set_reference_text("a completely different script");
    assert_eq!(engine.cursor(), None);
    assert_eq!(engine.words().len(), 4);
    assert_eq!(engine.progress().pending, 4);
    assert_eq!(engine.word_index_at(3), Some(1));
}
