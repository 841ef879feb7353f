use std::time::Duration;

use drillquiz::{
    BuiltinBank, EndReason, EngineEvent, Phase, ProfileRollup, ProfileStore, QuizType, Rules,
    SessionEngine, SqliteProfileStore, SteppedClock,
};
use tempfile::tempdir;

fn engine() -> SessionEngine<BuiltinBank, SteppedClock> {
    let bank = BuiltinBank::named("academic").unwrap();
    SessionEngine::new(bank, SteppedClock::new(), Rules::default())
}

#[test]
fn finished_sessions_accumulate_xp_across_reopen() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("profile.db");

    {
        let mut engine = engine();
        let rx = engine.subscribe();
        let mut rollup = ProfileRollup::new(SqliteProfileStore::open(&db).unwrap());

        // reading passage answers from the academic bank
        engine.start_session(QuizType::Reading).unwrap();
        for answer in [1, 2, 3] {
            engine.select_answer(answer).unwrap();
            engine.advance(Duration::from_secs(3));
        }
        assert_eq!(engine.session().phase, Phase::Ended);

        engine.start_session(QuizType::Writing).unwrap();
        engine.submit_essay(75).unwrap();

        assert_eq!(rollup.drain(&rx).unwrap(), 2);
        // a second drain finds nothing new
        assert_eq!(rollup.drain(&rx).unwrap(), 0);
    }

    let store = SqliteProfileStore::open(&db).unwrap();
    let profile = store.load().unwrap();
    assert_eq!(profile.xp, 330 + 500);
    assert!(profile.completed_games.contains(&QuizType::Reading));
    assert!(profile.completed_games.contains(&QuizType::Writing));

    let history = store.recent_sessions(10).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].reason, EndReason::EssaySubmitted);
    assert_eq!(store.best_score(QuizType::Reading).unwrap(), Some(330));
}

#[test]
fn abandoned_session_never_reaches_the_profile() {
    let mut engine = engine();
    let rx = engine.subscribe();
    let mut rollup = ProfileRollup::new(SqliteProfileStore::in_memory().unwrap());

    engine.start_session(QuizType::Vocabulary).unwrap();
    engine.select_answer(1).unwrap();
    engine.pause().unwrap();
    engine.reset();
    engine.advance(Duration::from_secs(30));

    let events: Vec<EngineEvent> = rx.try_iter().collect();
    assert!(events
        .iter()
        .all(|e| matches!(e, EngineEvent::Snapshot(_))));

    assert_eq!(rollup.store().load().unwrap().xp, 0);
    assert_eq!(rollup.drain(&rx).unwrap(), 0);
}

#[test]
fn losing_all_lives_still_rolls_up() {
    let mut engine = engine();
    let rx = engine.subscribe();
    let mut rollup = ProfileRollup::new(SqliteProfileStore::in_memory().unwrap());

    engine.start_session(QuizType::Vocabulary).unwrap();
    // first answer right, then three wrong ones
    engine.select_answer(1).unwrap();
    engine.advance(Duration::from_secs(3));
    for wrong in [3, 0, 1] {
        engine.select_answer(wrong).unwrap();
        engine.advance(Duration::from_secs(3));
    }

    assert_eq!(engine.session().phase, Phase::Ended);
    assert_eq!(engine.session().lives, 0);
    assert_eq!(rollup.drain(&rx).unwrap(), 1);

    let history = rollup.store().recent_sessions(1).unwrap();
    assert_eq!(history[0].reason, EndReason::OutOfLives);
    assert_eq!(history[0].score, 100);
}
