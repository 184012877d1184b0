use std::collections::HashSet;
use std::time::{Duration, SystemTime};

use assert_matches::assert_matches;
use rusqlite::Connection;

use formlab::condition::{Motion, CONDITIONS};
use formlab::experiment::{Experiment, FocusEvent};
use formlab::fields::Field;
use formlab::stats::StatsDb;
use formlab::summary;

fn ms(millis: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_millis(millis)
}

fn fill_form(exp: &mut Experiment) {
    exp.on_change(Field::Name, "Jane".to_string());
    exp.on_change(Field::Email, "jane@example.com".to_string());
    exp.on_change(Field::Password, "hunter2".to_string());
    exp.on_change(Field::PasswordConfirm, "hunter2".to_string());
    exp.on_change(Field::Phone, "010-1234-5678".to_string());
    exp.on_change(Field::Birthdate, "990101".to_string());
    exp.on_change(Field::Gender, "female".to_string());
    exp.on_change(Field::Region, "Seoul".to_string());
}

#[test]
fn repeated_sessions_always_produce_valid_permutations() {
    let mut exp = Experiment::without_stats(None);

    for _ in 0..100 {
        exp.start_session();

        assert_eq!(exp.order.len(), 8);
        let distinct: HashSet<usize> = exp.order.iter().copied().collect();
        assert_eq!(distinct.len(), 8, "no run index skipped or duplicated");
        assert!(exp.order.iter().all(|&i| i < CONDITIONS.len()));

        exp.reset_session();
    }
}

#[test]
fn full_session_covers_all_eight_condition_codes() {
    for seed in 0..20u64 {
        let mut exp = Experiment::without_stats(None);
        exp.start_session_seeded(seed);

        for _ in 0..8 {
            fill_form(&mut exp);
            exp.complete_run();
            exp.advance();
        }

        assert!(exp.session_over);
        assert_eq!(exp.summary.len(), 8);
        assert_eq!(
            summary::codes_sorted(&exp.summary),
            vec!["000", "001", "010", "011", "100", "101", "110", "111"]
        );
    }
}

#[test]
fn intervals_and_total_follow_the_focus_log() {
    let mut exp = Experiment::without_stats(None);
    exp.start_with_order(vec![3, 0, 1, 2, 4, 5, 6, 7]);

    exp.run.focus_log = vec![
        FocusEvent {
            field: Some(Field::Name),
            at: ms(0),
        },
        FocusEvent {
            field: Some(Field::Email),
            at: ms(700),
        },
        FocusEvent {
            field: Some(Field::Phone),
            at: ms(1900),
        },
    ];
    exp.finalize(ms(4000));

    let result = &exp.summary[0];
    assert_eq!(result.code, "011");
    assert_eq!(result.intervals, vec![700, 1200, 2100]);
    assert_eq!(result.total_time_ms, 4000);
    assert_eq!(
        result.intervals.iter().sum::<u64>(),
        result.total_time_ms,
        "intervals partition the total"
    );
}

#[test]
fn grouped_motion_never_reveals_profile_before_gate() {
    let grouped: Vec<&_> = CONDITIONS
        .iter()
        .filter(|c| c.motion == Motion::Grouped)
        .collect();
    assert_eq!(grouped.len(), 4);

    for (idx, cond) in CONDITIONS.iter().enumerate() {
        if cond.motion != Motion::Grouped {
            continue;
        }
        let mut exp = Experiment::without_stats(None);
        let mut order = vec![idx];
        order.extend((0..8).filter(|&i| i != idx));
        exp.start_with_order(order);

        // everything but a valid email: profile group stays hidden
        exp.on_change(Field::Name, "Jane".to_string());
        exp.on_change(Field::Email, "jane.example.com".to_string());
        exp.on_change(Field::Password, "hunter2".to_string());
        exp.on_change(Field::PasswordConfirm, "hunter2".to_string());
        assert_eq!(exp.visible().len(), 4);

        // mismatched confirmation also keeps it hidden
        exp.on_change(Field::Email, "jane@example.com".to_string());
        exp.on_change(Field::PasswordConfirm, "hunter3".to_string());
        assert_eq!(exp.visible().len(), 4);

        exp.on_change(Field::PasswordConfirm, "hunter2".to_string());
        assert_eq!(exp.visible().len(), 8);
    }
}

#[test]
fn reset_then_restart_is_independent() {
    let mut exp = Experiment::without_stats(None);
    exp.start_session_seeded(1);
    for _ in 0..3 {
        exp.complete_run();
        exp.advance();
    }
    assert_eq!(exp.summary.len(), 3);

    exp.reset_session();
    assert!(exp.order.is_empty());
    assert!(exp.summary.is_empty());

    exp.start_session_seeded(2);
    assert_eq!(exp.summary.len(), 0);
    assert_eq!(exp.current, 0);
    assert_matches!(exp.condition(), Some(_));
}

#[test]
fn completed_runs_record_dwell_stats() {
    let mut exp = Experiment::without_stats(Some("p01".to_string()));
    exp.stats_db = Some(StatsDb::from_connection(Connection::open_in_memory().unwrap()).unwrap());
    exp.start_with_order((0..8).collect());

    exp.focus_field(Field::Email);
    exp.focus_field(Field::Gender);
    fill_form(&mut exp);
    exp.complete_run();

    let db = exp.stats_db.as_ref().unwrap();
    // three focus events -> three dwell intervals, one per focused field
    let summary_rows = db.get_all_field_summary().unwrap();
    let fields: Vec<&str> = summary_rows.iter().map(|r| r.0.as_str()).collect();
    assert_eq!(fields, vec!["email", "gender", "name"]);
    let samples: i64 = summary_rows.iter().map(|r| r.4).sum();
    assert_eq!(samples, 3);
}

#[test]
fn condition_sequence_matches_shuffled_order() {
    let mut exp = Experiment::without_stats(None);
    exp.start_session_seeded(9);
    let order = exp.order.clone();

    for &expected_index in &order {
        assert_eq!(
            exp.condition().map(|c| c.code()),
            Some(CONDITIONS[expected_index].code())
        );
        exp.complete_run();
        exp.advance();
    }
    assert!(exp.session_over);

    let recorded: Vec<usize> = exp.summary.iter().map(|r| r.condition_index).collect();
    assert_eq!(recorded, order);
}
