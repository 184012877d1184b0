use chrono::Local;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng, SeedableRng};
use std::collections::HashSet;
use std::time::SystemTime;

use crate::condition::{Condition, CONDITIONS};
use crate::fields::{self, Field, FormData};
use crate::stats::{time_diff_ms, FieldStat, StatsDb};
use crate::summary::RunResult;

/// One focus timestamp. `field` is None for the final completion event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusEvent {
    pub field: Option<Field>,
    pub at: SystemTime,
}

/// Per-run state, replaced wholesale on every run transition so nothing
/// leaks from one condition into the next.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub form: FormData,
    pub focus_log: Vec<FocusEvent>,
    pub blurred: HashSet<Field>,
    pub focused: Option<Field>,
    pub completed: bool,
}

impl RunState {
    pub fn started_at(&self) -> Option<SystemTime> {
        self.focus_log.first().map(|e| e.at)
    }
}

/// Drives one participant through the 8 randomized form variants and
/// collects timing telemetry.
#[derive(Debug)]
pub struct Experiment {
    /// shuffled permutation of condition indices, empty until a session starts
    pub order: Vec<usize>,
    /// position within `order`
    pub current: usize,
    pub run: RunState,
    /// append-only within a session, cleared only by reset
    pub summary: Vec<RunResult>,
    pub session_over: bool,
    pub participant: Option<String>,
    pub stats_db: Option<StatsDb>,
}

/// Fisher-Yates permutation of the condition indices.
pub fn shuffled_order<R: Rng>(rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..CONDITIONS.len()).collect();
    order.shuffle(rng);
    order
}

impl Experiment {
    pub fn new(participant: Option<String>) -> Self {
        let stats_db = StatsDb::new().ok();
        Self {
            order: vec![],
            current: 0,
            run: RunState::default(),
            summary: vec![],
            session_over: false,
            participant,
            stats_db,
        }
    }

    /// Runner without the on-disk stats store, for headless use and tests.
    pub fn without_stats(participant: Option<String>) -> Self {
        Self {
            order: vec![],
            current: 0,
            run: RunState::default(),
            summary: vec![],
            session_over: false,
            participant,
            stats_db: None,
        }
    }

    pub fn has_started(&self) -> bool {
        !self.order.is_empty()
    }

    /// Start a session with a fresh uniformly random condition order.
    pub fn start_session(&mut self) {
        let order = shuffled_order(&mut thread_rng());
        self.start_with_order(order);
    }

    /// Seeded variant for reproducible condition orderings.
    pub fn start_session_seeded(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let order = shuffled_order(&mut rng);
        self.start_with_order(order);
    }

    pub fn start_with_order(&mut self, order: Vec<usize>) {
        self.order = order;
        self.current = 0;
        self.summary.clear();
        self.session_over = false;
        self.begin_run();
    }

    /// Clears everything, including the accumulated summary and the order.
    pub fn reset_session(&mut self) {
        self.order.clear();
        self.current = 0;
        self.run = RunState::default();
        self.summary.clear();
        self.session_over = false;
    }

    pub fn condition(&self) -> Option<&'static Condition> {
        self.order.get(self.current).map(|&i| &CONDITIONS[i])
    }

    pub fn visible(&self) -> Vec<Field> {
        match self.condition() {
            Some(cond) => fields::visible_fields(cond, &self.run.form),
            None => vec![],
        }
    }

    /// Fresh per-run state; the first visible field receives focus and the
    /// initial timestamp is recorded.
    fn begin_run(&mut self) {
        self.run = RunState::default();
        if let Some(first) = self.visible().first().copied() {
            self.run.focused = Some(first);
            self.on_field_focus(first);
        }
    }

    /// Append a focus timestamp. Side effect only.
    pub fn on_field_focus(&mut self, field: Field) {
        self.run.focus_log.push(FocusEvent {
            field: Some(field),
            at: SystemTime::now(),
        });
    }

    pub fn on_field_blur(&mut self, field: Field) {
        self.run.blurred.insert(field);
    }

    /// Move focus to `field`, blurring the previously focused field and
    /// recording the focus timestamp.
    pub fn focus_field(&mut self, field: Field) {
        if self.run.completed || self.run.focused == Some(field) {
            return;
        }
        if let Some(prev) = self.run.focused {
            self.on_field_blur(prev);
        }
        self.run.focused = Some(field);
        self.on_field_focus(field);
    }

    /// Update a field value. Validity is recomputed on read (pure
    /// predicates), so nothing else happens here. Input is halted once the
    /// run is completed, pending `advance`.
    pub fn on_change(&mut self, field: Field, value: String) {
        if self.run.completed {
            return;
        }
        self.run.form.set(field, value);
    }

    pub fn type_char(&mut self, c: char) {
        if self.run.completed {
            return;
        }
        if let Some(field) = self.run.focused {
            if !field.is_select() {
                self.run.form.push_char(field, c);
            }
        }
    }

    pub fn backspace(&mut self) {
        if self.run.completed {
            return;
        }
        if let Some(field) = self.run.focused {
            if !field.is_select() {
                self.run.form.pop_char(field);
            }
        }
    }

    pub fn form_complete(&self) -> bool {
        fields::form_complete(&self.run.form)
    }

    pub fn elapsed_ms(&self) -> u64 {
        match self.run.started_at() {
            Some(start) => time_diff_ms(start, SystemTime::now()),
            None => 0,
        }
    }

    /// Close out the current run: append the final timestamp, derive
    /// intervals and total time, push exactly one RunResult onto the
    /// summary, and halt input pending `advance`.
    pub fn complete_run(&mut self) {
        self.finalize(SystemTime::now());
    }

    /// `complete_run` with an explicit completion timestamp. The final
    /// timestamp is appended before intervals are derived, so interval i is
    /// always `t[i+1] - t[i]` over the full sequence.
    pub fn finalize(&mut self, final_at: SystemTime) {
        if self.run.completed || !self.has_started() || self.run.focus_log.is_empty() {
            return;
        }

        self.run.focus_log.push(FocusEvent {
            field: None,
            at: final_at,
        });

        let times: Vec<SystemTime> = self.run.focus_log.iter().map(|e| e.at).collect();
        let intervals: Vec<u64> = times
            .windows(2)
            .map(|w| time_diff_ms(w[0], w[1]))
            .collect();
        let total_time_ms = time_diff_ms(times[0], times[times.len() - 1]);

        let steps: Vec<String> = self
            .run
            .focus_log
            .iter()
            .filter_map(|e| e.field.map(|f| f.to_string()))
            .collect();

        let condition_index = self.order[self.current];
        let code = CONDITIONS[condition_index].code();
        let run_number = self.current + 1;

        let result = RunResult {
            run_number,
            condition_index,
            code: code.clone(),
            total_time_ms,
            intervals: intervals.clone(),
            steps: steps.clone(),
        };

        if let Some(ref mut db) = self.stats_db {
            let now = Local::now();
            let stats: Vec<FieldStat> = steps
                .iter()
                .zip(intervals.iter())
                .map(|(field, dwell)| FieldStat {
                    field: field.clone(),
                    dwell_ms: *dwell,
                    condition_code: code.clone(),
                    run_number: run_number as i64,
                    timestamp: now,
                })
                .collect();
            let _ = db.record_field_stats_batch(&stats);
        }

        self.summary.push(result);
        self.run.completed = true;
    }

    /// Step to the next run, or end the session after the last one. The
    /// session summary is appended to the on-disk session log at the end;
    /// that write is best effort.
    pub fn advance(&mut self) {
        if !self.run.completed || self.session_over {
            return;
        }
        if self.current + 1 < self.order.len() {
            self.current += 1;
            self.begin_run();
        } else {
            self.session_over = true;
            if let Err(e) =
                crate::summary::append_session_log(&self.summary, self.participant.as_deref())
            {
                tracing::warn!("could not append session log: {}", e);
            }
        }
    }
}
