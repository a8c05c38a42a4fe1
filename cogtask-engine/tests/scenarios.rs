use std::cell::RefCell;
use std::rc::Rc;

use cogtask_core::Phase;
use cogtask_engine::config::{FluencyConfig, InhibitionConfig, SymbolCodingConfig};
use cogtask_engine::fluency::{FluencyEngine, FluencyInput, FluencyResult};
use cogtask_engine::inhibition::{
    InhibitionEngine, InhibitionEvent, InhibitionInput, InhibitionPhase, InhibitionResult,
    Stimulus,
};
use cogtask_engine::symbol_coding::{SymbolCodingEngine, SymbolCodingInput, SymbolCodingResult};
use cogtask_engine::{RunStatus, TaskOutcome, TaskRunner};
use cogtask_timing::{Fired, ManualTimer, Scheduler, Timer, TimerId, TimerQueue};
use rand::SeedableRng;
use rand::rngs::StdRng;

type Sink<T> = Rc<RefCell<Vec<T>>>;

fn sink<T: 'static>() -> (Sink<T>, impl FnOnce(T) + 'static) {
    let out = Rc::new(RefCell::new(Vec::new()));
    let inner = out.clone();
    (out, move |v| inner.borrow_mut().push(v))
}

fn inhibition_runner(seed: u64) -> (TaskRunner<InhibitionEngine<StdRng>, ManualTimer>, Sink<InhibitionResult>) {
    let engine =
        InhibitionEngine::new(InhibitionConfig::default(), StdRng::seed_from_u64(seed)).unwrap();
    let (out, on_complete) = sink();
    let runner = TaskRunner::new(engine, ManualTimer::new()).on_complete(on_complete);
    (runner, out)
}

#[test]
fn inhibition_with_two_commissions_scores_88() {
    let (mut r, out) = inhibition_runner(17);
    r.start();
    let mut commissions = 0;
    while r.is_running() {
        assert!(r.advance_to_next());
        if r.phase() != InhibitionPhase::Stimulus {
            continue;
        }
        match r.engine().current_stimulus() {
            Some(Stimulus::Go) => {
                r.advance_ms(300);
                r.input(InhibitionInput::Press);
            }
            Some(Stimulus::NoGo) if commissions < 2 => {
                commissions += 1;
                r.advance_ms(300);
                r.input(InhibitionInput::Press);
            }
            _ => {}
        }
    }

    let results = out.borrow();
    assert_eq!(results.len(), 1);
    let res = &results[0];
    assert_eq!(res.trials.len(), 80);
    assert_eq!(res.summary.go_trials, 60);
    assert_eq!(res.summary.no_go_trials, 20);
    assert_eq!(res.summary.commission_errors, 2);
    assert_eq!(res.summary.omission_errors, 0);
    assert_eq!(res.summary.commission_rate, 0.1);
    assert_eq!(res.summary.omission_rate, 0.0);
    assert_eq!(res.summary.median_go_rt_ms, Some(300.0));
    assert_eq!(res.raw_score, 88);

    let json = serde_json::to_value(TaskOutcome::from(res.clone())).unwrap();
    assert_eq!(json["task"], "inhibition");
    assert_eq!(json["result"]["summary"]["commissionRate"], 0.1);
    assert!(json["result"]["trials"][0]["type"].is_string());
}

#[test]
fn unanswered_inhibition_run_completes_on_its_own() {
    let (mut r, out) = inhibition_runner(3);
    r.start();
    r.run_until_idle();
    assert_eq!(r.status(), RunStatus::Completed);
    let results = out.borrow();
    assert_eq!(results[0].summary.omission_errors, 60);
    assert_eq!(results[0].summary.commission_errors, 0);
    assert_eq!(results[0].raw_score, 20);
}

fn symbol_runner() -> (TaskRunner<SymbolCodingEngine, ManualTimer>, Sink<SymbolCodingResult>) {
    let engine =
        SymbolCodingEngine::new(SymbolCodingConfig::default(), StdRng::seed_from_u64(1)).unwrap();
    let (out, on_complete) = sink();
    (TaskRunner::new(engine, ManualTimer::new()).on_complete(on_complete), out)
}

fn correct_key(r: &TaskRunner<SymbolCodingEngine, ManualTimer>) -> u8 {
    let symbol = r.engine().current_symbol().unwrap();
    r.engine().legend().iter().position(|s| s == symbol).unwrap() as u8 + 1
}

#[test]
fn symbol_coding_all_correct_within_the_limit() {
    let (mut r, out) = symbol_runner();
    r.start();
    for _ in 0..100 {
        let key = correct_key(&r);
        r.input(SymbolCodingInput::Key(key));
        r.advance_ms(200);
    }
    assert_eq!(*out.borrow(), vec![SymbolCodingResult { raw_score: 100 }]);
}

#[test]
fn symbol_coding_exhausted_at_45_seconds() {
    let (mut r, out) = symbol_runner();
    r.start();
    for i in 0..100 {
        r.advance_ms(250);
        let key = correct_key(&r);
        let key = if i < 60 { key } else { key % 4 + 1 };
        r.input(SymbolCodingInput::Key(key));
        r.advance_ms(200);
    }
    assert_eq!(r.status(), RunStatus::Completed);
    assert_eq!(r.timer().now(), 45_000_000_000);
    assert_eq!(r.engine().seconds_left(), 45);
    assert_eq!(*out.borrow(), vec![SymbolCodingResult { raw_score: 60 }]);
}

#[test]
fn abort_never_reaches_the_completion_sink() {
    let (r, out) = inhibition_runner(5);
    let aborted = Rc::new(RefCell::new(0));
    let counter = aborted.clone();
    let mut r = r.on_abort(move || *counter.borrow_mut() += 1);
    r.start();
    r.advance_ms(2_000);
    assert!(r.pending_timers() > 0);
    r.abort();
    r.abort();
    assert_eq!(*aborted.borrow(), 1);
    assert_eq!(r.pending_timers(), 0);
    assert_eq!(r.next_deadline(), None);

    r.advance_ms(600_000);
    assert!(!r.input(InhibitionInput::Press));
    assert!(out.borrow().is_empty());
    assert_eq!(r.status(), RunStatus::Aborted);
}

/// One queue handed to several runners, as a host event loop would.
#[derive(Clone)]
struct SharedQueue(Rc<RefCell<TimerQueue<InhibitionEvent>>>);

impl Scheduler<InhibitionEvent> for SharedQueue {
    fn schedule(&mut self, deadline: u64, event: InhibitionEvent) -> TimerId {
        self.0.borrow_mut().schedule(deadline, event)
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        self.0.borrow_mut().cancel(id)
    }

    fn deadline_of(&self, id: TimerId) -> Option<u64> {
        self.0.borrow().deadline_of(id)
    }

    fn take(&mut self, id: TimerId) -> Option<Fired<InhibitionEvent>> {
        self.0.borrow_mut().take(id)
    }

    fn next_deadline(&self) -> Option<u64> {
        self.0.borrow().next_deadline()
    }

    fn pending(&self) -> usize {
        self.0.borrow().pending()
    }
}

#[test]
fn stale_timers_never_reach_a_later_run() {
    let queue = SharedQueue(Rc::new(RefCell::new(TimerQueue::new())));
    let clock = ManualTimer::new();

    let first = InhibitionEngine::new(InhibitionConfig::default(), StdRng::seed_from_u64(1)).unwrap();
    let (first_out, first_sink) = sink();
    let mut first = TaskRunner::with_scheduler(first, clock.clone(), queue.clone())
        .on_complete(first_sink);
    first.start();
    clock.advance_ms(450);
    first.poll();
    assert!(queue.pending() > 0);
    drop(first);
    assert_eq!(queue.pending(), 0);

    let second = InhibitionEngine::new(
        InhibitionConfig {
            total_trials: 4,
            ..InhibitionConfig::default()
        },
        StdRng::seed_from_u64(2),
    )
    .unwrap();
    let (second_out, second_sink) = sink();
    let mut second = TaskRunner::with_scheduler(second, clock.clone(), queue.clone())
        .on_complete(second_sink);
    second.start();
    assert_eq!(queue.pending(), second.pending_timers());
    while second.is_running() {
        clock.advance_ms(10);
        second.poll();
    }
    assert!(second.phase().is_finished());
    assert_eq!(second_out.borrow()[0].trials.len(), 4);
    assert!(first_out.borrow().is_empty());
    assert_eq!(queue.pending(), 0);
}

fn short_inhibition(seed: u64) -> InhibitionEngine<StdRng> {
    let config = InhibitionConfig {
        total_trials: 4,
        ..InhibitionConfig::default()
    };
    InhibitionEngine::new(config, StdRng::seed_from_u64(seed)).unwrap()
}

#[test]
fn coexisting_runs_on_one_queue_both_complete() {
    let queue = SharedQueue(Rc::new(RefCell::new(TimerQueue::new())));
    let clock = ManualTimer::new();

    let (a_out, a_sink) = sink();
    let mut a = TaskRunner::with_scheduler(short_inhibition(1), clock.clone(), queue.clone())
        .on_complete(a_sink);
    let (b_out, b_sink) = sink();
    let mut b = TaskRunner::with_scheduler(short_inhibition(2), clock.clone(), queue.clone())
        .on_complete(b_sink);

    a.start();
    b.start();
    assert_eq!(queue.pending(), 2);
    assert_eq!(a.pending_timers(), 1);
    assert_eq!(b.pending_timers(), 1);

    for _ in 0..6_000 {
        if !a.is_running() && !b.is_running() {
            break;
        }
        clock.advance_ms(10);
        a.poll();
        b.poll();
        assert_eq!(queue.pending(), a.pending_timers() + b.pending_timers());
    }

    assert_eq!(a.status(), RunStatus::Completed);
    assert_eq!(b.status(), RunStatus::Completed);
    assert_eq!(a_out.borrow()[0].trials.len(), 4);
    assert_eq!(b_out.borrow()[0].trials.len(), 4);
    assert_eq!(queue.pending(), 0);
}

#[test]
fn next_deadline_ignores_other_runs() {
    let queue = SharedQueue(Rc::new(RefCell::new(TimerQueue::new())));
    let clock = ManualTimer::new();
    let mut a = TaskRunner::with_scheduler(short_inhibition(1), clock.clone(), queue.clone());
    let mut b = TaskRunner::with_scheduler(short_inhibition(2), clock.clone(), queue.clone());

    a.start();
    assert_eq!(b.next_deadline(), None);
    b.start();
    let a_next = a.next_deadline().unwrap();
    let b_next = b.next_deadline().unwrap();
    assert_eq!(queue.next_deadline(), Some(a_next.min(b_next)));

    a.abort();
    assert_eq!(a.next_deadline(), None);
    assert_eq!(b.next_deadline(), Some(b_next));
    assert_eq!(queue.pending(), 1);
}

#[test]
fn fluency_dedup_and_normalization() {
    let engine = FluencyEngine::new(FluencyConfig::default()).unwrap();
    let (out, on_complete) = sink::<FluencyResult>();
    let mut r = TaskRunner::new(engine, ManualTimer::new()).on_complete(on_complete);
    r.start();
    for word in ["Dog", "dog", "dogs", "asdf"] {
        r.input(FluencyInput::Submit(word.to_string()));
    }
    r.run_until_idle();

    let results = out.borrow();
    let res = &results[0];
    assert_eq!(res.all_entries, vec!["Dog", "dogs", "asdf"]);
    assert_eq!(res.valid_animals, vec!["Dog", "dogs"]);
    assert_eq!(res.invalid_entries, vec!["asdf"]);
    assert_eq!(res.raw_score, 2);
}
