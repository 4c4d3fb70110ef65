//! Worker pool that hands out whole work units
//!
//! A work unit is typically one input file or one mate pair. Each worker owns a
//! clone of the processor and pulls the next unit from a shared cursor, so units
//! are started in list order and a unit is only ever seen by one worker.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::{progress::CancelToken, Error, IntoSeqopsError, Result};

/// Trait for types that can process work units in parallel.
pub trait ParallelProcessor: Send + Clone {
    /// The unit of work handed to a single worker
    type Unit: Sync;

    /// Process one unit; `index` is its position in the unit list
    fn process_unit(&mut self, index: usize, unit: &Self::Unit) -> Result<()>;

    /// Called when a worker finishes a unit, whether it succeeded or not
    /// Default implementation does nothing
    fn on_batch_complete(&mut self) -> Result<()> {
        Ok(())
    }

    /// Set the thread ID for this processor
    ///
    /// Each thread should call this method with its own unique ID.
    fn set_tid(&mut self, _tid: usize) {
        // Default implementation does nothing
    }

    /// Get the thread ID for this processor
    fn get_tid(&self) -> Option<usize> {
        None
    }
}

/// A unit that stopped with an error while its siblings carried on
#[derive(Debug)]
pub struct UnitFailure {
    pub index: usize,
    pub error: Error,
}

/// Resolves a requested thread count: 0 means all available cores
#[must_use]
pub fn resolve_threads(requested: usize) -> usize {
    if requested == 0 {
        num_cpus::get()
    } else {
        requested
    }
}

/// Processes `units` with up to `num_threads` workers
///
/// Workers stop taking new units once `cancel` is set. Errors of individual
/// units are collected and returned in unit order; only a panicking worker
/// fails the whole call.
pub fn process_parallel<P: ParallelProcessor>(
    units: &[P::Unit],
    processor: &P,
    num_threads: usize,
    cancel: &CancelToken,
) -> Result<Vec<UnitFailure>> {
    let num_threads = resolve_threads(num_threads).min(units.len()).max(1);
    let cursor = AtomicUsize::new(0);
    let failures = Mutex::new(Vec::new());

    let joined = std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(num_threads);
        for tid in 0..num_threads {
            let mut processor = processor.clone();
            processor.set_tid(tid);
            let cursor = &cursor;
            let failures = &failures;

            handles.push(scope.spawn(move || {
                let _guard = CancelOnPanic(cancel);
                while !cancel.is_cancelled() {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(unit) = units.get(index) else {
                        break;
                    };
                    let outcome = processor.process_unit(index, unit);
                    let flushed = processor.on_batch_complete();
                    if let Err(error) = outcome.and(flushed) {
                        failures.lock().push(UnitFailure { index, error });
                    }
                }
            }));
        }
        handles
            .into_iter()
            .map(std::thread::ScopedJoinHandle::join)
            .fold(true, |ok, joined| joined.is_ok() && ok)
    });

    if !joined {
        return Err(WorkerPanic.into_seqops_error());
    }
    let mut failures = failures.into_inner();
    failures.sort_by_key(|failure| failure.index);
    Ok(failures)
}

#[derive(thiserror::Error, Debug)]
#[error("A worker thread panicked")]
struct WorkerPanic;

/// Cancels the run when a worker unwinds, so no sibling waits on it forever
struct CancelOnPanic<'a>(&'a CancelToken);
impl Drop for CancelOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.cancel();
        }
    }
}

/// How often a waiting worker re-checks the cancellation flag
const TURN_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Default)]
struct TurnState {
    /// Lowest unit that has not completed yet
    next: usize,
    /// Completed units at or above `next`
    done: BTreeSet<usize>,
}

/// Lets workers commit their units in list order
///
/// A worker calls [`UnitSequencer::wait_turn`] before its first write and
/// [`UnitSequencer::complete`] once its unit is over, whatever the outcome.
/// Units are handed out in list order, so the lowest unfinished unit is always
/// running and never waits.
#[derive(Debug, Default)]
pub struct UnitSequencer {
    state: Mutex<TurnState>,
    turn: Condvar,
}
impl UnitSequencer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until every unit before `index` has completed
    ///
    /// Returns `false` if the run was cancelled while waiting.
    pub fn wait_turn(&self, index: usize, cancel: &CancelToken) -> bool {
        let mut state = self.state.lock();
        while state.next < index {
            if cancel.is_cancelled() {
                return false;
            }
            self.turn.wait_for(&mut state, TURN_POLL);
        }
        true
    }

    /// Marks `index` as completed and wakes the waiting workers
    pub fn complete(&self, index: usize) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.done.insert(index);
        while state.done.remove(&state.next) {
            state.next += 1;
        }
        drop(guard);
        self.turn.notify_all();
    }

    /// Index of the lowest unit that has not completed
    #[must_use]
    pub fn next(&self) -> usize {
        self.state.lock().next
    }
}

#[cfg(test)]
mod testing {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::ReadError;

    #[derive(Clone, Default)]
    struct TestProcessor {
        tid: Option<usize>,
        pub seen: Arc<Mutex<Vec<usize>>>,
        pub flushes: Arc<Mutex<usize>>,
    }
    impl ParallelProcessor for TestProcessor {
        type Unit = u64;

        fn process_unit(&mut self, index: usize, unit: &u64) -> Result<()> {
            if *unit == 13 {
                return Err(ReadError::UnsupportedFormat("unlucky".into()).into());
            }
            self.seen.lock().push(index);
            Ok(())
        }

        fn on_batch_complete(&mut self) -> Result<()> {
            *self.flushes.lock() += 1;
            Ok(())
        }

        fn set_tid(&mut self, tid: usize) {
            self.tid = Some(tid);
        }

        fn get_tid(&self) -> Option<usize> {
            self.tid
        }
    }

    #[test]
    fn test_every_unit_processed_once() -> Result<()> {
        let units: Vec<u64> = (0..50).collect();
        let processor = TestProcessor::default();
        let failures = process_parallel(&units, &processor, 4, &CancelToken::new())?;
        assert!(failures.is_empty());

        let mut seen = processor.seen.lock().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
        assert_eq!(*processor.flushes.lock(), 50);
        Ok(())
    }

    #[test]
    fn test_single_worker_keeps_order() -> Result<()> {
        let units: Vec<u64> = (0..10).collect();
        let processor = TestProcessor::default();
        process_parallel(&units, &processor, 1, &CancelToken::new())?;
        assert_eq!(*processor.seen.lock(), (0..10).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_failures_do_not_stop_siblings() -> Result<()> {
        let units: Vec<u64> = vec![1, 13, 2, 13, 3];
        let processor = TestProcessor::default();
        let failures = process_parallel(&units, &processor, 2, &CancelToken::new())?;
        assert_eq!(
            failures.iter().map(|f| f.index).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(processor.seen.lock().len(), 3);
        // failed units are still flushed
        assert_eq!(*processor.flushes.lock(), 5);
        Ok(())
    }

    #[test]
    fn test_cancelled_before_start() -> Result<()> {
        let units: Vec<u64> = (0..10).collect();
        let processor = TestProcessor::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        process_parallel(&units, &processor, 0, &cancel)?;
        assert!(processor.seen.lock().is_empty());
        Ok(())
    }

    #[derive(Clone)]
    struct OrderedProcessor {
        sequencer: Arc<UnitSequencer>,
        committed: Arc<Mutex<Vec<usize>>>,
        cancel: CancelToken,
        unit: usize,
    }
    impl ParallelProcessor for OrderedProcessor {
        type Unit = u64;

        fn process_unit(&mut self, index: usize, unit: &u64) -> Result<()> {
            self.unit = index;
            // later units finish their own work first
            std::thread::sleep(Duration::from_millis(*unit));
            if self.sequencer.wait_turn(index, &self.cancel) {
                self.committed.lock().push(index);
            }
            Ok(())
        }

        fn on_batch_complete(&mut self) -> Result<()> {
            self.sequencer.complete(self.unit);
            Ok(())
        }
    }

    #[test]
    fn test_sequencer_commits_in_unit_order() -> Result<()> {
        let units: Vec<u64> = (0..8).map(|i| 40 - 5 * i).collect();
        let processor = OrderedProcessor {
            sequencer: Arc::new(UnitSequencer::new()),
            committed: Arc::new(Mutex::new(Vec::new())),
            cancel: CancelToken::new(),
            unit: 0,
        };
        process_parallel(&units, &processor, 4, &processor.cancel)?;
        assert_eq!(*processor.committed.lock(), (0..8).collect::<Vec<_>>());
        assert_eq!(processor.sequencer.next(), 8);
        Ok(())
    }

    #[test]
    fn test_sequencer_out_of_order_completion() {
        let sequencer = UnitSequencer::new();
        sequencer.complete(2);
        sequencer.complete(1);
        assert_eq!(sequencer.next(), 0);
        sequencer.complete(0);
        assert_eq!(sequencer.next(), 3);

        let cancel = CancelToken::new();
        assert!(sequencer.wait_turn(3, &cancel));
        cancel.cancel();
        assert!(!sequencer.wait_turn(5, &cancel));
    }

    #[test]
    fn test_resolve_threads() {
        assert_eq!(resolve_threads(3), 3);
        assert!(resolve_threads(0) >= 1);
    }
}
