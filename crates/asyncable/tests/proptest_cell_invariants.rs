//! Property-based invariant tests for cells and dependency parsing.
//!
//! 1. Repeated reads with unchanged dependencies run the getter once.
//! 2. The getter runs once per distinct dependency value.
//! 3. The last write wins, however many writes are in flight.
//! 4. A failed write restores the previous value.
//! 5. Parsing preserves order and only reflects flagged cells.

use std::cell::Cell;
use std::rc::Rc;

use asyncable::deps::parse;
use asyncable::prelude::*;
use futures::executor::LocalPool;
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn counting_cell(config: &CellConfig, value: i32) -> (AsyncReadable<i32>, Rc<Cell<u32>>) {
    let calls = Rc::new(Cell::new(0));
    let c = Rc::clone(&calls);
    let cell = AsyncReadable::independent(config, move |_| {
        c.set(c.get() + 1);
        async move { Ok::<_, String>(value) }
    });
    (cell, calls)
}

fn rejecting_cell(config: &CellConfig, initial: i32) -> AsyncWritable<i32> {
    AsyncWritable::independent(
        config,
        move |_| async move { Ok::<_, String>(initial) },
        |_, (new, _): (i32, Option<i32>)| async move { Err::<Option<i32>, _>(format!("refused {new}")) },
    )
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Idempotent refresh
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn repeated_reads_run_getter_once(value in any::<i32>(), reads in proptest::collection::vec(any::<bool>(), 1..16)) {
        let mut pool = LocalPool::new();
        let config = CellConfig::new(pool.spawner());
        let (cell, calls) = counting_cell(&config, value);

        for subscribe in reads {
            if subscribe {
                let sub = cell.subscribe(|_| {});
                pool.run_until_stalled();
                drop(sub);
            } else {
                let got = pool.run_until(cell.get().settle());
                prop_assert_eq!(got.ok(), Some(value));
            }
        }
        pool.run_until_stalled();
        prop_assert_eq!(calls.get(), 1);
        prop_assert_eq!(cell.peek(), Some(value));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. One getter call per distinct dependency value
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn getter_runs_per_distinct_input(inputs in proptest::collection::vec(0i32..4, 1..24)) {
        let mut pool = LocalPool::new();
        let config = CellConfig::new(pool.spawner());
        let source = Observable::new(inputs[0]);
        let calls = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&calls);
        let squared = asyncable(&config, &source, move |_, parents: Vec<i32>| {
            c.set(c.get() + 1);
            async move { Ok::<_, String>(parents[0] * parents[0]) }
        });
        let _sub = squared.subscribe(|_| {});
        pool.run_until_stalled();

        let mut expected = 1;
        for pair in inputs.windows(2) {
            if pair[0] != pair[1] {
                expected += 1;
            }
            source.set(pair[1]);
            pool.run_until_stalled();
        }
        let last = inputs[inputs.len() - 1];
        prop_assert_eq!(calls.get(), expected);
        prop_assert_eq!(squared.peek(), Some(last * last));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Last write wins
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn last_write_wins(writes in proptest::collection::vec(any::<i16>(), 1..12), interleave in any::<bool>()) {
        let mut pool = LocalPool::new();
        let config = CellConfig::new(pool.spawner());
        let cell = AsyncWritable::independent(
            &config,
            |_| async { Ok::<_, String>(0i16) },
            |_, _| async { Ok::<_, String>(None) },
        );

        let mut outcomes = Vec::with_capacity(writes.len());
        for &value in &writes {
            outcomes.push(cell.set(value));
            if interleave {
                pool.run_until_stalled();
            }
        }
        for outcome in outcomes {
            prop_assert!(pool.run_until(outcome).is_ok());
        }
        let last = writes[writes.len() - 1];
        prop_assert_eq!(cell.peek(), Some(last));
        prop_assert_eq!(cell.get(), last);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Rollback
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn failed_write_restores_previous(initial in any::<i32>(), attempted in any::<i32>()) {
        prop_assume!(initial != attempted);
        let mut pool = LocalPool::new();
        let config = CellConfig::new(pool.spawner());
        let cell = rejecting_cell(&config, initial);
        prop_assert_eq!(pool.run_until(cell.update()).ok(), Some(initial));

        let outcome = pool.run_until(cell.set(attempted));
        let is_setter_error = matches!(outcome, Err(CellError::Setter(_)));
        prop_assert!(is_setter_error);
        prop_assert_eq!(cell.peek(), Some(initial));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Parsing
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn parse_keeps_order_and_filters_reflections(
        entries in proptest::collection::vec((any::<bool>(), any::<bool>()), 0..10)
    ) {
        let pool = LocalPool::new();
        let config = CellConfig::new(pool.spawner());
        let mut deps = Vec::with_capacity(entries.len());
        let mut expected_reflections = 0;
        for (index, &(is_cell, reflect)) in entries.iter().enumerate() {
            let value = i32::try_from(index).unwrap_or(i32::MAX);
            if is_cell {
                let (cell, _) = counting_cell(&config, value);
                deps.push(Dep::new(cell, reflect));
                if reflect {
                    expected_reflections += 1;
                }
            } else {
                deps.push(Dep::new(Observable::new(value), reflect));
            }
        }
        let sources: Vec<_> = deps.iter().map(|d| Rc::clone(d.source())).collect();

        let parsed = parse(deps);
        prop_assert_eq!(parsed.stores.len(), entries.len());
        prop_assert_eq!(parsed.reflections.len(), expected_reflections);
        for (got, want) in parsed.stores.iter().zip(&sources) {
            prop_assert!(std::ptr::addr_eq(Rc::as_ptr(got), Rc::as_ptr(want)));
        }
    }
}
