// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for queue churn and history (de)serialisation in the
// stapeldruck-print crate.

use std::path::Path;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use stapeldruck_core::types::PrintSettings;
use stapeldruck_print::history::{load_history, save_history};
use stapeldruck_print::{PrintQueue, PrintTask};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A queue whose completed list holds `n` finished tasks.
fn finished_queue(dir: &Path, n: usize) -> PrintQueue {
    let mut queue = PrintQueue::new(dir.join("setup.json"));
    for i in 0..n {
        queue.add_task(PrintTask::new(
            format!("C:/batch/document-{i:04}.pdf"),
            PrintSettings::default(),
        ));
        queue.start_next_task();
        if i % 10 == 0 {
            queue.fail_current_task("paper jam");
        } else {
            queue.complete_current_task();
        }
    }
    queue
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Add 100 tasks and drain them through start and cancel, history writes
/// included.
fn bench_queue_churn(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = PrintSettings::default();

    c.bench_function("queue add/start/cancel x100 (persisted)", |b| {
        b.iter(|| {
            let mut queue = PrintQueue::new(dir.path().join("churn.json"));
            let ids: Vec<_> = (0..100)
                .map(|i| queue.add_task(PrintTask::new(format!("/f/{i}.pdf"), settings.clone())))
                .collect();
            for id in ids {
                queue.start_next_task();
                let _ = queue.cancel_task(black_box(id));
            }
            black_box(queue.completed().len())
        });
    });
}

/// Serialise and parse a 500-entry history.
fn bench_history_io(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("print_history.json");
    let queue = finished_queue(dir.path(), 500);

    c.bench_function("history save (500 tasks)", |b| {
        b.iter(|| save_history(black_box(&path), queue.completed()).expect("save"));
    });

    save_history(&path, queue.completed()).expect("save");
    c.bench_function("history load (500 tasks)", |b| {
        b.iter(|| black_box(load_history(&path).expect("load")));
    });
}

criterion_group!(benches, bench_queue_churn, bench_history_io);
criterion_main!(benches);
