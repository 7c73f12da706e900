//! Concurrency tests for the dispatcher and balancer.
//!
//! Many tasks dispatch and complete jobs against one shared balancer. The
//! final state must account for every job exactly once and no worker window
//! may exceed its bound.

use std::sync::{Arc, Once};

use simlb_balancer::{
    AdaptiveWeightBalancer, BalancerConfig, BalancerError, Dispatcher, JobId, WorkerId,
};

static TRACING_INIT: Once = Once::new();

/// Controlled by `RUST_LOG` (e.g. `RUST_LOG=simlb_balancer=debug`).
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

fn shared_dispatcher(window_size: usize) -> Arc<Dispatcher> {
    let config = BalancerConfig::default().with_window_size(window_size);
    let lb = AdaptiveWeightBalancer::new(config).unwrap();
    for (id, mips) in [(0, 500.0), (1, 1000.0), (2, 1500.0), (3, 2000.0)] {
        lb.register(WorkerId(id), mips).unwrap();
    }
    Arc::new(Dispatcher::new(Arc::new(lb)))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_dispatch_accounts_for_every_job() {
    init_tracing();
    let dispatcher = shared_dispatcher(5);

    let mut handles = Vec::new();
    for task in 0..8u64 {
        let dispatcher = dispatcher.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..100u64 {
                let job = JobId(task * 1000 + i);
                let assignment = dispatcher.dispatch(job).unwrap();
                let capacity = dispatcher
                    .balancer()
                    .capacity_factor_of(assignment.worker)
                    .unwrap();
                let execution_time = 10_000.0 / capacity;
                dispatcher.complete(job, execution_time).unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(dispatcher.in_flight(), 0);

    let snap = dispatcher.balancer().snapshot();
    assert_eq!(snap.total_completions(), 800);
    let selections: u64 = snap.workers.iter().map(|w| w.selections).sum();
    assert_eq!(selections, 800);
    for w in &snap.workers {
        assert!(w.samples.len() <= 5, "{} holds {} samples", w.worker, w.samples.len());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reports_and_selections_stay_consistent() {
    init_tracing();
    let dispatcher = shared_dispatcher(3);
    let lb = dispatcher.balancer().clone();

    let reporter = {
        let lb = lb.clone();
        tokio::spawn(async move {
            for i in 0..500 {
                let worker = WorkerId(i % 4);
                lb.report_completion(worker, f64::from(i % 7) + 1.0).unwrap();
            }
        })
    };
    let selector = {
        let lb = lb.clone();
        tokio::spawn(async move {
            for _ in 0..500 {
                let worker = lb.select_worker().unwrap();
                assert!(worker.0 < 4);
            }
        })
    };
    reporter.await.unwrap();
    selector.await.unwrap();

    let snap = lb.snapshot();
    assert_eq!(snap.total_completions(), 500);
    for w in &snap.workers {
        assert_eq!(w.samples.len(), 3);
        let mean = w.samples.iter().sum::<f64>() / 3.0;
        assert_eq!(w.moving_average, Some(mean));
    }
}

#[tokio::test]
async fn empty_pool_error_is_retryable_after_registration() {
    init_tracing();
    let dispatcher = Dispatcher::new(Arc::new(AdaptiveWeightBalancer::default()));

    let err = dispatcher.dispatch(JobId(1)).unwrap_err();
    assert_eq!(err, BalancerError::NoWorkersAvailable);
    assert!(err.is_retryable());

    dispatcher.balancer().register(WorkerId(4), 750.0).unwrap();
    let assignment = dispatcher.dispatch(JobId(1)).unwrap();
    assert_eq!(assignment.worker, WorkerId(4));
}
