use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use forcelink_controller::{
    run_dependent, run_grid, run_independent, ControllerConfig, ControllerError, GridPhase,
    Readiness, IDLE_ABORT_CODE,
};
use forcelink_proto::transport::{Channel, MemoryWorld, World, EXCHANGE_COLOR};
use forcelink_proto::wire::{AtomState, ForceDelta};
use forcelink_proto::{deregister, exchange_forces, exchange_grid, register, ExchangeError};

fn atom_at(x: f64) -> AtomState {
    AtomState {
        x,
        ..AtomState::default()
    }
}

#[test]
fn independent_identity_controller_leaves_forces_unchanged() {
    let worlds = MemoryWorld::group(2);
    let controller_channel = worlds[1].split(EXCHANGE_COLOR).expect("split");
    let controller = thread::spawn(move || {
        run_independent(
            &controller_channel,
            &ControllerConfig::default(),
            |_atom| ForceDelta::default(),
        )
    });

    let worker = worlds[0].split(EXCHANGE_COLOR).expect("split");
    let controller_rank = register(&worker).expect("register");
    assert_eq!(controller_rank, 1);

    let deltas = exchange_forces(
        &worker,
        &[atom_at(1.0), atom_at(2.0)],
        0.0,
        controller_rank,
    )
    .expect("exchange");
    assert_eq!(deltas, vec![ForceDelta::default(), ForceDelta::default()]);

    deregister(&worker, controller_rank);
    controller
        .join()
        .expect("join")
        .expect("controller exits cleanly");
}

#[test]
fn independent_shift_controller_reports_the_shift() {
    let worlds = MemoryWorld::group(2);
    let controller_channel = worlds[1].split(EXCHANGE_COLOR).expect("split");
    let controller = thread::spawn(move || {
        run_independent(&controller_channel, &ControllerConfig::default(), |_atom| {
            ForceDelta {
                dfx: 1.5,
                dfy: -0.5,
                dfz: 0.0,
            }
        })
    });

    let worker = worlds[0].split(EXCHANGE_COLOR).expect("split");
    let controller_rank = register(&worker).expect("register");
    let deltas = exchange_forces(&worker, &[atom_at(0.0)], 0.0, controller_rank).expect("exchange");
    assert_eq!(deltas.len(), 1);
    assert_eq!(deltas[0].dfx, 1.5);
    assert_eq!(deltas[0].dfy, -0.5);
    assert_eq!(deltas[0].dfz, 0.0);

    deregister(&worker, controller_rank);
    controller.join().expect("join").expect("controller exits");
}

#[test]
fn idle_controller_aborts_with_code_ten() {
    let worlds = MemoryWorld::group(2);
    let controller_channel = worlds[1].split(EXCHANGE_COLOR).expect("split");
    let config = ControllerConfig {
        idle_timeout_ms: 30,
        ..ControllerConfig::default()
    };
    let outcome = run_independent(&controller_channel, &config, |_atom| ForceDelta::default());
    assert!(matches!(
        outcome,
        Err(ControllerError::IdleTimeout { ms: 30 })
    ));

    // The abort reached the shared context.
    let bystander = worlds[0].split(EXCHANGE_COLOR).expect("split");
    match bystander.try_probe() {
        Err(ExchangeError::Aborted(code)) => assert_eq!(code, IDLE_ABORT_CODE),
        other => panic!("expected abort, got {other:?}"),
    }
}

#[test]
fn dependent_controller_synchronizes_two_workers() {
    let worlds = MemoryWorld::group(3);
    let controller_channel = worlds[2].split(EXCHANGE_COLOR).expect("split");

    let gather_log: Arc<Mutex<Vec<Vec<f64>>>> = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&gather_log);
    let controller = thread::spawn(move || {
        run_dependent(
            &controller_channel,
            &ControllerConfig::default(),
            move |all| {
                log.lock()
                    .expect("log")
                    .push(all.iter().map(|atom| atom.x).collect());
                Readiness::Ready
            },
            |index| ForceDelta {
                dfx: (index + 1) as f64 * 10.0,
                dfy: 0.0,
                dfz: 0.0,
            },
        )
    });

    let worker_a = worlds[0].split(EXCHANGE_COLOR).expect("split");
    let worker_b = worlds[1].split(EXCHANGE_COLOR).expect("split");
    let rank_a = register(&worker_a).expect("register a");
    let rank_b = register(&worker_b).expect("register b");
    assert_eq!(rank_a, 2);
    assert_eq!(rank_b, 2);

    // Worker A reports first and has to sit through `waiting` packets until
    // worker B arrives.
    let first = thread::spawn(move || {
        let deltas = exchange_forces(&worker_a, &[atom_at(1.0)], 0.0, rank_a);
        deregister(&worker_a, rank_a);
        deltas
    });
    thread::sleep(Duration::from_millis(50));
    let deltas_b = exchange_forces(
        &worker_b,
        &[atom_at(2.0), atom_at(3.0)],
        0.0,
        rank_b,
    )
    .expect("exchange b");
    deregister(&worker_b, rank_b);
    let deltas_a = first.join().expect("join").expect("exchange a");

    // Global indices follow ascending rank order: worker A's atom is index 0,
    // and worker B's slice keeps its within-batch order.
    assert_eq!(deltas_a[0].dfx, 10.0);
    assert_eq!(deltas_b[0].dfx, 20.0);
    assert_eq!(deltas_b[1].dfx, 30.0);

    controller.join().expect("join").expect("controller exits");

    let rounds = gather_log.lock().expect("log");
    assert_eq!(rounds.len(), 1, "bulk callback runs once per round");
    assert_eq!(rounds[0], vec![1.0, 2.0, 3.0]);
}

#[test]
fn dependent_controller_retries_until_ready() {
    let worlds = MemoryWorld::group(2);
    let controller_channel = worlds[1].split(EXCHANGE_COLOR).expect("split");
    let polls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&polls);
    let controller = thread::spawn(move || {
        run_dependent(
            &controller_channel,
            &ControllerConfig::default(),
            move |_all| {
                if seen.fetch_add(1, Ordering::SeqCst) < 2 {
                    Readiness::NotReady
                } else {
                    Readiness::Ready
                }
            },
            |_index| ForceDelta {
                dfx: 7.0,
                dfy: 0.0,
                dfz: 0.0,
            },
        )
    });

    let worker = worlds[0].split(EXCHANGE_COLOR).expect("split");
    let controller_rank = register(&worker).expect("register");
    let deltas = exchange_forces(&worker, &[atom_at(0.0)], 0.0, controller_rank).expect("exchange");
    assert_eq!(deltas[0].dfx, 7.0);
    deregister(&worker, controller_rank);

    controller.join().expect("join").expect("controller exits");
    assert_eq!(polls.load(Ordering::SeqCst), 3);
}

#[test]
fn grid_controller_serves_a_full_pass() {
    let worlds = MemoryWorld::group(2);
    let controller_channel = worlds[1].split(EXCHANGE_COLOR).expect("split");
    let phases: Arc<Mutex<Vec<GridPhase>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&phases);
    let controller = thread::spawn(move || {
        run_grid(
            &controller_channel,
            &ControllerConfig::default(),
            Some(4),
            move |phase, query, snapshot, _position| {
                assert_eq!(query.node_counts, [2, 2, 2]);
                assert!(snapshot.is_empty());
                seen.lock().expect("phases").push(phase);
                [0.0, -2.0, 0.0]
            },
        )
    });

    let worker = worlds[0].split(EXCHANGE_COLOR).expect("split");
    let controller_rank = register(&worker).expect("register");
    let reply = exchange_grid(
        &worker,
        [0.0; 3],
        [10.0; 3],
        [2, 2, 2],
        None,
        controller_rank,
    )
    .expect("grid exchange");

    assert_eq!(reply.nodes.len(), 8);
    assert!(reply.nodes.iter().all(|node| node.dfy == -2.0));
    assert_eq!(reply.every, Some(4));
    // x-outer, y-middle, z-inner ordering.
    assert_eq!(
        (reply.nodes[0].x_index, reply.nodes[0].y_index, reply.nodes[0].z_index),
        (0, 0, 0)
    );
    assert_eq!(
        (reply.nodes[1].x_index, reply.nodes[1].y_index, reply.nodes[1].z_index),
        (0, 0, 1)
    );
    assert_eq!(
        (reply.nodes[7].x_index, reply.nodes[7].y_index, reply.nodes[7].z_index),
        (1, 1, 1)
    );

    deregister(&worker, controller_rank);
    controller.join().expect("join").expect("controller exits");

    let phases = phases.lock().expect("phases");
    assert_eq!(phases.len(), 8);
    assert_eq!(phases[0], GridPhase::First);
    assert!(phases[1..].iter().all(|phase| *phase == GridPhase::Middle));
}
