//! End-to-end schedule scenario: a full training protocol driven
//! against the cosine warm-restart scheduler, checked epoch by epoch.

use apilar::optim::{CosineRestarts, Optimizer, ParamGroup, RestartOptions, Sgd};
use apilar::Error;
use approx::assert_abs_diff_eq;

fn optimizer(lr: f32, weight_decay: f32) -> Sgd {
    Sgd::new(vec![ParamGroup::new(vec![], lr, weight_decay)], 0.0)
}

#[test]
fn scenario_restart_after_five_epochs_then_longer_period() {
    // 100 samples at batch 32: 3 whole batches plus remainder, so the
    // increment sequence holds 5 slots per epoch (epoch_step + 4 steps)
    let mut opt = optimizer(0.1, 0.01);
    let mut sched = CosineRestarts::new(&mut opt, 32, 100, 5.0, 1.0, 10.0).unwrap();

    let min_lr = 1e-7_f32;
    let mut restart_epochs = Vec::new();

    for epoch in 0..12 {
        let mut restarted = sched.epoch_step(&mut opt).unwrap();
        for _ in 0..4 {
            restarted |= sched.step(&mut opt).unwrap();

            let lr = opt.param_groups()[0].lr;
            assert!(lr >= min_lr, "lr {lr} fell below the floor in epoch {epoch}");
            assert!(lr <= 0.1 + 1e-6, "lr {lr} exceeded the base rate in epoch {epoch}");
        }
        if restarted {
            restart_epochs.push(epoch);
        }
    }

    // First period is 5 epochs, the next one 6
    assert_eq!(restart_epochs[0], 5);
    assert_eq!(restart_epochs[1], 11);
    assert_abs_diff_eq!(sched.restart_period(), 7.0, epsilon = 1e-6);
    assert_eq!(sched.restarts(), 2);
}

#[test]
fn scenario_schedule_symmetric_within_period() {
    let mut opt = optimizer(0.1, 0.0);
    let mut sched = CosineRestarts::new(&mut opt, 25, 100, 2.0, 0.0, 2.0).unwrap();

    // Collect the lr at every step of one full 2-epoch period
    let mut lrs = Vec::new();
    for _ in 0..2 {
        sched.epoch_step(&mut opt).unwrap();
        lrs.push(opt.param_groups()[0].lr);
        for _ in 0..4 {
            sched.step(&mut opt).unwrap();
            lrs.push(opt.param_groups()[0].lr);
        }
    }

    // Half-cosine: starts at the base rate, decays through half
    // amplitude at the period midpoint
    assert_abs_diff_eq!(lrs[0], 0.1, epsilon = 1e-6);
    assert_abs_diff_eq!(lrs[5], 0.05, epsilon = 1e-6);
    assert!(lrs.windows(2).all(|w| w[1] <= w[0] + 1e-6), "lr must decay within a period");
}

#[test]
fn scenario_weight_decay_tracks_lr_with_normalization() {
    let mut opt = optimizer(0.1, 0.01);
    let mut sched = CosineRestarts::new(&mut opt, 32, 1024, 5.0, 1.0, 10.0).unwrap();

    sched.epoch_step(&mut opt).unwrap();

    let norm = (32.0_f32 / (1024.0 * 5.0)).sqrt();
    let group = &opt.param_groups()[0];
    assert_abs_diff_eq!(group.weight_decay, 0.01 * norm, epsilon = 1e-8);

    // One epoch in, both rates have moved by the same eta factor
    sched.epoch_step(&mut opt).unwrap();
    let group = &opt.param_groups()[0];
    let eta = group.lr / 0.1;
    assert_abs_diff_eq!(group.weight_decay, 0.01 * eta * norm, epsilon = 1e-7);
}

#[test]
fn scenario_phase_resets_immediately_after_restart() {
    let mut opt = optimizer(0.1, 0.0);
    let mut sched = CosineRestarts::new(&mut opt, 25, 100, 2.0, 0.0, 2.0).unwrap();

    // Epochs 0 and 1 walk the cosine down; epoch 2's first position
    // wraps the period and triggers the restart
    let mut restarted = false;
    for _ in 0..2 {
        restarted = sched.epoch_step(&mut opt).unwrap();
        for _ in 0..4 {
            restarted |= sched.step(&mut opt).unwrap();
        }
    }
    assert!(!restarted);
    let pre_restart_lr = opt.param_groups()[0].lr;

    restarted = sched.epoch_step(&mut opt).unwrap();
    assert!(restarted);

    // The very next step already anneals from the top of a new period:
    // t_cur = 0 + 0.25 instead of 2.25
    sched.step(&mut opt).unwrap();
    let post_restart_lr = opt.param_groups()[0].lr;
    assert!(post_restart_lr > 0.09, "lr {post_restart_lr} did not jump back near the peak");
    assert!(pre_restart_lr < 0.01, "lr {pre_restart_lr} should have decayed before the restart");
}

#[test]
fn scenario_resume_requires_frozen_initial_lr() {
    let mut opt = optimizer(0.1, 0.01);
    let err = CosineRestarts::with_options(
        &mut opt,
        32,
        1024,
        RestartOptions { last_epoch: Some(10), ..RestartOptions::default() },
    )
    .unwrap_err();

    match err {
        Error::InitError(msg) => assert!(msg.contains("param group 0")),
        other => panic!("expected InitError, got {other}"),
    }

    // Freezing the rate first makes the same resume valid
    opt.param_groups_mut()[0].initial_lr = Some(0.1);
    let sched = CosineRestarts::with_options(
        &mut opt,
        32,
        1024,
        RestartOptions { last_epoch: Some(10), ..RestartOptions::default() },
    )
    .unwrap();
    assert_eq!(sched.last_epoch(), 10);
}

#[test]
fn scenario_protocol_violation_surfaces_immediately() {
    let mut opt = optimizer(0.1, 0.0);
    let mut sched = CosineRestarts::new(&mut opt, 32, 64, 5.0, 1.0, 10.0).unwrap();

    // 64 samples at batch 32: 3 increments per epoch
    sched.epoch_step(&mut opt).unwrap();
    sched.step(&mut opt).unwrap();
    sched.step(&mut opt).unwrap();

    assert!(matches!(sched.step(&mut opt), Err(Error::BatchIncrementExhausted)));
}
