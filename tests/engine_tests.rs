//! End-to-end runs of the engine

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pgaevo::prelude::*;
use pgaevo::registry::{cancel, live_runs};

fn onemax(c: &Chromosome) -> f64 {
    c.as_binary()
        .map_or(0.0, |bits| bits.iter().filter(|&&b| b).count() as f64)
}

/// Two conflicting objectives on a real line (Schaffer's problem)
fn schaffer(c: &Chromosome) -> CallbackResult<Vec<f64>> {
    let x = c.as_real().map_or(0.0, |v| v[0]);
    Ok(vec![x * x, (x - 2.0) * (x - 2.0)])
}

#[test]
fn test_every_replacement_policy_completes() {
    for replacement in [
        ReplacementType::Best,
        ReplacementType::RandomRep,
        ReplacementType::RandomNoRep,
        ReplacementType::Rtr,
        ReplacementType::PairwiseBest,
    ] {
        let mut engine = GaEngine::builder(GeneType::Binary, 20)
            .population_size(20)
            .max_iterations(25)
            .replacement(replacement)
            .random_seed(42)
            .objective(onemax)
            .build()
            .unwrap();
        let summary = engine.run().unwrap();
        assert_eq!(summary.iterations, 25, "{replacement:?}");
        assert_eq!(engine.population(PopId::Old).len(), 20);
        assert!(engine
            .population(PopId::Old)
            .iter()
            .all(|ind| ind.is_evaluated()));
    }
}

#[test]
fn test_every_selection_scheme_completes() {
    for select_type in [
        SelectType::Proportional,
        SelectType::Sus,
        SelectType::Tournament,
        SelectType::PTournament,
        SelectType::Truncation,
        SelectType::Linear,
    ] {
        let mut engine = GaEngine::builder(GeneType::Binary, 16)
            .population_size(20)
            .max_iterations(10)
            .selection(select_type)
            .random_seed(42)
            .objective(onemax)
            .build()
            .unwrap();
        assert_eq!(engine.run().unwrap().iterations, 10, "{select_type:?}");
    }
}

/// Parents of one generation, read from allele 0 which holds each slot's index
fn parents_of_first_generation(select_type: SelectType, randomize: bool) -> Vec<i64> {
    let parents = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&parents);
    let mut engine = GaEngine::builder(GeneType::Integer, 2)
        .population_size(100)
        .max_iterations(1)
        .selection(select_type)
        .randomize_select(randomize)
        .mixing(MixingPolicy::MutationOnly)
        .random_seed(42)
        .callbacks(
            UserCallbacks::new()
                .with_objective(|_| 1.0)
                .with_mutate(move |c, _, _| {
                    if let Ok(Allele::Integer(tag)) = c.get(0) {
                        seen.lock().unwrap().push(tag);
                    }
                    Ok(1)
                }),
        )
        .build()
        .unwrap();
    engine.initialize();
    for p in 0..100 {
        engine
            .set_allele(p, PopId::Old, 0, Allele::Integer(p as i64))
            .unwrap();
    }
    engine.run().unwrap();
    let parents = parents.lock().unwrap().clone();
    parents
}

#[test]
fn test_partial_parent_draw_spans_population() {
    for randomize in [false, true] {
        let parents = parents_of_first_generation(SelectType::Sus, randomize);
        assert_eq!(parents.len(), 10);
        assert!(
            parents.iter().any(|&p| p >= 10),
            "randomize_select={randomize}: {parents:?}"
        );
    }

    let parents = parents_of_first_generation(SelectType::Linear, true);
    assert!(parents.iter().any(|&p| p >= 10), "{parents:?}");
}

#[test]
fn test_elitist_best_never_regresses() {
    let mut engine = GaEngine::builder(GeneType::Binary, 40)
        .population_size(30)
        .max_iterations(50)
        .random_seed(11)
        .objective(onemax)
        .build()
        .unwrap();
    let summary = engine.run().unwrap();
    let history = summary.stats.best_evaluation_history();
    assert!(history.windows(2).all(|w| w[1] >= w[0]));
}

#[test]
fn test_nsga2_spreads_along_front() {
    let mut engine = GaEngine::builder(GeneType::Real, 2)
        .population_size(40)
        .max_iterations(40)
        .direction(Direction::Minimize)
        .num_aux_eval(1)
        .replacement(ReplacementType::Nsga2)
        .crossover(CrossoverType::Sbx)
        .init_range(vec![Bounds::new(-10.0, 10.0); 2])
        .random_seed(42)
        .evaluate(schaffer)
        .build()
        .unwrap();
    engine.run().unwrap();

    let pop = engine.population(PopId::Old);
    let on_front = pop.iter().filter(|ind| ind.front() == Some(0)).count();
    assert!(on_front > pop.len() / 2);
    // Pareto-optimal solutions lie in [0, 2]
    let xs: Vec<f64> = pop
        .iter()
        .filter(|ind| ind.front() == Some(0))
        .map(|ind| ind.chromosome().as_real().unwrap()[0])
        .collect();
    assert!(xs.iter().all(|&x| (-0.5..=2.5).contains(&x)));
}

#[test]
fn test_nsga3_with_reference_points() {
    let reference_points = das_dennis(2, 8).unwrap();
    let mut engine = GaEngine::builder(GeneType::Real, 2)
        .population_size(20)
        .max_iterations(30)
        .direction(Direction::Minimize)
        .num_aux_eval(1)
        .replacement(ReplacementType::Nsga3)
        .reference_points(reference_points)
        .init_range(vec![Bounds::new(-5.0, 5.0); 2])
        .random_seed(7)
        .evaluate(schaffer)
        .build()
        .unwrap();
    let summary = engine.run().unwrap();
    assert_eq!(summary.iterations, 30);
    assert!(engine
        .population(PopId::Old)
        .iter()
        .any(|ind| ind.front() == Some(0)));
}

#[test]
fn test_nsga3_without_points_is_rejected() {
    let err = GaEngine::builder(GeneType::Real, 2)
        .num_aux_eval(1)
        .replacement(ReplacementType::Nsga3)
        .evaluate(schaffer)
        .build()
        .unwrap_err();
    assert!(matches!(err, EngineError::Setup(SetupError::ReferencePoints(_))));
}

#[test]
fn test_constraints_drive_toward_feasibility() {
    // Maximize the bit count subject to at most 10 ones
    let mut engine = GaEngine::builder(GeneType::Binary, 30)
        .population_size(30)
        .max_iterations(200)
        .num_aux_eval(1)
        .num_constraint(1)
        .random_seed(5)
        .evaluate(|c| {
            let ones = onemax(c);
            Ok(vec![ones, (ones - 10.0).max(0.0)])
        })
        .build()
        .unwrap();
    let summary = engine.run().unwrap();
    assert_eq!(summary.best_evaluations[1], 0.0);
    assert!(summary.best_evaluation() <= 10.0);
}

#[test]
fn test_no_duplicates_keeps_offspring_distinct() {
    let mut engine = GaEngine::builder(GeneType::Integer, 6)
        .population_size(20)
        .max_iterations(20)
        .no_duplicates(true)
        .replacement(ReplacementType::PairwiseBest)
        .random_seed(3)
        .objective(|c| c.as_integer().map_or(0.0, |v| v.iter().sum::<i64>() as f64))
        .build()
        .unwrap();
    engine.run().unwrap();
    let pop = engine.population(PopId::Old);
    let distinct = pop
        .iter()
        .filter_map(|ind| ind.chromosome().default_hash())
        .collect::<std::collections::HashSet<_>>()
        .len();
    assert!(distinct > pop.len() / 2);
}

#[test]
fn test_restart_reseeds_population() {
    let mut config = EngineConfig::new(GeneType::Binary, 24);
    config.pop_size = 20;
    config.max_ga_iter = 20;
    config.restart = true;
    config.restart_frequency = 5;
    config.random_seed = Some(9);

    let mut engine = GaEngine::builder(GeneType::Binary, 24)
        .config(config)
        .objective(onemax)
        .build()
        .unwrap();
    let summary = engine.run().unwrap();
    assert_eq!(summary.iterations, 20);
    let history = summary.stats.best_evaluation_history();
    assert!(history.windows(2).all(|w| w[1] >= w[0]));
}

#[test]
fn test_no_change_rule_stops_converged_run() {
    let mut engine = GaEngine::builder(GeneType::Binary, 8)
        .population_size(10)
        .max_iterations(10_000)
        .stopping_rules(vec![StopRule::MaxIter, StopRule::NoChange])
        .random_seed(2)
        .objective(|_| 1.0)
        .build()
        .unwrap();
    let summary = engine.run().unwrap();
    assert_eq!(summary.stop_reason, "No change in best evaluation");
    assert_eq!(summary.iterations, engine.config().max_no_change);
}

#[test]
fn test_too_similar_rule() {
    let mut engine = GaEngine::builder(GeneType::Binary, 4)
        .population_size(10)
        .max_iterations(10_000)
        .stopping_rules(vec![StopRule::MaxIter, StopRule::TooSimilar])
        .random_seed(4)
        .objective(onemax)
        .build()
        .unwrap();
    let summary = engine.run().unwrap();
    assert_eq!(summary.stop_reason, "Population too similar");
    assert!(summary.iterations < 10_000);
}

#[test]
fn test_user_hook_overrides_builtin_verdict() {
    let mut engine = GaEngine::builder(GeneType::Binary, 8)
        .population_size(6)
        .max_iterations(3)
        .random_seed(8)
        .callbacks(
            UserCallbacks::new()
                .with_objective(onemax)
                .with_stop_condition(|ctx| Ok(ctx.state.iteration >= 6)),
        )
        .build()
        .unwrap();
    let summary = engine.run().unwrap();
    assert_eq!(summary.iterations, 6);
    assert_eq!(summary.stop_reason, "Maximum iterations reached");
}

#[test]
fn test_hooks_see_every_generation() {
    let generations = Arc::new(AtomicUsize::new(0));
    let pre_evaluations = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&generations);
    let pre = Arc::clone(&pre_evaluations);

    let mut engine = GaEngine::builder(GeneType::Real, 3)
        .population_size(10)
        .max_iterations(12)
        .random_seed(1)
        .callbacks(
            UserCallbacks::new()
                .with_objective(|c| c.as_real().map_or(0.0, |v| -v.iter().map(|x| x * x).sum::<f64>()))
                .with_end_of_generation(move |_, _| {
                    counted.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .with_pre_evaluate(move |_, _| {
                    pre.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
        )
        .build()
        .unwrap();
    engine.run().unwrap();
    assert_eq!(generations.load(Ordering::SeqCst), 12);
    // Once for the initial population, then once per generation
    assert_eq!(pre_evaluations.load(Ordering::SeqCst), 13);
}

#[test]
fn test_second_run_continues() {
    let mut engine = GaEngine::builder(GeneType::Binary, 16)
        .population_size(10)
        .max_iterations(5)
        .random_seed(6)
        .objective(onemax)
        .build()
        .unwrap();
    assert_eq!(engine.run().unwrap().iterations, 5);
    engine.set_max_ga_iter(9).unwrap();
    assert_eq!(engine.run().unwrap().iterations, 9);
}

#[test]
fn test_cancel_from_another_thread() {
    let mut engine = GaEngine::builder(GeneType::Real, 4)
        .population_size(10)
        .max_iterations(usize::MAX)
        .random_seed(12)
        .parallel_evaluation(false)
        .objective(|c| {
            std::thread::sleep(std::time::Duration::from_micros(50));
            c.as_real().map_or(0.0, |v| v.iter().sum())
        })
        .build()
        .unwrap();
    let id = engine.run_id();
    assert!(live_runs().contains(&id));

    let canceller = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(50));
        cancel(id)
    });
    let result = engine.run();
    assert!(canceller.join().unwrap());
    assert!(matches!(result, Err(EngineError::Cancelled)));

    drop(engine);
    assert!(!live_runs().contains(&id));
}

#[test]
fn test_config_json_roundtrip_builds() {
    let mut config = EngineConfig::new(GeneType::Character, 12);
    config.pop_size = 12;
    config.max_ga_iter = 4;
    config.select_type = SelectType::Sus;
    config.random_seed = Some(1);
    let json = config.to_json().unwrap();
    let parsed = EngineConfig::from_json(&json).unwrap();

    let target = b"hello world!";
    let mut engine = GaEngine::builder(GeneType::Character, 12)
        .config(parsed)
        .objective(move |c| {
            c.as_character().map_or(0.0, |s| {
                s.iter().zip(target.iter()).filter(|(a, b)| a == b).count() as f64
            })
        })
        .build()
        .unwrap();
    assert_eq!(engine.run().unwrap().iterations, 4);
}

#[derive(Clone, Debug, PartialEq)]
struct Point {
    x: f64,
}

impl GeneValue for Point {
    fn clone_box(&self) -> Box<dyn GeneValue> {
        Box::new(self.clone())
    }

    fn eq_value(&self, other: &dyn GeneValue) -> bool {
        other
            .as_any()
            .downcast_ref::<Point>()
            .is_some_and(|p| p == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn point(c: &Chromosome) -> f64 {
    c.opaque_as::<Point>().map_or(f64::NAN, |p| p.x)
}

#[test]
fn test_opaque_genes_with_user_operators() {
    let callbacks = UserCallbacks::new()
        .with_objective(|c| {
            let x = point(c);
            -(x - 3.0) * (x - 3.0)
        })
        .with_initialize(|c, rng| {
            c.set_opaque(Box::new(Point {
                x: rng.uniform_real(-10.0, 10.0),
            }))?;
            Ok(())
        })
        .with_crossover(|p1, p2, c1, c2, _| {
            let mid = (point(p1) + point(p2)) / 2.0;
            c1.set_opaque(Box::new(Point { x: mid }))?;
            c2.set_opaque(Box::new(Point { x: point(p2) }))?;
            Ok(())
        })
        .with_mutate(|c, rate, rng| {
            if !rng.flip(rate) {
                return Ok(0);
            }
            let x = point(c) + rng.gaussian(0.0, 0.5);
            c.set_opaque(Box::new(Point { x }))?;
            Ok(1)
        })
        .with_gene_distance(|a, b| Ok((point(a) - point(b)).abs()));

    let mut engine = GaEngine::builder(GeneType::Opaque, 1)
        .population_size(20)
        .max_iterations(40)
        .mutation_probability(0.5)
        .random_seed(42)
        .callbacks(callbacks)
        .build()
        .unwrap();
    let summary = engine.run().unwrap();
    let initial = summary.stats.generations[0].best_evaluation;
    assert!(summary.best_evaluation() >= initial);

    let best = engine.individual(summary.best_index, PopId::Old).unwrap();
    assert!(best.chromosome().opaque_as::<Point>().is_some());
}

#[test]
fn test_opaque_without_hooks_is_rejected() {
    let err = GaEngine::builder(GeneType::Opaque, 1)
        .objective(|_| 0.0)
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Setup(SetupError::MissingHook { hook: "initialize", .. })
    ));
}

#[test]
fn test_parallel_and_serial_evaluation_agree() {
    let run = |parallel: bool| {
        let mut engine = GaEngine::builder(GeneType::Real, 5)
            .population_size(16)
            .max_iterations(10)
            .random_seed(21)
            .parallel_evaluation(parallel)
            .objective(|c| c.as_real().map_or(0.0, |v| v.iter().sum()))
            .build()
            .unwrap();
        engine.run().unwrap().stats.best_evaluation_history()
    };
    assert_eq!(run(true), run(false));
}
