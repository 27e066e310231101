//! Property-based tests for pgaevo
//!
//! Uses proptest to verify invariants and properties of the library.

use pgaevo::prelude::*;
use proptest::prelude::*;

fn evaluated(evals: Vec<f64>) -> Individual {
    let mut ind = Individual::blank(GeneType::Real, 2, evals.len());
    ind.set_evaluations(evals).unwrap();
    ind
}

proptest! {
    // ==================== Binary Codec Properties ====================

    #[test]
    fn binary_int_roundtrip(width in 1usize..=64, raw in any::<u64>()) {
        let value = if width == 64 { raw } else { raw & ((1u64 << width) - 1) };
        let mut bits = vec![false; width + 3];
        encode_int_as_binary(&mut bits, 1, width, value).unwrap();
        prop_assert_eq!(int_from_binary(&bits, 1, width).unwrap(), value);
        prop_assert!(!bits[0]);
    }

    #[test]
    fn gray_int_roundtrip(width in 1usize..=64, raw in any::<u64>()) {
        let value = if width == 64 { raw } else { raw & ((1u64 << width) - 1) };
        let mut bits = vec![false; width];
        encode_int_as_gray_code(&mut bits, 0, width - 1, value).unwrap();
        prop_assert_eq!(int_from_gray_code(&bits, 0, width - 1).unwrap(), value);
    }

    #[test]
    fn gray_neighbours_differ_in_one_bit(value in 0u64..((1u64 << 20) - 1)) {
        let diff = binary_to_gray(value) ^ binary_to_gray(value + 1);
        prop_assert_eq!(diff.count_ones(), 1);
    }

    #[test]
    fn real_gray_roundtrip_within_resolution(
        width in 4usize..=40,
        low in -100.0f64..0.0,
        span in 0.5f64..200.0,
        t in 0.0f64..=1.0,
    ) {
        let high = low + span;
        let value = low + t * span;
        let mut bits = vec![false; width];
        encode_real_as_gray_code(&mut bits, 0, width - 1, low, high, value).unwrap();
        let back = real_from_gray_code(&bits, 0, width - 1, low, high).unwrap();
        let resolution = span / ((1u64 << width) - 1) as f64;
        prop_assert!((back - value).abs() <= resolution / 2.0 + 1e-9);
    }

    // ==================== Distance Properties ====================

    #[test]
    fn real_distance_symmetric(
        genes1 in prop::collection::vec(-10.0..10.0f64, 5),
        genes2 in prop::collection::vec(-10.0..10.0f64, 5)
    ) {
        let a = Chromosome::Real(genes1);
        let b = Chromosome::Real(genes2);
        let d1 = default_distance(&a, &b);
        let d2 = default_distance(&b, &a);
        prop_assert!((d1 - d2).abs() < 1e-10);
        prop_assert!(d1 >= 0.0);
    }

    #[test]
    fn binary_distance_identity(bits in prop::collection::vec(any::<bool>(), 1..100)) {
        let c = Chromosome::Binary(bits);
        prop_assert_eq!(default_distance(&c, &c), 0.0);
    }

    // ==================== Fitness Properties ====================

    #[test]
    fn fitness_recompute_is_idempotent(
        evals in prop::collection::vec(-1e6f64..1e6, 2..40),
        minimize in any::<bool>(),
        fitness_type in prop_oneof![
            Just(FitnessType::Raw),
            Just(FitnessType::Ranking),
            Just(FitnessType::Normal),
        ],
    ) {
        let mut config = EngineConfig::new(GeneType::Real, 2);
        config.fitness_type = fitness_type;
        if minimize {
            config.direction = Direction::Minimize;
        }
        let transform = FitnessTransform::from_config(&config);
        let individuals: Vec<Individual> = evals.iter().map(|&e| evaluated(vec![e])).collect();
        let mut pop = Population::from_individuals(individuals);

        transform.apply(&mut pop);
        let first = pop.fitness_values();
        transform.apply(&mut pop);
        prop_assert_eq!(first.clone(), pop.fitness_values());
        prop_assert!(first.iter().all(|f| f.is_finite() && *f >= 0.0));
    }

    #[test]
    fn best_index_has_best_evaluation(
        evals in prop::collection::vec(-100.0f64..100.0, 1..30),
        minimize in any::<bool>(),
    ) {
        let mut config = EngineConfig::new(GeneType::Real, 2);
        if minimize {
            config.direction = Direction::Minimize;
        }
        let comparator = Comparator::from_config(&config);
        let pop = Population::from_individuals(
            evals.iter().map(|&e| evaluated(vec![e])).collect(),
        );
        let best = comparator.best_index(&pop);
        let expected = if minimize {
            evals.iter().copied().fold(f64::INFINITY, f64::min)
        } else {
            evals.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        };
        prop_assert_eq!(evals[best], expected);
        // Lowest index among equals
        prop_assert!(evals[..best].iter().all(|&e| e != expected));
    }

    // ==================== Selection Properties ====================

    #[test]
    fn tournament_ties_resolve_to_lower_index(seed in any::<u64>(), size in 2usize..20) {
        let mut config = EngineConfig::new(GeneType::Real, 2);
        config.select_type = SelectType::Tournament;
        config.tournament_with_replacement = false;
        let mut selection = SelectionEngine::from_config(&config);
        let fitness = vec![1.0; size];

        let mut rng = StdRandom::new(seed);
        selection.reset(&fitness, &mut rng);
        let first: Vec<usize> = (0..size).map(|_| selection.select_next().unwrap()).collect();

        let mut rng = StdRandom::new(seed);
        selection.reset(&fitness, &mut rng);
        let second: Vec<usize> = (0..size).map(|_| selection.select_next().unwrap()).collect();

        prop_assert_eq!(first, second);
    }

    #[test]
    fn selection_never_exceeds_population(seed in any::<u64>(), size in 1usize..20) {
        let config = EngineConfig::new(GeneType::Real, 2);
        let mut selection = SelectionEngine::from_config(&config);
        let fitness: Vec<f64> = (0..size).map(|i| i as f64).collect();
        let mut rng = StdRandom::new(seed);
        selection.reset(&fitness, &mut rng);
        for _ in 0..size {
            let index = selection.select_next().unwrap();
            prop_assert!(index < size);
        }
        prop_assert!(selection.select_next().is_err());
    }

    // ==================== Multi-objective Properties ====================

    #[test]
    fn non_dominated_sort_is_consistent(
        points in prop::collection::vec((0.0f64..10.0, 0.0f64..10.0), 2..30)
    ) {
        let objectives = Objectives { direction: Direction::Minimize, num_constraint: 0 };
        let mut individuals: Vec<Individual> = points
            .iter()
            .map(|&(a, b)| evaluated(vec![a, b]))
            .collect();
        let fronts = pgaevo::algorithms::nsga2::fast_non_dominated_sort(&mut individuals, &objectives);

        let total: usize = fronts.iter().map(Vec::len).sum();
        prop_assert_eq!(total, individuals.len());
        for front in &fronts {
            for &i in front {
                for &j in front {
                    prop_assert!(!objectives.dominates(&individuals[i], &individuals[j]));
                }
            }
        }
    }

    #[test]
    fn das_dennis_points_lie_on_simplex(dim in 2usize..6, partitions in 1usize..8) {
        let points = das_dennis(dim, partitions).unwrap();
        prop_assert_eq!(Some(points.len()), das_dennis_count(dim, partitions));
        for point in &points {
            prop_assert_eq!(point.len(), dim);
            let sum: f64 = point.iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-9);
            prop_assert!(point.iter().all(|&x| x >= 0.0));
        }
    }

    // ==================== Random Source Properties ====================

    #[test]
    fn seeded_sources_repeat(seed in any::<u64>()) {
        let mut a = StdRandom::new(seed);
        let mut b = StdRandom::new(seed);
        for _ in 0..16 {
            prop_assert_eq!(a.uniform01().to_bits(), b.uniform01().to_bits());
        }
    }

    #[test]
    fn worker_subseeds_are_distinct(seed in any::<u64>(), rank in 0usize..1000) {
        prop_assert_ne!(derive_subseed(seed, rank), derive_subseed(seed, rank + 1));
    }
}
