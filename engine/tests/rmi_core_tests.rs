//! RMI Core Tests
//!
//! Build and query behaviour of the recursive model index through the public API

use num::{BigInt, BigRational};
use rmi_engine::{Rmi, RmiConfig, RmiError};

#[test]
fn test_evenly_spaced_keys_predict_rank() {
    let keys: Vec<u64> = (0..100).map(|i| i * 10).collect();
    let rmi = Rmi::build(&keys, 2, 2).unwrap();

    let predicted = rmi.get_index(500u64) as i64;
    assert!((predicted - 50).abs() <= 5, "predicted {}", predicted);

    // Perfectly linear data: every leaf fit is exact
    assert_eq!(rmi.get_index(0u64), 0);
    assert_eq!(rmi.get_index(990u64), 99);
}

#[test]
fn test_single_key_index() {
    for width in 1..5 {
        let rmi = Rmi::build(&[5u64], width, 1).unwrap();
        assert_eq!(rmi.get_index(5u64), 0);
        assert_eq!(rmi.get_index(0u64), 0);
        assert_eq!(rmi.get_index(u64::MAX), 0);
        assert_eq!(rmi.max_index(), 0);
        assert_eq!(rmi.key_count(), 1);
    }
}

#[test]
fn test_queries_outside_training_range_are_clamped() {
    let keys: Vec<i64> = (0..1_000).map(|i| i * 7 + 1_000).collect();
    let rmi = Rmi::build(&keys, 8, 3).unwrap();

    assert_eq!(rmi.get_index(i64::MIN), 0);
    assert_eq!(rmi.get_index(-1i64), 0);
    assert_eq!(rmi.get_index(0i64), 0);
    assert_eq!(rmi.get_index(i64::MAX), rmi.max_index());
    assert_eq!(rmi.get_index(u128::MAX), rmi.max_index());
}

#[test]
fn test_unsorted_input_is_rejected() {
    let keys: Vec<u64> = vec![1, 2, 3, 10, 4, 5];
    let err = Rmi::build(&keys, 2, 2).unwrap_err();
    assert_eq!(err, RmiError::Unsorted { position: 3 });
    assert!(err.to_string().contains("keys[3] > keys[4]"));
}

#[test]
fn test_shape_matches_width_and_depth() {
    let keys: Vec<u64> = (0..500).collect();
    for width in 1..6 {
        for depth in 1..5 {
            let rmi = Rmi::build(&keys, width, depth).unwrap();
            let expected: Vec<usize> = (0..depth as u32).map(|i| width.pow(i)).collect();
            assert_eq!(rmi.layer_sizes(), expected, "width={} depth={}", width, depth);
            assert_eq!(rmi.depth(), depth);
            assert_eq!(rmi.width(), width);
            assert_eq!(rmi.route(250u64).len(), depth);
        }
    }
}

#[test]
fn test_build_is_deterministic() {
    let keys: Vec<u64> = (0..2_000u64).map(|i| i * i + 3 * i).collect();
    let first = Rmi::build(&keys, 6, 3).unwrap();
    let second = Rmi::build(&keys, 6, 3).unwrap();

    for probe in (0..4_100_000u64).step_by(9_973) {
        assert_eq!(first.get_index(probe), second.get_index(probe));
    }
    assert_eq!(first.stats(), second.stats());
}

#[test]
fn test_with_config_respects_node_limit() {
    let keys: Vec<u64> = (0..100).collect();
    let config = RmiConfig {
        width: 10,
        depth: 3,
        max_nodes: 100,
    };
    assert_eq!(
        Rmi::with_config(&keys, &config).unwrap_err(),
        RmiError::ShapeTooLarge {
            width: 10,
            depth: 3,
            limit: 100
        }
    );

    let config = RmiConfig {
        max_nodes: 111,
        ..config
    };
    let rmi = Rmi::with_config(&keys, &config).unwrap();
    assert_eq!(rmi.stats().total_nodes, 111);
}

#[test]
fn test_big_integer_keys() {
    // Keys well beyond 128 bits, spaced one apart.
    let base = BigInt::from(1u8) << 200;
    let keys: Vec<BigInt> = (0..64).map(|i| &base + i).collect();
    let rmi = Rmi::build(&keys, 4, 2).unwrap();

    for (rank, key) in keys.iter().enumerate() {
        assert_eq!(rmi.get_index(key.clone()), rank);
    }

    // Slope of the root is exactly one rank per key.
    assert_eq!(
        rmi.root().slope(),
        &BigRational::from_integer(BigInt::from(1))
    );
}

#[test]
fn test_adjacent_keys_at_top_of_u64_range() {
    let keys: Vec<u64> = (0..32).map(|i| u64::MAX - 31 + i).collect();
    let rmi = Rmi::build(&keys, 2, 2).unwrap();
    for (rank, key) in keys.iter().enumerate() {
        assert_eq!(rmi.get_index(*key), rank);
    }
}

#[test]
fn test_stats_report_degenerate_nodes() {
    // 3 keys under width 4: three empty children plus one fitted leaf
    let rmi = Rmi::build(&[10u64, 20, 30], 4, 2).unwrap();
    let stats = rmi.stats();
    assert_eq!(stats.total_nodes, 5);
    assert_eq!(stats.degenerate_nodes, 3);
    assert_eq!(stats.layer_sizes, vec![1, 4]);
    assert_eq!(stats.max_index, 2);

    let json = serde_json::to_string(&stats).unwrap();
    assert!(json.contains("\"degenerate_nodes\":3"));
}
