//! The six end-to-end scenarios named in the oracle module's test suite,
//! plus the boundary laws that accompany them.

#[cfg(test)]
mod tests {
    use qc_18_oracle::{keys, Decimal, OracleApi, OracleError, Params, Price};

    use crate::{env, small_params, Harness};

    fn decode_price(harness: &Harness, asset: &str) -> Price {
        let bytes = harness.store.get(&keys::key_price(asset)).expect("price must be committed");
        serde_json::from_slice(&bytes).expect("price must decode")
    }

    #[test]
    fn scenario_1_happy_aggregation_commits_the_median_and_a_snapshot() {
        let mut harness = Harness::new();
        harness.bond("val1", 100);
        harness.bond("val2", 100);
        harness.bond("val3", 100);

        let params = small_params(30, "0.1");
        harness.module().update_params("gov", params).unwrap();

        for (validator, price) in [("val1", 49_900), ("val2", 50_000), ("val3", 50_100)] {
            harness
                .module()
                .submit_price(&env(1), validator, validator, "BTC", Decimal::from_i64(price))
                .unwrap();
        }

        let events = harness.module().end_block_aggregate(&env(30)).unwrap();
        assert!(events.iter().any(|e| e.name == "price_aggregated"));

        let price = decode_price(&harness, "BTC");
        assert_eq!(price.price, Decimal::from_i64(50_000));
        assert_eq!(price.num_validators, 3);
        assert!(harness.store.has(&keys::key_snapshot("BTC", 30)));
    }

    #[test]
    fn scenario_2_outlier_is_rejected_before_the_median_is_taken() {
        let mut harness = Harness::new();
        for validator in ["val1", "val2", "val3", "val4"] {
            harness.bond(validator, 100);
        }
        harness.module().update_params("gov", small_params(30, "0.1")).unwrap();

        for (validator, price) in [
            ("val1", 50_000),
            ("val2", 50_100),
            ("val3", 49_900),
            ("val4", 1_000_000),
        ] {
            harness
                .module()
                .submit_price(&env(1), validator, validator, "BTC", Decimal::from_i64(price))
                .unwrap();
        }

        harness.module().end_block_aggregate(&env(30)).unwrap();
        let price = decode_price(&harness, "BTC");
        assert_eq!(price.price, Decimal::from_i64(50_000));
        assert_eq!(price.num_validators, 3);
    }

    #[test]
    fn scenario_3_insufficient_participation_skips_commit_and_still_accounts_misses() {
        let mut harness = Harness::new();
        for validator in ["val1", "val2", "val3", "val4"] {
            harness.bond(validator, 100);
        }
        harness.module().update_params("gov", small_params(30, "0.67")).unwrap();

        harness
            .module()
            .submit_price(&env(1), "val1", "val1", "BTC", Decimal::from_i64(50_000))
            .unwrap();

        let events = harness.module().end_block_aggregate(&env(30)).unwrap();
        assert!(events
            .iter()
            .any(|e| e.attributes.iter().any(|(k, v)| k == "status" && v == "insufficient")));
        assert!(!harness.store.has(&keys::key_price("BTC")));

        let bytes = harness.store.get(&keys::key_validator_oracle("val2")).unwrap();
        let oracle: qc_18_oracle::ValidatorOracle = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(oracle.miss_counter, 1);
    }

    #[test]
    fn scenario_4_nonce_replay_then_strictly_increasing_is_accepted() {
        let mut store = qc_18_oracle::ports::InMemoryKvStore::new();
        qc_18_oracle::NonceManager::validate_incoming(&mut store, "channel-0", "alice", 5, 1_000, 1_000).unwrap();

        let err = qc_18_oracle::NonceManager::validate_incoming(&mut store, "channel-0", "alice", 5, 1_000, 1_000)
            .unwrap_err();
        assert!(matches!(err, OracleError::ReplayAttack { .. }));

        let err = qc_18_oracle::NonceManager::validate_incoming(&mut store, "channel-0", "alice", 4, 1_000, 1_000)
            .unwrap_err();
        assert!(matches!(err, OracleError::ReplayAttack { .. }));

        qc_18_oracle::NonceManager::validate_incoming(&mut store, "channel-0", "alice", 6, 1_000, 1_000).unwrap();
    }

    #[test]
    fn scenario_5_epoch_rotation_at_the_threshold() {
        use qc_18_oracle::domain::nonce::NONCE_ROTATION_THRESHOLD;

        let mut store = qc_18_oracle::ports::InMemoryKvStore::new();
        let key = qc_18_oracle::keys::key_nonce_outbound("channel-0", "relayer");
        let seeded = qc_18_oracle::domain::NonceState {
            epoch: 0,
            nonce: NONCE_ROTATION_THRESHOLD - 1,
            last_update_unix_seconds: 0,
        };
        store.set(&key, serde_json::to_vec(&seeded).unwrap());

        let first = qc_18_oracle::NonceManager::next_outbound(&mut store, "channel-0", "relayer", 1).unwrap();
        let second = qc_18_oracle::NonceManager::next_outbound(&mut store, "channel-0", "relayer", 2).unwrap();
        let third = qc_18_oracle::NonceManager::next_outbound(&mut store, "channel-0", "relayer", 3).unwrap();

        assert_eq!(first, NONCE_ROTATION_THRESHOLD);
        assert_eq!(second, 1);
        assert_eq!(third, 2);

        let bytes = store.get(&key).unwrap();
        let state: qc_18_oracle::domain::NonceState = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(state.epoch, 1);
    }

    #[test]
    fn scenario_6_migration_repairs_malformed_prices_and_is_idempotent() {
        use qc_18_oracle::keys;

        let mut harness = Harness::new();
        harness.store.set(
            &keys::key_price("SOL"),
            br#"{"asset":"SOL","price":"100","block_height":-50,"block_time":-1000,"num_validators":0}"#.to_vec(),
        );
        harness.store.set(
            &keys::key_price("ZERO"),
            br#"{"asset":"ZERO","price":"0","block_height":1,"block_time":1,"num_validators":1}"#.to_vec(),
        );

        harness.module().migrate_v1_to_v2(&env(500)).unwrap();

        assert!(!harness.store.has(&keys::key_price("ZERO")));
        let sol = decode_price(&harness, "SOL");
        assert_eq!(sol.price, Decimal::from_i64(100));
        assert_eq!(sol.block_height, 500);
        assert_eq!(sol.num_validators, 1);

        let after_first: Vec<_> = harness.store.prefix_iterate(&keys::prefix_price());
        harness.module().migrate_v1_to_v2(&env(500)).unwrap();
        let after_second: Vec<_> = harness.store.prefix_iterate(&keys::prefix_price());
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn delegate_then_submit_under_the_validators_own_account_form_is_accepted() {
        let mut harness = Harness::new();
        harness.bond("val1", 100);

        harness.module().delegate_feeder(&env(1), "val1", "val1").unwrap();
        harness
            .module()
            .submit_price(&env(1), "val1", "val1", "BTC", Decimal::from_i64(50_000))
            .unwrap();
    }

    #[test]
    fn slashing_runs_after_aggregation_at_the_slash_window_boundary() {
        let mut harness = Harness::new();
        harness.bond("val1", 100);
        harness.bond("val2", 100);

        let mut params = small_params(10, "0.1");
        params.slash_window = 10;
        params.min_valid_per_window = 9;
        harness.module().update_params("gov", params).unwrap();

        // val1 submits every period; val2 never does, across one slash window.
        for height in (10..=100).step_by(10) {
            harness
                .module()
                .submit_price(&env(height - 9), "val1", "val1", "BTC", Decimal::from_i64(50_000))
                .unwrap();
            harness.module().end_block_aggregate(&env(height)).unwrap();
        }

        let slash_events = harness.module().end_block_slash(&env(100)).unwrap();
        assert!(slash_events.iter().any(|e| e.name == "oracle_slash"));
        assert!(slash_events.iter().any(|e| e.name == "oracle_jail"));

        let bytes = harness.store.get(&qc_18_oracle::keys::key_validator_oracle("val1")).unwrap();
        let val1_oracle: qc_18_oracle::ValidatorOracle = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(val1_oracle.miss_counter, 0);
    }

    #[test]
    fn twap_reflects_a_full_aggregation_history_not_just_the_latest_price() {
        let mut harness = Harness::new();
        harness.bond("val1", 100);

        let params = small_params(10, "0.1");
        harness.module().update_params("gov", params).unwrap();

        for (height, price) in [(10u64, 100i64), (20, 200)] {
            harness
                .module()
                .submit_price(&env(height - 9), "val1", "val1", "BTC", Decimal::from_i64(price))
                .unwrap();
            harness.module().end_block_aggregate(&env(height)).unwrap();
        }

        let twap = harness.module().twap("BTC", 20, 30).unwrap();
        // height 10 holds for 10 blocks, height 20 holds for 10 blocks: (100*10 + 200*10) / 20 = 150
        assert_eq!(twap, Decimal::from_i64(150));
    }

    #[test]
    fn circuit_breaker_blocks_submission_until_closed() {
        let mut harness = Harness::new();
        harness.bond("val1", 100);

        let mut params = Params::default();
        params.emergency_admin = Some("admin1".to_string());
        harness.module().update_params("gov", params).unwrap();

        harness
            .module()
            .open_circuit_breaker(&env(1), "admin1", "data quality alarm".to_string())
            .unwrap();

        let err = harness
            .module()
            .submit_price(&env(1), "val1", "val1", "BTC", Decimal::from_i64(1))
            .unwrap_err();
        assert!(matches!(err, OracleError::CircuitBreakerActive));

        let err = harness
            .module()
            .open_circuit_breaker(&env(1), "admin1", "again".to_string())
            .unwrap_err();
        assert!(matches!(err, OracleError::CircuitBreakerAlreadyOpen));

        harness.module().close_circuit_breaker(&env(1), "admin1").unwrap();
        harness
            .module()
            .submit_price(&env(1), "val1", "val1", "BTC", Decimal::from_i64(1))
            .unwrap();
    }

    #[test]
    fn inbound_packet_on_an_unauthorized_channel_is_rejected() {
        let mut harness = Harness::new();
        let payload = br#"{"type":"oracle_heartbeat","version":"paw-oracle-1","nonce":1,"timestamp":1000}"#;

        let err = harness
            .module()
            .receive_packet("oracle", "channel-7", "alice", payload, 1_000)
            .unwrap_err();
        assert!(matches!(err, OracleError::UnauthorizedChannel { .. }));
    }
}
