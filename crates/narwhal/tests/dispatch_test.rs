use narwhal::{Error, LayoutRequest, StrategyConfig, StrategyRegistry, adjacency_from_edges, layout};

fn request(strategy: &str) -> LayoutRequest {
    LayoutRequest {
        strategy_name: strategy.to_string(),
        node_ids: vec!["a".into(), "b".into()],
        adjacency_by_node_id: adjacency_from_edges([("a", "b")]),
        temporal_key: "2024-01".into(),
        ..Default::default()
    }
}

#[test]
fn unknown_strategy_fails_with_its_name() {
    let registry = StrategyRegistry::with_defaults();
    let err = layout(&registry, &request("unknown")).unwrap_err();
    assert!(matches!(err, Error::UnknownStrategy { ref name } if name == "unknown"));
    assert!(err.to_string().contains("Unknown strategy"));
}

#[test]
fn unregistered_strategy_is_unknown_even_if_the_id_exists() {
    let registry = StrategyRegistry::new();
    let err = layout(&registry, &request("fa2line")).unwrap_err();
    assert_eq!(err.to_string(), "Unknown strategy: fa2line");
}

#[test]
fn gravity_below_the_minimum_is_clamped() {
    let registry = StrategyRegistry::with_defaults();
    let mut raw = StrategyConfig::new();
    raw.insert("gravity".into(), -5.0);
    for name in ["barnes-hut-fa2", "fa2line"] {
        let resolved = registry.resolve_config(name, Some(&raw)).unwrap();
        assert_eq!(resolved.get("gravity"), 0.1, "{name}");
    }
}

#[test]
fn non_finite_and_missing_values_fall_back_to_defaults() {
    let registry = StrategyRegistry::with_defaults();
    let mut raw = StrategyConfig::new();
    raw.insert("ringGap".into(), f64::NAN);
    raw.insert("sweeps".into(), 99.4);
    let resolved = registry.resolve_config("radial-sugiyama", Some(&raw)).unwrap();
    assert_eq!(resolved.get("ringGap"), 48.0);
    assert_eq!(resolved.get("sweeps"), 12.0);
    assert_eq!(resolved.get("nodeSpacing"), 28.0);
    assert_eq!(resolved.get("stability"), 0.4);
}

#[test]
fn registry_describes_fields_for_configuration_uis() {
    let registry = StrategyRegistry::with_defaults();
    let options = registry.options();
    assert_eq!(options.len(), 6);
    assert_eq!(options[0].value, "hybrid-backbone");
    assert_eq!(options[5].value, "fa2line");

    let fields = registry.fields("stress-majorization").unwrap();
    let keys: Vec<&str> = fields.iter().map(|f| f.key).collect();
    assert_eq!(
        keys,
        vec!["nodeSpacing", "stability", "idealDistance", "maxHops", "anchorWeight", "iterations"]
    );
    let json = serde_json::to_value(fields[3]).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"key": "maxHops", "label": "Max hops", "min": 1.0, "max": 10.0, "step": 1.0})
    );

    let defaults = registry.default_config("fa2line").unwrap();
    assert_eq!(defaults.get("iterations"), Some(&90.0));
    assert_eq!(defaults.get("gravity"), Some(&1.2));
}

#[test]
fn summaries_are_single_lines() {
    let registry = StrategyRegistry::with_defaults();
    for option in registry.options() {
        let summary = registry.summarize_config(option.value, None).unwrap();
        assert!(!summary.is_empty());
        assert!(!summary.contains('\n'), "{summary}");
    }
}

#[test]
fn request_and_response_use_camel_case_json() {
    let registry = StrategyRegistry::with_defaults();
    let req: LayoutRequest = serde_json::from_value(serde_json::json!({
        "strategyName": "stress-majorization",
        "nodeIds": ["a", "b", "c"],
        "adjacencyByNodeId": {"a": ["b"], "b": ["a", "c"], "c": ["b"]},
        "temporalKey": "2024-02",
        "strategyConfig": {"iterations": 10}
    }))
    .unwrap();
    let res = layout(&registry, &req).unwrap();
    let json = serde_json::to_value(&res).unwrap();
    let target = &json["layout"]["nodeTargets"][0];
    for key in [
        "nodeId", "componentId", "communityId", "targetX", "targetY", "neighborX", "neighborY",
        "anchorX", "anchorY",
    ] {
        assert!(target.get(key).is_some(), "missing {key}");
    }
    assert_eq!(json["metadata"]["state"]["strategy"], "stress-majorization");
    assert_eq!(json["metadata"]["state"]["snapshot"]["temporalKey"], "2024-02");
}
