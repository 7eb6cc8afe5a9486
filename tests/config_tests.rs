use chart_axis::ChartModelConfig;
use chart_axis::config::CHART_MODEL_CONFIG_JSON_SCHEMA_V1;
use chart_axis::error::ChartError;
use chart_axis::model::{PriceScaleMode, PriceScaleOptions, TimeScaleOptions};
use chart_axis::ChartModel;

#[test]
fn config_contract_round_trips() {
    let config = ChartModelConfig::default()
        .with_time_scale(TimeScaleOptions {
            bar_spacing: 12.0,
            right_offset: 3.0,
            ..TimeScaleOptions::default()
        })
        .with_left_price_scale(PriceScaleOptions {
            mode: PriceScaleMode::Logarithmic,
            ..PriceScaleOptions::default()
        });

    let json = config.to_json_contract_v1_pretty().expect("serialize");
    assert!(json.contains(&format!("\"schema_version\": {CHART_MODEL_CONFIG_JSON_SCHEMA_V1}")));
    assert!(json.contains("\"logarithmic\""));

    let parsed = ChartModelConfig::from_json_str(&json).expect("parse");
    assert_eq!(parsed, config);
}

#[test]
fn bare_config_accepts_partial_objects() {
    let parsed = ChartModelConfig::from_json_str(
        r#"{"right_price_scale": {"mode": "percentage"}, "time_scale": {"bar_spacing": 9.0}}"#,
    )
    .expect("parse");
    assert_eq!(parsed.right_price_scale.mode, PriceScaleMode::Percentage);
    assert!(parsed.right_price_scale.auto_scale);
    assert_eq!(parsed.time_scale.bar_spacing, 9.0);
    assert_eq!(parsed.time_scale.min_bar_spacing, 0.5);
}

#[test]
fn invalid_values_are_config_errors() {
    let err = ChartModelConfig::from_json_str(r#"{"time_scale": {"bar_spacing": -1.0}}"#)
        .expect_err("negative spacing");
    assert!(matches!(err, ChartError::Config(_)));

    let err = ChartModelConfig::from_json_str("not json").expect_err("garbage");
    assert!(err.to_string().contains("failed to parse config json"));
}

#[test]
fn model_rejects_invalid_config() {
    let config = ChartModelConfig::default().with_right_price_scale(PriceScaleOptions {
        scale_margins: chart_axis::model::PriceScaleMargins {
            top: 0.8,
            bottom: 0.8,
        },
        ..PriceScaleOptions::default()
    });
    assert!(matches!(ChartModel::new(config), Err(ChartError::Config(_))));
}
