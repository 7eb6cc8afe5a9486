use serde::{Deserialize, Serialize};

use crate::core::TimeAxisLabelOptions;
use crate::error::{ChartError, ChartResult};
use crate::model::{PriceScaleOptions, TimeScaleOptions};

pub const CHART_MODEL_CONFIG_JSON_SCHEMA_V1: u32 = 1;

/// Serializable setup of a [`crate::model::ChartModel`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartModelConfig {
    #[serde(default)]
    pub time_scale: TimeScaleOptions,
    #[serde(default)]
    pub right_price_scale: PriceScaleOptions,
    #[serde(default)]
    pub left_price_scale: PriceScaleOptions,
    #[serde(default)]
    pub time_axis: TimeAxisLabelOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartModelConfigJsonContractV1 {
    pub schema_version: u32,
    pub config: ChartModelConfig,
}

impl ChartModelConfig {
    #[must_use]
    pub fn with_time_scale(mut self, options: TimeScaleOptions) -> Self {
        self.time_scale = options;
        self
    }

    #[must_use]
    pub fn with_right_price_scale(mut self, options: PriceScaleOptions) -> Self {
        self.right_price_scale = options;
        self
    }

    #[must_use]
    pub fn with_left_price_scale(mut self, options: PriceScaleOptions) -> Self {
        self.left_price_scale = options;
        self
    }

    #[must_use]
    pub fn with_time_axis(mut self, options: TimeAxisLabelOptions) -> Self {
        self.time_axis = options;
        self
    }

    pub fn validate(&self) -> ChartResult<()> {
        self.time_scale
            .validate()
            .and_then(|()| self.right_price_scale.validate())
            .and_then(|()| self.left_price_scale.validate())
            .and_then(|()| self.time_axis.validate())
            .map_err(|e| ChartError::Config(e.to_string()))
    }

    pub fn to_json_pretty(self) -> ChartResult<String> {
        serde_json::to_string_pretty(&self)
            .map_err(|e| ChartError::Config(format!("failed to serialize config: {e}")))
    }

    pub fn to_json_contract_v1_pretty(self) -> ChartResult<String> {
        let payload = ChartModelConfigJsonContractV1 {
            schema_version: CHART_MODEL_CONFIG_JSON_SCHEMA_V1,
            config: self,
        };
        serde_json::to_string_pretty(&payload)
            .map_err(|e| ChartError::Config(format!("failed to serialize config contract v1: {e}")))
    }

    /// Parses either a bare config or a versioned envelope, then validates it.
    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        let value: serde_json::Value = serde_json::from_str(input)
            .map_err(|e| ChartError::Config(format!("failed to parse config json: {e}")))?;

        let config = if value.get("schema_version").is_some() {
            let payload: ChartModelConfigJsonContractV1 = serde_json::from_value(value)
                .map_err(|e| ChartError::Config(format!("invalid config envelope: {e}")))?;
            if payload.schema_version != CHART_MODEL_CONFIG_JSON_SCHEMA_V1 {
                return Err(ChartError::Config(format!(
                    "unsupported config schema version: {}",
                    payload.schema_version
                )));
            }
            payload.config
        } else {
            serde_json::from_value(value)
                .map_err(|e| ChartError::Config(format!("invalid config: {e}")))?
        };
        config.validate()?;
        Ok(config)
    }
}
