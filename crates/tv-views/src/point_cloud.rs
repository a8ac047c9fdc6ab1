//! Point cloud visualization

use tv_core::{ParserMode, ScalarRange};
use tv_data::{extract_column, Row};

use crate::visualization::{Visualization, VisualizationConfig, VisualizationPayload};
use crate::VisualizationError;

/// Configuration for a point cloud
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudConfig {
    pub position_field: String,
    pub use_scalar: bool,
    /// Required when `use_scalar` is set
    pub scalar_field: Option<String>,
    pub min: f64,
    pub desired: f64,
    pub max: f64,
}

impl PointCloudConfig {
    pub fn new(position_field: impl Into<String>) -> Self {
        Self {
            position_field: position_field.into(),
            use_scalar: false,
            scalar_field: None,
            min: 0.0,
            desired: 0.0,
            max: 0.0,
        }
    }

    /// Color points by `field` within `min..max`
    pub fn with_scalars(mut self, field: impl Into<String>, min: f64, desired: f64, max: f64) -> Self {
        self.use_scalar = true;
        self.scalar_field = Some(field.into());
        self.min = min;
        self.desired = desired;
        self.max = max;
        self
    }
}

/// Positions from one included field, optionally colored by another
pub struct PointCloud;

impl PointCloud {
    pub const KIND: &'static str = "point_cloud";
}

fn require_fetched(field: &str, included_fields: &[String]) -> Result<(), VisualizationError> {
    if included_fields.iter().any(|f| f == field) {
        Ok(())
    } else {
        Err(VisualizationError::UnknownField(field.to_string()))
    }
}

impl Visualization for PointCloud {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn build(
        &self,
        rows: &[Row],
        included_fields: &[String],
        config: &VisualizationConfig,
        mode: &ParserMode,
    ) -> Result<VisualizationPayload, VisualizationError> {
        let VisualizationConfig::PointCloud(config) = config;

        require_fetched(&config.position_field, included_fields)?;
        let positions = extract_column(rows, &config.position_field);

        let scalars = if config.use_scalar {
            let field = config
                .scalar_field
                .as_deref()
                .ok_or(VisualizationError::MissingScalarField)?;
            require_fetched(field, included_fields)?;
            Some(ScalarRange {
                scalars: extract_column(rows, field),
                min: config.min,
                desired: config.desired,
                max: config.max,
            })
        } else {
            None
        };

        Ok(VisualizationPayload::PointCloud {
            parser: mode.code(),
            positions,
            scalars,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use tv_core::Value;

    fn rows() -> Vec<Row> {
        let row = |id: usize, included: bool, pos: Value, heat: Value| Row {
            id,
            is_included: included,
            values: IndexMap::from([("pos".to_string(), pos), ("heat".to_string(), heat)]),
        };
        vec![
            row(0, true, Value::from("1 2 3"), Value::from(0.5)),
            row(1, false, Value::from("4 5 6"), Value::from(0.7)),
            row(2, true, Value::from("7 8 9"), Value::Null),
        ]
    }

    fn fields() -> Vec<String> {
        vec!["pos".to_string(), "heat".to_string()]
    }

    #[test]
    fn test_positions_only_without_scalars() {
        let config = VisualizationConfig::PointCloud(PointCloudConfig::new("pos"));
        let payload = PointCloud.build(&rows(), &fields(), &config, &ParserMode::Vector3).unwrap();

        let VisualizationPayload::PointCloud { parser, positions, scalars } = payload;
        assert_eq!(parser, 1);
        assert_eq!(positions, vec![Value::from("1 2 3"), Value::from("7 8 9")]);
        assert_eq!(scalars, None);
    }

    #[test]
    fn test_scalars_carry_range() {
        let config = VisualizationConfig::PointCloud(PointCloudConfig::new("pos").with_scalars("heat", 0.0, 0.5, 1.0));
        let payload = PointCloud.build(&rows(), &fields(), &config, &ParserMode::position()).unwrap();

        let VisualizationPayload::PointCloud { parser, scalars, .. } = payload;
        assert_eq!(parser, 2);
        let range = scalars.unwrap();
        assert_eq!(range.scalars, vec![Value::from(0.5)]);
        assert_eq!((range.min, range.desired, range.max), (0.0, 0.5, 1.0));
    }

    #[test]
    fn test_fields_must_have_been_fetched() {
        let config = VisualizationConfig::PointCloud(PointCloudConfig::new("velocity"));
        let err = PointCloud.build(&rows(), &fields(), &config, &ParserMode::None).unwrap_err();
        assert_eq!(err, VisualizationError::UnknownField("velocity".into()));

        let mut scalar = PointCloudConfig::new("pos");
        scalar.use_scalar = true;
        let err = PointCloud
            .build(&rows(), &fields(), &VisualizationConfig::PointCloud(scalar), &ParserMode::None)
            .unwrap_err();
        assert_eq!(err, VisualizationError::MissingScalarField);
    }
}
