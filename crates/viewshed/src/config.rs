use foundation::Color;
use foundation::math::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ViewshedError;

pub const MAX_SHADOW_MAP_SIZE: u32 = 16_384;

/// Parameters of one viewshed analysis, in the shape accepted by
/// [`crate::create_viewshed`].
///
/// Angles are full angles in degrees; the classifier halves them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewshedConfig {
    /// World (ECEF) position, already lifted slightly above the terrain.
    pub observer_position: Option<Vec3>,
    /// Optional until the second point is picked.
    pub target_position: Option<Vec3>,
    pub horizontal_angle_deg: f64,
    pub vertical_angle_deg: f64,
    /// Maximum analysed distance in metres.
    pub distance: f64,
    pub visible_color: Color,
    pub hidden_color: Color,
    /// Blend factor toward the visible/hidden color.
    pub alpha: f64,
    pub shadow_map_size: u32,
    /// Tessellation of the frustum indicator.
    pub slice_count: u32,
}

impl Default for ViewshedConfig {
    fn default() -> Self {
        Self {
            observer_position: None,
            target_position: None,
            horizontal_angle_deg: 90.0,
            vertical_angle_deg: 60.0,
            distance: 100.0,
            visible_color: Color::LIME,
            hidden_color: Color::RED,
            alpha: 0.5,
            shadow_map_size: 2048,
            slice_count: 32,
        }
    }
}

impl ViewshedConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ViewshedError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ViewshedError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ViewshedError> {
        serde_json::to_string_pretty(self).map_err(|e| ViewshedError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ViewshedError> {
        check_angle("horizontal", self.horizontal_angle_deg)?;
        check_angle("vertical", self.vertical_angle_deg)?;
        check_distance(self.distance)?;
        check_alpha(self.alpha)?;

        let Some(observer) = self.observer_position else {
            return Err(ViewshedError::Config("observerPosition is required".into()));
        };
        if !observer.is_finite() || self.target_position.is_some_and(|t| !t.is_finite()) {
            return Err(ViewshedError::Config("positions must be finite".into()));
        }
        if !self.visible_color.is_finite() || !self.hidden_color.is_finite() {
            return Err(ViewshedError::Config("colors must be finite".into()));
        }
        if !(1..=MAX_SHADOW_MAP_SIZE).contains(&self.shadow_map_size) {
            return Err(ViewshedError::Config(format!(
                "shadowMapSize must be in [1, {MAX_SHADOW_MAP_SIZE}]: got {}",
                self.shadow_map_size
            )));
        }
        if !(1..=sensor::MAX_SLICE_COUNT).contains(&self.slice_count) {
            return Err(ViewshedError::Config(format!(
                "sliceCount must be in [1, {}]: got {}",
                sensor::MAX_SLICE_COUNT,
                self.slice_count
            )));
        }
        Ok(())
    }

    pub fn horizontal_half_angle(&self) -> f64 {
        (self.horizontal_angle_deg * 0.5).to_radians()
    }

    pub fn vertical_half_angle(&self) -> f64 {
        (self.vertical_angle_deg * 0.5).to_radians()
    }
}

pub(crate) fn check_angle(axis: &'static str, degrees: f64) -> Result<(), ViewshedError> {
    if degrees.is_finite() && (0.0..=180.0).contains(&degrees) {
        Ok(())
    } else {
        Err(ViewshedError::InvalidAngle { axis, degrees })
    }
}

pub(crate) fn check_distance(distance: f64) -> Result<(), ViewshedError> {
    if distance.is_finite() && distance > 0.0 {
        Ok(())
    } else {
        Err(ViewshedError::InvalidDistance(distance))
    }
}

pub(crate) fn check_alpha(alpha: f64) -> Result<(), ViewshedError> {
    if (0.0..=1.0).contains(&alpha) {
        Ok(())
    } else {
        Err(ViewshedError::InvalidAlpha(alpha))
    }
}

#[cfg(test)]
mod tests {
    use super::ViewshedConfig;
    use crate::error::ViewshedError;
    use foundation::Color;
    use foundation::math::Vec3;
    use pretty_assertions::assert_eq;

    #[test]
    fn json_uses_camel_case_and_defaults() {
        let raw = r#"{
            "observerPosition": { "x": 0.0, "y": 0.0, "z": 100.0 },
            "targetPosition": { "x": 100.0, "y": 0.0, "z": 0.0 },
            "horizontalAngleDeg": 120.0,
            "hiddenColor": { "r": 0.5, "g": 0.0, "b": 0.0 }
        }"#;
        let config = ViewshedConfig::from_json_str(raw).unwrap();
        assert_eq!(config.observer_position, Some(Vec3::new(0.0, 0.0, 100.0)));
        assert_eq!(config.horizontal_angle_deg, 120.0);
        assert_eq!(config.vertical_angle_deg, 60.0);
        assert_eq!(config.hidden_color, Color::new(0.5, 0.0, 0.0, 1.0));
        assert_eq!(config.shadow_map_size, 2048);
    }

    #[test]
    fn missing_observer_is_rejected() {
        let err = ViewshedConfig::from_json_str("{}").unwrap_err();
        assert!(matches!(err, ViewshedError::Config(_)));
    }

    #[test]
    fn negative_angle_is_rejected() {
        let config = ViewshedConfig {
            observer_position: Some(Vec3::new(1.0, 2.0, 3.0)),
            vertical_angle_deg: -5.0,
            ..ViewshedConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ViewshedError::InvalidAngle {
                axis: "vertical",
                degrees: -5.0
            })
        );
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = ViewshedConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ViewshedError::Config(_)));
    }

    #[test]
    fn serializes_back_to_camel_case() {
        let config = ViewshedConfig {
            observer_position: Some(Vec3::new(1.0, 2.0, 3.0)),
            ..ViewshedConfig::default()
        };
        let raw = config.to_json_string().unwrap();
        assert!(raw.contains("\"shadowMapSize\""));
        assert_eq!(ViewshedConfig::from_json_str(&raw).unwrap(), config);
    }

    #[test]
    fn half_angles_are_radians() {
        let config = ViewshedConfig::default();
        assert!((config.horizontal_half_angle() - 45f64.to_radians()).abs() < 1e-12);
        assert!((config.vertical_half_angle() - 30f64.to_radians()).abs() < 1e-12);
    }
}
