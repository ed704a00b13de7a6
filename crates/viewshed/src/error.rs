use gpu::GpuError;
use sensor::SensorError;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewshedError {
    /// Full angles must be finite and within `[0, 180]` degrees.
    InvalidAngle { axis: &'static str, degrees: f64 },
    InvalidDistance(f64),
    InvalidAlpha(f64),
    /// The operation needs a target position and none has been set yet.
    MissingTarget,
    /// Observer and target coincide, or the view direction is parallel to the
    /// observer's up vector.
    DegenerateGeometry,
    Config(String),
    Destroyed,
    Sensor(SensorError),
    Gpu(GpuError),
}

impl std::fmt::Display for ViewshedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewshedError::InvalidAngle { axis, degrees } => {
                write!(f, "{axis} angle must be in [0, 180] degrees: got {degrees}")
            }
            ViewshedError::InvalidDistance(d) => {
                write!(f, "distance must be finite and > 0: got {d}")
            }
            ViewshedError::InvalidAlpha(a) => write!(f, "alpha must be in [0, 1]: got {a}"),
            ViewshedError::MissingTarget => write!(f, "no target position set"),
            ViewshedError::DegenerateGeometry => {
                write!(f, "observer/target geometry is degenerate")
            }
            ViewshedError::Config(msg) => write!(f, "config: {msg}"),
            ViewshedError::Destroyed => write!(f, "viewshed used after destroy()"),
            ViewshedError::Sensor(e) => write!(f, "sensor: {e}"),
            ViewshedError::Gpu(e) => write!(f, "gpu: {e}"),
        }
    }
}

impl std::error::Error for ViewshedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ViewshedError::Sensor(e) => Some(e),
            ViewshedError::Gpu(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SensorError> for ViewshedError {
    fn from(e: SensorError) -> Self {
        ViewshedError::Sensor(e)
    }
}

impl From<GpuError> for ViewshedError {
    fn from(e: GpuError) -> Self {
        ViewshedError::Gpu(e)
    }
}
