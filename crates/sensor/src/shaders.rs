//! WGSL sources for sensor programs.
//!
//! Variants are selected with pipeline-overridable constants; the names in
//! `ShaderProgramDesc::defines` are set to `true`. Uniform block entries named
//! `u_<field>` map onto the fields of the `SensorUniforms` struct below, and
//! the host fills `frame` plus the per-command `model` matrix.

pub const DEFINE_TRANSLUCENT: &str = "TRANSLUCENT";
pub const DEFINE_BACK_FACE: &str = "BACK_FACE";
pub const DEFINE_PICK: &str = "PICK";

pub const SENSOR_SURFACE_SHADER: &str = r#"
override TRANSLUCENT: bool = false;
override BACK_FACE: bool = false;
override PICK: bool = false;

const WGS84_A: f32 = 6378137.0;
const INV_RADII_SQ = vec3<f32>(
    1.0 / (6378137.0 * 6378137.0),
    1.0 / (6378137.0 * 6378137.0),
    1.0 / (6356752.314245 * 6356752.314245),
);

struct FrameUniforms {
    view_projection: mat4x4<f32>,
    camera_position: vec3<f32>,
    _pad: f32,
};

struct SensorUniforms {
    model: mat4x4<f32>,
    material_even: vec4<f32>,
    material_odd: vec4<f32>,
    intersection_color: vec4<f32>,
    pick_color: vec4<f32>,
    radius: f32,
    material_repeat: f32,
    intersection_width: f32,
    show_intersection: f32,
    show_through_ellipsoid: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
};

@group(0) @binding(0) var<uniform> frame: FrameUniforms;
@group(1) @binding(0) var<uniform> sensor: SensorUniforms;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) world: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) radial: f32,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) normal: vec3<f32>) -> VsOut {
    let world = sensor.model * vec4<f32>(position, 1.0);
    let n = (sensor.model * vec4<f32>(normal, 0.0)).xyz;
    return VsOut(frame.view_projection * world, world.xyz, n, length(position));
}

@fragment
fn fs_main(fs_in: VsOut) -> @location(0) vec4<f32> {
    let q = dot(fs_in.world * fs_in.world, INV_RADII_SQ);
    if (sensor.show_through_ellipsoid < 0.5 && q < 1.0) {
        discard;
    }
    if (PICK) {
        return sensor.pick_color;
    }
    let height = (sqrt(q) - 1.0) * WGS84_A;
    if (sensor.show_intersection > 0.5 && abs(height) < sensor.intersection_width) {
        return sensor.intersection_color;
    }

    var n = normalize(fs_in.normal);
    if (BACK_FACE) {
        n = -n;
    }
    var band = 0.0;
    if (sensor.material_repeat > 0.0) {
        band = fract(fs_in.radial * sensor.material_repeat);
    }
    let color = select(sensor.material_even, sensor.material_odd, band >= 0.5);
    let v = normalize(frame.camera_position - fs_in.world);
    let shade = 0.6 + 0.4 * abs(dot(n, v));
    var alpha = color.a;
    if (!TRANSLUCENT) {
        alpha = 1.0;
    }
    return vec4<f32>(color.rgb * shade, alpha);
}
"#;

pub const SENSOR_LINE_SHADER: &str = r#"
override TRANSLUCENT: bool = false;
override BACK_FACE: bool = false;
override PICK: bool = false;

struct FrameUniforms {
    view_projection: mat4x4<f32>,
    camera_position: vec3<f32>,
    _pad: f32,
};

struct LineUniforms {
    model: mat4x4<f32>,
    color: vec4<f32>,
    pick_color: vec4<f32>,
};

@group(0) @binding(0) var<uniform> frame: FrameUniforms;
@group(1) @binding(0) var<uniform> line: LineUniforms;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return frame.view_projection * line.model * vec4<f32>(position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    if (PICK) {
        return line.pick_color;
    }
    if (!TRANSLUCENT) {
        return vec4<f32>(line.color.rgb, 1.0);
    }
    return line.color;
}
"#;
