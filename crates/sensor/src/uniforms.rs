use foundation::Color;
use gpu::UniformBlock;

use crate::material::Material;

/// Per-draw uniform values, rebuilt by value from the sensor's fields every
/// frame and copied into each draw command.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SensorUniforms {
    pub radius: f64,
    pub intersection_color: Color,
    pub intersection_width: f64,
    pub show_intersection: bool,
    pub show_through_ellipsoid: bool,
    pub pick_color: Color,
}

impl SensorUniforms {
    pub fn surface_block(&self, material: &Material) -> UniformBlock {
        let mut block = UniformBlock::new();
        material.write_uniforms(&mut block);
        block
            .set_float("u_radius", self.radius)
            .set_color("u_intersection_color", self.intersection_color)
            .set_float("u_intersection_width", self.intersection_width)
            .set_bool("u_show_intersection", self.show_intersection)
            .set_bool("u_show_through_ellipsoid", self.show_through_ellipsoid)
            .set_color("u_pick_color", self.pick_color);
        block
    }

    pub fn line_block(&self, color: Color) -> UniformBlock {
        let mut block = UniformBlock::new();
        block
            .set_color("u_color", color)
            .set_color("u_pick_color", self.pick_color);
        block
    }

    /// Pick commands only read the pick color; the ellipsoid flag still
    /// decides whether hidden fragments are discarded.
    pub fn pick_block(&self) -> UniformBlock {
        let mut block = UniformBlock::new();
        block
            .set_color("u_pick_color", self.pick_color)
            .set_bool("u_show_through_ellipsoid", self.show_through_ellipsoid);
        block
    }
}

/// Encodes a pick id as RGBA, one byte per channel, low byte in red.
pub fn pick_color(id: u32) -> Color {
    let [r, g, b, a] = id.to_le_bytes();
    let channel = |v: u8| v as f32 / 255.0;
    Color::new(channel(r), channel(g), channel(b), channel(a))
}

#[cfg(test)]
mod tests {
    use super::{SensorUniforms, pick_color};
    use crate::material::Material;
    use foundation::Color;
    use gpu::UniformValue;

    fn uniforms() -> SensorUniforms {
        SensorUniforms {
            radius: 250.0,
            intersection_color: Color::WHITE,
            intersection_width: 5.0,
            show_intersection: true,
            show_through_ellipsoid: false,
            pick_color: pick_color(7),
        }
    }

    #[test]
    fn surface_block_carries_material_and_flags() {
        let block = uniforms().surface_block(&Material::color(Color::RED));
        assert_eq!(block.get("u_radius"), Some(UniformValue::Float(250.0)));
        assert_eq!(
            block.get("u_material_even"),
            Some(UniformValue::Color(Color::RED.to_array()))
        );
        assert_eq!(block.get("u_show_intersection"), Some(UniformValue::Bool(true)));
    }

    #[test]
    fn line_block_is_color_only() {
        let block = uniforms().line_block(Color::YELLOW);
        assert_eq!(block.len(), 2);
        assert_eq!(
            block.get("u_color"),
            Some(UniformValue::Color(Color::YELLOW.to_array()))
        );
    }

    #[test]
    fn pick_color_round_trips_bytes() {
        let c = pick_color(0x0403_0201);
        assert_eq!(
            [c.r, c.g, c.b, c.a].map(|v| (v * 255.0).round() as u8),
            [1, 2, 3, 4]
        );
    }
}
