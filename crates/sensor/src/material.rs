use foundation::Color;
use gpu::UniformBlock;

/// Surface appearance, expressed entirely through uniforms.
///
/// Every variant is drawn by the same surface program, so swapping materials
/// never needs a program rebuild unless translucency flips.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Material {
    Color(Color),
    /// Alternating bands along the radial direction.
    Stripe { even: Color, odd: Color, repeat: f64 },
}

impl Default for Material {
    fn default() -> Self {
        Material::Color(Color::new(0.0, 1.0, 1.0, 0.5))
    }
}

impl Material {
    pub fn color(color: Color) -> Self {
        Material::Color(color)
    }

    pub fn is_translucent(&self) -> bool {
        match self {
            Material::Color(c) => c.is_translucent(),
            Material::Stripe { even, odd, .. } => even.is_translucent() || odd.is_translucent(),
        }
    }

    pub fn write_uniforms(&self, block: &mut UniformBlock) {
        match *self {
            Material::Color(c) => {
                block
                    .set_color("u_material_even", c)
                    .set_color("u_material_odd", c)
                    .set_float("u_material_repeat", 0.0);
            }
            Material::Stripe { even, odd, repeat } => {
                block
                    .set_color("u_material_even", even)
                    .set_color("u_material_odd", odd)
                    .set_float("u_material_repeat", repeat.max(0.0));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Material;
    use foundation::Color;
    use gpu::{UniformBlock, UniformValue};

    #[test]
    fn stripe_is_translucent_if_either_band_is() {
        let m = Material::Stripe {
            even: Color::RED,
            odd: Color::WHITE.with_alpha(0.2),
            repeat: 4.0,
        };
        assert!(m.is_translucent());
        assert!(!Material::color(Color::RED).is_translucent());
    }

    #[test]
    fn solid_color_writes_zero_repeat() {
        let mut block = UniformBlock::new();
        Material::color(Color::LIME).write_uniforms(&mut block);
        assert_eq!(block.get("u_material_repeat"), Some(UniformValue::Float(0.0)));
        assert_eq!(
            block.get("u_material_odd"),
            Some(UniformValue::Color(Color::LIME.to_array()))
        );
    }
}
