use glam::Vec3;

/// Per-term light colors of the classic ambient/diffuse/specular model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightColors {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl LightColors {
    #[must_use]
    pub fn new(ambient: Vec3, diffuse: Vec3, specular: Vec3) -> Self {
        Self {
            ambient,
            diffuse,
            specular,
        }
    }
}

/// Distance falloff `1 / (constant + linear·d + quadratic·d²)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    /// Roughly a 50-unit range.
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

impl Attenuation {
    #[must_use]
    pub fn factor(&self, distance: f32) -> f32 {
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Infinitely distant light; `direction` points from the light into the scene.
    Directional { direction: Vec3 },
    Point {
        position: Vec3,
        attenuation: Attenuation,
    },
}

/// A scene light: shared colors plus the kind-specific geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub colors: LightColors,
    pub kind: LightKind,
}

impl Light {
    #[must_use]
    pub fn new_directional(direction: Vec3, colors: LightColors) -> Self {
        Self {
            colors,
            kind: LightKind::Directional { direction },
        }
    }

    #[must_use]
    pub fn new_point(position: Vec3, colors: LightColors) -> Self {
        Self {
            colors,
            kind: LightKind::Point {
                position,
                attenuation: Attenuation::default(),
            },
        }
    }

    #[must_use]
    pub fn with_attenuation(mut self, value: Attenuation) -> Self {
        if let LightKind::Point { attenuation, .. } = &mut self.kind {
            *attenuation = value;
        }
        self
    }

    #[must_use]
    pub fn position(&self) -> Option<Vec3> {
        match self.kind {
            LightKind::Point { position, .. } => Some(position),
            LightKind::Directional { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attenuation_is_one_at_source() {
        let att = Attenuation::default();
        assert!((att.factor(0.0) - 1.0).abs() < 1e-6);
        assert!(att.factor(10.0) < att.factor(1.0));
    }

    #[test]
    fn directional_ignores_attenuation() {
        let colors = LightColors::new(Vec3::splat(0.2), Vec3::splat(0.5), Vec3::ONE);
        let light = Light::new_directional(Vec3::NEG_Y, colors).with_attenuation(Attenuation {
            constant: 2.0,
            linear: 0.0,
            quadratic: 0.0,
        });
        assert_eq!(light.kind, LightKind::Directional { direction: Vec3::NEG_Y });
        assert_eq!(light.position(), None);
    }
}
