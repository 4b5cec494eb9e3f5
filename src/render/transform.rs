// PixelGL
// copyright zipxing@hotmail.com 2022~2024

//! Hand-rolled transform and projection math. Matrices are column major,
//! ready for a `uniform_matrix_4_f32_slice` upload.

/// Per-draw model transform. Every draw call gets a fresh one; there is no
/// global matrix stack to save or restore.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub m: [f32; 16],
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform {
    pub fn new() -> Self {
        let mut m = [0.0; 16];
        m[0] = 1.0;
        m[5] = 1.0;
        m[10] = 1.0;
        m[15] = 1.0;
        Self { m }
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.m[12] += self.m[0] * x + self.m[4] * y + self.m[8] * z;
        self.m[13] += self.m[1] * x + self.m[5] * y + self.m[9] * z;
        self.m[14] += self.m[2] * x + self.m[6] * y + self.m[10] * z;
        self
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        for i in 0..3 {
            self.m[i] *= x;
            self.m[4 + i] *= y;
            self.m[8 + i] *= z;
        }
        self
    }

    /// Rotation around the z axis, radians.
    pub fn rotate_z(&mut self, angle: f32) -> &mut Self {
        let (sin, cos) = angle.sin_cos();
        for i in 0..3 {
            let a = self.m[i];
            let b = self.m[4 + i];
            self.m[i] = a * cos + b * sin;
            self.m[4 + i] = -a * sin + b * cos;
        }
        self
    }
}

/// Projection handed to each draw call. `Perspective` is the world pass,
/// `Flat` the pixel-scaled GUI/cursor/video pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    Perspective {
        fov_deg: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    /// Origin at screen center, x right, y up, one unit per pixel.
    Flat { width: f32, height: f32 },
}

impl Projection {
    /// Default world projection for a surface of the given size.
    pub fn world(width: u32, height: u32) -> Self {
        Projection::Perspective {
            fov_deg: 60.0,
            aspect: width as f32 / height.max(1) as f32,
            near: 1.0,
            far: 1000.0,
        }
    }

    pub fn flat(width: u32, height: u32) -> Self {
        Projection::Flat {
            width: width as f32,
            height: height as f32,
        }
    }

    pub fn matrix(&self) -> [f32; 16] {
        let mut m = [0.0; 16];
        match *self {
            Projection::Perspective {
                fov_deg,
                aspect,
                near,
                far,
            } => {
                let f = 1.0 / (fov_deg.to_radians() / 2.0).tan();
                m[0] = f / aspect;
                m[5] = f;
                m[10] = (far + near) / (near - far);
                m[11] = -1.0;
                m[14] = (2.0 * far * near) / (near - far);
            }
            Projection::Flat { width, height } => {
                // matches the legacy glScalef(2/w, 2/h, 0) gui setup
                m[0] = 2.0 / width;
                m[5] = 2.0 / height;
                m[10] = 1.0;
                m[15] = 1.0;
            }
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(m: &[f32; 16], v: [f32; 4]) -> [f32; 4] {
        let mut out = [0.0; 4];
        for (r, o) in out.iter_mut().enumerate() {
            *o = m[r] * v[0] + m[4 + r] * v[1] + m[8 + r] * v[2] + m[12 + r] * v[3];
        }
        out
    }

    #[test]
    fn test_transform_translate() {
        let mut t = Transform::new();
        t.translate(3.0, -2.0, 1.0);
        let p = apply(&t.m, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(&p[..3], &[3.0, -2.0, 1.0]);
    }

    #[test]
    fn test_transform_scale_then_translate() {
        let mut t = Transform::new();
        t.scale(2.0, 2.0, 1.0).translate(1.0, 0.0, 0.0);
        // translation happens in the scaled frame
        let p = apply(&t.m, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(p[0], 2.0);
    }

    #[test]
    fn test_flat_projection_maps_pixels_to_ndc() {
        let p = Projection::flat(800, 600).matrix();
        let corner = apply(&p, [400.0, 300.0, 0.0, 1.0]);
        assert!((corner[0] - 1.0).abs() < 1e-6);
        assert!((corner[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_perspective_projection_depth_sign() {
        let p = Projection::world(800, 600).matrix();
        // a point in front of the camera has positive w after projection
        let v = apply(&p, [0.0, 0.0, -10.0, 1.0]);
        assert!(v[3] > 0.0);
    }
}
