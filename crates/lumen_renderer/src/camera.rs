//! Camera and per-pixel ray generation.

use std::io::{self, Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use lumen_math::{rotation_x_deg, rotation_y_deg, rotation_z_deg, Ray, Vec3};

/// Serialized camera: origin (3 f64) plus pitch, yaw, roll and the angle
/// of view, all little-endian f64.
pub const SERIALIZED_SIZE: usize = 7 * 8;

/// A camera placed at `origin`, oriented by pitch/yaw/roll (degrees,
/// around the X/Y/Z axes) with a horizontal angle of view in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub origin: Vec3,
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
    pub aov: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            pitch: 0.0,
            yaw: 0.0,
            roll: 0.0,
            aov: 90.0,
        }
    }
}

impl Camera {
    pub fn new(origin: Vec3, pitch: f64, yaw: f64, roll: f64, aov: f64) -> Self {
        Self {
            origin,
            pitch,
            yaw,
            roll,
            aov,
        }
    }

    /// The camera's forward direction. Roll is skipped since it cannot
    /// change the forward vector.
    pub fn direction(&self) -> Vec3 {
        (rotation_y_deg(self.yaw) * rotation_x_deg(self.pitch))
            .transform_point3(Vec3::new(0.0, 0.0, 1.0))
    }

    /// Build the sensor for an image of the given resolution.
    pub fn sensor(&self, width: u32, height: u32) -> Sensor {
        let aov_vertical = (height as f64 / width as f64) * self.aov;

        let rot_left = rotation_y_deg(self.aov / 2.0);
        let rot_right = rotation_y_deg(-self.aov / 2.0);
        let rot_top = rotation_z_deg(aov_vertical / 2.0);
        let rot_bottom = rotation_z_deg(-aov_vertical / 2.0);

        let forward = Vec3::new(0.0, 0.0, 1.0);
        let top_left = (rot_top * rot_left).transform_point3(forward);
        let top_right = (rot_bottom * rot_right).transform_point3(forward);
        let bottom_left = (rot_bottom * rot_left).transform_point3(forward);

        // Rotate the frustum corners into the camera's direction.
        let orientation =
            rotation_y_deg(self.yaw) * rotation_x_deg(self.pitch) * rotation_z_deg(self.roll);
        let top_left = orientation.transform_point3(top_left);
        let top_right = orientation.transform_point3(top_right);
        let bottom_left = orientation.transform_point3(bottom_left);

        Sensor {
            origin: self.origin,
            start: top_left,
            delta_scanline: (bottom_left - top_left) / height as f64,
            delta_pixel: (top_right - top_left) / width as f64,
        }
    }

    /// Write the camera in wire format.
    pub fn serialize(&self, out: &mut impl Write) -> io::Result<()> {
        out.write_f64::<LittleEndian>(self.origin.x)?;
        out.write_f64::<LittleEndian>(self.origin.y)?;
        out.write_f64::<LittleEndian>(self.origin.z)?;
        out.write_f64::<LittleEndian>(self.pitch)?;
        out.write_f64::<LittleEndian>(self.yaw)?;
        out.write_f64::<LittleEndian>(self.roll)?;
        out.write_f64::<LittleEndian>(self.aov)?;
        Ok(())
    }

    /// Serialize into a fresh byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SERIALIZED_SIZE);
        self.serialize(&mut bytes)
            .expect("writing to a Vec cannot fail");
        bytes
    }

    /// Decode a camera from wire format. The payload must be exactly
    /// `SERIALIZED_SIZE` bytes.
    pub fn deserialize(bytes: &[u8]) -> Option<Camera> {
        if bytes.len() != SERIALIZED_SIZE {
            return None;
        }
        let mut cursor = Cursor::new(bytes);
        let mut next = || cursor.read_f64::<LittleEndian>();
        read_camera(&mut next).ok()
    }
}

fn read_camera(next: &mut impl FnMut() -> io::Result<f64>) -> io::Result<Camera> {
    Ok(Camera {
        origin: Vec3::new(next()?, next()?, next()?),
        pitch: next()?,
        yaw: next()?,
        roll: next()?,
        aov: next()?,
    })
}

/// A camera sensor: precomputed frustum deltas for an image resolution.
#[derive(Debug, Clone, Copy)]
pub struct Sensor {
    origin: Vec3,
    start: Vec3,
    delta_scanline: Vec3,
    delta_pixel: Vec3,
}

impl Sensor {
    /// The primary ray through pixel (x, y).
    pub fn ray(&self, x: u32, y: u32) -> Ray {
        let direction = self.start + self.delta_scanline * y as f64 + self.delta_pixel * x as f64;
        Ray::new(self.origin, direction)
    }
}
