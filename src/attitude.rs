// Quaternion attitude error against a yaw-only reference
//
// Quaternions are [w, x, y, z] (scalar first).

/// Computes the quaternion error between a reference yaw and the measured rates
pub trait AttitudeMath: Send + Sync {
    /// `reference_yaw` in radians, `rates` as received in an orientation/rate packet
    fn quaternion_error(&self, reference_yaw: f32, rates: [f32; 4]) -> [f32; 4];
}

/// Reads the rate vector as `[elapsed s, wx, wy, wz]` and takes the measured
/// attitude to be the rotation vector `w * elapsed`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuaternionError;

impl AttitudeMath for QuaternionError {
    fn quaternion_error(&self, reference_yaw: f32, rates: [f32; 4]) -> [f32; 4] {
        let [elapsed, wx, wy, wz] = rates;
        let reference = yaw_quaternion(reference_yaw);
        let measured = rotation_vector_quaternion([wx * elapsed, wy * elapsed, wz * elapsed]);

        let error = multiply(conjugate(reference), measured);
        // Keep the shortest-path representation
        if error[0] < 0.0 { error.map(|c| -c) } else { error }
    }
}

pub fn yaw_quaternion(yaw: f32) -> [f32; 4] {
    let half = yaw * 0.5;
    [half.cos(), 0.0, 0.0, half.sin()]
}

/// Axis-angle quaternion from a rotation vector (radians)
pub fn rotation_vector_quaternion(v: [f32; 3]) -> [f32; 4] {
    let angle = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if angle < f32::EPSILON {
        return [1.0, 0.0, 0.0, 0.0];
    }
    let half = angle * 0.5;
    let s = half.sin() / angle;
    [half.cos(), v[0] * s, v[1] * s, v[2] * s]
}

pub fn conjugate(q: [f32; 4]) -> [f32; 4] {
    [q[0], -q[1], -q[2], -q[3]]
}

/// Hamilton product a ⊗ b
pub fn multiply(a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
    [
        a[0] * b[0] - a[1] * b[1] - a[2] * b[2] - a[3] * b[3],
        a[0] * b[1] + a[1] * b[0] + a[2] * b[3] - a[3] * b[2],
        a[0] * b[2] - a[1] * b[3] + a[2] * b[0] + a[3] * b[1],
        a[0] * b[3] + a[1] * b[2] - a[2] * b[1] + a[3] * b[0],
    ]
}
