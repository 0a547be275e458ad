use crate::{Error, Point3D, PointCloud, Result};

const FLOAT_SIZE: usize = std::mem::size_of::<f32>();

/// Decode a buffer of little-endian `f32` values in row-major order into a cloud.
///
/// Every point occupies `stride` floats. The first three are `x, y, z`; any
/// further columns (intensity, ring, label...) are dropped.
pub fn cloud_from_raw_buffer(buffer: &[u8], stride: usize) -> Result<PointCloud> {
    if stride < 3 {
        return Err(Error::InvalidInput(format!(
            "stride must be at least 3 floats, got {stride}"
        )));
    }

    let row_bytes = stride * FLOAT_SIZE;
    if buffer.len() % row_bytes != 0 {
        return Err(Error::InvalidInput(format!(
            "buffer of {} bytes is not a whole number of {}-float rows",
            buffer.len(),
            stride
        )));
    }

    let cloud = buffer
        .chunks_exact(row_bytes)
        .map(|row| {
            let mut xyz = [0f32; 3];
            for (col, value) in xyz.iter_mut().enumerate() {
                let start = col * FLOAT_SIZE;
                let mut bytes = [0u8; FLOAT_SIZE];
                bytes.copy_from_slice(&row[start..start + FLOAT_SIZE]);
                *value = f32::from_le_bytes(bytes);
            }
            Point3D::new(xyz[0], xyz[1], xyz[2])
        })
        .collect();

    Ok(cloud)
}

/// Rows of an `N x 3` matrix as points.
pub fn cloud_from_matrix<S>(
    matrix: &nalgebra::Matrix<f32, nalgebra::Dyn, nalgebra::Const<3>, S>,
) -> PointCloud
where
    S: nalgebra::RawStorage<f32, nalgebra::Dyn, nalgebra::Const<3>>,
{
    matrix
        .row_iter()
        .map(|row| Point3D::new(row[0], row[1], row[2]))
        .collect()
}
