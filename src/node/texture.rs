//! Circle alpha mask sampled by the texture node shape

pub const CIRCLE_TEXTURE_SIZE: u32 = 256;

/// RGBA pixels of a `size`×`size` disc: opaque alpha inside radius `size/2`
/// (measured from pixel centers), transparent outside. Color channels are
/// zero; the shader takes color from the vertex.
pub fn circle_texture(size: u32) -> Vec<u8> {
    let side = size as usize;
    let mut pixels = vec![0u8; side * side * 4];
    let r = size as f32 / 2.0;

    for row in 0..side {
        for col in 0..side {
            let cy = row as f32 - r + 0.5;
            let cx = col as f32 - r + 0.5;
            if (cx * cx + cy * cy).sqrt() < r {
                pixels[(row * side + col) * 4 + 3] = 0xff;
            }
        }
    }
    pixels
}
