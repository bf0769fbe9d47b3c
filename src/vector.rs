/// Squared euclidean distance (L2²). LOWER is closer.
///
/// No sqrt: ranking is identical and the value stays bit-stable across
/// insert, search and reload.
///
/// Unrolling 16 lanes lets LLVM fill AVX-512 registers; on AVX2 it splits
/// into two 256-bit halves.
#[inline(always)]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = 0.0;

    let chunks = a.chunks_exact(16);
    let b_chunks = b.chunks_exact(16);
    let remainder_start = a.len() - a.len() % 16;

    // Accumulation order is fixed: each 16-lane block sums left to right, then the
    // tail. Stored distances only stay bit-identical across reloads if it never changes.
    for (ac, bc) in chunks.zip(b_chunks) {
        let d0  = ac[0]  - bc[0];
        let d1  = ac[1]  - bc[1];
        let d2  = ac[2]  - bc[2];
        let d3  = ac[3]  - bc[3];
        let d4  = ac[4]  - bc[4];
        let d5  = ac[5]  - bc[5];
        let d6  = ac[6]  - bc[6];
        let d7  = ac[7]  - bc[7];
        let d8  = ac[8]  - bc[8];
        let d9  = ac[9]  - bc[9];
        let d10 = ac[10] - bc[10];
        let d11 = ac[11] - bc[11];
        let d12 = ac[12] - bc[12];
        let d13 = ac[13] - bc[13];
        let d14 = ac[14] - bc[14];
        let d15 = ac[15] - bc[15];

        sum += d0*d0   + d1*d1   + d2*d2   + d3*d3   +
        d4*d4   + d5*d5   + d6*d6   + d7*d7   +
        d8*d8   + d9*d9   + d10*d10 + d11*d11 +
        d12*d12 + d13*d13 + d14*d14 + d15*d15;
    }

    for i in remainder_start..a.len() {
        let diff = a[i] - b[i];
        sum += diff * diff;
    }

    sum
}

/// Scale `v` to unit length in place. Zero vectors are left alone.
pub fn normalize_l2(v: &mut [f32]) {
    // f64 accumulator keeps the norm stable for wide vectors
    let norm = v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt() as f32;
    if norm > 1e-10 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
