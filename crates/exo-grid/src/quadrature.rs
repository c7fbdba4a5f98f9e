//! Gauss–Legendre quadrature nodes and weights.

use std::f64::consts::PI;

const NEWTON_TOLERANCE: f64 = 1e-15;
const NEWTON_MAX_ITERATIONS: usize = 100;

/// Gauss–Legendre abscissas and weights for `n` points on `[a, b]`.
///
/// Roots of the Legendre polynomial `P_n` are found by Newton iteration from
/// the Chebyshev-like initial guess `cos(π (i + 3/4) / (n + 1/2))`, then
/// mapped linearly onto the interval. Abscissas are returned in ascending
/// order. An n-point rule integrates polynomials up to degree `2n - 1` exactly.
pub fn gauss_legendre(a: f64, b: f64, n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut x = vec![0.0; n];
    let mut w = vec![0.0; n];
    if n == 0 {
        return (x, w);
    }

    let half_sum = 0.5 * (b + a);
    let half_len = 0.5 * (b - a);
    let nf = n as f64;

    // Roots are symmetric about the midpoint; only the upper half is solved.
    for i in 0..n.div_ceil(2) {
        let mut z = (PI * (i as f64 + 0.75) / (nf + 0.5)).cos();
        for _ in 0..NEWTON_MAX_ITERATIONS {
            let (p, deriv) = legendre_with_derivative(n, z);
            let z_prev = z;
            z = z_prev - p / deriv;
            if (z - z_prev).abs() <= NEWTON_TOLERANCE {
                break;
            }
        }
        let (_, dp) = legendre_with_derivative(n, z);
        let weight = 2.0 * half_len / ((1.0 - z * z) * dp * dp);
        x[i] = half_sum - half_len * z;
        x[n - 1 - i] = half_sum + half_len * z;
        w[i] = weight;
        w[n - 1 - i] = weight;
    }
    (x, w)
}

/// Evaluate `P_n(z)` and `P_n'(z)` by the three-term recurrence.
fn legendre_with_derivative(n: usize, z: f64) -> (f64, f64) {
    let mut p1 = 1.0;
    let mut p2 = 0.0;
    for j in 0..n {
        let p3 = p2;
        p2 = p1;
        let jf = j as f64;
        p1 = ((2.0 * jf + 1.0) * z * p2 - jf * p3) / (jf + 1.0);
    }
    let nf = n as f64;
    let deriv = nf * (z * p1 - p2) / (z * z - 1.0);
    (p1, deriv)
}
