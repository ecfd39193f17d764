use nalgebra as na;
use num_traits::Float;

/// Ordinary least-squares slopes of `x(t)` and `y(t)` over `(t, x, y)`
/// samples. `None` with fewer than two samples or zero time variance.
pub fn linear_trend<T, I>(samples: I) -> Option<(T, T)>
where
    T: Float,
    I: IntoIterator<Item = (T, T, T)>,
    I::IntoIter: Clone,
{
    let iter = samples.into_iter();

    let mut count = 0usize;
    let (mut s_t, mut s_x, mut s_y) = (T::zero(), T::zero(), T::zero());

    for (t, x, y) in iter.clone() {
        count += 1;
        s_t = s_t + t;
        s_x = s_x + x;
        s_y = s_y + y;
    }

    if count < 2 {
        return None;
    }

    let n = T::from(count)?;
    let (mean_t, mean_x, mean_y) = (s_t / n, s_x / n, s_y / n);

    let (mut s_xt, mut s_yt, mut s_tt) = (T::zero(), T::zero(), T::zero());

    for (t, x, y) in iter {
        let dt = t - mean_t;
        s_xt = s_xt + dt * (x - mean_x);
        s_yt = s_yt + dt * (y - mean_y);
        s_tt = s_tt + dt * dt;
    }

    if s_tt == T::zero() {
        return None;
    }

    Some((s_xt / s_tt, s_yt / s_tt))
}

/// Direct linear transform with `h8 = 1`: solves the `2n x 8` system built
/// from `n >= 4` correspondences in least squares through QR.
pub fn homography_ls(
    src: &[na::Point2<f64>],
    dst: &[na::Point2<f64>],
) -> Option<na::Matrix3<f64>> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }

    let rows = src.len() * 2;
    let mut a = na::DMatrix::<f64>::zeros(rows, 8);
    let mut b = na::DVector::<f64>::zeros(rows);

    for (i, (p, q)) in src.iter().zip(dst.iter()).enumerate() {
        let (x, y, u, v) = (p.x, p.y, q.x, q.y);
        let r = i * 2;

        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -u * x;
        a[(r, 7)] = -u * y;
        b[r] = u;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -v * x;
        a[(r + 1, 7)] = -v * y;
        b[r + 1] = v;
    }

    let qr_result = a.qr();
    let r = qr_result.r();

    // collinear or repeated points leave a (near) zero pivot
    let pivots = r.diagonal();
    let largest = pivots.iter().fold(0.0f64, |m, d| m.max(d.abs()));
    if largest == 0.0 || pivots.iter().any(|d| d.abs() <= largest * 1e-10) {
        return None;
    }

    let qty = qr_result.q().transpose() * b;
    let h = r.solve_upper_triangular(&qty)?;

    if h.iter().any(|c| !c.is_finite()) {
        return None;
    }

    Some(na::Matrix3::new(
        h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0,
    ))
}
