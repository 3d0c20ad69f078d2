//! Element-wise helpers over flat `f64` buffers.
//!
//! Every operation comes in two flavours: a copying one that leaves its input
//! untouched and returns a fresh buffer, and an `_in_place` one that writes into
//! (and returns) the first argument so the frame loop does not allocate.
//! Buffers passed together must have the same length; the value-shape adapter
//! fixes that length once per spring.

#[inline]
pub fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

#[inline]
pub fn add_in_place<'a>(a: &'a mut [f64], b: &[f64]) -> &'a mut [f64] {
    debug_assert_eq!(a.len(), b.len());
    for (x, y) in a.iter_mut().zip(b) {
        *x += y;
    }
    a
}

#[inline]
pub fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

#[inline]
pub fn sub_in_place<'a>(a: &'a mut [f64], b: &[f64]) -> &'a mut [f64] {
    debug_assert_eq!(a.len(), b.len());
    for (x, y) in a.iter_mut().zip(b) {
        *x -= y;
    }
    a
}

#[inline]
pub fn scale(a: &[f64], k: f64) -> Vec<f64> {
    a.iter().map(|x| x * k).collect()
}

#[inline]
pub fn scale_in_place(a: &mut [f64], k: f64) -> &mut [f64] {
    for x in a.iter_mut() {
        *x *= k;
    }
    a
}

/// Euclidean length, `sqrt(sum(a_i^2))`.
#[inline]
pub fn norm(a: &[f64]) -> f64 {
    a.iter().map(|x| x * x).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copying_ops_leave_input_untouched() {
        let a = [1.0, 2.0, 3.0];
        let b = [0.5, 0.5, 0.5];
        assert_eq!(add(&a, &b), vec![1.5, 2.5, 3.5]);
        assert_eq!(sub(&a, &b), vec![0.5, 1.5, 2.5]);
        assert_eq!(scale(&a, 2.0), vec![2.0, 4.0, 6.0]);
        assert_eq!(a, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn in_place_ops_write_into_first_argument() {
        let mut a = vec![1.0, 2.0];
        add_in_place(&mut a, &[1.0, 1.0]);
        assert_eq!(a, vec![2.0, 3.0]);
        sub_in_place(&mut a, &[2.0, 2.0]);
        assert_eq!(a, vec![0.0, 1.0]);
        scale_in_place(&mut a, -3.0);
        assert_eq!(a, vec![0.0, -3.0]);
    }

    #[test]
    fn in_place_ops_chain() {
        let mut a = vec![1.0, 1.0];
        let out = scale_in_place(add_in_place(&mut a, &[1.0, 2.0]), 0.5);
        assert_eq!(out, &[1.0, 1.5]);
    }

    #[test]
    fn norm_is_euclidean() {
        assert_eq!(norm(&[3.0, 4.0]), 5.0);
        assert_eq!(norm(&[-2.0]), 2.0);
        assert_eq!(norm(&[]), 0.0);
    }
}
