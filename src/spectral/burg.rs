use super::SpectralError;

/// Autoregressive model `A(z) = 1 + Σ a_k z^-k` with its driving gain.
#[derive(Debug, Clone, PartialEq)]
pub struct ArModel {
    /// `order + 1` values, `coefficients[0] == 1.0`.
    pub coefficients: Vec<f64>,
    /// Square root of the residual mean power.
    pub gain: f64,
}

impl ArModel {
    pub fn order(&self) -> usize {
        self.coefficients.len() - 1
    }
}

/// Scratch space reused across fits so a cycle does not allocate.
#[derive(Debug, Clone, Default)]
pub struct BurgWorkspace {
    forward: Vec<f64>,
    backward: Vec<f64>,
    coefficients: Vec<f64>,
    previous: Vec<f64>,
}

impl BurgWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit an AR model of `order` to `window` with Burg's recursion.
    pub fn fit(&mut self, window: &[f64], order: usize) -> Result<ArModel, SpectralError> {
        let n = window.len();
        if order == 0 {
            return Err(SpectralError::InvalidOrder(order));
        }
        if n <= order {
            return Err(SpectralError::WindowTooShort { len: n, order });
        }

        let mut power = window.iter().map(|x| x * x).sum::<f64>() / n as f64;

        self.forward.clear();
        self.forward.extend_from_slice(&window[..n - 1]);
        self.backward.clear();
        self.backward.extend_from_slice(&window[1..]);
        self.coefficients.clear();
        self.coefficients.resize(order + 1, 0.0);
        self.previous.clear();
        self.previous.resize(order + 1, 0.0);

        let d = &mut self.coefficients;
        let wkm = &mut self.previous;
        let wk1 = &mut self.forward;
        let wk2 = &mut self.backward;

        for k in 1..=order {
            let overlap = n - k;
            let mut num = 0.0;
            let mut denom = 0.0;
            for j in 0..overlap {
                num += wk1[j] * wk2[j];
                denom += wk1[j] * wk1[j] + wk2[j] * wk2[j];
            }
            if denom < f64::EPSILON {
                num = 0.5;
                denom = 1.0;
            }

            d[k] = 2.0 * num / denom;
            power *= 1.0 - d[k] * d[k];
            for i in 1..k {
                d[i] = wkm[i] - d[k] * wkm[k - i];
            }

            if k == order {
                break;
            }

            wkm[1..=k].copy_from_slice(&d[1..=k]);
            for j in 0..overlap - 1 {
                wk1[j] -= wkm[k] * wk2[j];
                wk2[j] = wk2[j + 1] - wkm[k] * wk1[j + 1];
            }
        }

        let mut coefficients = Vec::with_capacity(order + 1);
        coefficients.push(1.0);
        coefficients.extend(d[1..=order].iter().map(|c| -c));

        Ok(ArModel {
            coefficients,
            gain: power.max(0.0).sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_must_exceed_order() {
        let mut ws = BurgWorkspace::new();
        let err = ws.fit(&[1.0, 2.0, 3.0], 3).unwrap_err();
        assert!(matches!(err, SpectralError::WindowTooShort { len: 3, order: 3 }));
        assert!(ws.fit(&[1.0, 2.0, 3.0, 4.0], 3).is_ok());
    }

    #[test]
    fn test_zero_order_rejected() {
        let mut ws = BurgWorkspace::new();
        assert!(matches!(ws.fit(&[1.0; 8], 0), Err(SpectralError::InvalidOrder(0))));
    }

    #[test]
    fn test_first_order_process_recovered() {
        // x[n] = 0.9 x[n-1] + e[n], deterministic pseudo-noise drive
        let mut x = vec![0.0f64; 2048];
        let mut seed: u32 = 12345;
        for n in 1..x.len() {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let e = ((seed >> 16) & 0x7FFF) as f64 / 32768.0 - 0.5;
            x[n] = 0.9 * x[n - 1] + e;
        }
        let model = BurgWorkspace::new().fit(&x, 1).unwrap();
        assert_eq!(model.coefficients[0], 1.0);
        assert!((model.coefficients[1] + 0.9).abs() < 0.05, "a1 = {}", model.coefficients[1]);
    }

    #[test]
    fn test_silent_window_uses_fallback_ratio() {
        let model = BurgWorkspace::new().fit(&[0.0; 16], 2).unwrap();
        assert!(model.coefficients.iter().all(|c| c.is_finite()));
        assert_eq!(model.gain, 0.0);
    }
}
