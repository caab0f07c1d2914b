use special::Gamma;

/// Outcome of a Pearson Χ<sup>2</sup> goodness-of-fit test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoodnessOfFit {
    /// The Χ<sup>2</sup> statistic
    pub statistic: f64,
    /// Probability of a statistic at least this large under the null
    pub p_value: f64,
}

impl GoodnessOfFit {
    /// `true` if the null hypothesis survives at significance `alpha`
    pub fn passes(&self, alpha: f64) -> bool {
        self.p_value > alpha
    }
}

/// Pearson Χ<sup>2</sup> test of observed category counts against expected
/// category probabilities.
///
/// # Example
///
/// Were the counts generated uniformly?
///
/// ```
/// use switchpoint::misc::x2_test;
///
/// let f_obs: Vec<u32> = vec![28, 31, 40, 35];
/// let ps: Vec<f64> = vec![0.25; 4];
///
/// assert!(x2_test(&f_obs, &ps).passes(0.05));
/// ```
pub fn x2_test(f_obs: &[u32], ps: &[f64]) -> GoodnessOfFit {
    let n: f64 = f_obs.iter().map(|&o| f64::from(o)).sum();
    let statistic: f64 = f_obs
        .iter()
        .zip(ps.iter())
        .map(|(&o, &p)| {
            let expected = n * p;
            (f64::from(o) - expected).powi(2) / expected
        })
        .sum();

    let half_dof = (f_obs.len() - 1) as f64 / 2.0;
    GoodnessOfFit {
        statistic,
        p_value: 1.0 - (statistic / 2.0).inc_gamma(half_dof),
    }
}
