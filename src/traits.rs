//! Trait definitions
use rand::Rng;

/// Something with a (possibly un-normalized) density or mass function.
pub trait HasDensity<X> {
    /// Probability function
    ///
    /// # Example
    ///
    /// ```
    /// use switchpoint::dist::Poisson;
    /// use switchpoint::traits::HasDensity;
    ///
    /// let pois = Poisson::new(1.0).unwrap();
    /// let f = pois.f(&1_u32);
    /// assert!((f - (-1.0_f64).exp()).abs() < 1E-12);
    /// ```
    fn f(&self, x: &X) -> f64 {
        self.ln_f(x).exp()
    }

    /// Log probability function. Values outside the support must map to
    /// `f64::NEG_INFINITY` rather than panic.
    fn ln_f(&self, x: &X) -> f64;
}

/// Something that can be drawn from.
pub trait Sampleable<X> {
    /// Single draw
    fn draw<R: Rng>(&self, rng: &mut R) -> X;

    /// Multiple draws
    ///
    /// # Example
    ///
    /// ```
    /// use switchpoint::dist::Exponential;
    /// use switchpoint::traits::Sampleable;
    ///
    /// let mut rng = rand::thread_rng();
    /// let expon = Exponential::new(2.0).unwrap();
    /// let xs: Vec<f64> = expon.sample(22, &mut rng);
    ///
    /// assert_eq!(xs.len(), 22);
    /// ```
    fn sample<R: Rng>(&self, n: usize, mut rng: &mut R) -> Vec<X> {
        (0..n).map(|_| self.draw(&mut rng)).collect()
    }
}

/// Identifies the support of a distribution
pub trait Support<X> {
    /// Returns `true` if `x` is in the support
    fn supports(&self, x: &X) -> bool;
}

/// Marker for distributions over continuous values
pub trait ContinuousDistr<X>: HasDensity<X> + Support<X> {
    /// The value of the log Probability Density Function (PDF) at `x`.
    /// Returns `-∞` outside of the support.
    fn ln_pdf(&self, x: &X) -> f64 {
        if self.supports(x) {
            self.ln_f(x)
        } else {
            f64::NEG_INFINITY
        }
    }
}

/// Marker for distributions over discrete values
pub trait DiscreteDistr<X>: HasDensity<X> + Support<X> {
    /// Log probability mass at `x`. Returns `-∞` outside of the support.
    fn ln_pmf(&self, x: &X) -> f64 {
        if self.supports(x) {
            self.ln_f(x)
        } else {
            f64::NEG_INFINITY
        }
    }

    /// Probability mass at `x`
    fn pmf(&self, x: &X) -> f64 {
        self.ln_pmf(x).exp()
    }
}
