// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Clopper-Pearson confidence bounds on a sampled binomial proportion `k / n`.
//!
//! Used by consumers that need a confidence interval on a ratio estimated by
//! sampling (e.g. the fraction of one sketch's hashes found in another),
//! distinct from [`crate::common::binomial_bounds`], which bounds an absolute
//! cardinality.

use crate::error::Error;

/// Returns the two-sided `(lower, upper)` Clopper-Pearson confidence interval
/// on the true success probability, given `k` successes out of `n` trials at
/// tail probability `alpha` (e.g. `0.05` for a 95% interval).
pub fn bounds(k: u64, n: u64, alpha: f64) -> Result<(f64, f64), Error> {
    if n == 0 {
        return Err(Error::invalid_argument("n must be > 0"));
    }
    if k > n {
        return Err(Error::invalid_argument(format!(
            "k must be <= n, got k={k}, n={n}"
        )));
    }
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(Error::invalid_argument(format!(
            "alpha must be in (0, 1), got {alpha}"
        )));
    }

    let half = alpha / 2.0;

    let lower = if k == 0 {
        0.0
    } else if k == 1 {
        // Beta(1, b): I_x(1, b) = 1 - (1 - x)^b, invert directly.
        beta_one_b_inverse((n - k + 1) as f64, half)
    } else {
        approx_inverse_incomplete_beta(k as f64, (n - k + 1) as f64, half)
    };

    let upper = if k == n {
        1.0
    } else if k == n - 1 {
        // Beta(a, 1): I_x(a, 1) = x^a, invert directly.
        beta_a_one_inverse((k + 1) as f64, 1.0 - half)
    } else {
        approx_inverse_incomplete_beta((k + 1) as f64, (n - k) as f64, 1.0 - half)
    };

    Ok((lower, upper))
}

/// Exact inverse of `I_x(1, b) = p`, the Beta(1, b) CDF.
fn beta_one_b_inverse(b: f64, p: f64) -> f64 {
    1.0 - (1.0 - p).powf(1.0 / b)
}

/// Exact inverse of `I_x(a, 1) = p`, the Beta(a, 1) CDF.
fn beta_a_one_inverse(a: f64, p: f64) -> f64 {
    p.powf(1.0 / a)
}

/// Abramowitz & Stegun formula 26.5.22: a normal-approximation inversion of
/// the incomplete beta function `I_z(a, b) = p`, solving for `z`.
///
/// This is the standard closed-form approximation used by Clopper-Pearson
/// implementations that avoid an iterative beta-quantile solver.
fn approx_inverse_incomplete_beta(a: f64, b: f64, p: f64) -> f64 {
    let y = inverse_normal_cdf(p);
    let lambda = (y * y - 3.0) / 6.0;
    let h = 2.0 / (1.0 / (2.0 * a - 1.0) + 1.0 / (2.0 * b - 1.0));
    let w = y * (h + lambda).sqrt() / h
        - (1.0 / (2.0 * b - 1.0) - 1.0 / (2.0 * a - 1.0)) * (lambda + 5.0 / 6.0 - 2.0 / (3.0 * h));

    let x = a / (a + b * (2.0 * w).exp());
    x.clamp(0.0, 1.0)
}

/// Rational (Beasley-Springer-Moro family) approximation of the standard
/// normal quantile function, accurate to within ~1.15e-9 over `(0, 1)`.
fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e+01,
        2.209_460_984_245_205e+02,
        -2.759_285_104_469_687e+02,
        1.383_577_518_672_690e+02,
        -3.066_479_806_614_716e+01,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e+01,
        1.615_858_368_580_409e+02,
        -1.556_989_798_598_866e+02,
        6.680_131_188_771_972e+01,
        -1.328_068_155_288_572e+01,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-03,
        -3.223_964_580_411_365e-01,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-03,
        3.224_671_290_700_398e-01,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];

    const P_LOW: f64 = 0.02425;
    let p_high = 1.0 - P_LOW;

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= p_high {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}
