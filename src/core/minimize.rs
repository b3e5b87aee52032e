use crate::types::{AcError, AcResult};

/// Golden ratio used for downhill bracket expansion
const GOLDEN: f64 = 1.618_033_988_749_895;
/// Complement of the golden section, used by the Brent minimizer
const CGOLD: f64 = 0.381_966_011_250_105;
/// Largest allowed magnification per parabolic-extrapolation step
const GLIMIT: f64 = 100.0;
const TINY: f64 = 1e-20;

/// Triple of points bracketing a minimum: `inner_f < lower_f` and
/// `inner_f < upper_f`, with `inner_x` strictly between the outer points.
#[derive(Debug, Clone, Copy)]
pub struct MinBracket {
    pub lower_x: f64,
    pub inner_x: f64,
    pub upper_x: f64,
    pub lower_f: f64,
    pub inner_f: f64,
    pub upper_f: f64,
}

/// Outcome of a 1-D minimum search.
#[derive(Debug, Clone, Copy)]
pub struct MinStatus {
    pub x: f64,
    pub f: f64,
    pub iterations: usize,
    /// `false` when the iteration budget ran out; the estimate stands.
    pub converged: bool,
}

/// Expand outward from two seed points until a true bracketing triple is
/// found, stepping downhill by golden-ratio magnification with parabolic
/// extrapolation shortcuts.
pub fn bracket_minimum<F>(f: F, a: f64, b: f64) -> MinBracket
where
    F: Fn(f64) -> f64,
{
    let mut ax = a;
    let mut bx = b;
    let mut fa = f(ax);
    let mut fb = f(bx);
    // Walk downhill from a to b
    if fb > fa {
        std::mem::swap(&mut ax, &mut bx);
        std::mem::swap(&mut fa, &mut fb);
    }
    let mut cx = bx + GOLDEN * (bx - ax);
    let mut fc = f(cx);

    while fb > fc {
        // Parabolic extrapolation from the current triple
        let r = (bx - ax) * (fb - fc);
        let q = (bx - cx) * (fb - fa);
        let denom = 2.0 * (q - r).abs().max(TINY) * (q - r).signum();
        let mut u = bx - ((bx - cx) * q - (bx - ax) * r) / denom;
        let ulim = bx + GLIMIT * (cx - bx);
        let mut fu;

        if (bx - u) * (u - cx) > 0.0 {
            // u lies between b and c
            fu = f(u);
            if fu < fc {
                return order_bracket(bx, u, cx, fb, fu, fc);
            } else if fu > fb {
                return order_bracket(ax, bx, u, fa, fb, fu);
            }
            u = cx + GOLDEN * (cx - bx);
            fu = f(u);
        } else if (cx - u) * (u - ulim) > 0.0 {
            // u lies between c and the step limit
            fu = f(u);
            if fu < fc {
                bx = cx;
                cx = u;
                u = cx + GOLDEN * (cx - bx);
                fb = fc;
                fc = fu;
                fu = f(u);
            }
        } else if (u - ulim) * (ulim - cx) >= 0.0 {
            u = ulim;
            fu = f(u);
        } else {
            u = cx + GOLDEN * (cx - bx);
            fu = f(u);
        }

        ax = bx;
        bx = cx;
        cx = u;
        fa = fb;
        fb = fc;
        fc = fu;
    }

    order_bracket(ax, bx, cx, fa, fb, fc)
}

/// Normalize a triple so the outer points are in ascending order.
fn order_bracket(a: f64, b: f64, c: f64, fa: f64, fb: f64, fc: f64) -> MinBracket {
    if a <= c {
        MinBracket {
            lower_x: a,
            inner_x: b,
            upper_x: c,
            lower_f: fa,
            inner_f: fb,
            upper_f: fc,
        }
    } else {
        MinBracket {
            lower_x: c,
            inner_x: b,
            upper_x: a,
            lower_f: fc,
            inner_f: fb,
            upper_f: fa,
        }
    }
}

/// Refine a bracketed minimum with Brent's method: parabolic interpolation
/// through the three best points, golden-section fallback when the parabola
/// is untrustworthy. Stops once both bracket ends lie within
/// `2 * (rel_tol * |x| + abs_tol)` of the current best point `x`, so the
/// minimum is pinned to roughly `rel_tol` relative accuracy.
pub fn minimize_brent<F>(
    f: F,
    bracket: &MinBracket,
    rel_tol: f64,
    abs_tol: f64,
    max_iter: usize,
) -> AcResult<MinStatus>
where
    F: Fn(f64) -> f64,
{
    if !(bracket.inner_f < bracket.lower_f && bracket.inner_f < bracket.upper_f)
        || !(bracket.lower_x < bracket.inner_x && bracket.inner_x < bracket.upper_x)
    {
        return Err(AcError::InvalidInput(
            "Minimization bracket does not enclose a minimum".to_string(),
        ));
    }

    let mut a = bracket.lower_x;
    let mut b = bracket.upper_x;
    let mut x = bracket.inner_x;
    let mut fx = bracket.inner_f;
    // w, v: second and third best points
    let mut w = x;
    let mut v = x;
    let mut fw = fx;
    let mut fv = fx;
    let mut d: f64 = 0.0;
    let mut e: f64 = 0.0;

    for iteration in 1..=max_iter {
        let mid = 0.5 * (a + b);
        let tol1 = rel_tol * x.abs() + abs_tol;
        let tol2 = 2.0 * tol1;

        if (x - mid).abs() <= tol2 - 0.5 * (b - a) {
            return Ok(MinStatus {
                x,
                f: fx,
                iterations: iteration,
                converged: true,
            });
        }

        let mut use_golden = true;
        if e.abs() > tol1 {
            // Parabolic fit through x, w, v
            let r = (x - w) * (fx - fv);
            let mut q = (x - v) * (fx - fw);
            let mut p = (x - v) * q - (x - w) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            }
            q = q.abs();
            let e_prev = e;
            e = d;
            if p.abs() < (0.5 * q * e_prev).abs() && p > q * (a - x) && p < q * (b - x) {
                d = p / q;
                let u = x + d;
                if u - a < tol2 || b - u < tol2 {
                    d = if mid > x { tol1 } else { -tol1 };
                }
                use_golden = false;
            }
        }
        if use_golden {
            e = if x >= mid { a - x } else { b - x };
            d = CGOLD * e;
        }

        let u = if d.abs() >= tol1 {
            x + d
        } else if d > 0.0 {
            x + tol1
        } else {
            x - tol1
        };
        let fu = f(u);

        if fu <= fx {
            if u >= x {
                a = x;
            } else {
                b = x;
            }
            v = w;
            fv = fw;
            w = x;
            fw = fx;
            x = u;
            fx = fu;
        } else {
            if u < x {
                a = u;
            } else {
                b = u;
            }
            if fu <= fw || w == x {
                v = w;
                fv = fw;
                w = u;
                fw = fu;
            } else if fu <= fv || v == x || v == w {
                v = u;
                fv = fu;
            }
        }
    }

    Ok(MinStatus {
        x,
        f: fx,
        iterations: max_iter,
        converged: false,
    })
}

/// Outcome of a Powell multivariate search.
#[derive(Debug, Clone)]
pub struct PowellStatus {
    pub point: Vec<f64>,
    pub f: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Powell's direction-set minimization without derivatives.
///
/// Each cycle line-minimizes along every direction of the current set, then
/// applies the standard replacement heuristic: the direction of largest
/// single-step decrease is swapped for the cycle's net displacement when
/// the extrapolation test favors it. Used by the smile wavelength-shift
/// estimator, not by the reflectance retrieval itself.
pub fn minimize_powell<F>(f: F, start: &[f64], tol: f64, max_iter: usize) -> AcResult<PowellStatus>
where
    F: Fn(&[f64]) -> f64,
{
    let n = start.len();
    if n == 0 {
        return Err(AcError::InvalidInput(
            "Powell minimization needs at least one dimension".to_string(),
        ));
    }

    // Direction set starts as the unit vectors
    let mut directions: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| f64::from(u8::from(i == j))).collect())
        .collect();

    let mut point = start.to_vec();
    let mut f_current = f(&point);

    for iteration in 1..=max_iter {
        let point_start = point.clone();
        let f_start = f_current;
        let mut largest_decrease = 0.0;
        let mut largest_index = 0;

        for (i, direction) in directions.iter().enumerate() {
            let f_before = f_current;
            f_current = line_minimize(&f, &mut point, direction);
            let decrease = f_before - f_current;
            if decrease > largest_decrease {
                largest_decrease = decrease;
                largest_index = i;
            }
        }

        if 2.0 * (f_start - f_current) <= tol * (f_start.abs() + f_current.abs()) + TINY {
            return Ok(PowellStatus {
                point,
                f: f_current,
                iterations: iteration,
                converged: true,
            });
        }

        // Extrapolated point along the cycle's net displacement
        let extrapolated: Vec<f64> = point
            .iter()
            .zip(&point_start)
            .map(|(&p, &p0)| 2.0 * p - p0)
            .collect();
        let f_extrapolated = f(&extrapolated);

        if f_extrapolated < f_start {
            let t = 2.0 * (f_start - 2.0 * f_current + f_extrapolated)
                * (f_start - f_current - largest_decrease).powi(2)
                - largest_decrease * (f_start - f_extrapolated).powi(2);
            if t < 0.0 {
                let displacement: Vec<f64> = point
                    .iter()
                    .zip(&point_start)
                    .map(|(&p, &p0)| p - p0)
                    .collect();
                f_current = line_minimize(&f, &mut point, &displacement);
                directions[largest_index] = directions[n - 1].clone();
                directions[n - 1] = displacement;
            }
        }
    }

    Ok(PowellStatus {
        point,
        f: f_current,
        iterations: max_iter,
        converged: false,
    })
}

/// Minimize `f` along `point + t * direction`, moving `point` to the found
/// minimum and returning the function value there.
fn line_minimize<F>(f: &F, point: &mut [f64], direction: &[f64]) -> f64
where
    F: Fn(&[f64]) -> f64,
{
    let line = |t: f64| -> f64 {
        let probe: Vec<f64> = point
            .iter()
            .zip(direction)
            .map(|(&p, &d)| p + t * d)
            .collect();
        f(&probe)
    };

    let bracket = bracket_minimum(&line, 0.0, 1.0);
    // The bracket is valid by construction, and the budget fallback is the
    // current best point either way.
    let status = minimize_brent(&line, &bracket, 1e-8, 1e-12, 200)
        .unwrap_or(MinStatus {
            x: bracket.inner_x,
            f: bracket.inner_f,
            iterations: 0,
            converged: false,
        });

    for (p, &d) in point.iter_mut().zip(direction) {
        *p += status.x * d;
    }
    status.f
}
