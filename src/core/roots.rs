use crate::types::{AcError, AcResult};

/// Interval known to contain a sign change, plus the current best root
/// estimate. Shrunk in place by [`solve_brent`].
#[derive(Debug, Clone, Copy)]
pub struct Bracket {
    pub lower_x: f64,
    pub upper_x: f64,
    pub root: f64,
}

impl Bracket {
    pub fn new(lower_x: f64, upper_x: f64) -> Self {
        Self {
            lower_x,
            upper_x,
            root: 0.5 * (lower_x + upper_x),
        }
    }
}

/// Outcome of a bracketed root search.
#[derive(Debug, Clone, Copy)]
pub struct RootStatus {
    /// Best root estimate
    pub root: f64,
    /// Iterations actually spent
    pub iterations: usize,
    /// Whether the tolerance was reached within the iteration budget.
    /// `false` means the budget ran out; the estimate is still usable.
    pub converged: bool,
}

/// Bracketed root search with Brent's method (inverse quadratic
/// interpolation where safe, bisection otherwise), following the GSL
/// formulation.
///
/// The endpoint function values must straddle zero (or one of them be
/// exactly zero); endpoints of equal sign are a caller contract violation
/// and yield `InvalidInput`. Exhausting `max_iter` is not an error: the
/// bracket's best estimate is returned with `converged = false`, which
/// per-pixel batch callers accept as degraded output.
pub fn solve_brent<F>(
    f: F,
    bracket: &mut Bracket,
    abs_tol: f64,
    rel_tol: f64,
    max_iter: usize,
) -> AcResult<RootStatus>
where
    F: Fn(f64) -> f64,
{
    let mut a = bracket.lower_x;
    let mut b = bracket.upper_x;
    let mut fa = f(a);
    let mut fb = f(b);

    if fa == 0.0 {
        bracket.root = a;
        bracket.upper_x = a;
        return Ok(RootStatus {
            root: a,
            iterations: 0,
            converged: true,
        });
    }
    if fb == 0.0 {
        bracket.root = b;
        bracket.lower_x = b;
        return Ok(RootStatus {
            root: b,
            iterations: 0,
            converged: true,
        });
    }
    if fa.signum() == fb.signum() {
        return Err(AcError::InvalidInput(format!(
            "Root bracket endpoints do not straddle zero: f({a}) = {fa}, f({b}) = {fb}"
        )));
    }

    // c tracks the previous iterate, d/e the current and previous steps
    let mut c = b;
    let mut fc = fb;
    let mut d = b - a;
    let mut e = d;

    for iteration in 1..=max_iter {
        if fb.signum() == fc.signum() {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = 0.5 * rel_tol * b.abs() + 0.5 * abs_tol;
        let m = 0.5 * (c - b);

        if fb == 0.0 || m.abs() <= tol {
            bracket.root = b;
            bracket.lower_x = b.min(c);
            bracket.upper_x = b.max(c);
            return Ok(RootStatus {
                root: b,
                iterations: iteration,
                converged: true,
            });
        }

        if e.abs() < tol || fa.abs() <= fb.abs() {
            // Interpolation untrustworthy, bisect
            d = m;
            e = m;
        } else {
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                // Secant step
                (2.0 * m * s, 1.0 - s)
            } else {
                // Inverse quadratic interpolation
                let r = fb / fc;
                let t = fa / fc;
                (
                    s * (2.0 * m * t * (t - r) - (b - a) * (r - 1.0)),
                    (t - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            } else {
                p = -p;
            }
            if 2.0 * p < (3.0 * m * q - (tol * q).abs()).min((e * q).abs()) {
                e = d;
                d = p / q;
            } else {
                d = m;
                e = m;
            }
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol {
            d
        } else if m > 0.0 {
            tol
        } else {
            -tol
        };
        fb = f(b);

        bracket.root = b;
        bracket.lower_x = b.min(c);
        bracket.upper_x = b.max(c);
    }

    Ok(RootStatus {
        root: bracket.root,
        iterations: max_iter,
        converged: false,
    })
}
