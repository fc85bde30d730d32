//! Group 2: dense matrix products, triangular solves and LDLᵀ

use std::io::Write;

use super::compare::all_within;
use super::VerificationHarness;
use crate::backends::{generic, SimdProcessor};
use crate::error::Result;
use crate::math::{MatX, VecX};

type MatVecOp = fn(&dyn SimdProcessor, &mut VecX, &MatX, &VecX);
type MatMatOp = fn(&dyn SimdProcessor, &mut MatX, &MatX, &MatX);

/// Shapes `NxN`, `Nx6` and `6xN` for N = 1..=6
fn shapes() -> impl Iterator<Item = (usize, usize)> {
    (1..=6).flat_map(|n| [(n, n), (n, 6), (6, n)])
}

/// System sizes for the solves and the factorization
const SOLVE_SIZES: [usize; 4] = [1, 8, 15, 22];

/// Side of the random matrix the solves read from
const SOLVE_MATRIX: usize = 25;

/// Side of the Gram matrix the factorization runs on
const LDLT_MATRIX: usize = 64;

fn mat_agrees(a: &MatX, b: &MatX, eps: f32) -> bool {
    a.rows() == b.rows() && a.cols() == b.cols() && all_within(a.as_slice(), b.as_slice(), eps)
}

pub(super) fn run<W: Write>(h: &mut VerificationHarness<'_, W>) -> Result<()> {
    let seed = h.config().seed();
    matrix_vector(h, seed)?;
    matrix_matrix(h, seed)?;
    solves(h)?;
    ldlt(h)?;
    Ok(())
}

fn matrix_vector<W: Write>(h: &mut VerificationHarness<'_, W>, seed: u32) -> Result<()> {
    let forward: [(&str, MatVecOp); 3] = [
        ("matx_multiply_vecx", |p, d, m, v| p.matx_multiply_vecx(d, m, v)),
        ("matx_multiply_add_vecx", |p, d, m, v| p.matx_multiply_add_vecx(d, m, v)),
        ("matx_multiply_sub_vecx", |p, d, m, v| p.matx_multiply_sub_vecx(d, m, v)),
    ];
    let transposed: [(&str, MatVecOp); 3] = [
        ("matx_transpose_multiply_vecx", |p, d, m, v| {
            p.matx_transpose_multiply_vecx(d, m, v)
        }),
        ("matx_transpose_multiply_add_vecx", |p, d, m, v| {
            p.matx_transpose_multiply_add_vecx(d, m, v)
        }),
        ("matx_transpose_multiply_sub_vecx", |p, d, m, v| {
            p.matx_transpose_multiply_sub_vecx(d, m, v)
        }),
    ];

    for (rows, cols) in shapes() {
        let mat = MatX::random(rows, cols, seed, -10.0, 10.0);

        let vec = VecX::random(cols, seed, -10.0, 10.0);
        let start = VecX::random(rows, seed.wrapping_add(1), -10.0, 10.0);
        for (name, f) in forward {
            h.compare(
                &format!("{name}( {rows}x{cols} * {cols}x1 )"),
                rows * cols,
                || start.clone(),
                |p, d| f(p, d, &mat, &vec),
                |a, b| all_within(a.as_slice(), b.as_slice(), 1e-5),
            )?;
        }

        let vec = VecX::random(rows, seed, -10.0, 10.0);
        let start = VecX::random(cols, seed.wrapping_add(1), -10.0, 10.0);
        for (name, f) in transposed {
            h.compare(
                &format!("{name}( {cols}x{rows} * {rows}x1 )"),
                rows * cols,
                || start.clone(),
                |p, d| f(p, d, &mat, &vec),
                |a, b| all_within(a.as_slice(), b.as_slice(), 1e-5),
            )?;
        }
    }
    Ok(())
}

fn matrix_matrix<W: Write>(h: &mut VerificationHarness<'_, W>, seed: u32) -> Result<()> {
    let ops: [(&str, MatMatOp, bool); 2] = [
        ("matx_multiply_matx", |p, d, a, b| p.matx_multiply_matx(d, a, b), false),
        (
            "matx_transpose_multiply_matx",
            |p, d, a, b| p.matx_transpose_multiply_matx(d, a, b),
            true,
        ),
    ];

    for (rows, cols) in shapes() {
        let m1 = MatX::random(rows, cols, seed, -10.0, 10.0);
        for (name, f, transpose) in ops {
            let (inner, out_rows) = if transpose { (rows, cols) } else { (cols, rows) };
            let out_cols = rows;
            let m2 = MatX::random(inner, out_cols, seed.wrapping_add(1), -10.0, 10.0);
            let label = if transpose {
                format!("{name}( {cols}x{rows} * {inner}x{out_cols} )")
            } else {
                format!("{name}( {rows}x{cols} * {inner}x{out_cols} )")
            };
            h.compare(
                &label,
                out_rows * out_cols,
                MatX::default,
                |p, d| f(p, d, &m1, &m2),
                |a, b| mat_agrees(a, b, 1e-4),
            )?;
        }
    }
    Ok(())
}

fn solves<W: Write>(h: &mut VerificationHarness<'_, W>) -> Result<()> {
    let l = MatX::random(SOLVE_MATRIX, SOLVE_MATRIX, 0, -1.0, 1.0);
    let b = VecX::random(SOLVE_MATRIX, 1, -1.0, 1.0);
    let b = b.as_slice();

    for n in SOLVE_SIZES {
        h.compare(
            &format!("matx_lower_triangular_solve( {n}x{n} )"),
            n,
            || vec![0.0f32; n],
            |p, x| p.matx_lower_triangular_solve(&l, x, b, n, 0),
            |x, y| all_within(x, y, 1.0),
        )?;
    }

    // Second half only, with the first half already solved
    for n in SOLVE_SIZES {
        let skip = n / 2;
        let mut prefix = vec![0.0f32; n];
        generic::matx_lower_triangular_solve(&l, &mut prefix, b, skip, 0);
        h.compare(
            &format!("matx_lower_triangular_solve( {n}x{n}, skip {skip} )"),
            n - skip,
            || prefix.clone(),
            |p, x| p.matx_lower_triangular_solve(&l, x, b, n, skip),
            |x, y| all_within(x, y, 1.0),
        )?;
    }

    for n in SOLVE_SIZES {
        h.compare(
            &format!("matx_lower_triangular_solve_transpose( {n}x{n} )"),
            n,
            || vec![0.0f32; n],
            |p, x| p.matx_lower_triangular_solve_transpose(&l, x, b, n),
            |x, y| all_within(x, y, 1.0),
        )?;
    }
    Ok(())
}

fn ldlt<W: Write>(h: &mut VerificationHarness<'_, W>) -> Result<()> {
    // srcᵀ·src is symmetric positive semi-definite; random data makes it definite
    let src = MatX::random(LDLT_MATRIX, LDLT_MATRIX, 0, -1.0, 1.0);
    let mut gram = MatX::default();
    generic::matx_transpose_multiply_matx(&mut gram, &src, &src);

    for n in SOLVE_SIZES {
        h.compare(
            &format!("matx_ldlt_factor( {n}x{n} )"),
            n,
            || (gram.clone(), VecX::zeros(n), false),
            |p, (mat, inv_diag, ok)| *ok = p.matx_ldlt_factor(mat, inv_diag, n),
            |(ma, da, oka), (mb, db, okb)| {
                oka == okb
                    && mat_agrees(ma, mb, 0.1)
                    && all_within(da.as_slice(), db.as_slice(), 0.1)
            },
        )?;
    }
    Ok(())
}
