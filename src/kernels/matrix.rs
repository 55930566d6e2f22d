//! Dense row-major matrices and their add, subtract and multiply kernels.
//!
//! The parallel paths partition the output by rows; each worker writes only
//! its own block of rows.

use std::ops::{Add, Mul, Sub};

use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::parallel::{OperationKind, Range, RangeOperation, WorkerPool};

/// Scalar types the matrix kernels work on. `Default` is the additive zero.
pub trait Element:
    Copy + Default + Send + Sync + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self>
{
}

impl<T> Element for T where
    T: Copy + Default + Send + Sync + Add<Output = T> + Sub<Output = T> + Mul<Output = T>
{
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Copy> Matrix<T> {
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Wrap a row-major buffer of `rows * cols` items.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(EngineError::dimension(
                "matrix buffer",
                rows * cols,
                data.len(),
            ));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from nested rows; all rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let count = rows.len();
        let mut data = Vec::with_capacity(count * cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(EngineError::dimension("matrix row", cols, format!("{} in row {i}", row.len())));
            }
            data.extend(row);
        }
        Ok(Self {
            rows: count,
            cols,
            data,
        })
    }

    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }
}

impl<T: Copy + Default> Matrix<T> {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, T::default())
    }
}

impl<T> Matrix<T> {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.cols + col] = value;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

/// Which matrix kernel to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixOp {
    Add,
    Subtract,
    Multiply,
}

impl MatrixOp {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "add" => Some(Self::Add),
            "sub" | "subtract" => Some(Self::Subtract),
            "mul" | "multiply" => Some(Self::Multiply),
            _ => None,
        }
    }

    pub const fn kind(self) -> OperationKind {
        match self {
            Self::Add => OperationKind::Add,
            Self::Subtract => OperationKind::Subtract,
            Self::Multiply => OperationKind::Multiply,
        }
    }

    /// Shape of `lhs op rhs`, or an error if the operands do not fit.
    pub fn output_shape<T>(self, lhs: &Matrix<T>, rhs: &Matrix<T>) -> Result<(usize, usize)> {
        match self {
            Self::Add | Self::Subtract => {
                if lhs.rows != rhs.rows || lhs.cols != rhs.cols {
                    return Err(EngineError::dimension(
                        self.kind().as_str(),
                        format!("{}x{}", lhs.rows, lhs.cols),
                        format!("{}x{}", rhs.rows, rhs.cols),
                    ));
                }
                Ok((lhs.rows, lhs.cols))
            }
            Self::Multiply => {
                if lhs.cols != rhs.rows {
                    return Err(EngineError::dimension(
                        "multiply",
                        format!("{} rows on the right", lhs.cols),
                        rhs.rows,
                    ));
                }
                Ok((lhs.rows, rhs.cols))
            }
        }
    }
}

/// `lhs op rhs` for one block of output rows.
pub struct MatrixKernel<'a, T> {
    op: MatrixOp,
    lhs: &'a Matrix<T>,
    rhs: &'a Matrix<T>,
    out_cols: usize,
}

impl<'a, T: Element> MatrixKernel<'a, T> {
    pub fn new(op: MatrixOp, lhs: &'a Matrix<T>, rhs: &'a Matrix<T>) -> Result<Self> {
        let (_, out_cols) = op.output_shape(lhs, rhs)?;
        Ok(Self {
            op,
            lhs,
            rhs,
            out_cols,
        })
    }
}

impl<T: Element> RangeOperation for MatrixKernel<'_, T> {
    type Item = T;

    fn kind(&self) -> OperationKind {
        self.op.kind()
    }

    fn width(&self) -> usize {
        self.out_cols
    }

    fn apply(&self, range: Range, out: &mut [T]) {
        let cols = self.out_cols;
        match self.op {
            MatrixOp::Add | MatrixOp::Subtract => {
                let base = range.start * cols;
                let lhs = &self.lhs.data[base..base + out.len()];
                let rhs = &self.rhs.data[base..base + out.len()];
                for ((dst, &a), &b) in out.iter_mut().zip(lhs).zip(rhs) {
                    *dst = if self.op == MatrixOp::Add { a + b } else { a - b };
                }
            }
            MatrixOp::Multiply => {
                let inner = self.lhs.cols;
                for (offset, dst_row) in out.chunks_mut(cols.max(1)).enumerate() {
                    let lhs_row = self.lhs.row(range.start + offset);
                    for (j, dst) in dst_row.iter_mut().enumerate() {
                        let mut acc = T::default();
                        for k in 0..inner {
                            acc = acc + lhs_row[k] * self.rhs.data[k * cols + j];
                        }
                        *dst = acc;
                    }
                }
            }
        }
    }
}

/// Single-threaded reference for every [MatrixOp].
pub fn apply_sequential<T: Element>(op: MatrixOp, lhs: &Matrix<T>, rhs: &Matrix<T>) -> Result<Matrix<T>> {
    let (rows, cols) = op.output_shape(lhs, rhs)?;
    let mut out = Matrix::zeros(rows, cols);
    for i in 0..rows {
        for j in 0..cols {
            let value = match op {
                MatrixOp::Add => lhs.get(i, j) + rhs.get(i, j),
                MatrixOp::Subtract => lhs.get(i, j) - rhs.get(i, j),
                MatrixOp::Multiply => {
                    let mut acc = T::default();
                    for k in 0..lhs.cols {
                        acc = acc + lhs.get(i, k) * rhs.get(k, j);
                    }
                    acc
                }
            };
            out.set(i, j, value);
        }
    }
    Ok(out)
}

/// Row-partitioned [MatrixOp] on `pool`.
pub fn apply_parallel<T: Element>(
    pool: &WorkerPool,
    op: MatrixOp,
    lhs: &Matrix<T>,
    rhs: &Matrix<T>,
) -> Result<Matrix<T>> {
    let kernel = MatrixKernel::new(op, lhs, rhs)?;
    let (rows, cols) = op.output_shape(lhs, rhs)?;
    let mut out = Matrix::zeros(rows, cols);
    pool.execute(rows, &kernel, out.as_mut_slice())?;
    Ok(out)
}

pub fn add_parallel<T: Element>(pool: &WorkerPool, lhs: &Matrix<T>, rhs: &Matrix<T>) -> Result<Matrix<T>> {
    apply_parallel(pool, MatrixOp::Add, lhs, rhs)
}

pub fn subtract_parallel<T: Element>(pool: &WorkerPool, lhs: &Matrix<T>, rhs: &Matrix<T>) -> Result<Matrix<T>> {
    apply_parallel(pool, MatrixOp::Subtract, lhs, rhs)
}

pub fn multiply_parallel<T: Element>(pool: &WorkerPool, lhs: &Matrix<T>, rhs: &Matrix<T>) -> Result<Matrix<T>> {
    apply_parallel(pool, MatrixOp::Multiply, lhs, rhs)
}
