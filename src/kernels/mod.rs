//! Dense numeric kernels: matrix arithmetic and the Jacobi solver.

pub mod jacobi;
pub mod matrix;

pub use jacobi::{jacobi_parallel, jacobi_sequential, JacobiSweep, LinearSystem, SolverResult};
pub use matrix::{
    add_parallel, apply_parallel, apply_sequential, multiply_parallel, subtract_parallel, Element,
    Matrix, MatrixKernel, MatrixOp,
};
