pub mod gaussian;
pub mod student;

pub use gaussian::Gaussian;
pub use student::Student;
