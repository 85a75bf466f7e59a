pub mod check;
pub mod explain;
pub mod root;
pub mod walk;
