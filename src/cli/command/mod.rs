pub mod counties;
pub mod fetch;
pub mod finalize;
pub mod pipeline;
pub mod report;
pub mod transform;

pub use counties::counties;
pub use fetch::fetch;
pub use finalize::finalize;
pub use pipeline::pipeline;
pub use report::report;
pub use transform::transform;
