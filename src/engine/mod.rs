pub mod decode;
pub mod highlight;
pub mod lines;
pub mod patch;
pub mod stats;
