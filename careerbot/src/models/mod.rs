mod conversation;
mod job;
mod knowledge;
mod question;
mod resume;

pub use conversation::*;
pub use job::*;
pub use knowledge::*;
pub use question::*;
pub use resume::*;
