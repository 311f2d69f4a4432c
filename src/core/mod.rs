pub mod logging;
pub mod media;
pub mod validation;
pub mod voting;
