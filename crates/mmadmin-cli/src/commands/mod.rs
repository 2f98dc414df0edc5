//! Command handlers grouped by resource.

pub(crate) mod post;
pub(crate) mod status;
