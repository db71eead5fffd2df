pub(crate) mod compiler;
pub(crate) mod fingerprint;
pub(crate) mod plan;
pub(crate) mod time_warp;
