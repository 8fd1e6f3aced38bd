//! Flutter bridge for locstore core.
//!
//! Every exported function lives in `api` and is sync, UTF-8 in/out, and
//! never panics across the boundary.

pub mod api;
