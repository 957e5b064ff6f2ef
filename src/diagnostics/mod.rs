// Diagnostics — render-side frame statistics.

pub mod stats;
