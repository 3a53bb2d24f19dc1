//! Layout strategies. Everything except `fa2_line` is a [`continuity::LocalPlacement`] plugged
//! into the shared continuity template.

pub(crate) mod backbone;
pub(crate) mod barnes_hut;
pub(crate) mod continuity;
pub(crate) mod fa2_line;
pub(crate) mod radial_sugiyama;
pub(crate) mod stress;
pub(crate) mod temporal;
