pub mod merger;

pub use merger::{apply_batch, apply_single, parse_export, re_resolve, render_export, ExportedQuestion};
