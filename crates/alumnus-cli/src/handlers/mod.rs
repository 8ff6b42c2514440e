//! Command handlers, one module per subcommand
//!
//! Browser-facing handlers only compile their session code with the
//! `browser` feature; without it they return `FeatureDisabled`.

pub mod check_login;
pub mod config;
pub mod preview;
pub mod run;
pub mod templates;

pub use check_login::execute_check_login;
pub use config::execute_config;
pub use preview::{execute_preview, render_previews};
pub use run::{apply_overrides, execute_run};
pub use templates::{execute_templates, format_template_list};
