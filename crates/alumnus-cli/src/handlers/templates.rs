//! Templates command handler

use alumnus::list_templates;

/// Execute the templates command
pub fn execute_templates() {
    print!("{}", format_template_list());
}

/// One line per built-in template: key and description
#[must_use]
pub fn format_template_list() -> String {
    let templates = list_templates();
    let width = templates.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut out = String::from("Available templates:\n");
    for (key, description) in templates {
        out.push_str(&format!("  {key:<width$}  {description}\n"));
    }
    out
}
