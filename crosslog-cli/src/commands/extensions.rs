//! `crosslog extensions` command handler

use std::io::Write;

use serde::Serialize;

use crosslog_access_log::ensure_builtin_extensions;
use crosslog_core::registry::{ExtensionRole, Registry};

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `extensions` command.
pub fn execute(writer: &OutputWriter) -> Result<(), CliError> {
    let registry = ensure_builtin_extensions()?;
    writer.render(&list(registry))
}

/// Collect registered extension names for every role.
pub fn list(registry: &Registry) -> ExtensionsReport {
    ExtensionsReport {
        roles: ExtensionRole::ALL
            .iter()
            .map(|&role| RoleExtensions {
                role,
                names: registry.registered_names(role),
            })
            .collect(),
    }
}

/// Registered extensions grouped by role.
#[derive(Serialize)]
pub struct ExtensionsReport {
    pub roles: Vec<RoleExtensions>,
}

#[derive(Serialize)]
pub struct RoleExtensions {
    pub role: ExtensionRole,
    pub names: Vec<String>,
}

impl Render for ExtensionsReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        for group in &self.roles {
            writeln!(w, "{}", group.role.to_string().bold())?;
            if group.names.is_empty() {
                writeln!(w, "  (none)")?;
            }
            for name in &group.names {
                writeln!(w, "  {name}")?;
            }
        }
        Ok(())
    }
}
