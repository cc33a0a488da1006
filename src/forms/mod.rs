//! Form Renderer collaborator seam.
//!
//! The real marketplace profile form (fields, validation, styling) is built
//! and owned by an external team. This trait is the seam the page handlers
//! call through; `BasicFormRenderer` is a minimal stand-in so the pages
//! render something coherent without that collaborator present.

use crate::routing::Role;
use crate::storage::ProfileRow;

/// Renders the profile form for a role, prefilled from an existing record
/// when editing. Returns a full HTML document.
pub trait FormRenderer: Send + Sync {
    fn render(&self, role: Role, existing: Option<&ProfileRow>) -> String;
}

/// Placeholder renderer: a bare display-name + bio form posting to the role's
/// submit route.
pub struct BasicFormRenderer;

impl FormRenderer for BasicFormRenderer {
    fn render(&self, role: Role, existing: Option<&ProfileRow>) -> String {
        let title = match existing {
            Some(_) => format!("Edit your {} profile", role.as_str()),
            None => format!("Create your {} profile", role.as_str()),
        };
        let display_name = existing.map(|p| p.display_name.as_str()).unwrap_or("");
        let bio = existing.map(|p| p.bio.as_str()).unwrap_or("");

        format!(
            "<!doctype html>\n\
             <html><head><title>{title}</title></head><body>\n\
             <h1>{title}</h1>\n\
             <form method=\"post\" action=\"{action}\">\n\
             <label>Display name <input name=\"display_name\" value=\"{display_name}\"></label>\n\
             <label>Bio <textarea name=\"bio\">{bio}</textarea></label>\n\
             <button type=\"submit\">Save</button>\n\
             </form>\n\
             </body></html>\n",
            action = role.submit_path(),
            display_name = escape(display_name),
            bio = escape(bio),
        )
    }
}

/// Minimal HTML entity escaping for attribute/text interpolation.
fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
