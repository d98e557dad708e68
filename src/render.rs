//! Page rendering with Handlebars.
//!
//! Templates are embedded from `views/` at build time and registered under
//! their path without the `.hbs` extension (`index`, `layouts/main`). Every
//! page is rendered twice: first the named template with its own context,
//! then the shared layout with that same context plus `body`, `user` and
//! `dev`.

use crate::auth::Session;
use axum::response::Html;
use handlebars::Handlebars;
use rust_embed::RustEmbed;
use serde::Serialize;
use serde_json::Value;

/// Template every page is wrapped in.
pub const LAYOUT: &str = "layouts/main";

#[derive(RustEmbed)]
#[folder = "views/"]
struct Views;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("Render error: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("Context error: {0}")]
    Context(#[from] serde_json::Error),

    #[error("Template {0} is not valid UTF-8")]
    Encoding(String),

    #[error("Page context must be an object")]
    NotAnObject,
}

pub struct Renderer {
    registry: Handlebars<'static>,
    dev_mode: bool,
}

impl Renderer {
    /// Register every embedded template.
    pub fn new(dev_mode: bool) -> Result<Self, RenderError> {
        let mut registry = Handlebars::new();

        for path in Views::iter() {
            let Some(file) = Views::get(&path) else {
                continue;
            };
            let source = std::str::from_utf8(&file.data)
                .map_err(|_| RenderError::Encoding(path.to_string()))?;
            let name = path.trim_end_matches(".hbs");
            registry.register_template_string(name, source)?;
        }

        tracing::debug!(templates = registry.get_templates().len(), "Templates registered");

        Ok(Self { registry, dev_mode })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }

    /// Render `template` with `context` inside the shared layout.
    pub fn page<T: Serialize>(
        &self,
        template: &str,
        context: &T,
        session: &Session,
    ) -> Result<Html<String>, RenderError> {
        let Value::Object(mut locals) = serde_json::to_value(context)? else {
            return Err(RenderError::NotAnObject);
        };

        let body = self.registry.render(template, &locals)?;

        locals.insert("body".to_string(), Value::String(body));
        locals.insert("user".to_string(), serde_json::to_value(session.user())?);
        locals.insert("dev".to_string(), Value::Bool(self.dev_mode));

        Ok(Html(self.registry.render(LAYOUT, &locals)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoginPage, PrivatePage, SessionUser, TitledPage};

    fn signed_in(username: &str) -> Session {
        Session::authenticated(SessionUser {
            username: username.to_string(),
            email: "someone@example.com".to_string(),
        })
    }

    #[test]
    fn test_all_pages_registered() {
        let renderer = Renderer::new(false).unwrap();
        for name in ["index", "public", "login", "private", LAYOUT] {
            assert!(renderer.has_template(name), "missing template {}", name);
        }
    }

    #[test]
    fn test_page_wrapped_in_layout() {
        let renderer = Renderer::new(false).unwrap();
        let Html(html) = renderer
            .page("index", &TitledPage { title: "Index Page" }, &Session::anonymous())
            .unwrap();
        assert!(html.contains("<title>Index Page</title>"));
        assert!(html.contains("<h1>Index Page</h1>"));
        assert!(html.contains("href=\"/login\""));
        assert!(!html.contains("dev-live-reload.js"));
    }

    #[test]
    fn test_private_page_escapes_username() {
        let renderer = Renderer::new(false).unwrap();
        let session = signed_in("<b>mallory</b>");
        let context = PrivatePage {
            title: "Private Page",
            username: "<b>mallory</b>".to_string(),
        };
        let Html(html) = renderer.page("private", &context, &session).unwrap();
        assert!(html.contains("&lt;b&gt;mallory"));
        assert!(!html.contains("<b>mallory</b>"));
        assert!(html.contains("action=\"/logout\""));
    }

    #[test]
    fn test_login_form_carries_redir() {
        let renderer = Renderer::new(false).unwrap();
        let context = LoginPage {
            title: "Login",
            redir: Some("/private".to_string()),
        };
        let Html(html) = renderer.page("login", &context, &Session::anonymous()).unwrap();
        assert!(html.contains("action=\"/login?redir=/private\""));

        let context = LoginPage {
            title: "Login",
            redir: None,
        };
        let Html(html) = renderer.page("login", &context, &Session::anonymous()).unwrap();
        assert!(html.contains("action=\"/login\""));
    }

    #[test]
    fn test_dev_mode_injects_reload_script() {
        let renderer = Renderer::new(true).unwrap();
        let Html(html) = renderer
            .page("public", &TitledPage { title: "Public Page" }, &Session::anonymous())
            .unwrap();
        assert!(html.contains("<script src=\"/dev-live-reload.js\" defer></script>"));
    }

    #[test]
    fn test_unknown_template() {
        let renderer = Renderer::new(false).unwrap();
        let result = renderer.page("missing", &TitledPage { title: "x" }, &Session::anonymous());
        assert!(matches!(result, Err(RenderError::Render(_))));
    }
}
