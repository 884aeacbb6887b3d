use std::path::Path;

use crate::domains::export::types::ExportError;

/// The three page templates the bundle is rendered from. Substitution is
/// literal string replacement; the placeholder set is the whole contract
/// between this crate and the template author.
#[derive(Debug)]
pub struct TemplateSet {
    pub shell: String,
    pub bootstrap: String,
    pub stylesheet: String,
}

/// Values substituted into the page shell.
pub struct PageContext<'a> {
    pub title: &'a str,
    pub lib_styles: &'a str,
    pub lib_scripts: &'a str,
    pub inline_data: &'a str,
    pub header_logo: &'a str,
}

impl TemplateSet {
    /// The default templates compiled into the crate.
    pub fn embedded() -> Self {
        Self {
            shell: include_str!("../../../templates/map.html").to_string(),
            bootstrap: include_str!("../../../templates/app.js").to_string(),
            stylesheet: include_str!("../../../templates/styles.css").to_string(),
        }
    }

    /// Load the template set from a directory holding `map.html`, `app.js`
    /// and `styles.css`.
    pub async fn load(dir: &Path) -> Result<Self, ExportError> {
        Ok(Self {
            shell: read_template(dir, "map.html").await?,
            bootstrap: read_template(dir, "app.js").await?,
            stylesheet: read_template(dir, "styles.css").await?,
        })
    }

    /// Resolve against an optional override directory.
    pub async fn resolve(dir: Option<&Path>) -> Result<Self, ExportError> {
        match dir {
            Some(dir) => Self::load(dir).await,
            None => Ok(Self::embedded()),
        }
    }

    pub fn render_shell(&self, ctx: &PageContext<'_>) -> String {
        self.shell
            .replace("{{TITLE}}", ctx.title)
            .replace("{{LIB_STYLES}}", ctx.lib_styles)
            .replace("{{LIB_SCRIPTS}}", ctx.lib_scripts)
            .replace("{{INLINE_DATA}}", ctx.inline_data)
            .replace("{{HEADER_LOGO}}", ctx.header_logo)
    }
}

async fn read_template(dir: &Path, name: &str) -> Result<String, ExportError> {
    tokio::fs::read_to_string(dir.join(name))
        .await
        .map_err(|source| ExportError::Template {
            name: name.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_templates_carry_placeholders() {
        let templates = TemplateSet::embedded();
        for placeholder in [
            "{{TITLE}}",
            "{{LIB_STYLES}}",
            "{{LIB_SCRIPTS}}",
            "{{INLINE_DATA}}",
            "{{HEADER_LOGO}}",
        ] {
            assert!(
                templates.shell.contains(placeholder),
                "shell lacks {placeholder}"
            );
        }
    }

    #[test]
    fn test_render_substitutes_all_placeholders() {
        let templates = TemplateSet::embedded();
        let html = templates.render_shell(&PageContext {
            title: "Demo",
            lib_styles: "<link rel=\"stylesheet\" href=\"x.css\" />",
            lib_scripts: "<script src=\"x.js\"></script>",
            inline_data: "",
            header_logo: "<span class=\"logo-text\">Demo</span>",
        });
        assert!(html.contains("<title>Demo</title>"));
        assert!(!html.contains("{{"));
    }

    #[tokio::test]
    async fn test_load_missing_directory_is_typed() {
        let err = TemplateSet::load(Path::new("/nonexistent-template-dir"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Template { .. }));
    }
}
