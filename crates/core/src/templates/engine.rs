use std::collections::HashMap;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateRenderError {
    #[error("invalid regex for template placeholder: {0}")]
    Regex(String),
}

pub type RenderContext = HashMap<String, String>;

/// Replace every `{{name}}` in `template` with its value from `ctx`.
///
/// Unknown names are left as written. Substituted values are not scanned
/// again, so a post body containing `{{title}}` stays literal.
pub fn render_string(
    template: &str,
    ctx: &RenderContext,
) -> Result<String, TemplateRenderError> {
    let re = Regex::new(r"\{\{([^{}]+)\}\}")
        .map_err(|e| TemplateRenderError::Regex(e.to_string()))?;

    let result = re.replace_all(template, |caps: &regex::Captures<'_>| {
        ctx.get(caps[1].trim()).cloned().unwrap_or_else(|| caps[0].to_string())
    });

    Ok(result.into_owned())
}
