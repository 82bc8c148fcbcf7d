//! Advisory message rendering
//!
//! Wording comes from a TOML table keyed by advice code. The built-in
//! English table is compiled in; a replacement table overlays it key by key.

use agrotwin_common::{Error, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{error, warn};

use super::rules::{Advice, AdviceArgs, Finding};

/// Turns a finding into user-facing text
pub trait AdviceRenderer: Send + Sync {
    fn render(&self, finding: &Finding) -> String;
}

const BUILTIN_TEMPLATES: &str = include_str!("../../../templates/advice_en.toml");

static BUILTIN: Lazy<HashMap<String, String>> = Lazy::new(|| {
    parse_templates(BUILTIN_TEMPLATES).unwrap_or_else(|e| {
        error!("Built-in advice templates are invalid: {}", e);
        HashMap::new()
    })
});

#[derive(Debug, Deserialize)]
struct TemplateFile {
    #[serde(default)]
    advice: HashMap<String, String>,
}

fn parse_templates(content: &str) -> Result<HashMap<String, String>> {
    toml::from_str::<TemplateFile>(content)
        .map(|file| file.advice)
        .map_err(|e| Error::Config(format!("Invalid advice template table: {}", e)))
}

/// Placeholder-substituting template renderer
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    templates: HashMap<String, String>,
}

impl TemplateRenderer {
    pub fn builtin() -> Self {
        Self {
            templates: BUILTIN.clone(),
        }
    }

    /// Built-in table overlaid with the entries in `content`
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let overrides = parse_templates(content)?;
        for key in overrides.keys() {
            if !Advice::ALL.iter().any(|a| a.code() == key) {
                warn!("Ignoring template for unknown advice code '{}'", key);
            }
        }

        let mut templates = BUILTIN.clone();
        templates.extend(overrides);
        Ok(Self { templates })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn template(&self, advice: Advice) -> Option<&str> {
        self.templates.get(advice.code()).map(String::as_str)
    }
}

impl AdviceRenderer for TemplateRenderer {
    fn render(&self, finding: &Finding) -> String {
        match self.template(finding.advice) {
            Some(template) => fill(template, &finding.args),
            None => {
                warn!("No template for advice code '{}'", finding.advice.code());
                finding.advice.code().to_string()
            }
        }
    }
}

/// Substitute every placeholder `args` has a value for
pub fn fill(template: &str, args: &AdviceArgs) -> String {
    let mut text = template.replace("{crop}", &args.crop);
    if let Some(value) = args.value {
        text = text.replace("{value}", &format!("{:.*}", args.decimals, value));
    }
    if let Some(band) = args.band {
        text = text
            .replace("{min}", &band.min.to_string())
            .replace("{max}", &band.max.to_string())
            .replace("{rationale}", band.rationale);
    }
    if let Some(conductivity) = args.conductivity {
        text = text.replace("{ec}", &format!("{:.0}", conductivity));
    }
    if let Some(salt) = args.salt {
        text = text.replace("{salt}", &format!("{:.0}", salt));
    }
    if let Some(score) = args.score {
        text = text.replace("{score}", &format!("{:.1}", score));
    }
    if !args.nutrients.is_empty() {
        text = text.replace("{nutrients}", &args.nutrients.join(" and "));
    }
    text
}
