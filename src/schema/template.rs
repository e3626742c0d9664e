//! Recipe scaffolding from embedded Tera templates

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rust_embed::Embed;
use tera::Tera;
use thiserror::Error;

use crate::entities::{ResistKind, ResistParameters, ToolParameters};

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

const RECIPE_TEMPLATE: &str = "recipe.yaml.tera";

/// Values substituted into a new recipe
#[derive(Debug, Clone)]
pub struct RecipeTemplate {
    pub name: String,
    pub file_name: String,
    pub created: DateTime<Utc>,
    pub tool: ToolParameters,
    pub resist: ResistParameters,
    pub line_px: usize,
    pub pitch_px: usize,
    pub height_px: usize,
    pub width_px: usize,
    pub pixel_size_nm: f64,
    pub seed: u64,
}

impl RecipeTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: "recipe.yaml".to_string(),
            created: Utc::now(),
            tool: ToolParameters::default(),
            resist: ResistParameters::default(),
            line_px: 16,
            pitch_px: 32,
            height_px: 256,
            width_px: 256,
            pixel_size_nm: 1.0,
            seed: 42,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Resist preset for `kind`
    pub fn with_resist(mut self, kind: ResistKind) -> Self {
        self.resist = ResistParameters::preset(kind);
        self
    }

    pub fn with_tool(mut self, tool: ToolParameters) -> Self {
        self.tool = tool;
        self
    }

    pub fn with_pattern(mut self, line_px: usize, pitch_px: usize) -> Self {
        self.line_px = line_px;
        self.pitch_px = pitch_px;
        self
    }

    pub fn with_size(mut self, height_px: usize, width_px: usize) -> Self {
        self.height_px = height_px;
        self.width_px = width_px;
        self
    }

    pub fn with_pixel_size(mut self, pixel_size_nm: f64) -> Self {
        self.pixel_size_nm = pixel_size_nm;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    #[diagnostic(code(euvsim::template::missing))]
    NotFound(String),

    #[error("Template rendering error: {0}")]
    #[diagnostic(code(euvsim::template::render))]
    RenderError(String),
}

/// Template generator using Tera
pub struct TemplateGenerator {
    tera: Tera,
}

impl TemplateGenerator {
    /// Create a new template generator with embedded templates
    pub fn new() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();

        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                if let Ok(template_str) = std::str::from_utf8(&content.data) {
                    tera.add_raw_template(filename, template_str)
                        .map_err(|e| TemplateError::RenderError(e.to_string()))?;
                }
            }
        }

        Ok(Self { tera })
    }

    pub fn generate_recipe(&self, ctx: &RecipeTemplate) -> Result<String, TemplateError> {
        if !self.tera.get_template_names().any(|n| n == RECIPE_TEMPLATE) {
            return Err(TemplateError::NotFound(RECIPE_TEMPLATE.to_string()));
        }

        let tool = &ctx.tool;
        let resist = &ctx.resist;
        let target_cd_nm = ctx.line_px as f64 * ctx.pixel_size_nm;

        let mut context = tera::Context::new();
        context.insert("name", &ctx.name);
        context.insert("file_name", &ctx.file_name);
        context.insert("created", &ctx.created.to_rfc3339());
        context.insert("created_date", &ctx.created.format("%Y-%m-%d").to_string());
        context.insert("dose_mj_cm2", &tool.dose_mj_cm2);
        context.insert("numerical_aperture", &tool.numerical_aperture);
        context.insert("psf_sigma_factor", &tool.psf_sigma_factor);
        context.insert("defocus_scale_nm", &tool.defocus_scale_nm);
        context.insert("flare_fraction", &tool.flare_fraction);
        context.insert("resist_kind", &resist.kind.to_string());
        context.insert("absorption_coefficient", &resist.absorption_coefficient);
        context.insert("thickness_nm", &resist.thickness_nm);
        context.insert("diffusion_length_nm", &resist.diffusion_length_nm);
        context.insert("quantum_yield", &resist.quantum_yield);
        context.insert("yield_variance", &resist.yield_variance);
        context.insert("secondary_electron_yield", &resist.secondary_electron_yield);
        context.insert("electron_range_nm", &resist.electron_range_nm);
        context.insert("quencher_loading", &resist.quencher_loading);
        context.insert("development_threshold", &resist.development_threshold);
        context.insert("height_px", &ctx.height_px);
        context.insert("width_px", &ctx.width_px);
        context.insert("line_px", &ctx.line_px);
        context.insert("pitch_px", &ctx.pitch_px);
        context.insert("pixel_size_nm", &ctx.pixel_size_nm);
        context.insert("target_cd_nm", &target_cd_nm);
        context.insert("seed", &ctx.seed);
        // ±20 % around the nominal dose
        context.insert("dose_start", &(tool.dose_mj_cm2 * 0.8));
        context.insert("dose_end", &(tool.dose_mj_cm2 * 1.2));

        self.tera
            .render(RECIPE_TEMPLATE, &context)
            .map_err(|e| TemplateError::RenderError(e.to_string()))
    }
}
