//! Prompt definitions and variant weights

use super::error::PromptError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of a registered prompt: `(id, version, variant?)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PromptKey {
    /// Stable prompt name
    pub id: String,
    /// Monotonic version
    pub version: u32,
    /// Variant label, `None` for the base prompt
    pub variant: Option<String>,
}

impl PromptKey {
    /// Key of a base (non-variant) prompt
    #[must_use]
    pub fn base(id: impl Into<String>, version: u32) -> Self {
        Self {
            id: id.into(),
            version,
            variant: None,
        }
    }

    /// Key of a variant prompt
    #[must_use]
    pub fn variant(id: impl Into<String>, version: u32, variant: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version,
            variant: Some(variant.into()),
        }
    }
}

impl fmt::Display for PromptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variant {
            Some(v) => write!(f, "{}@{}:{}", self.id, self.version, v),
            None => write!(f, "{}@{}", self.id, self.version),
        }
    }
}

/// Declared template inputs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputContract {
    /// Keys that must be present and non-empty
    #[serde(default)]
    pub required: Vec<String>,
    /// Keys substituted when present
    #[serde(default)]
    pub optional: Vec<String>,
}

impl InputContract {
    /// Whether `key` is declared at all
    #[must_use]
    pub fn declares(&self, key: &str) -> bool {
        self.required.iter().chain(&self.optional).any(|k| k == key)
    }
}

/// Output format a prompt promises
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// A single JSON object
    #[default]
    Json,
    /// A complete HTML document
    Html,
    /// Markdown text
    Markdown,
    /// Free text
    Text,
}

impl OutputFormat {
    /// Lowercase name, as serialized
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Text => "text",
        }
    }
}

/// Declared output contract
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputContract {
    /// Output format
    #[serde(default)]
    pub format: OutputFormat,
    /// Name of the schema the output is validated against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// Generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Completion token cap
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2048
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// A versioned prompt definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSpec {
    /// Stable prompt name
    pub id: String,
    /// Monotonic version
    pub version: u32,
    /// Variant label, `None` for the base prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Human description
    #[serde(default)]
    pub description: String,
    /// Declared inputs
    #[serde(default)]
    pub inputs: InputContract,
    /// Declared output
    #[serde(default)]
    pub output: OutputContract,
    /// Model preference list, first entry wins
    #[serde(default)]
    pub models: Vec<String>,
    /// Generation parameters
    #[serde(default)]
    pub params: GenerationParams,
    /// System template
    #[serde(default)]
    pub system: String,
    /// User template
    pub user: String,
}

impl PromptSpec {
    /// Start a base prompt definition
    #[must_use]
    pub fn new(id: impl Into<String>, version: u32) -> Self {
        Self {
            id: id.into(),
            version,
            variant: None,
            description: String::new(),
            inputs: InputContract::default(),
            output: OutputContract::default(),
            models: Vec::new(),
            params: GenerationParams::default(),
            system: String::new(),
            user: String::new(),
        }
    }

    /// Identity key of this definition
    #[must_use]
    pub fn key(&self) -> PromptKey {
        PromptKey {
            id: self.id.clone(),
            version: self.version,
            variant: self.variant.clone(),
        }
    }

    /// Mark as a variant
    #[must_use]
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set required and optional inputs
    #[must_use]
    pub fn with_inputs(mut self, required: &[&str], optional: &[&str]) -> Self {
        self.inputs = InputContract {
            required: required.iter().map(|s| s.to_string()).collect(),
            optional: optional.iter().map(|s| s.to_string()).collect(),
        };
        self
    }

    /// Set the output contract
    #[must_use]
    pub fn with_output(mut self, format: OutputFormat, schema: Option<&str>) -> Self {
        self.output = OutputContract {
            format,
            schema: schema.map(str::to_string),
        };
        self
    }

    /// Set the model preference list
    #[must_use]
    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.models = models.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Set generation parameters
    #[must_use]
    pub fn with_params(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.params = GenerationParams {
            temperature,
            max_tokens,
        };
        self
    }

    /// Set both templates
    #[must_use]
    pub fn with_templates(mut self, system: impl Into<String>, user: impl Into<String>) -> Self {
        self.system = system.into();
        self.user = user.into();
        self
    }

    /// First preferred model, if any
    #[must_use]
    pub fn preferred_model(&self) -> Option<&str> {
        self.models.first().map(String::as_str)
    }
}

/// One variant's share of traffic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantWeight {
    /// Variant label
    pub variant: String,
    /// Integer percentage
    pub weight: u32,
}

/// Weighted variant split for one `(prompt id, version)`
///
/// Weights always sum to exactly 100; construction and deserialization both
/// reject anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VariantConfigRepr")]
pub struct VariantConfig {
    prompt_id: String,
    version: u32,
    weights: Vec<VariantWeight>,
}

impl VariantConfig {
    /// Build a validated configuration; weights are walked in the given order
    pub fn new<I, S>(prompt_id: impl Into<String>, version: u32, weights: I) -> Result<Self, PromptError>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let prompt_id = prompt_id.into();
        let weights: Vec<VariantWeight> = weights
            .into_iter()
            .map(|(variant, weight)| VariantWeight {
                variant: variant.into(),
                weight,
            })
            .collect();

        let sum: u64 = weights.iter().map(|w| u64::from(w.weight)).sum();
        if sum != 100 {
            return Err(PromptError::InvalidVariantWeights {
                prompt_id,
                version,
                sum,
            });
        }

        Ok(Self {
            prompt_id,
            version,
            weights,
        })
    }

    /// Prompt id
    #[must_use]
    pub fn prompt_id(&self) -> &str {
        &self.prompt_id
    }

    /// Prompt version
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Weights in walk order
    #[must_use]
    pub fn weights(&self) -> &[VariantWeight] {
        &self.weights
    }

    /// Variant owning `bucket` (expected in `[0, 100)`)
    #[must_use]
    pub fn pick(&self, bucket: u32) -> Option<&str> {
        let mut running = 0u32;
        for w in &self.weights {
            running += w.weight;
            if running > bucket {
                return Some(&w.variant);
            }
        }
        None
    }
}

#[derive(Deserialize)]
struct VariantConfigRepr {
    #[serde(alias = "promptId")]
    prompt_id: String,
    version: u32,
    weights: WeightsRepr,
}

/// Weights arrive either as an ordered list or as an object map
#[derive(Deserialize)]
#[serde(untagged)]
enum WeightsRepr {
    List(Vec<VariantWeight>),
    Map(BTreeMap<String, u32>),
}

impl TryFrom<VariantConfigRepr> for VariantConfig {
    type Error = PromptError;

    fn try_from(repr: VariantConfigRepr) -> Result<Self, Self::Error> {
        let pairs: Vec<(String, u32)> = match repr.weights {
            WeightsRepr::List(list) => list.into_iter().map(|w| (w.variant, w.weight)).collect(),
            WeightsRepr::Map(map) => map.into_iter().collect(),
        };
        VariantConfig::new(repr.prompt_id, repr.version, pairs)
    }
}
