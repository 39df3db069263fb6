//! Typed cleaning steps.
//!
//! A [`Step`] is built from the loose JSON object a language model writes
//! (`{column, action, method, params, reason}`) by [`Step::from_raw`]. Every
//! action has its own payload shape, so an engine that receives a `Step` never
//! has to look at strings or untyped params again.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Statistic used by `impute`.
#[derive(Debug, Clone, PartialEq)]
pub enum ImputeMethod {
    Mean,
    Median,
    /// Most frequent value; ties resolve to the smallest value.
    Mode,
    /// Fixed JSON scalar (`params.value`, default `0`).
    Constant(Value),
}

/// Kind of rescaling performed by `scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleMethod {
    ZScore,
    MinMax,
}

/// Statistic used to fill gaps after a numeric conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericFill {
    Mean,
    #[default]
    Median,
}

/// Statistic that replaces values outside the IQR fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutlierFill {
    #[default]
    Median,
    Mean,
}

/// Target of `convert_dtype`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConvertTarget {
    Int { impute: Option<NumericFill> },
    Float { impute: Option<NumericFill> },
    Str,
    Datetime { format: Option<String> },
}

/// One cleaning action with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Drop,
    Impute(ImputeMethod),
    Standardize { remove_special_chars: bool },
    Normalize,
    Scale(ScaleMethod),
    ConvertDtype(ConvertTarget),
    ClipOutliers { lower: Option<f64>, upper: Option<f64> },
    FillOutliers(OutlierFill),
    MapValues { mapping: Vec<(Value, Value)> },
    RemoveDuplicates,
    StripWhitespace,
}

impl Action {
    /// Wire name of the action (`"impute"`, `"convert_dtype"`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::Impute(_) => "impute",
            Self::Standardize { .. } => "standardize",
            Self::Normalize => "normalize",
            Self::Scale(_) => "scale",
            Self::ConvertDtype(_) => "convert_dtype",
            Self::ClipOutliers { .. } => "clip_outliers",
            Self::FillOutliers(_) => "fill_outliers",
            Self::MapValues { .. } => "map_values",
            Self::RemoveDuplicates => "remove_duplicates",
            Self::StripWhitespace => "strip_whitespace",
        }
    }

    /// Whether the action acts on a single named column.
    pub fn needs_column(&self) -> bool {
        !matches!(self, Self::RemoveDuplicates)
    }

    fn method(&self) -> Option<&'static str> {
        match self {
            Self::Impute(ImputeMethod::Mean) => Some("mean"),
            Self::Impute(ImputeMethod::Median) => Some("median"),
            Self::Impute(ImputeMethod::Mode) => Some("mode"),
            Self::Impute(ImputeMethod::Constant(_)) => Some("constant"),
            Self::Scale(ScaleMethod::ZScore) => Some("zscore"),
            Self::Scale(ScaleMethod::MinMax) => Some("minmax"),
            Self::ConvertDtype(ConvertTarget::Int { .. }) => Some("int"),
            Self::ConvertDtype(ConvertTarget::Float { .. }) => Some("float"),
            Self::ConvertDtype(ConvertTarget::Str) => Some("str"),
            Self::ConvertDtype(ConvertTarget::Datetime { .. }) => Some("datetime"),
            Self::FillOutliers(OutlierFill::Median) => Some("median"),
            Self::FillOutliers(OutlierFill::Mean) => Some("mean"),
            _ => None,
        }
    }

    fn params(&self) -> Option<Map<String, Value>> {
        let mut params = Map::new();
        match self {
            Self::Impute(ImputeMethod::Constant(value)) => {
                params.insert("value".to_string(), value.clone());
            }
            Self::Standardize {
                remove_special_chars,
            } => {
                params.insert(
                    "remove_special_chars".to_string(),
                    Value::Bool(*remove_special_chars),
                );
            }
            Self::ConvertDtype(ConvertTarget::Int { impute } | ConvertTarget::Float { impute }) => {
                if let Some(fill) = impute {
                    params.insert("impute_missing".to_string(), Value::Bool(true));
                    let method = match fill {
                        NumericFill::Mean => "mean",
                        NumericFill::Median => "median",
                    };
                    params.insert("impute_method".to_string(), Value::from(method));
                }
            }
            Self::ConvertDtype(ConvertTarget::Datetime { format: Some(format) }) => {
                params.insert("format".to_string(), Value::from(format.as_str()));
            }
            Self::ClipOutliers { lower, upper } => {
                if let Some(lower) = lower {
                    params.insert("lower".to_string(), Value::from(*lower));
                }
                if let Some(upper) = upper {
                    params.insert("upper".to_string(), Value::from(*upper));
                }
            }
            Self::MapValues { mapping } => {
                let entries = mapping
                    .iter()
                    .map(|(from, to)| (mapping_key(from), to.clone()))
                    .collect();
                params.insert("mapping".to_string(), Value::Object(entries));
            }
            _ => {}
        }
        (!params.is_empty()).then_some(params)
    }
}

/// A parsed cleaning step.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Target column; `None` only for table-wide actions.
    pub column: Option<String>,
    pub action: Action,
    /// Free-text justification supplied with the step, never interpreted.
    pub reason: Option<String>,
}

impl Step {
    /// Create a step on a single column.
    pub fn on(column: impl Into<String>, action: Action) -> Self {
        Self {
            column: Some(column.into()),
            action,
            reason: None,
        }
    }

    /// Create a step that acts on the whole table.
    pub fn table(action: Action) -> Self {
        Self {
            column: None,
            action,
            reason: None,
        }
    }

    /// Attach a reason to the step.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Build a typed step from its loose JSON form.
    ///
    /// Returns the reason the step cannot be understood when the action or method
    /// is unknown, the column is missing, or params have the wrong shape.
    pub fn from_raw(raw: RawStep) -> Result<Self, String> {
        let action_name = raw
            .action
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| "missing action".to_string())?;
        let method = raw.method.as_deref().map(str::trim);
        let params = raw.params.unwrap_or_default();

        let action = match action_name {
            "drop" => Action::Drop,
            "impute" => Action::Impute(parse_impute(method, &params)?),
            "standardize" => Action::Standardize {
                remove_special_chars: bool_param(&params, "remove_special_chars")?.unwrap_or(false),
            },
            "normalize" => Action::Normalize,
            "scale" => Action::Scale(match require_method(action_name, method)? {
                "zscore" => ScaleMethod::ZScore,
                "minmax" => ScaleMethod::MinMax,
                other => return Err(unknown_method(action_name, other)),
            }),
            "convert_dtype" => Action::ConvertDtype(parse_convert(method, &params)?),
            "clip_outliers" => Action::ClipOutliers {
                lower: number_param(&params, "lower")?,
                upper: number_param(&params, "upper")?,
            },
            "fill_outliers" => Action::FillOutliers(match method {
                None | Some("median") => OutlierFill::Median,
                Some("mean") => OutlierFill::Mean,
                Some(other) => return Err(unknown_method(action_name, other)),
            }),
            "map_values" => Action::MapValues {
                mapping: parse_mapping(&params)?,
            },
            "remove_duplicates" => Action::RemoveDuplicates,
            "strip_whitespace" => Action::StripWhitespace,
            other => return Err(format!("unrecognized action '{other}'")),
        };

        let column = raw.column.filter(|c| !c.is_empty());
        if action.needs_column() && column.is_none() {
            return Err(format!("action '{}' requires a column", action.name()));
        }

        Ok(Self {
            column,
            action,
            reason: raw.reason,
        })
    }

    /// Loose JSON form of the step.
    pub fn to_raw(&self) -> RawStep {
        RawStep {
            column: self.column.clone(),
            action: Some(self.action.name().to_string()),
            method: self.action.method().map(str::to_string),
            params: self.action.params(),
            reason: self.reason.clone(),
        }
    }
}

impl Serialize for Step {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_raw().serialize(serializer)
    }
}

/// A step as it appears in JSON, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawStep {
    pub column: Option<String>,
    pub action: Option<String>,
    pub method: Option<String>,
    pub params: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// =============================================================================
// Param Parsing
// =============================================================================

fn unknown_method(action: &str, method: &str) -> String {
    format!("unrecognized method '{method}' for action '{action}'")
}

fn require_method<'a>(action: &str, method: Option<&'a str>) -> Result<&'a str, String> {
    method.ok_or_else(|| format!("action '{action}' requires a method"))
}

fn parse_impute(method: Option<&str>, params: &Map<String, Value>) -> Result<ImputeMethod, String> {
    Ok(match require_method("impute", method)? {
        "mean" => ImputeMethod::Mean,
        "median" => ImputeMethod::Median,
        "mode" => ImputeMethod::Mode,
        "constant" => {
            let value = params.get("value").cloned().unwrap_or_else(|| Value::from(0));
            if value.is_array() || value.is_object() {
                return Err("params.value must be a scalar".to_string());
            }
            ImputeMethod::Constant(value)
        }
        other => return Err(unknown_method("impute", other)),
    })
}

fn parse_convert(method: Option<&str>, params: &Map<String, Value>) -> Result<ConvertTarget, String> {
    let numeric_fill = || -> Result<Option<NumericFill>, String> {
        if !bool_param(params, "impute_missing")?.unwrap_or(false) {
            return Ok(None);
        }
        // Anything other than "mean" falls back to the median.
        let fill = match params.get("impute_method").and_then(Value::as_str) {
            Some("mean") => NumericFill::Mean,
            _ => NumericFill::Median,
        };
        Ok(Some(fill))
    };

    Ok(match require_method("convert_dtype", method)? {
        "int" => ConvertTarget::Int {
            impute: numeric_fill()?,
        },
        "float" => ConvertTarget::Float {
            impute: numeric_fill()?,
        },
        "str" => ConvertTarget::Str,
        "datetime" => ConvertTarget::Datetime {
            format: match params.get("format") {
                None | Some(Value::Null) => None,
                Some(Value::String(format)) => Some(format.clone()),
                Some(_) => return Err("params.format must be a string".to_string()),
            },
        },
        other => return Err(unknown_method("convert_dtype", other)),
    })
}

fn parse_mapping(params: &Map<String, Value>) -> Result<Vec<(Value, Value)>, String> {
    match params.get("mapping") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(entries)) => entries
            .iter()
            .map(|(from, to)| {
                if to.is_array() || to.is_object() {
                    Err(format!("mapping value for '{from}' must be a scalar"))
                } else {
                    Ok((Value::String(from.clone()), to.clone()))
                }
            })
            .collect(),
        Some(_) => Err("params.mapping must be an object".to_string()),
    }
}

fn bool_param(params: &Map<String, Value>, key: &str) -> Result<Option<bool>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(_) => Err(format!("params.{key} must be a boolean")),
    }
}

fn number_param(params: &Map<String, Value>, key: &str) -> Result<Option<f64>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(_) => Err(format!("params.{key} must be a number")),
    }
}

fn mapping_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
