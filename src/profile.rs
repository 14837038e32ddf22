//! Transformation profile resolution.
//!
//! A profile starts life as a raw TOML table under `[templates.<name>]` and
//! is turned into a [`TransformProfile`] by [`resolve`]: the template is
//! selected, every recognized key gets its default, types are checked, and
//! width/height are enforced when an operation needs them. Nothing
//! downstream (fingerprinting, the pipeline) ever sees a raw table.
//!
//! ## Recognized keys
//!
//! | Key | Type | Default |
//! |---|---|---|
//! | `inCanvas` | bool | `false` |
//! | `format` | string or `false` | `false` (inherit source extension) |
//! | `fit` | bool | `false` |
//! | `resize` | bool | `false` |
//! | `keepRatio` | bool | `false` |
//! | `trim` | array | `[]` (no trim) |
//! | `width` | integer ≥ 0 | required with `resize`/`inCanvas`, else `0` |
//! | `height` | integer ≥ 0 | required with `resize`/`inCanvas`, else `0` |
//!
//! Any other key is rejected.

use crate::config::{ConfigError, Templates};
use crate::imaging::{OutputFormat, TrimBase, TrimParams, TrimSides};
use toml::Value;

const IN_CANVAS: &str = "inCanvas";
const FORMAT: &str = "format";
const FIT: &str = "fit";
const RESIZE: &str = "resize";
const KEEP_RATIO: &str = "keepRatio";
const TRIM: &str = "trim";
const WIDTH: &str = "width";
const HEIGHT: &str = "height";

const RECOGNIZED: [&str; 8] = [IN_CANVAS, FORMAT, FIT, RESIZE, KEEP_RATIO, TRIM, WIDTH, HEIGHT];

/// A fully resolved, immutable transformation profile.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformProfile {
    pub(crate) name: String,
    pub(crate) in_canvas: bool,
    pub(crate) format: Option<OutputFormat>,
    pub(crate) fit: bool,
    pub(crate) resize: bool,
    pub(crate) keep_ratio: bool,
    /// Raw trim arguments, kept verbatim for fingerprinting.
    pub(crate) trim: Vec<Value>,
    /// Parsed form of `trim`; `None` when `trim` is empty.
    pub(crate) trim_params: Option<TrimParams>,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

/// One profile field in fingerprint order, borrowed from the profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Bool(bool),
    Integer(u32),
    Str(&'a str),
    Sequence(&'a [Value]),
}

impl TransformProfile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn in_canvas(&self) -> bool {
        self.in_canvas
    }

    /// Target format, `None` when the source extension should be kept.
    pub fn format(&self) -> Option<OutputFormat> {
        self.format
    }

    pub fn fit(&self) -> bool {
        self.fit
    }

    pub fn resize(&self) -> bool {
        self.resize
    }

    pub fn keep_ratio(&self) -> bool {
        self.keep_ratio
    }

    pub fn trim(&self) -> Option<&TrimParams> {
        self.trim_params.as_ref()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Copy of this profile with the target format pinned.
    pub fn with_format(&self, format: OutputFormat) -> Self {
        Self {
            format: Some(format),
            ..self.clone()
        }
    }

    /// Every field in the fixed order used for fingerprinting.
    ///
    /// An unset format is reported as `Bool(false)`.
    pub fn fields(&self) -> [(&'static str, FieldValue<'_>); 8] {
        let format = match self.format {
            Some(f) => FieldValue::Str(f.extension()),
            None => FieldValue::Bool(false),
        };
        [
            (IN_CANVAS, FieldValue::Bool(self.in_canvas)),
            (FORMAT, format),
            (FIT, FieldValue::Bool(self.fit)),
            (RESIZE, FieldValue::Bool(self.resize)),
            (KEEP_RATIO, FieldValue::Bool(self.keep_ratio)),
            (TRIM, FieldValue::Sequence(&self.trim)),
            (WIDTH, FieldValue::Integer(self.width)),
            (HEIGHT, FieldValue::Integer(self.height)),
        ]
    }
}

/// Select a template and resolve it into a [`TransformProfile`].
///
/// `requested` picks a template by name; when it is `None` or not present,
/// the first template in file order is used.
pub fn resolve(templates: &Templates, requested: Option<&str>) -> Result<TransformProfile, ConfigError> {
    let (name, raw) = requested
        .and_then(|n| templates.iter().find(|(k, _)| k.as_str() == n))
        .or_else(|| templates.iter().next())
        .ok_or(ConfigError::NoTemplates)?;

    let raw = raw.as_table().ok_or_else(|| {
        ConfigError::Validation(format!("templates.{name} must be a table"))
    })?;

    resolve_table(name, raw)
}

/// Resolve one raw template table.
pub fn resolve_table(name: &str, raw: &toml::Table) -> Result<TransformProfile, ConfigError> {
    if let Some(unknown) = raw.keys().find(|k| !RECOGNIZED.contains(&k.as_str())) {
        return Err(ConfigError::invalid_field(
            name,
            unknown,
            format!("unknown key, expected one of {}", RECOGNIZED.join(", ")),
        ));
    }

    let in_canvas = bool_field(name, raw, IN_CANVAS)?;
    let fit = bool_field(name, raw, FIT)?;
    let resize = bool_field(name, raw, RESIZE)?;
    let keep_ratio = bool_field(name, raw, KEEP_RATIO)?;
    let format = format_field(name, raw)?;

    // A non-array trim means "no trim", not an error
    let trim = match raw.get(TRIM) {
        Some(Value::Array(args)) => args.clone(),
        _ => Vec::new(),
    };
    let trim_params = parse_trim(name, &trim)?;

    let required = resize || in_canvas;
    let width = dimension_field(name, raw, WIDTH, required)?;
    let height = dimension_field(name, raw, HEIGHT, required)?;

    Ok(TransformProfile {
        name: name.to_string(),
        in_canvas,
        format,
        fit,
        resize,
        keep_ratio,
        trim,
        trim_params,
        width,
        height,
    })
}

fn bool_field(template: &str, raw: &toml::Table, key: &str) -> Result<bool, ConfigError> {
    match raw.get(key) {
        None => Ok(false),
        Some(Value::Boolean(b)) => Ok(*b),
        Some(other) => Err(ConfigError::invalid_field(
            template,
            key,
            format!("expected a boolean, got {}", other.type_str()),
        )),
    }
}

fn format_field(template: &str, raw: &toml::Table) -> Result<Option<OutputFormat>, ConfigError> {
    match raw.get(FORMAT) {
        None | Some(Value::Boolean(false)) => Ok(None),
        Some(Value::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::format_not_accepted(s)),
        Some(other) => Err(ConfigError::invalid_field(
            template,
            FORMAT,
            format!("expected a format name or false, got {other}"),
        )),
    }
}

fn dimension_field(
    template: &str,
    raw: &toml::Table,
    key: &str,
    required: bool,
) -> Result<u32, ConfigError> {
    match raw.get(key) {
        None if !required => Ok(0),
        Some(Value::Integer(n)) => u32::try_from(*n).map_err(|_| {
            ConfigError::invalid_field(template, key, format!("{n} is not a valid pixel size"))
        }),
        _ => Err(ConfigError::invalid_field(
            template,
            key,
            format!("check {key} is present and is integer"),
        )),
    }
}

/// Parse positional trim arguments `[base, away, tolerance, feather]`.
///
/// Missing trailing arguments take their defaults. An empty list disables
/// trimming.
fn parse_trim(template: &str, args: &[Value]) -> Result<Option<TrimParams>, ConfigError> {
    if args.is_empty() {
        return Ok(None);
    }
    if args.len() > 4 {
        return Err(ConfigError::invalid_field(
            template,
            TRIM,
            format!("expected at most 4 arguments, got {}", args.len()),
        ));
    }

    let invalid = |reason: String| ConfigError::invalid_field(template, TRIM, reason);
    let mut params = TrimParams::default();

    if let Some(base) = args.first() {
        params.base = base
            .as_str()
            .and_then(TrimBase::parse)
            .ok_or_else(|| invalid(format!("unknown trim base {base}")))?;
    }

    if let Some(away) = args.get(1) {
        params.away = match away {
            Value::String(s) if s == "all" => TrimSides::all(),
            Value::Array(sides) if sides.is_empty() => TrimSides::all(),
            Value::Array(sides) => {
                let mut parsed = TrimSides::none();
                for side in sides {
                    match side.as_str() {
                        Some("top") => parsed.top = true,
                        Some("bottom") => parsed.bottom = true,
                        Some("left") => parsed.left = true,
                        Some("right") => parsed.right = true,
                        _ => return Err(invalid(format!("unknown trim side {side}"))),
                    }
                }
                parsed
            }
            other => return Err(invalid(format!("unknown trim sides {other}"))),
        };
    }

    if let Some(tolerance) = args.get(2) {
        params.tolerance = tolerance
            .as_integer()
            .and_then(|t| u8::try_from(t).ok())
            .filter(|t| *t <= 100)
            .ok_or_else(|| invalid(format!("tolerance must be an integer 0-100, got {tolerance}")))?;
    }

    if let Some(feather) = args.get(3) {
        params.feather = feather
            .as_integer()
            .and_then(|f| u32::try_from(f).ok())
            .ok_or_else(|| invalid(format!("feather must be a non-negative integer, got {feather}")))?;
    }

    Ok(Some(params))
}
