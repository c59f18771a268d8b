//! Scalar viewer preferences and their `<Settings>` representation.
//!
//! Every field has a compile-time default. On load a field is only overwritten
//! when its value is present and parses; on save every field is written.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::document::Element;

/// How the mapping tree is ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SortingType {
    #[default]
    OriginalNameAsc,
    OriginalNameDesc,
    NewNameAsc,
    NewNameDesc,
}

impl SortingType {
    /// Name used in the persisted document.
    pub fn as_str(self) -> &'static str {
        match self {
            SortingType::OriginalNameAsc => "OriginalNameAscending",
            SortingType::OriginalNameDesc => "OriginalNameDescending",
            SortingType::NewNameAsc => "NewNameAscending",
            SortingType::NewNameDesc => "NewNameDescending",
        }
    }
}

impl fmt::Display for SortingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortingType {
    type Err = ParseValueError;

    /// Accepts the persisted names as well as the short variant names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "OriginalNameAscending" | "OriginalNameAsc" => Ok(SortingType::OriginalNameAsc),
            "OriginalNameDescending" | "OriginalNameDesc" => Ok(SortingType::OriginalNameDesc),
            "NewNameAscending" | "NewNameAsc" => Ok(SortingType::NewNameAsc),
            "NewNameDescending" | "NewNameDesc" => Ok(SortingType::NewNameDesc),
            other => Err(ParseValueError(other.to_string())),
        }
    }
}

/// Visual Studio release used to open source locations.
///
/// Which releases are installed is decided outside this crate; the store only
/// keeps the user's choice and asks its environment for the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ToolVersion {
    Vs2010,
    Vs2012,
    Vs2013,
    Vs2015,
    Vs2017,
    Vs2019,
    Vs2022,
}

impl ToolVersion {
    pub const HIGHEST: ToolVersion = ToolVersion::Vs2022;

    pub const ALL: [ToolVersion; 7] = [
        ToolVersion::Vs2010,
        ToolVersion::Vs2012,
        ToolVersion::Vs2013,
        ToolVersion::Vs2015,
        ToolVersion::Vs2017,
        ToolVersion::Vs2019,
        ToolVersion::Vs2022,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolVersion::Vs2010 => "VS2010",
            ToolVersion::Vs2012 => "VS2012",
            ToolVersion::Vs2013 => "VS2013",
            ToolVersion::Vs2015 => "VS2015",
            ToolVersion::Vs2017 => "VS2017",
            ToolVersion::Vs2019 => "VS2019",
            ToolVersion::Vs2022 => "VS2022",
        }
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolVersion {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ToolVersion::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseValueError(s.to_string()))
    }
}

/// A persisted value that does not name a valid variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized value: {0:?}")]
pub struct ParseValueError(pub String);

/// Viewer preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub show_modules: bool,
    pub group_namespaces: bool,
    pub group_modules: bool,
    pub use_columns: bool,
    pub show_original: bool,
    pub show_unicode: bool,
    pub simplify_system_names: bool,
    pub simplify_nullable: bool,
    pub sorting_type: SortingType,
    pub tool_version: ToolVersion,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_modules: false,
            group_namespaces: true,
            group_modules: false,
            use_columns: true,
            show_original: true,
            show_unicode: false,
            simplify_system_names: true,
            simplify_nullable: true,
            sorting_type: SortingType::default(),
            tool_version: ToolVersion::HIGHEST,
        }
    }
}

impl Settings {
    /// Overlays the values present in a `<Settings>` element.
    pub fn load(&mut self, el: &Element) {
        load_bool(el, "ShowModules", &mut self.show_modules);
        load_bool(el, "GroupNamespaces", &mut self.group_namespaces);
        load_bool(el, "GroupModules", &mut self.group_modules);
        load_bool(el, "UseColumns", &mut self.use_columns);
        load_bool(el, "ShowOriginal", &mut self.show_original);
        load_bool(el, "ShowUnicode", &mut self.show_unicode);
        load_bool(el, "SimplifySystem", &mut self.simplify_system_names);
        load_bool(el, "SimplifyNullable", &mut self.simplify_nullable);
        load_parsed(el, "SortingType", &mut self.sorting_type);
        load_parsed(el, "VisualStudioVersion", &mut self.tool_version);
    }

    /// Writes every value as a child of `el`.
    pub fn save(&self, el: &mut Element) {
        el.append_value("ShowModules", bool_str(self.show_modules));
        el.append_value("GroupNamespaces", bool_str(self.group_namespaces));
        el.append_value("GroupModules", bool_str(self.group_modules));
        el.append_value("UseColumns", bool_str(self.use_columns));
        el.append_value("ShowOriginal", bool_str(self.show_original));
        el.append_value("ShowUnicode", bool_str(self.show_unicode));
        el.append_value("SimplifySystem", bool_str(self.simplify_system_names));
        el.append_value("SimplifyNullable", bool_str(self.simplify_nullable));
        el.append_value("SortingType", self.sorting_type.as_str());
        el.append_value("VisualStudioVersion", self.tool_version.as_str());
    }

    /// Sets a value by its persisted name (as used by the CLI).
    pub fn set_named(&mut self, name: &str, value: &str) -> Result<(), SetNamedError> {
        let flag = match name {
            "ShowModules" => &mut self.show_modules,
            "GroupNamespaces" => &mut self.group_namespaces,
            "GroupModules" => &mut self.group_modules,
            "UseColumns" => &mut self.use_columns,
            "ShowOriginal" => &mut self.show_original,
            "ShowUnicode" => &mut self.show_unicode,
            "SimplifySystem" => &mut self.simplify_system_names,
            "SimplifyNullable" => &mut self.simplify_nullable,
            "SortingType" => {
                self.sorting_type = value.parse()?;
                return Ok(());
            }
            "VisualStudioVersion" => {
                self.tool_version = value.parse()?;
                return Ok(());
            }
            other => return Err(SetNamedError::UnknownName(other.to_string())),
        };
        *flag = parse_bool(value)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SetNamedError {
    #[error("unknown setting: {0}")]
    UnknownName(String),
    #[error(transparent)]
    Value(#[from] ParseValueError),
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn parse_bool(s: &str) -> Result<bool, ParseValueError> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if s.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ParseValueError(s.to_string()))
    }
}

fn load_bool(el: &Element, name: &str, slot: &mut bool) {
    let Some(raw) = el.child_text(name) else {
        return;
    };
    match parse_bool(raw) {
        Ok(v) => *slot = v,
        Err(e) => tracing::warn!(setting = name, "ignoring stored value: {e}"),
    }
}

fn load_parsed<T: FromStr<Err = ParseValueError>>(el: &Element, name: &str, slot: &mut T) {
    let Some(raw) = el.child_text(name) else {
        return;
    };
    match raw.parse() {
        Ok(v) => *slot = v,
        Err(e) => tracing::warn!(setting = name, "ignoring stored value: {e}"),
    }
}
