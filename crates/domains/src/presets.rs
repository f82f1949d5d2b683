//! Built-in theme presets and the variable set given to new themes.

/// Variables a freshly created theme starts with.
pub const DEFAULT_VARIABLES: &[(&str, &str)] = &[
    ("primary", "#007bff"),
    ("secondary", "#6c757d"),
    ("background", "#ffffff"),
    ("text", "#212529"),
    ("border", "#dee2e6"),
    ("shadow", "rgba(0, 0, 0, 0.1)"),
];

pub struct ThemePreset {
    pub name: &'static str,
    pub identifier: &'static str,
    pub variables: &'static [(&'static str, &'static str)],
}

/// Identifier of the preset activated on a fresh install.
pub const FALLBACK_IDENTIFIER: &str = "light";

pub const BUILTIN_THEMES: &[ThemePreset] = &[
    ThemePreset {
        name: "Light",
        identifier: "light",
        variables: &[
            ("primary", "#007bff"),
            ("secondary", "#6c757d"),
            ("background", "#ffffff"),
            ("text", "#212529"),
            ("border", "#dee2e6"),
            ("shadow", "rgba(0, 0, 0, 0.1)"),
            ("card-bg", "#ffffff"),
            ("navbar-bg", "#f8f9fa"),
            ("navbar-text", "#212529"),
            ("footer-bg", "#f8f9fa"),
            ("footer-text", "#212529"),
        ],
    },
    ThemePreset {
        name: "Dark",
        identifier: "dark",
        variables: &[
            ("primary", "#0d6efd"),
            ("secondary", "#6c757d"),
            ("background", "#121212"),
            ("text", "#ffffff"),
            ("border", "#404040"),
            ("shadow", "rgba(0, 0, 0, 0.3)"),
            ("card-bg", "#1e1e1e"),
            ("navbar-bg", "#343a40"),
            ("navbar-text", "#ffffff"),
            ("footer-bg", "#343a40"),
            ("footer-text", "#ffffff"),
        ],
    },
    ThemePreset {
        name: "Blue",
        identifier: "blue",
        variables: &[
            ("primary", "#0056b3"),
            ("secondary", "#6c757d"),
            ("background", "#f8faff"),
            ("text", "#212529"),
            ("border", "#b3d7ff"),
            ("shadow", "rgba(0, 86, 179, 0.1)"),
            ("card-bg", "#ffffff"),
            ("navbar-bg", "#0056b3"),
            ("navbar-text", "#ffffff"),
            ("footer-bg", "#e6f2ff"),
            ("footer-text", "#212529"),
        ],
    },
    ThemePreset {
        name: "Green",
        identifier: "green",
        variables: &[
            ("primary", "#28a745"),
            ("secondary", "#6c757d"),
            ("background", "#f8fff9"),
            ("text", "#212529"),
            ("border", "#c3e6cb"),
            ("shadow", "rgba(40, 167, 69, 0.1)"),
            ("card-bg", "#ffffff"),
            ("navbar-bg", "#28a745"),
            ("navbar-text", "#ffffff"),
            ("footer-bg", "#e6f7ec"),
            ("footer-text", "#212529"),
        ],
    },
];

pub fn owned(variables: &[(&str, &str)]) -> Vec<(String, String)> {
    variables
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

pub fn default_variables() -> Vec<(String, String)> {
    owned(DEFAULT_VARIABLES)
}
