//! Archive filename → install subdirectory table.
//!
//! The manifest only names archives; where each one unpacks is fixed by the
//! client layout and kept here as data. Unknown archives fall back to the
//! install root so a release that introduces a new archive still installs.

use std::collections::BTreeMap;

use tracing::warn;

use crate::types::ArchiveDescriptor;

/// Built-in mapping for the player and studio archive sets.
const BUILTIN: &[(&str, &str)] = &[
    // Player
    ("Libraries.zip", ""),
    ("shaders.zip", "shaders"),
    ("ssl.zip", "ssl"),
    ("WebView2.zip", ""),
    ("WebView2RuntimeInstaller.zip", "WebView2RuntimeInstaller"),
    ("content-avatar.zip", "content/avatar"),
    ("content-configs.zip", "content/configs"),
    ("content-fonts.zip", "content/fonts"),
    ("content-models.zip", "content/models"),
    ("content-sky.zip", "content/sky"),
    ("content-sounds.zip", "content/sounds"),
    ("content-textures2.zip", "content/textures"),
    ("content-textures3.zip", "PlatformContent/pc/textures"),
    ("content-terrain.zip", "PlatformContent/pc/terrain"),
    ("content-platform-fonts.zip", "PlatformContent/pc/fonts"),
    ("extracontent-places.zip", "ExtraContent/places"),
    ("extracontent-luapackages.zip", "ExtraContent/LuaPackages"),
    ("extracontent-translations.zip", "ExtraContent/translations"),
    ("extracontent-models.zip", "ExtraContent/models"),
    ("extracontent-textures.zip", "ExtraContent/textures"),
    ("RobloxApp.zip", ""),
    // Studio
    ("RobloxStudio.zip", ""),
    ("ApplicationConfig.zip", "ApplicationConfig"),
    ("content-studio_svg_textures.zip", "content/studio_svg_textures"),
    ("content-qt_translations.zip", "content/qt_translations"),
    ("content-api-docs.zip", "content/api_docs"),
    ("extracontent-scripts.zip", "ExtraContent/scripts"),
    ("BuiltInPlugins.zip", "BuiltInPlugins"),
    ("BuiltInStandalonePlugins.zip", "BuiltInStandalonePlugins"),
    ("LibrariesQt5.zip", ""),
    ("Plugins.zip", "Plugins"),
    ("Qml.zip", "Qml"),
    ("StudioFonts.zip", "StudioFonts"),
    ("redist.zip", ""),
];

/// Exact-match filename → subpath lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationMap {
    entries: BTreeMap<String, String>,
}

impl Default for DestinationMap {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DestinationMap {
    /// The table shipped with the installer.
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN
                .iter()
                .map(|(name, sub)| ((*name).to_string(), (*sub).to_string()))
                .collect(),
        }
    }

    /// Add or replace entries. Overrides win over existing rows.
    pub fn with_overrides<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, sub) in overrides {
            self.entries
                .insert(name.into(), normalize_subpath(&sub.into()));
        }
        self
    }

    /// Subpath for `filename`, or `None` when the table has no row for it.
    pub fn get(&self, filename: &str) -> Option<&str> {
        self.entries.get(filename).map(String::as_str)
    }

    /// Number of rows in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve an archive filename into a descriptor, defaulting to the root.
    pub fn resolve(&self, filename: &str) -> ArchiveDescriptor {
        if let Some(sub) = self.get(filename) {
            ArchiveDescriptor {
                filename: filename.to_string(),
                subpath: sub.to_string(),
                mapped: true,
            }
        } else {
            warn!(archive = filename, "no destination mapping, using install root");
            ArchiveDescriptor {
                filename: filename.to_string(),
                subpath: String::new(),
                mapped: false,
            }
        }
    }
}

/// Strip leading/trailing separators so `"/content/sky/"` joins as a relative path.
fn normalize_subpath(raw: &str) -> String {
    raw.trim().trim_matches(|c| c == '/' || c == '\\').to_string()
}
