use std::{env, path::PathBuf};

pub const MODULE_DIR_ENV: &str = "MAP_RESTRICTIONS_MODULE_DIR";
pub const LOCALE_ENV: &str = "MAP_RESTRICTIONS_LOCALE";
pub const ADMIN_PERMISSION_ENV: &str = "MAP_RESTRICTIONS_ADMIN_PERMISSION";

pub const DEFAULT_LOCALE: &str = "en";
pub const DEFAULT_ADMIN_PERMISSION: &str = "@css/root";

/// Where the plugin finds its files and who may reload it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSettings {
    /// Directory holding `configs/` and `lang/`.
    pub module_dir: PathBuf,
    pub locale: String,
    pub admin_permission: String,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            module_dir: PathBuf::from("."),
            locale: DEFAULT_LOCALE.to_string(),
            admin_permission: DEFAULT_ADMIN_PERMISSION.to_string(),
        }
    }
}

impl PluginSettings {
    pub fn with_module_dir(module_dir: impl Into<PathBuf>) -> Self {
        Self {
            module_dir: module_dir.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `MAP_RESTRICTIONS_*` variables.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(dir) = non_empty_var(MODULE_DIR_ENV) {
            settings.module_dir = PathBuf::from(dir);
        }
        if let Some(locale) = non_empty_var(LOCALE_ENV) {
            settings.locale = locale;
        }
        if let Some(permission) = non_empty_var(ADMIN_PERMISSION_ENV) {
            settings.admin_permission = permission;
        }
        settings
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_working_directory() {
        let settings = PluginSettings::default();
        assert_eq!(settings.module_dir, PathBuf::from("."));
        assert_eq!(settings.locale, "en");
        assert_eq!(settings.admin_permission, "@css/root");
    }

    #[test]
    fn env_overrides_apply() {
        env::set_var(MODULE_DIR_ENV, "/srv/cs2/plugins/MapRestrictions");
        env::set_var(LOCALE_ENV, "  ");
        let settings = PluginSettings::from_env();
        env::remove_var(MODULE_DIR_ENV);
        env::remove_var(LOCALE_ENV);

        assert_eq!(
            settings.module_dir,
            PathBuf::from("/srv/cs2/plugins/MapRestrictions")
        );
        assert_eq!(settings.locale, DEFAULT_LOCALE);
    }
}
