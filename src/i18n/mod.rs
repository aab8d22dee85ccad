//! Internationalization (i18n) of interface labels

use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const BUILTIN_PT_BR: &str = r#"
load_more: Carregar mais posts
not_found: Post não encontrado
back_home: Voltar para o início
no_posts: Nenhum post publicado ainda.
minutes: min
"#;

const BUILTIN_EN: &str = r#"
load_more: Load more posts
not_found: Post not found
back_home: Back to home
no_posts: No posts published yet.
minutes: min
"#;

/// Interface labels for the configured language
pub struct I18n {
    /// Current language, normalized (`pt-br`)
    language: String,
    /// lang -> key -> label
    translations: HashMap<String, HashMap<String, String>>,
}

impl I18n {
    /// Create a handler with the built-in `pt-BR` and `en` labels
    pub fn new(language: &str) -> Self {
        let mut translations = HashMap::new();
        for (lang, source) in [("pt-br", BUILTIN_PT_BR), ("en", BUILTIN_EN)] {
            match serde_yaml::from_str::<HashMap<String, String>>(source) {
                Ok(table) => {
                    translations.insert(lang.to_string(), table);
                }
                Err(e) => tracing::error!("Built-in {} labels are invalid: {}", lang, e),
            }
        }

        Self {
            language: normalize(language),
            translations,
        }
    }

    /// Merge label files from a directory (`<lang>.yml`, `.yaml` or `.json`)
    pub fn load_languages<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }

            let ext = path.extension().and_then(|e| e.to_str());
            if !matches!(ext, Some("yml") | Some("yaml") | Some("json")) {
                continue;
            }
            let Some(lang) = path.file_stem().and_then(|s| s.to_str()).map(normalize) else {
                continue;
            };

            let content = fs::read_to_string(&path)?;
            // YAML is a superset of JSON
            match serde_yaml::from_str::<HashMap<String, serde_yaml::Value>>(&content) {
                Ok(data) => {
                    let table = self.translations.entry(lang).or_default();
                    for (key, value) in data {
                        if let Some(label) = yaml_value_to_string(&value) {
                            table.insert(key, label);
                        }
                    }
                    tracing::debug!("Loaded language file: {:?}", path);
                }
                Err(e) => tracing::warn!("Failed to parse language file {:?}: {}", path, e),
            }
        }

        Ok(())
    }

    /// Get a label: current language, then its base language, then English,
    /// then the key itself
    pub fn get(&self, key: &str) -> String {
        self.candidates()
            .iter()
            .find_map(|lang| self.translations.get(lang)?.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// All labels resolved for the current language
    pub fn get_all_translations(&self) -> HashMap<String, String> {
        let mut result = HashMap::new();
        for lang in self.candidates() {
            if let Some(table) = self.translations.get(&lang) {
                for (k, v) in table {
                    result.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
        }
        result
    }

    fn candidates(&self) -> Vec<String> {
        let mut langs = vec![self.language.clone()];
        if let Some((base, _)) = self.language.split_once('-') {
            langs.push(base.to_string());
        }
        // built-in Portuguese labels are regional
        if self.language == "pt" {
            langs.push("pt-br".to_string());
        }
        langs.push("en".to_string());
        langs
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new("en")
    }
}

/// `pt_BR`, `pt-BR` and `PT-br` all become `pt-br`
fn normalize(lang: &str) -> String {
    lang.trim().replace('_', "-").to_ascii_lowercase()
}

fn yaml_value_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
