// Settings table exposed to the engine as a ConfigProvider

use std::collections::{BTreeMap, HashMap};

use checkin_domain::{ConfigProvider, ConfigValue};

/// Flattened view of `[settings]`; nested tables become dotted keys.
#[derive(Debug, Clone, Default)]
pub struct TomlSettingsProvider {
    values: HashMap<String, ConfigValue>,
}

impl TomlSettingsProvider {
    pub fn from_table(table: &BTreeMap<String, toml::Value>) -> Self {
        let mut values = HashMap::new();
        for (key, value) in table {
            flatten_into(&mut values, key, value);
        }
        Self { values }
    }

    pub fn with_value(mut self, key: &str, value: ConfigValue) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConfigProvider for TomlSettingsProvider {
    fn get_config(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).cloned()
    }
}

fn flatten_into(values: &mut HashMap<String, ConfigValue>, prefix: &str, value: &toml::Value) {
    match value {
        toml::Value::Table(table) => {
            for (key, nested) in table {
                flatten_into(values, &format!("{}.{}", prefix, key), nested);
            }
        }
        toml::Value::String(text) => {
            values.insert(prefix.to_string(), ConfigValue::Text(text.clone()));
        }
        toml::Value::Integer(number) => {
            values.insert(prefix.to_string(), ConfigValue::Integer(*number));
        }
        toml::Value::Boolean(flag) => {
            values.insert(prefix.to_string(), ConfigValue::Flag(*flag));
        }
        // Floats, dates and arrays are not engine settings.
        _ => {}
    }
}
