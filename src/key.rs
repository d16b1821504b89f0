//! Deterministic job key derivation
//!
//! Every unit of fetch-and-cache work is identified by a string key composed
//! from its dataset, category, key base and parameters. The key doubles as
//! the cache storage identifier, so the composition must be stable across
//! runs and independent of the order in which named parameters are supplied.

use std::fmt;

/// A scalar parameter value used in job key composition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamValue {
    Int(i64),
    Str(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(n) => write!(f, "{}", n),
            ParamValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Int(n)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

/// Derives the deterministic key for one unit of work
///
/// The key is composed as `dataset/category/key_base`, followed by each
/// positional scalar, followed by each named parameter as `name=value` with
/// the names sorted ascending. Each appended segment is prefixed with `-`
/// unless the key currently ends in `/`.
///
/// Two calls with the same logical parameters always produce the same key
/// regardless of the order of the named parameters.
///
/// # Arguments
///
/// * `dataset` - The top-level dataset name (e.g. "current")
/// * `category` - The category under the dataset
/// * `key_base` - The base name for this job kind (may be empty)
/// * `positional` - Leading scalar parameters, appended verbatim in order
/// * `named` - Named parameters, sorted by name before composition
pub fn derive_key(
    dataset: &str,
    category: &str,
    key_base: &str,
    positional: &[ParamValue],
    named: &[(&str, ParamValue)],
) -> String {
    let mut key = format!("{}/{}/{}", dataset, category, key_base);

    for value in positional {
        if !key.ends_with('/') {
            key.push('-');
        }
        key.push_str(&value.to_string());
    }

    let mut sorted: Vec<&(&str, ParamValue)> = named.iter().collect();
    sorted.sort_by_key(|(name, _)| *name);

    for (name, value) in sorted {
        if !key.ends_with('/') {
            key.push('-');
        }
        key.push_str(name);
        key.push('=');
        key.push_str(&value.to_string());
    }

    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_appended_without_separator_after_slash() {
        // An empty key base leaves the key slash-terminated, so the first
        // positional segment lands directly after the slash.
        let key = derive_key("current", "config", "", &["environment-config".into()], &[]);
        assert_eq!(key, "current/config/environment-config");
    }

    #[test]
    fn test_named_parameters_sorted_by_name() {
        let key = derive_key(
            "current",
            "listas-regio-muni",
            "listas-regio-muni",
            &[],
            &[
                ("id_tipo_eleccion", 1.into()),
                ("id_proceso_electoral", 110.into()),
            ],
        );
        assert_eq!(
            key,
            "current/listas-regio-muni/listas-regio-muni-id_proceso_electoral=110-id_tipo_eleccion=1"
        );
    }

    #[test]
    fn test_order_independence_over_named_parameters() {
        let a = derive_key(
            "curr",
            "listas",
            "x",
            &[],
            &[("idA", 1.into()), ("idB", 2.into())],
        );
        let b = derive_key(
            "curr",
            "listas",
            "x",
            &[],
            &[("idB", 2.into()), ("idA", 1.into())],
        );
        assert_eq!(a, b);
        assert_eq!(a, "curr/listas/x-idA=1-idB=2");
    }

    #[test]
    fn test_string_parameter_values() {
        let key = derive_key(
            "current",
            "expedientes-detalles",
            "detalle",
            &[],
            &[("expediente", "EXP-2022-001".into())],
        );
        assert_eq!(
            key,
            "current/expedientes-detalles/detalle-expediente=EXP-2022-001"
        );
    }

    #[test]
    fn test_determinism_across_calls() {
        let make = || {
            derive_key(
                "current",
                "candidatos-hojavidas",
                "hojavida",
                &[],
                &[("id_hoja_vida", 42.into())],
            )
        };
        assert_eq!(make(), make());
        assert_eq!(make(), "current/candidatos-hojavidas/hojavida-id_hoja_vida=42");
    }

    #[test]
    fn test_mixed_positional_and_named() {
        let key = derive_key(
            "ds",
            "cat",
            "base",
            &["p1".into()],
            &[("n", 7.into())],
        );
        assert_eq!(key, "ds/cat/base-p1-n=7");
    }
}
