//! Text parameter parsing shared by the nodes in this crate.
//!
//! Every node accepts its parameters as strings (the registry and config
//! layers only carry text). These helpers turn a bad value into a
//! [`NodeError::Parameter`] naming the node and the parameter.

#[cfg(not(feature = "std"))]
use alloc::{format, string::String, vec::Vec};

use core::fmt::Write;

use sluice_core::{Extent, NodeError, SplitMode, TimeSnap};

/// Error for a parameter the node does not have.
pub fn unknown(node: &str, name: &str) -> NodeError {
    NodeError::parameter(format!("{node}: unknown parameter '{name}'"))
}

fn invalid(node: &str, name: &str, value: &str, expected: &str) -> NodeError {
    NodeError::parameter(format!(
        "{node}: invalid value '{value}' for '{name}', expected {expected}"
    ))
}

/// Parses a finite float.
pub fn parse_f64(node: &str, name: &str, value: &str) -> Result<f64, NodeError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(node, name, value, "a finite number"))
}

/// Parses a non-negative integer.
pub fn parse_u32(node: &str, name: &str, value: &str) -> Result<u32, NodeError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| invalid(node, name, value, "a non-negative integer"))
}

/// Parses `true`/`false`, `1`/`0`, `yes`/`no` or `on`/`off`.
pub fn parse_bool(node: &str, name: &str, value: &str) -> Result<bool, NodeError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(node, name, value, "a boolean")),
    }
}

/// Parses a comma or whitespace separated list of finite floats.
///
/// An empty string yields an empty list.
pub fn parse_f64_list(node: &str, name: &str, value: &str) -> Result<Vec<f64>, NodeError> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| parse_f64(node, name, t))
        .collect()
}

/// Parses a list of floats sorted strictly ascending.
pub fn parse_time_steps(node: &str, name: &str, value: &str) -> Result<Vec<f64>, NodeError> {
    let steps = parse_f64_list(node, name, value)?;
    if steps.windows(2).any(|w| w[0] >= w[1]) {
        return Err(invalid(node, name, value, "strictly ascending times"));
    }
    Ok(steps)
}

/// Parses a `lo,hi` range with `lo <= hi`. An empty string clears it.
pub fn parse_range(node: &str, name: &str, value: &str) -> Result<Option<[f64; 2]>, NodeError> {
    let values = parse_f64_list(node, name, value)?;
    match values.as_slice() {
        [] => Ok(None),
        [lo, hi] if lo <= hi => Ok(Some([*lo, *hi])),
        _ => Err(invalid(node, name, value, "two ascending numbers")),
    }
}

/// Parses an extent such as `"0 9 0 9 0 0"`.
pub fn parse_extent(node: &str, name: &str, value: &str) -> Result<Extent, NodeError> {
    value
        .parse::<Extent>()
        .map_err(|_| invalid(node, name, value, "six integers"))
}

/// Parses a split mode name.
pub fn parse_split_mode(node: &str, name: &str, value: &str) -> Result<SplitMode, NodeError> {
    value
        .parse::<SplitMode>()
        .map_err(|_| invalid(node, name, value, "block, x-slab, y-slab or z-slab"))
}

/// Parses a time snap mode name.
pub fn parse_snap(node: &str, name: &str, value: &str) -> Result<TimeSnap, NodeError> {
    value
        .parse::<TimeSnap>()
        .map_err(|_| invalid(node, name, value, "nearest, below or above"))
}

/// Parses a comma separated list of non-empty names.
pub fn parse_names(node: &str, name: &str, value: &str) -> Result<Vec<String>, NodeError> {
    let names: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if names.is_empty() {
        return Err(invalid(node, name, value, "at least one name"));
    }
    Ok(names)
}

/// Formats floats as a comma separated list.
pub fn format_list(values: &[f64]) -> String {
    let mut out = String::new();
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{v}");
    }
    out
}

/// Formats an extent as six space separated integers.
pub fn format_extent(extent: &Extent) -> String {
    let e = &extent.0;
    format!("{} {} {} {} {} {}", e[0], e[1], e[2], e[3], e[4], e[5])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_f64("n", "p", " 2.5 ").unwrap(), 2.5);
        assert!(parse_f64("n", "p", "inf").is_err());
        assert!(parse_f64("n", "p", "abc").is_err());
        assert_eq!(parse_u32("n", "p", "7").unwrap(), 7);
        assert!(parse_u32("n", "p", "-1").is_err());
    }

    #[test]
    fn test_parse_bool_spellings() {
        for v in ["true", "1", "YES", "on"] {
            assert!(parse_bool("n", "p", v).unwrap());
        }
        for v in ["false", "0", "no", "Off"] {
            assert!(!parse_bool("n", "p", v).unwrap());
        }
        assert!(parse_bool("n", "p", "maybe").is_err());
    }

    #[test]
    fn test_parse_lists() {
        assert_eq!(parse_f64_list("n", "p", "0, 1 2.5").unwrap(), vec![0.0, 1.0, 2.5]);
        assert!(parse_f64_list("n", "p", "").unwrap().is_empty());
        assert!(parse_time_steps("n", "p", "0,2,1").is_err());
        assert_eq!(parse_range("n", "p", "0,10").unwrap(), Some([0.0, 10.0]));
        assert_eq!(parse_range("n", "p", "").unwrap(), None);
        assert!(parse_range("n", "p", "3,1").is_err());
    }

    #[test]
    fn test_error_names_node_and_parameter() {
        let err = parse_u32("image_source", "divisions", "x").unwrap_err();
        let NodeError::Parameter(msg) = err else {
            panic!("expected a parameter error");
        };
        assert!(msg.contains("image_source"));
        assert!(msg.contains("divisions"));
    }

    #[test]
    fn test_format_round_trips() {
        let e = Extent::new(0, 9, 0, 4, 0, 0);
        assert_eq!(parse_extent("n", "p", &format_extent(&e)).unwrap(), e);
        assert_eq!(format_list(&[0.0, 1.5]), "0,1.5");
        assert_eq!(parse_names("n", "p", "a, b").unwrap(), vec!["a", "b"]);
        assert!(parse_names("n", "p", " , ").is_err());
    }
}
