//! Target profiles: the per-language glue around block templates.
//!
//! Block definitions supply the instantiation and callback text for each
//! target. A profile supplies everything else: how an instantiation is bound
//! to its id, how connections and setter sections are spelled, and what the
//! output file is called. Profile templates use `${name}` placeholders:
//!
//! | Template        | Placeholders                            |
//! |-----------------|-----------------------------------------|
//! | `instance`      | `id`, `make`                            |
//! | `connection`    | `src`, `src_port`, `sink`, `sink_port`  |
//! | `setter_*`      | `var`, and `expr` in `setter_call`      |

use blockflow_core::template::{Placeholder, Segment, segments};

use crate::error::GenerationError;

/// Spelling of generated programs for one target language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetProfile {
    /// Target name; selects the block template set.
    pub name: String,
    /// Output file extension, without the dot.
    pub extension: String,
    /// Line comment prefix.
    pub comment: String,
    /// Binds a block's instantiation to its id.
    pub instance: String,
    /// One connection statement.
    pub connection: String,
    /// First line of a setter section.
    pub setter_open: String,
    /// Stores the new value. Skipped when empty.
    pub setter_assign: String,
    /// Re-invokes a dependent variable's setter.
    pub setter_call: String,
    /// Last line of a setter section. Skipped when empty.
    pub setter_close: String,
    /// Indentation of setter bodies.
    pub indent: String,
}

/// Names of the built-in profiles.
pub const BUILTIN_TARGETS: &[&str] = &["ref", "python", "cpp"];

impl TargetProfile {
    /// The plain reference notation, used by tests and for inspection.
    pub fn reference() -> Self {
        Self {
            name: "ref".to_string(),
            extension: "flow".to_string(),
            comment: "#".to_string(),
            instance: "${id} = ${make}".to_string(),
            connection: "connect ${src}:${src_port} -> ${sink}:${sink_port}".to_string(),
            setter_open: "on change ${var}:".to_string(),
            setter_assign: String::new(),
            setter_call: "update ${var} = ${expr}".to_string(),
            setter_close: String::new(),
            indent: "  ".to_string(),
        }
    }

    /// Python module.
    pub fn python() -> Self {
        Self {
            name: "python".to_string(),
            extension: "py".to_string(),
            comment: "#".to_string(),
            instance: "${id} = ${make}".to_string(),
            connection: "connect((${src}, ${src_port}), (${sink}, ${sink_port}))".to_string(),
            setter_open: "def set_${var}(self, ${var}):".to_string(),
            setter_assign: "self.${var} = ${var}".to_string(),
            setter_call: "self.set_${var}(${expr})".to_string(),
            setter_close: String::new(),
            indent: "    ".to_string(),
        }
    }

    /// C++ translation unit.
    pub fn cpp() -> Self {
        Self {
            name: "cpp".to_string(),
            extension: "cpp".to_string(),
            comment: "//".to_string(),
            instance: "auto ${id} = ${make};".to_string(),
            connection: "connect(${src}, ${src_port}, ${sink}, ${sink_port});".to_string(),
            setter_open: "void set_${var}(double ${var}) {".to_string(),
            setter_assign: "this->${var} = ${var};".to_string(),
            setter_call: "set_${var}(${expr});".to_string(),
            setter_close: "}".to_string(),
            indent: "    ".to_string(),
        }
    }

    /// Looks up a built-in profile by name.
    pub fn builtin(name: &str) -> Result<Self, GenerationError> {
        match name {
            "ref" => Ok(Self::reference()),
            "python" => Ok(Self::python()),
            "cpp" => Ok(Self::cpp()),
            _ => Err(GenerationError::UnknownTarget {
                name: name.to_string(),
                available: BUILTIN_TARGETS.join(", "),
            }),
        }
    }
}

/// Substitutes `${name}` placeholders in a profile template. Names not in
/// `vars` are left as written.
pub(crate) fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    for segment in segments(template) {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Placeholder(placeholder) => {
                let name = match placeholder {
                    Placeholder::InstanceId => Some("id"),
                    Placeholder::Value(name) => Some(name),
                    _ => None,
                };
                match name.and_then(|n| vars.iter().find(|(k, _)| *k == n)) {
                    Some((_, value)) => out.push_str(value),
                    None => out.push_str(&placeholder.to_string()),
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        for name in BUILTIN_TARGETS {
            assert_eq!(TargetProfile::builtin(name).unwrap().name, *name);
        }
        let err = TargetProfile::builtin("rust").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown target 'rust' (available: ref, python, cpp)"
        );
    }

    #[test]
    fn test_fill() {
        let profile = TargetProfile::python();
        assert_eq!(
            fill(&profile.connection, &[("src", "b1"), ("src_port", "0"), ("sink", "b2"), ("sink_port", "1")]),
            "connect((b1, 0), (b2, 1))"
        );
        assert_eq!(fill("${id} = ${make}", &[("id", "b3"), ("make", "f()")]), "b3 = f()");
        assert_eq!(fill("keep ${other}", &[]), "keep ${other}");
    }
}
