//! Code-template substitution.
//!
//! A template is a string with positional placeholders: `{this}`, `{0}` ..
//! `{n}`, `{*}` for the remaining arguments, and `{T0}` .. `{Tk}` for type
//! arguments. Substitution is textual; arguments not named by any
//! placeholder are dropped. A placeholder past the provided arguments is a
//! compilation error at the calling method's location.

use crate::error::{EmitError, EmitResult};
use sharplua_semantic::SourceLocation;

/// Expand `template` with rendered argument texts.
pub fn expand(
    template: &str,
    this: Option<&str>,
    args: &[String],
    type_args: &[String],
    location: SourceLocation,
) -> EmitResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut max_positional_used: Option<usize> = None;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            return Err(EmitError::MalformedTemplate {
                template: template.to_string(),
                message: "unterminated placeholder".to_string(),
                location,
            });
        };
        let content = &after[..close];
        match classify(content) {
            Placeholder::This => match this {
                Some(t) => out.push_str(t),
                None => {
                    return Err(EmitError::MalformedTemplate {
                        template: template.to_string(),
                        message: "{this} used on a method without a receiver".to_string(),
                        location,
                    })
                }
            },
            Placeholder::Positional(i) => match args.get(i) {
                Some(a) => {
                    max_positional_used = Some(max_positional_used.map_or(i, |m| m.max(i)));
                    out.push_str(a);
                }
                None => {
                    return Err(EmitError::TemplateArity {
                        index: i,
                        provided: args.len(),
                        location,
                    })
                }
            },
            Placeholder::Rest => {
                let from = max_positional_used.map_or(0, |m| m + 1);
                out.push_str(&args[from.min(args.len())..].join(", "));
            }
            Placeholder::TypeArg(i) => match type_args.get(i) {
                Some(t) => out.push_str(t),
                None => {
                    return Err(EmitError::TemplateArity {
                        index: i,
                        provided: type_args.len(),
                        location,
                    })
                }
            },
            // Anything else is literal text; Lua tables put braces in
            // templates legitimately.
            Placeholder::Literal => {
                out.push('{');
                out.push_str(content);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

enum Placeholder {
    This,
    Positional(usize),
    Rest,
    TypeArg(usize),
    Literal,
}

fn classify(content: &str) -> Placeholder {
    if content == "this" {
        return Placeholder::This;
    }
    if content == "*" {
        return Placeholder::Rest;
    }
    if let Ok(i) = content.parse::<usize>() {
        return Placeholder::Positional(i);
    }
    if let Some(rest) = content.strip_prefix('T') {
        if let Ok(i) = rest.parse::<usize>() {
            return Placeholder::TypeArg(i);
        }
    }
    Placeholder::Literal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::new("test.cs", 1, 1)
    }

    #[test]
    fn positional_and_this() {
        let out = expand(
            "{this}:Write({0}, {1})",
            Some("stream"),
            &["a".to_string(), "b".to_string()],
            &[],
            loc(),
        )
        .unwrap();
        assert_eq!(out, "stream:Write(a, b)");
    }

    #[test]
    fn rest_collects_remaining() {
        let out = expand(
            "print({0}, {*})",
            None,
            &["a".to_string(), "b".to_string(), "c".to_string()],
            &[],
            loc(),
        )
        .unwrap();
        assert_eq!(out, "print(a, b, c)");
    }

    #[test]
    fn type_args_substitute() {
        let out = expand(
            "System.Array({T0})",
            None,
            &[],
            &["System.Int32".to_string()],
            loc(),
        )
        .unwrap();
        assert_eq!(out, "System.Array(System.Int32)");
    }

    #[test]
    fn arity_mismatch_errors() {
        let err = expand("f({2})", None, &["a".to_string()], &[], loc()).unwrap_err();
        assert!(matches!(err, EmitError::TemplateArity { index: 2, .. }));
    }

    #[test]
    fn literal_braces_pass_through() {
        let out = expand("setmetatable({}, mt)", None, &[], &[], loc()).unwrap();
        assert_eq!(out, "setmetatable({}, mt)");
    }

    #[test]
    fn unterminated_placeholder_errors() {
        let err = expand("f({0", None, &["a".to_string()], &[], loc()).unwrap_err();
        assert!(matches!(err, EmitError::MalformedTemplate { .. }));
    }
}
