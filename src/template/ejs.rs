//! Translation of legacy EJS templates into handlebars.
//!
//! Only output tags are supported: `<%= expr %>` (escaped), `<%- expr %>`
//! (raw) and `<%# comment %>`. An expression is a property path
//! (`insured.name`, `items[0].qty`) or a helper call
//! (`helpers.yn(gas_line_work)`, `formatDate(effective_date, '%Y')`). The
//! second argument of `formatDate` becomes `fmt=`, and a trailing string
//! literal passed to `join` becomes `sep=`. A trailing `|| ''` fallback is
//! dropped since lookup is already total. Scriptlets (`<% ... %>`) carry
//! control flow and are rejected.

use regex::Regex;
use std::sync::OnceLock;

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<%([=\-#_]?)(.*?)([-_]?)%>").expect("valid regex"))
}

fn call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^(?:helpers\.)?([A-Za-z_]\w*)\s*\((.*)\)$").expect("valid regex")
    })
}

fn path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^[A-Za-z_]\w*(?:\.[A-Za-z_]\w*|\[\d+\]|\[\s*(?:'[^']*'|"[^"]*")\s*\])*$"#)
            .expect("valid regex")
    })
}

fn fallback_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\s*\|\|\s*(?:''|""|``)\s*$"#).expect("valid regex"))
}

fn index_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\[\s*(?:(\d+)|'([^']*)'|"([^"]*)")\s*\]"#).expect("valid regex"))
}

/// Translate an EJS source into an equivalent handlebars source.
pub fn translate(source: &str) -> Result<String, String> {
    let mut out = String::with_capacity(source.len());
    let mut last = 0;
    let mut slurp_newline = false;

    for caps in tag_re().captures_iter(source) {
        let Some(tag) = caps.get(0) else { continue };
        let mut text = &source[last..tag.start()];
        if slurp_newline {
            text = text
                .strip_prefix("\r\n")
                .or_else(|| text.strip_prefix('\n'))
                .unwrap_or(text);
        }
        push_text(&mut out, text);

        let body = &caps[2];
        match &caps[1] {
            "=" => {
                out.push_str("{{");
                out.push_str(&translate_expr(body)?);
                out.push_str("}}");
            }
            "-" => {
                out.push_str("{{{");
                out.push_str(&translate_expr(body)?);
                out.push_str("}}}");
            }
            "#" => {}
            _ => {
                return Err(format!(
                    "scriptlet tags are not supported: <%{}%>",
                    body.trim()
                ))
            }
        }

        slurp_newline = &caps[3] == "-";
        last = tag.end();
    }

    let mut rest = &source[last..];
    if slurp_newline {
        rest = rest
            .strip_prefix("\r\n")
            .or_else(|| rest.strip_prefix('\n'))
            .unwrap_or(rest);
    }
    push_text(&mut out, rest);
    Ok(out)
}

/// Literal text; any `{{` in it must not open a handlebars expression.
fn push_text(out: &mut String, text: &str) {
    out.push_str(&text.replace("{{", "\\{{"));
}

fn translate_expr(expr: &str) -> Result<String, String> {
    let trimmed = expr.trim();
    let expr = fallback_re().replace(trimmed, "");
    let expr = expr.trim();
    if expr.is_empty() {
        return Err("empty output tag".to_string());
    }

    if let Some(caps) = call_re().captures(expr) {
        let helper = &caps[1];
        let mut args = split_args(&caps[2])?;
        let option = match trailing_option(helper, &args) {
            Some(key) => args.pop().map(|arg| (key, arg)),
            None => None,
        };

        let mut parts = vec![helper.to_string()];
        for arg in args {
            parts.push(translate_arg(arg)?);
        }
        if let Some((key, arg)) = option {
            parts.push(format!("{key}={}", translate_arg(arg)?));
        }
        return Ok(parts.join(" "));
    }
    translate_path(expr)
}

/// Hash key the last argument of a helper call maps to, when the helper
/// reads it as an option rather than a value.
fn trailing_option(helper: &str, args: &[&str]) -> Option<&'static str> {
    match (helper, args) {
        ("formatDate", [_, _]) => Some("fmt"),
        ("join", [_, .., last]) if is_string_literal(last) => Some("sep"),
        _ => None,
    }
}

fn is_string_literal(arg: &str) -> bool {
    let arg = arg.trim();
    arg.len() >= 2
        && ((arg.starts_with('\'') && arg.ends_with('\''))
            || (arg.starts_with('"') && arg.ends_with('"')))
}

fn translate_arg(arg: &str) -> Result<String, String> {
    let arg = arg.trim();
    if let Some(inner) = arg
        .strip_prefix('\'')
        .and_then(|a| a.strip_suffix('\''))
        .or_else(|| arg.strip_prefix('"').and_then(|a| a.strip_suffix('"')))
    {
        if inner.contains('"') {
            return Err(format!("unsupported string literal: {arg}"));
        }
        return Ok(format!("\"{inner}\""));
    }
    if matches!(arg, "true" | "false" | "null") || arg.parse::<f64>().is_ok() {
        return Ok(arg.to_string());
    }
    if call_re().is_match(arg) {
        return Ok(format!("({})", translate_expr(arg)?));
    }
    translate_path(arg)
}

/// `a.b[0]['c d']` → `a.b.[0].[c d]`
fn translate_path(expr: &str) -> Result<String, String> {
    if !path_re().is_match(expr) {
        return Err(format!("unsupported expression: {expr}"));
    }
    Ok(index_re()
        .replace_all(expr, |caps: &regex::Captures| {
            let key = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            format!(".[{key}]")
        })
        .into_owned())
}

/// Split call arguments on top-level commas.
fn split_args(args: &str) -> Result<Vec<&str>, String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in args.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => {
                depth -= 1;
                if depth < 0 {
                    return Err(format!("unbalanced arguments: {args}"));
                }
            }
            (None, ',') if depth == 0 => {
                parts.push(&args[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 || quote.is_some() {
        return Err(format!("unbalanced arguments: {args}"));
    }

    parts.push(&args[start..]);
    Ok(parts.into_iter().filter(|p| !p.trim().is_empty()).collect())
}
