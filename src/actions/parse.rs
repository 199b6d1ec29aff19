//! Reduce model replies and source files to the pieces the pipeline needs.

use std::sync::LazyLock;

use regex::Regex;

static CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+\-]*[ \t]*\r?\n?(.*?)```").expect("valid regex")
});

static OPT_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[(.*?)\]").expect("valid regex"));

static LINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"//[^\n]*").expect("valid regex"));

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"));

static FUNCTION_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:[A-Za-z_][\w:<>,]*[ \t\*&]+)+([A-Za-z_]\w*)[ \t]*\([^;{}]*\)[ \t\r\n]*(?:const[ \t\r\n]*)?\{",
    )
    .expect("valid regex")
});

const NOT_FUNCTIONS: &[&str] = &["if", "for", "while", "switch", "return", "sizeof", "catch"];

/// The first fenced code block of a reply, or the whole reply when there is
/// none.
pub fn parse_code(reply: &str) -> String {
    match CODE_BLOCK.captures(reply) {
        Some(caps) => caps[1].trim().to_string(),
        None => reply.trim().to_string(),
    }
}

/// Parse `[a, b, c]`; `null`, `[]` or no list at all mean no optimizations.
pub fn parse_opt_list(reply: &str) -> Vec<String> {
    let Some(caps) = OPT_LIST.captures(reply) else {
        return Vec::new();
    };

    caps[1]
        .split(',')
        .map(|item| item.trim().trim_matches(|c| matches!(c, '"' | '\'' | '`')).trim())
        .filter(|item| !item.is_empty() && !item.eq_ignore_ascii_case("null"))
        .map(str::to_string)
        .collect()
}

/// Inverse of [`parse_opt_list`], used as message content.
pub fn render_opt_list(opts: &[String]) -> String {
    if opts.is_empty() {
        "null".to_string()
    } else {
        format!("[{}]", opts.join(", "))
    }
}

/// Name of the last function defined in `code` other than `main`.
///
/// Helpers are normally defined before the function that calls them, so the
/// last definition is taken as the top function.
pub fn extract_func_name(code: &str) -> Option<String> {
    let code = BLOCK_COMMENT.replace_all(code, "");
    let code = LINE_COMMENT.replace_all(&code, "");

    FUNCTION_DEF
        .captures_iter(&code)
        .map(|caps| caps[1].to_string())
        .filter(|name| name != "main" && !NOT_FUNCTIONS.contains(&name.as_str()))
        .last()
}

/// Declaration of the function `name` as defined in `code`, e.g.
/// `void fir(int *y, int x);`. Storage qualifiers are dropped so the
/// prototype links against the definition from another translation unit.
pub fn function_prototype(code: &str, name: &str) -> Option<String> {
    let code = BLOCK_COMMENT.replace_all(code, "");
    let code = LINE_COMMENT.replace_all(&code, "");

    let signature = FUNCTION_DEF
        .captures_iter(&code)
        .filter(|caps| &caps[1] == name)
        .last()?
        .get(0)?
        .as_str()
        .trim_end_matches('{')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let mut signature = signature.as_str();
    while let Some(rest) = ["static ", "inline "]
        .iter()
        .find_map(|q| signature.strip_prefix(q))
    {
        signature = rest;
    }
    Some(format!("{};", signature))
}
