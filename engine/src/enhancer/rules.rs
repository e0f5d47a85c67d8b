//! Ordered rule table mapping javac and JVM output to symbol roles.
//!
//! Each rule is tried in table order; within a role, only the first rule that
//! matches contributes, and every occurrence it matches is extracted.
//! Capture groups by name:
//!
//! | Group        | Meaning                                         |
//! |--------------|-------------------------------------------------|
//! | `name`       | missing type, method, or null-returning method  |
//! | `owner`      | declaring type, qualified or simple             |
//! | `owner_var`  | variable whose type owns the method             |
//! | `qualified`  | fully-qualified class name                      |

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::diagnostic::{MessageLocale, SymbolRole};

/// One row of the rule table.
pub struct DiagnosticRule {
    pub role: SymbolRole,
    pub locale: MessageLocale,
    pub pattern: Regex,
    /// Symbol name when the pattern has no `name` group
    pub fallback_name: Option<&'static str>,
    /// The null comes from stubbing a void method
    pub void_method: bool,
}

/// A single rule hit before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub role: SymbolRole,
    pub locale: MessageLocale,
    pub name: String,
    pub owner: Option<String>,
    pub qualified: Option<String>,
    pub void_method: bool,
}

fn rule(role: SymbolRole, locale: MessageLocale, pattern: &str) -> DiagnosticRule {
    DiagnosticRule {
        role,
        locale,
        pattern: Regex::new(pattern).unwrap(),
        fallback_name: None,
        void_method: false,
    }
}

pub static RULES: LazyLock<Vec<DiagnosticRule>> = LazyLock::new(|| {
    use MessageLocale::{En, Neutral, Zh};
    use SymbolRole::*;

    vec![
        // Missing types
        rule(MissingType, En, r"symbol:\s+class\s+(?P<name>\w+)"),
        rule(MissingType, Zh, r"符号:\s*类\s*(?P<name>\w+)"),
        rule(
            MissingType,
            Neutral,
            r"java\.lang\.(?:ClassNotFoundException|NoClassDefFoundError):?\s+(?P<qualified>[\w.$/]+)",
        ),
        // Missing methods
        rule(
            MissingMethod,
            En,
            r"symbol:\s+method\s+(?P<name>\w+)\s*\([^)]*\)(?:\s*location:\s+(?:(?:class|interface)\s+(?P<owner>[\w.$]+)|variable\s+\w+\s+of\s+type\s+(?P<owner_var>[\w.$]+)))?",
        ),
        rule(
            MissingMethod,
            Zh,
            r"符号:\s*方法\s*(?P<name>\w+)\s*\([^)]*\)(?:\s*位置:\s*(?:类型为\s*(?P<owner_var>[\w.$]+?)\s*的变量|(?:类|接口)\s*(?P<owner>[\w.$]+)))?",
        ),
        rule(
            MissingMethod,
            Neutral,
            r"java\.lang\.NoSuchMethodError:\s*'?(?:[\w.$\[\]<>]+\s+)?(?P<owner>[\w.$]+)\.(?P<name>[\w<>$]+)\(",
        ),
        // Nulls where a value is required
        DiagnosticRule {
            void_method: true,
            ..rule(
                IllegalNullAssignment,
                En,
                r"'void' type not allowed here[^\n]*\n[^\n]*?when\(\s*\w+\.(?P<name>\w+)\(",
            )
        },
        DiagnosticRule {
            void_method: true,
            fallback_name: Some("void"),
            ..rule(IllegalNullAssignment, En, r"'void' type not allowed here")
        },
        rule(
            IllegalNullAssignment,
            En,
            r"incompatible types: <null(?:type)?> cannot be converted to (?P<name>\w+)",
        ),
        rule(
            IllegalNullAssignment,
            En,
            r#"because the return value of "(?P<owner>[\w.$]+)\.(?P<name>\w+)\([^"]*\)" is null"#,
        ),
        rule(
            IllegalNullAssignment,
            En,
            r#"Cannot invoke "(?P<owner>[\w.$]+)\.(?P<name>\w+)\([^"]*\)""#,
        ),
        DiagnosticRule {
            void_method: true,
            ..rule(
                IllegalNullAssignment,
                Zh,
                r"此处不允许使用\s*'?空'?\s*类型[^\n]*\n[^\n]*?when\(\s*\w+\.(?P<name>\w+)\(",
            )
        },
        DiagnosticRule {
            void_method: true,
            fallback_name: Some("void"),
            ..rule(IllegalNullAssignment, Zh, r"此处不允许使用\s*'?空'?\s*类型")
        },
        rule(
            IllegalNullAssignment,
            Zh,
            r"不兼容的类型:\s*<空值?>\s*无法转换为\s*(?P<name>\w+)",
        ),
        rule(
            IllegalNullAssignment,
            Zh,
            r#"因为\s*"(?P<owner>[\w.$]+)\.(?P<name>\w+)\([^"]*\)"\s*的返回值为\s*null"#,
        ),
        rule(
            IllegalNullAssignment,
            Zh,
            r#"无法调用\s*"(?P<owner>[\w.$]+)\.(?P<name>\w+)\([^"]*\)""#,
        ),
        // Exceptions raised while running the test
        rule(
            RuntimeExceptionType,
            En,
            r#"Exception in thread "[^"]*"\s+(?P<qualified>(?:[\w$]+\.)+[\w$]+)"#,
        ),
        rule(
            RuntimeExceptionType,
            Zh,
            r#"线程\s*"[^"]*"\s*中的异常\s*(?P<qualified>(?:[\w$]+\.)+[\w$]+)"#,
        ),
        rule(
            RuntimeExceptionType,
            Neutral,
            r"(?m)^(?:\s*Caused by:\s*|\s*)(?P<qualified>(?:[a-z_][\w$]*\.)+[A-Z][\w$]*(?:Exception|Error))\b",
        ),
    ]
});

/// Run the table over `text`.
///
/// Hits come out in table order, then position order; duplicates of the same
/// (role, name, owner) are dropped.
pub fn apply(text: &str) -> Vec<RuleMatch> {
    let mut matched_roles: Vec<SymbolRole> = Vec::new();
    let mut hits: Vec<RuleMatch> = Vec::new();

    for rule in RULES.iter() {
        if matched_roles.contains(&rule.role) {
            continue;
        }

        let mut any = false;
        for caps in rule.pattern.captures_iter(text) {
            let Some(hit) = to_match(rule, &caps) else {
                continue;
            };
            any = true;
            let duplicate = hits
                .iter()
                .any(|h| h.role == hit.role && h.name == hit.name && h.owner == hit.owner);
            if !duplicate {
                hits.push(hit);
            }
        }

        if any {
            matched_roles.push(rule.role);
        }
    }

    hits
}

fn to_match(rule: &DiagnosticRule, caps: &Captures) -> Option<RuleMatch> {
    let group = |name: &str| caps.name(name).map(|m| m.as_str().to_string());

    let qualified = group("qualified").map(|q| q.replace('/', "."));
    let owner = group("owner").or_else(|| group("owner_var"));
    let name = group("name")
        .or_else(|| {
            qualified
                .as_deref()
                .map(|q| q.rsplit(['.', '$']).next().unwrap_or(q).to_string())
        })
        .or_else(|| rule.fallback_name.map(str::to_string))?;

    Some(RuleMatch {
        role: rule.role,
        locale: rule.locale,
        name,
        owner,
        qualified,
        void_method: rule.void_method,
    })
}
