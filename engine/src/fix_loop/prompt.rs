//! Generation prompt rendering.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever the preamble or section
//! layout changes so reports can tell which prompt produced a test.

use crate::backend::ModuleContext;
use crate::context::bundle::ContextBundle;
use crate::diagnostic::{Diagnostic, SymbolRole};

pub const PROMPT_VERSION: &str = "1.2.0";

/// Lines of raw diagnostic text kept per failed attempt.
const MAX_DIAGNOSTIC_LINES: usize = 40;

pub const GENERATOR_PREAMBLE: &str = "\
You are a senior Java engineer writing JUnit 5 unit tests with Mockito. \
Produce one complete, compilable test class and nothing else.

## Rules
- Use only types, constructors and methods that appear in the context below \
or in the JDK, JUnit 5 and Mockito.
- Mock every collaborator that is not a plain value type. Configure every \
stubbed call the method under test relies on; never rely on a mock's default null.
- Include the package declaration and every import the class needs.
- Reply with a single ```java fenced block.";

/// Everything a prompt is built from.
pub struct PromptInput<'a> {
    pub bundle: &'a ContextBundle,
    pub module: &'a ModuleContext,
    /// Code produced by the previous attempt, if any
    pub previous_code: Option<&'a str>,
    /// Diagnostics of all failed attempts, oldest first
    pub diagnostics: &'a [Diagnostic],
    pub group_id: Option<&'a str>,
}

/// Repair advice for one category of extracted symbol.
pub fn guidance(role: SymbolRole) -> &'static str {
    match role {
        SymbolRole::MissingType => {
            "Some types could not be resolved. Add the imports listed under Imports, and \
             replace types that do not exist with ones shown in the context."
        }
        SymbolRole::MissingMethod => {
            "Some methods do not exist. Call only the constructors and methods listed in the \
             context and add the static imports listed under Imports."
        }
        SymbolRole::IllegalNullAssignment => {
            "A null reached code that needs a value. Follow the Stubbing notes: give every \
             stubbed collaborator call an explicit non-null return, and stub void methods with \
             doNothing()/doThrow()."
        }
        SymbolRole::RuntimeExceptionType => {
            "The test threw while running. Either assert the exception with assertThrows or fix \
             the arrange step that causes it; see Known failures."
        }
    }
}

pub fn build_prompt(input: &PromptInput<'_>) -> String {
    let bundle = input.bundle;
    let module = input.module;
    let mut out = String::new();

    out.push_str(GENERATOR_PREAMBLE);
    out.push_str("\n\n## Task\n");
    out.push_str(&format!(
        "Write the test class `{}` for method `{}` of `{}`.\n",
        module.test_fqn(),
        bundle.target_method(),
        bundle.target_type()
    ));
    if let Some(method) = &module.test_method {
        out.push_str(&format!("Name the test method `{method}`.\n"));
    }
    if let Some(group) = input.group_id {
        out.push_str(&format!("Project group id: {group}\n"));
    }
    out.push('\n');

    out.push_str(&bundle.render());

    if let Some(code) = input.previous_code {
        out.push_str("## Previous attempt\n```java\n");
        out.push_str(code.trim_end());
        out.push_str("\n```\n\n");
    }

    if !input.diagnostics.is_empty() {
        out.push_str("## Failures so far\n");
        for (i, diagnostic) in input.diagnostics.iter().enumerate() {
            out.push_str(&format!(
                "### Attempt {} ({} failure)\n```\n{}\n```\n",
                i + 1,
                diagnostic.kind,
                diagnostic.headline(MAX_DIAGNOSTIC_LINES)
            ));
        }
        out.push('\n');

        if let Some(latest) = input.diagnostics.last() {
            let roles = latest.roles();
            if !roles.is_empty() {
                out.push_str("## How to fix the last failure\n");
                for role in roles {
                    out.push_str("- ");
                    out.push_str(guidance(role));
                    out.push('\n');
                }
                out.push('\n');
            }
        }
    }

    out
}
