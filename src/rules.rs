//! Static MISRA C:2012 rule table
//!
//! The analyzers we run know nothing about MISRA. Cppcheck reports its own
//! diagnostic ids (`uninitvar`, `memleak`, ...) and clang-tidy reports check
//! names. This module maps those ids onto MISRA C:2012 rule identifiers and
//! attaches a canned description and remediation hint to each rule.
//!
//! # Mapping
//!
//! | Tool id | MISRA rule |
//! |---------|------------|
//! | `uninitvar`, `uninitStructMember` | Rule 9.1 |
//! | `memleak`, `resourceLeak` | Rule 22.1 |
//! | `arrayIndexOutOfBounds`, `bufferAccessOutOfBounds` | Rule 18.1 |
//! | `knownConditionTrueFalse`, `duplicateCondition`, ... | Rule 14.3 |
//! | anything unknown | `MISRA C:2012 Rule <tool id>` |
//!
//! The table is hand-maintained reference data. Bump [`CURRENT_RULESET`]
//! whenever it changes so stored analyses can be told apart.

use serde::Serialize;

/// Prefix shared by every rule identifier we emit
pub const RULE_PREFIX: &str = "MISRA C:2012 Rule";

/// Current version of the rule table
pub const CURRENT_RULESET: RuleSet = RuleSet {
    major: 1,
    minor: 0,
    patch: 0,
    name: "misra-c-2012",
    tools: &["cppcheck", "clang-tidy"],
};

/// Describes the version of the rule table and the tools it understands
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub name: &'static str,
    pub tools: &'static [&'static str],
}

impl RuleSet {
    pub fn version_string(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

}

impl std::fmt::Display for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{} ({})", self.version_string(), self.name)
    }
}

/// MISRA guideline category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Mandatory,
    Required,
    Advisory,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Mandatory => "Mandatory",
            Severity::Required => "Required",
            Severity::Advisory => "Advisory",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description and remediation text for one rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleInfo {
    pub description: &'static str,
    pub solution: &'static str,
}

const GENERIC_RULE: RuleInfo = RuleInfo {
    description: "Detected MISRA guideline violation.",
    solution: "Consult the MISRA C:2012 manual for specific remediation steps for this rule.",
};

/// Format a bare rule number ("9.1") as a full identifier
pub fn rule_id(number: &str) -> String {
    format!("{} {}", RULE_PREFIX, number)
}

/// Map a tool-specific diagnostic id onto a MISRA rule identifier.
///
/// Unknown ids are not dropped: they become `MISRA C:2012 Rule <id>` so the
/// finding still shows up in the report under its tool name.
pub fn map_tool_code(code: &str) -> String {
    let number = match code {
        "unusedVariable" => "2.7",
        "unusedFunction" => "2.1",
        "uninitvar" | "uninitStructMember" => "9.1",
        "nullPointer" => "1.3",
        "memleak" | "resourceLeak" => "22.1",
        "arrayIndexOutOfBounds" | "bufferAccessOutOfBounds" => "18.1",
        "va_list_usedBeforeStarted" | "va_start_wrongParameter" => "17.1",
        "functionStatic" | "variableScope" => "8.7",
        "constParameter" | "constVariable" => "8.13",
        "shadowVariable" => "5.3",
        "duplicateCondition" | "identicalConditionAfterEarlyExit" | "knownConditionTrueFalse" => {
            "14.3"
        }
        "comparePointers" | "literalWithCharPtrCompare" => "18.3",
        "unusedStructMember" => "2.3",
        "unusedLabel" => "2.6",
        "cstyleCast" => "10.8",
        "invalidPointerCast" => "11.3",
        "missingReturn" => "17.4",
        "wrongPrintfScanfArgNum" | "invalidScanfArgType_int" => "21.6",
        other => other,
    };
    rule_id(number)
}

/// Look up the canned description for a rule identifier
pub fn rule_info(rule: &str) -> RuleInfo {
    let number = rule.strip_prefix(RULE_PREFIX).map(str::trim).unwrap_or(rule);

    match number {
        "2.1" => RuleInfo {
            description: "A project shall not contain unreachable code.",
            solution: "Remove the code that cannot be executed or refactor the logic (e.g., removing returns before code blocks).",
        },
        "2.7" => RuleInfo {
            description: "There shall be no unused parameters in functions.",
            solution: "Remove the unused parameter from the function signature or use it if it was intended to be used.",
        },
        "5.3" => RuleInfo {
            description: "An identifier declared in an inner scope shall not hide an identifier declared in an outer scope.",
            solution: "Rename the inner scope variable to avoid name clashing with the outer scope variable.",
        },
        "8.7" => RuleInfo {
            description: "Functions and objects should not be defined with external linkage if they are referenced only in one translation unit.",
            solution: "Add the \"static\" keyword to the declaration to limit its scope to the current file.",
        },
        "8.13" => RuleInfo {
            description: "A pointer should point to a const-qualified type whenever possible.",
            solution: "Add \"const\" to the pointer target type in function parameters if the target is not modified within the function.",
        },
        "9.1" => RuleInfo {
            description: "The value of an object with automatic storage duration shall not be read before it has been set.",
            solution: "Initialize variables at the point of declaration or ensure they are assigned a value before being read.",
        },
        "10.8" => RuleInfo {
            description: "The value of a composite expression shall not be cast to a different essential type category or wider essential type.",
            solution: "Cast individual operands to the necessary type before performing the operation to ensure explicit conversion behavior.",
        },
        "11.3" => RuleInfo {
            description: "A cast shall not be performed between a pointer to object type and a pointer to a different object type.",
            solution: "Avoid pointer type punning. Use unions or explicit byte-wise copying if bit-level manipulation is required.",
        },
        "14.3" => RuleInfo {
            description: "Controlling expressions shall not be invariant (always true or always false).",
            solution: "Review the logic to ensure the condition can realistically change, or remove the redundant condition/code.",
        },
        "17.1" => RuleInfo {
            description: "The features of <stdarg.h> shall not be used.",
            solution: "Avoid variadic functions. Use explicit parameter passing or specialized functions instead.",
        },
        "17.4" => RuleInfo {
            description: "All exit paths from a function with non-void return type shall have an explicit return statement.",
            solution: "Add a return statement for all logical branches, including default cases and error paths.",
        },
        "18.1" => RuleInfo {
            description: "A pointer resulting from arithmetic on a pointer operand shall address an element of the same array as that pointer operand.",
            solution: "Perform bounds checking before pointer arithmetic or switch to indexed array access.",
        },
        "21.6" => RuleInfo {
            description: "The Standard Library input/output functions shall not be used.",
            solution: "Use platform-specific safe I/O drivers or strictly validated wrappers instead of standard printf/scanf.",
        },
        "22.1" => RuleInfo {
            description: "All resources obtained dynamically by use of Standard Library functions shall be explicitly released.",
            solution: "Ensure every malloc/calloc has a corresponding free call, preferably in a structured resource management pattern.",
        },
        _ => GENERIC_RULE,
    }
}

/// Map a raw tool severity onto a MISRA category
pub fn map_severity(raw: &str) -> Severity {
    match raw.to_ascii_lowercase().as_str() {
        "error" | "critical" => Severity::Required,
        "warning" | "portability" | "performance" => Severity::Required,
        _ => Severity::Advisory,
    }
}
